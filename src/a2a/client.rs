//! Client transports for the research protocol

use super::manager::TaskManager;
use super::types::*;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};

/// The four protocol operations, independent of how they are carried
#[async_trait]
pub trait TaskTransport: Send + Sync {
    async fn agent_card(&self) -> Result<AgentCard>;

    async fn submit(&self, request: &TaskRequest) -> Result<String>;

    async fn get(&self, task_id: &str) -> Result<TaskSnapshot>;

    async fn cancel(&self, task_id: &str) -> Result<TaskState>;
}

/// JSON-RPC over HTTP to a remote executor
pub struct HttpA2AClient {
    http: reqwest::Client,
    base_url: String,
    next_id: AtomicU64,
}

impl HttpA2AClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let request = RpcRequest::new(self.next_id.fetch_add(1, Ordering::Relaxed), method, params);

        let response = self
            .http
            .post(format!("{}{}", self.base_url, RPC_PATH))
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Delegation(format!("{} request failed: {}", method, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Delegation(format!(
                "{} returned HTTP {}",
                method,
                response.status().as_u16()
            )));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| AppError::Delegation(format!("{} response unreadable: {}", method, e)))?;

        if let Some(err) = body.error {
            return Err(match err.code {
                TASK_NOT_FOUND => AppError::NotFound(err.message),
                code => AppError::Delegation(format!("A2A error {}: {}", code, err.message)),
            });
        }

        let result = body
            .result
            .ok_or_else(|| AppError::Delegation(format!("{} response carried no result", method)))?;
        serde_json::from_value(result)
            .map_err(|e| AppError::Delegation(format!("{} result malformed: {}", method, e)))
    }
}

#[async_trait]
impl TaskTransport for HttpA2AClient {
    async fn agent_card(&self) -> Result<AgentCard> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, AGENT_CARD_PATH))
            .send()
            .await
            .map_err(|e| AppError::Delegation(format!("agent card unreachable: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Delegation(format!(
                "agent card returned HTTP {}",
                response.status().as_u16()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Delegation(format!("agent card malformed: {}", e)))
    }

    async fn submit(&self, request: &TaskRequest) -> Result<String> {
        let params = serde_json::to_value(request)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let result: SubmitResult = self.call(METHOD_SUBMIT, params).await?;
        Ok(result.task_id)
    }

    async fn get(&self, task_id: &str) -> Result<TaskSnapshot> {
        self.call(METHOD_GET, json!({ "task_id": task_id })).await
    }

    async fn cancel(&self, task_id: &str) -> Result<TaskState> {
        let result: CancelResult = self.call(METHOD_CANCEL, json!({ "task_id": task_id })).await?;
        Ok(result.state)
    }
}

/// In-process transport for a server that hosts its own executor
#[async_trait]
impl TaskTransport for TaskManager {
    async fn agent_card(&self) -> Result<AgentCard> {
        Ok(self.card().clone())
    }

    async fn submit(&self, request: &TaskRequest) -> Result<String> {
        TaskManager::submit(self, request.clone())
    }

    async fn get(&self, task_id: &str) -> Result<TaskSnapshot> {
        TaskManager::get(self, task_id)
    }

    async fn cancel(&self, task_id: &str) -> Result<TaskState> {
        TaskManager::cancel(self, task_id)
    }
}

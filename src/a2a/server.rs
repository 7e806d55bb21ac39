//! HTTP surface of the research executor
//!
//! - `GET /.well-known/agent.json` returns the agent card
//! - `POST /a2a` accepts JSON-RPC 2.0 `submit`, `get` and `cancel` calls

use super::manager::TaskManager;
use super::types::*;
use crate::types::AppError;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

pub fn router(manager: Arc<TaskManager>) -> Router {
    Router::new()
        .route(AGENT_CARD_PATH, get(agent_card))
        .route(RPC_PATH, post(handle_rpc))
        .with_state(manager)
}

/// Agent card for discovery
#[utoipa::path(
    get,
    path = "/.well-known/agent.json",
    responses(
        (status = 200, description = "Research executor capabilities", body = AgentCard)
    ),
    tag = "a2a"
)]
pub async fn agent_card(State(manager): State<Arc<TaskManager>>) -> Json<AgentCard> {
    Json(manager.card().clone())
}

pub async fn handle_rpc(
    State(manager): State<Arc<TaskManager>>,
    Json(request): Json<RpcRequest>,
) -> Json<RpcResponse> {
    let id = request.id.clone();
    let response = match dispatch(&manager, &request) {
        Ok(result) => RpcResponse::success(id, result),
        Err((code, message)) => RpcResponse::failure(id, code, message),
    };
    Json(response)
}

fn dispatch(manager: &TaskManager, request: &RpcRequest) -> Result<Value, (i64, String)> {
    if request.jsonrpc != "2.0" {
        return Err((INVALID_PARAMS, "jsonrpc must be \"2.0\"".to_string()));
    }

    match request.method.as_str() {
        METHOD_SUBMIT => {
            let params: TaskRequest = params(&request.params)?;
            let task_id = manager.submit(params).map_err(rpc_error)?;
            to_value(SubmitResult { task_id })
        }
        METHOD_GET => {
            let params: TaskIdParams = params(&request.params)?;
            let snapshot = manager.get(&params.task_id).map_err(rpc_error)?;
            to_value(snapshot)
        }
        METHOD_CANCEL => {
            let params: TaskIdParams = params(&request.params)?;
            let state = manager.cancel(&params.task_id).map_err(rpc_error)?;
            to_value(CancelResult {
                task_id: params.task_id,
                state,
            })
        }
        other => Err((METHOD_NOT_FOUND, format!("unknown method '{}'", other))),
    }
}

fn params<T: DeserializeOwned>(value: &Value) -> Result<T, (i64, String)> {
    serde_json::from_value(value.clone()).map_err(|e| (INVALID_PARAMS, e.to_string()))
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, (i64, String)> {
    serde_json::to_value(value).map_err(|e| (INTERNAL_ERROR, e.to_string()))
}

fn rpc_error(err: AppError) -> (i64, String) {
    let code = match err {
        AppError::NotFound(_) => TASK_NOT_FOUND,
        AppError::InvalidInput(_) => INVALID_PARAMS,
        _ => INTERNAL_ERROR,
    };
    (code, err.to_string())
}

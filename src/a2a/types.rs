//! Wire types for the remote research protocol (JSON-RPC 2.0 over HTTP)

use crate::research::{ResearchMaterial, SourceReport};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

pub const AGENT_CARD_PATH: &str = "/.well-known/agent.json";
pub const RPC_PATH: &str = "/a2a";
pub const RESEARCH_SKILL: &str = "research";

pub const METHOD_SUBMIT: &str = "submit";
pub const METHOD_GET: &str = "get";
pub const METHOD_CANCEL: &str = "cancel";

// JSON-RPC error codes
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
pub const TASK_NOT_FOUND: i64 = -32001;

// ============= Agent Card =============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AgentCard {
    pub name: String,
    pub version: String,
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub default_input_modes: Vec<String>,
    #[serde(default)]
    pub default_output_modes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Capabilities {
    pub streaming: bool,
    pub partial_results: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl AgentCard {
    /// The card advertised by this crate's research executor
    pub fn research_executor(url: impl Into<String>) -> Self {
        Self {
            name: "strata-researcher".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: "Gathers fundamentals, valuation, volatility, macro, news and sentiment data for a company in parallel".to_string(),
            url: url.into(),
            capabilities: Capabilities {
                streaming: false,
                partial_results: true,
            },
            skills: vec![Skill {
                id: RESEARCH_SKILL.to_string(),
                name: "Company research".to_string(),
                description: "Aggregate metrics from six independent data sources".to_string(),
            }],
            default_input_modes: vec!["application/json".to_string()],
            default_output_modes: vec!["application/json".to_string()],
        }
    }

    pub fn has_skill(&self, id: &str) -> bool {
        self.skills.iter().any(|s| s.id == id)
    }
}

// ============= Tasks =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Submitted,
    Working,
    Completed,
    Failed,
    Cancelled,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Cancelled
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub company: String,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub strategy_focus: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskIdParams {
    pub task_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResult {
    pub task_id: String,
}

/// Poll result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task_id: String,
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ResearchMaterial>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Source reports finished so far, in completion order
    #[serde(default)]
    pub partial: Vec<SourceReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResult {
    pub task_id: String,
    pub state: TaskState,
}

// ============= JSON-RPC Envelope =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Value::from(id),
            method: method.to_string(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!TaskState::Submitted.is_terminal());
        assert!(!TaskState::Working.is_terminal());
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(TaskState::Cancelled.is_terminal());
    }

    #[test]
    fn executor_card_advertises_research() {
        let card = AgentCard::research_executor("http://localhost:3000");
        assert!(card.has_skill(RESEARCH_SKILL));
        assert!(!card.has_skill("translate"));
    }

    #[test]
    fn rpc_failure_omits_result() {
        let resp = RpcResponse::failure(Value::from(1), TASK_NOT_FOUND, "no such task");
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json.get("result").is_none());
        assert_eq!(json["error"]["code"], -32001);
    }
}

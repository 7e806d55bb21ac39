use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============= API Request/Response Types =============

/// Client request to run one analysis.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisRequest {
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_focus: Option<String>,
}

pub const DEFAULT_STRATEGY_FOCUS: &str = "Cost Leadership";

impl AnalysisRequest {
    pub fn new(company: impl Into<String>) -> Self {
        Self {
            company: company.into(),
            ticker: None,
            strategy_focus: None,
        }
    }

    pub fn with_ticker(mut self, ticker: impl Into<String>) -> Self {
        self.ticker = Some(ticker.into());
        self
    }

    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.strategy_focus = Some(focus.into());
        self
    }

    /// Trims every field, upper-cases the ticker and fills in the default focus.
    pub fn normalized(&self) -> Result<Self> {
        let company = self.company.trim().to_string();
        if company.is_empty() {
            return Err(AppError::InvalidInput("company must not be empty".into()));
        }
        let ticker = self
            .ticker
            .as_deref()
            .map(|t| t.trim().to_uppercase())
            .filter(|t| !t.is_empty());
        let focus = self
            .strategy_focus
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .unwrap_or(DEFAULT_STRATEGY_FOCUS)
            .to_string();

        Ok(Self {
            company,
            ticker,
            strategy_focus: Some(focus),
        })
    }

    pub fn focus(&self) -> &str {
        self.strategy_focus
            .as_deref()
            .unwrap_or(DEFAULT_STRATEGY_FOCUS)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeResponse {
    pub workflow_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AbortResponse {
    pub workflow_id: String,
    pub aborted: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub providers: Vec<String>,
    pub research_mode: String,
}

// ============= Subsystem Status =============

/// Per data source progress, as shown in `mcp_status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    #[default]
    Idle,
    Executing,
    Completed,
    Partial,
    Failed,
}

/// Per model provider progress, as shown in `llm_status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderStatus {
    #[default]
    Idle,
    Executing,
    Completed,
    Failed,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Provider error: {0}")]
    Provider(String),

    #[error("All providers failed: {0}")]
    ProvidersExhausted(String),

    #[error("Data source error: {0}")]
    DataSource(String),

    #[error("All data sources failed: {0}")]
    AllSourcesFailed(String),

    #[error("Delegation error: {0}")]
    Delegation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Aborted: {0}")]
    Aborted(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            AppError::Provider(_)
            | AppError::ProvidersExhausted(_)
            | AppError::DataSource(_)
            | AppError::AllSourcesFailed(_)
            | AppError::Delegation(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Aborted(_) => StatusCode::CONFLICT,
            AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn normalizes_request_fields() {
        let req = AnalysisRequest::new("  Tesla Inc ")
            .with_ticker(" tsla ")
            .with_focus("   ");
        let norm = req.normalized().unwrap();

        assert_eq!(norm.company, "Tesla Inc");
        assert_eq!(norm.ticker.as_deref(), Some("TSLA"));
        assert_eq!(norm.focus(), DEFAULT_STRATEGY_FOCUS);
    }

    #[test]
    fn rejects_blank_company() {
        let err = AnalysisRequest::new("  ").normalized().unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn error_status_codes() {
        let resp = AppError::NotFound("wf".into()).into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::NOT_FOUND);

        let resp = AppError::ProvidersExhausted("all".into()).into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn statuses_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&SourceStatus::Partial).unwrap(),
            "\"partial\""
        );
        assert_eq!(
            serde_json::to_string(&ProviderStatus::Executing).unwrap(),
            "\"executing\""
        );
    }
}

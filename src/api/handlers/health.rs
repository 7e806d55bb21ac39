use crate::{types::HealthResponse, AppState};
use axum::{extract::State, Json};

/// Health check
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        providers: state
            .router
            .provider_names()
            .iter()
            .map(|p| p.to_string())
            .collect(),
        research_mode: state.config.research.mode.to_string(),
    })
}

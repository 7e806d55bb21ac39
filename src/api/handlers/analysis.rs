//! Workflow handlers
//!
//! Starting an analysis returns at once; callers poll the status document
//! until the status is terminal, then fetch the result.

use crate::{
    types::{AbortResponse, AnalysisRequest, AnalyzeResponse, Result},
    workflows::{FinalReport, StatusDocument},
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

/// Start a SWOT analysis
#[utoipa::path(
    post,
    path = "/api/analyze",
    request_body = AnalysisRequest,
    responses(
        (status = 202, description = "Workflow started", body = AnalyzeResponse),
        (status = 400, description = "Invalid input")
    ),
    tag = "analysis"
)]
pub async fn analyze(
    State(state): State<AppState>,
    Json(payload): Json<AnalysisRequest>,
) -> Result<(StatusCode, Json<AnalyzeResponse>)> {
    let workflow_id = state.workflows.start(payload)?;
    Ok((StatusCode::ACCEPTED, Json(AnalyzeResponse { workflow_id })))
}

/// Current status document of a workflow
#[utoipa::path(
    get,
    path = "/api/workflow/{workflow_id}/status",
    responses(
        (status = 200, description = "Workflow status", body = StatusDocument),
        (status = 404, description = "Unknown workflow")
    ),
    params(
        ("workflow_id" = String, Path, description = "Workflow identifier")
    ),
    tag = "analysis"
)]
pub async fn workflow_status(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<Json<StatusDocument>> {
    Ok(Json(state.workflows.status(&workflow_id)?))
}

/// Final report of a completed workflow
#[utoipa::path(
    get,
    path = "/api/workflow/{workflow_id}/result",
    responses(
        (status = 200, description = "Final report", body = FinalReport),
        (status = 404, description = "Unknown workflow or no result yet"),
        (status = 409, description = "Workflow was aborted"),
        (status = 500, description = "Workflow failed")
    ),
    params(
        ("workflow_id" = String, Path, description = "Workflow identifier")
    ),
    tag = "analysis"
)]
pub async fn workflow_result(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<Json<FinalReport>> {
    Ok(Json(state.workflows.result(&workflow_id)?))
}

/// Abort a running workflow
///
/// Aborting a workflow that already finished is not an error; the response
/// reports `aborted: false`.
#[utoipa::path(
    post,
    path = "/api/workflow/{workflow_id}/abort",
    responses(
        (status = 200, description = "Abort processed", body = AbortResponse),
        (status = 404, description = "Unknown workflow")
    ),
    params(
        ("workflow_id" = String, Path, description = "Workflow identifier")
    ),
    tag = "analysis"
)]
pub async fn abort_workflow(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<Json<AbortResponse>> {
    let aborted = state.workflows.abort(&workflow_id)?;
    Ok(Json(AbortResponse {
        workflow_id,
        aborted,
    }))
}

//! HTTP API Handlers and Routes
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Analysis (`/api`)
//! - `POST /api/analyze` - Start a workflow, returns its id
//! - `GET /api/workflow/{id}/status` - Status document for polling
//! - `GET /api/workflow/{id}/result` - Final report once completed
//! - `POST /api/workflow/{id}/abort` - Request cancellation
//!
//! ## Health (`/api/health`)
//! - `GET /api/health` - Health check endpoint
//!
//! ## Research executor (when `a2a.serve = true`)
//! - `GET /.well-known/agent.json` - Agent card
//! - `POST /a2a` - JSON-RPC task calls
//!
//! # OpenAPI Documentation
//!
//! The OpenAPI document is served at `/api-docs/openapi.json`. When the
//! `swagger-ui` feature is enabled, interactive API documentation is
//! available at `/swagger-ui/`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::analysis::analyze,
        handlers::analysis::workflow_status,
        handlers::analysis::workflow_result,
        handlers::analysis::abort_workflow,
        handlers::health::health,
        crate::a2a::server::agent_card,
    ),
    components(schemas(
        crate::types::AnalysisRequest,
        crate::types::AnalyzeResponse,
        crate::types::AbortResponse,
        crate::types::HealthResponse,
        crate::types::SourceStatus,
        crate::types::ProviderStatus,
        crate::workflows::StatusDocument,
        crate::workflows::FinalReport,
        crate::workflows::state::LogEntry,
        crate::workflows::state::MetricEntry,
        crate::a2a::AgentCard,
    )),
    tags(
        (name = "analysis", description = "SWOT workflows"),
        (name = "health", description = "Service health"),
        (name = "a2a", description = "Research executor discovery"),
    )
)]
pub struct ApiDoc;

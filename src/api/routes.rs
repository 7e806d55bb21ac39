use crate::api::handlers::{analysis, health};
use crate::api::ApiDoc;
use crate::AppState;
use axum::{
    routing::{get, post},
    Json, Router,
};
use utoipa::OpenApi;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/analyze", post(analysis::analyze))
        .route("/workflow/{workflow_id}/status", get(analysis::workflow_status))
        .route("/workflow/{workflow_id}/result", get(analysis::workflow_result))
        .route("/workflow/{workflow_id}/abort", post(analysis::abort_workflow))
        .route("/health", get(health::health))
}

const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Full application router: `/api`, the research executor when served
/// locally, the OpenAPI document and, with the `swagger-ui` feature, the
/// Swagger UI on top of it.
pub fn create_router(state: AppState) -> Router {
    let task_manager = state.task_manager.clone();
    let mut router = Router::new().nest("/api", api_routes()).with_state(state);

    if let Some(manager) = task_manager {
        router = router.merge(crate::a2a::server::router(manager));
    }

    #[cfg(feature = "swagger-ui")]
    {
        router = router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url(OPENAPI_PATH, ApiDoc::openapi()),
        );
    }
    #[cfg(not(feature = "swagger-ui"))]
    {
        router = router.route(OPENAPI_PATH, get(openapi_json));
    }

    router
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

#[cfg(not(feature = "swagger-ui"))]
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

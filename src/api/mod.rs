//! Read-only REST API over the ingested fleet data.
//!
//! Resource endpoints are mounted under `/api/v1`; `/health` and the OpenAPI
//! document live at the root.

pub mod dto;
pub mod handlers;

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::app_state::AppState;

/// Path of the generated OpenAPI document.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Aggregated OpenAPI specification of the read API.
#[derive(Debug, OpenApi)]
#[openapi(
    paths(
        handlers::system::health_handler,
        handlers::machines::list_machines,
        handlers::machines::machine_games,
        handlers::machines::machine_session,
        handlers::games::game_states,
        handlers::scores::top_scores,
    ),
    components(
        schemas(
            handlers::system::HealthResponse,
            dto::MachineDto,
            dto::GameDto,
            dto::GameStateDto,
            dto::SessionDto,
            dto::ScoreDto,
            crate::error::ErrorResponse,
            crate::error::ErrorBody,
        )
    ),
    tags(
        (name = "System", description = "Service health"),
        (name = "Machines", description = "Discovered machines and their sessions"),
        (name = "Games", description = "Recorded game state logs"),
        (name = "Scores", description = "High scores across the fleet"),
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
        .route(OPENAPI_PATH, get(openapi_json));

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/docs").url("/api-docs/swagger.json", ApiDoc::openapi()),
    );

    router
}

//! Score handlers: high-score table across the fleet.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ScoreDto, ScoreQuery};
use crate::app_state::AppState;
use crate::domain::MachineId;
use crate::error::{ApiError, ErrorResponse};
use crate::persistence::PlayRepository;

/// `GET /scores`: Highest scores, optionally for one machine.
///
/// # Errors
///
/// Returns [`ApiError::InvalidRequest`] for an empty `machine` filter.
#[utoipa::path(
    get,
    path = "/api/v1/scores",
    tag = "Scores",
    summary = "List high scores",
    description = "Returns the highest stored scores, live and reconciled, in descending order.",
    params(
        ("machine" = Option<String>, Query, description = "Restrict to one machine address"),
        ("limit" = Option<u32>, Query, description = "Number of rows, 1 to 100 (default 10)"),
    ),
    responses(
        (status = 200, description = "Score table", body = Vec<ScoreDto>),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
    )
)]
pub async fn top_scores(
    State(state): State<AppState>,
    Query(query): Query<ScoreQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let machine = match query.machine.as_deref().map(str::trim) {
        Some("") => {
            return Err(ApiError::InvalidRequest(
                "machine filter must not be empty".to_string(),
            ));
        }
        Some(address) => Some(MachineId::new(address)),
        None => None,
    };
    let scores: Vec<ScoreDto> = state
        .store
        .top_scores(machine.as_ref(), query.clamped_limit())
        .await?
        .into_iter()
        .map(ScoreDto::from)
        .collect();
    Ok(Json(scores))
}

/// Score routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/scores", get(top_scores))
}

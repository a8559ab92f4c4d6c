//! Game handlers: recorded state log.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::GameStateDto;
use crate::app_state::AppState;
use crate::domain::GameId;
use crate::error::{ApiError, ErrorResponse};
use crate::persistence::GameStateRepository;

/// `GET /games/{id}/states`: State log of one game, oldest first.
///
/// An unknown game yields an empty list.
///
/// # Errors
///
/// Returns [`ApiError::Storage`] if the store cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/games/{id}/states",
    tag = "Games",
    summary = "List recorded states of a game",
    description = "Returns every distinct state snapshot recorded during the game, oldest first.",
    params(("id" = i64, Path, description = "Game identifier")),
    responses(
        (status = 200, description = "State log", body = Vec<GameStateDto>),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn game_states(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let states: Vec<GameStateDto> = state
        .store
        .states_for_game(GameId::new(id))
        .await?
        .into_iter()
        .map(GameStateDto::from)
        .collect();
    Ok(Json(states))
}

/// Game routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/games/{id}/states", get(game_states))
}

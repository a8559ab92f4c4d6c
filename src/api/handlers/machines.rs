//! Machine handlers: fleet listing, game history and the running session.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{GameDto, MachineDto, SessionDto};
use crate::app_state::AppState;
use crate::domain::MachineId;
use crate::error::{ApiError, ErrorResponse};
use crate::persistence::{GameRepository, GameStateRepository, MachineRepository};

/// `GET /machines`: List every machine ever discovered.
///
/// # Errors
///
/// Returns [`ApiError::Storage`] if the store cannot be read.
#[utoipa::path(
    get,
    path = "/api/v1/machines",
    tag = "Machines",
    summary = "List machines",
    description = "Returns every machine that has announced itself, ordered by address, with an `online` flag derived from the liveness window.",
    responses(
        (status = 200, description = "Machine list", body = Vec<MachineDto>),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn list_machines(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let machines: Vec<MachineDto> = state
        .store
        .list_machines()
        .await?
        .into_iter()
        .map(|m| MachineDto::from_machine(m, now, state.liveness))
        .collect();
    Ok(Json(machines))
}

/// `GET /machines/{id}/games`: Game history of one machine.
///
/// # Errors
///
/// Returns [`ApiError::MachineNotFound`] for an unknown address.
#[utoipa::path(
    get,
    path = "/api/v1/machines/{id}/games",
    tag = "Machines",
    summary = "List games of a machine",
    description = "Returns the machine's games, newest first. Includes games reconstructed from its leaderboard.",
    params(("id" = String, Path, description = "Machine network address")),
    responses(
        (status = 200, description = "Game list", body = Vec<GameDto>),
        (status = 404, description = "Machine not found", body = ErrorResponse),
    )
)]
pub async fn machine_games(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let machine = known_machine(&state, id).await?;
    let games: Vec<GameDto> = state
        .store
        .games_for_machine(&machine)
        .await?
        .into_iter()
        .map(GameDto::from)
        .collect();
    Ok(Json(games))
}

/// `GET /machines/{id}/session`: The running session of one machine.
///
/// # Errors
///
/// Returns [`ApiError::MachineNotFound`] for an unknown address and
/// [`ApiError::NoActiveSession`] when the machine is idle.
#[utoipa::path(
    get,
    path = "/api/v1/machines/{id}/session",
    tag = "Machines",
    summary = "Get the running session",
    description = "Returns the machine's active game and its latest recorded state.",
    params(("id" = String, Path, description = "Machine network address")),
    responses(
        (status = 200, description = "Active session", body = SessionDto),
        (status = 404, description = "Machine not found or idle", body = ErrorResponse),
    )
)]
pub async fn machine_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let machine = known_machine(&state, id).await?;
    let game = match state.store.latest_game(&machine).await? {
        Some(game) if game.active => game,
        _ => return Err(ApiError::NoActiveSession(machine)),
    };
    let latest_state = state.store.latest_state(game.id).await?.map(|s| s.state);
    Ok(Json(SessionDto {
        game: GameDto::from(game),
        latest_state,
    }))
}

async fn known_machine(state: &AppState, id: String) -> Result<MachineId, ApiError> {
    let machine = MachineId::new(id);
    match state.store.get_machine(&machine).await? {
        Some(_) => Ok(machine),
        None => Err(ApiError::MachineNotFound(machine)),
    }
}

/// Machine routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/machines", get(list_machines))
        .route("/machines/{id}/games", get(machine_games))
        .route("/machines/{id}/session", get(machine_session))
}

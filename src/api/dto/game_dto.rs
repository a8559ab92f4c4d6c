//! Game, session and state-log DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{Game, GameState};

/// A play session.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameDto {
    /// Game identifier.
    pub id: i64,
    /// Owning machine address.
    pub machine_id: String,
    /// Session start, or leaderboard day for reconciled games.
    pub date: DateTime<Utc>,
    /// Whether the session is still running.
    pub active: bool,
}

impl From<Game> for GameDto {
    fn from(game: Game) -> Self {
        Self {
            id: game.id.get(),
            machine_id: game.machine_id.to_string(),
            date: game.date,
            active: game.active,
        }
    }
}

/// One recorded state snapshot.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GameStateDto {
    /// State identifier.
    pub id: i64,
    /// Owning game.
    pub game_id: i64,
    /// Snapshot exactly as broadcast by the machine.
    #[schema(value_type = Object)]
    pub state: serde_json::Value,
    /// Time the snapshot was recorded.
    pub timestamp: DateTime<Utc>,
}

impl From<GameState> for GameStateDto {
    fn from(state: GameState) -> Self {
        Self {
            id: state.id,
            game_id: state.game_id.get(),
            state: state.state,
            timestamp: state.timestamp,
        }
    }
}

/// The running session of a machine.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SessionDto {
    /// The active game.
    pub game: GameDto,
    /// Latest recorded snapshot, if any.
    #[schema(value_type = Option<Object>)]
    pub latest_state: Option<serde_json::Value>,
}

//! Durable records owned by the storage layer.
//!
//! One struct per persisted entity plus the `New*` inputs used to create
//! rows whose identity is generated by the store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use super::{GameId, MachineId};

/// A machine that has announced itself on the network at least once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Machine {
    /// Network address, the machine's identity.
    pub id: MachineId,
    /// Display title (e.g. `"Medieval Madness"`).
    pub title: String,
    /// Firmware/software version string.
    pub version: String,
    /// Time of the most recent announcement.
    pub last_seen: DateTime<Utc>,
}

impl Machine {
    /// Returns `true` if the machine announced itself within `window` of `now`.
    #[must_use]
    pub fn is_online(&self, now: DateTime<Utc>, window: chrono::Duration) -> bool {
        now.signed_duration_since(self.last_seen) <= window
    }
}

/// A play session on a machine, live or reconstructed from a leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Game {
    /// Generated identifier.
    pub id: GameId,
    /// Owning machine.
    pub machine_id: MachineId,
    /// Session start (or leaderboard date for reconciled games).
    pub date: DateTime<Utc>,
    /// Whether the session is still running.
    pub active: bool,
}

/// Input for creating a [`Game`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGame {
    /// Owning machine.
    pub machine_id: MachineId,
    /// Session start.
    pub date: DateTime<Utc>,
    /// Initial `active` flag.
    pub active: bool,
}

/// One entry in a Game's append-only state log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameState {
    /// Generated identifier.
    pub id: i64,
    /// Owning game.
    pub game_id: GameId,
    /// Opaque `game_status` snapshot as broadcast by the machine.
    pub state: serde_json::Value,
    /// Time the snapshot was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Input for appending a [`GameState`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewGameState {
    /// Owning game.
    pub game_id: GameId,
    /// Opaque state payload.
    pub state: serde_json::Value,
    /// Time the snapshot was recorded.
    pub timestamp: DateTime<Utc>,
}

/// A final score achieved by one player in one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Play {
    /// Generated identifier.
    pub id: i64,
    /// Owning game.
    pub game_id: GameId,
    /// Final score.
    pub score: i64,
    /// Player initials (may be empty).
    pub initials: String,
    /// Session length, when known.
    pub duration_seconds: Option<i32>,
}

/// Input for inserting a [`Play`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlay {
    /// Owning game.
    pub game_id: GameId,
    /// Final score.
    pub score: i64,
    /// Player initials.
    pub initials: String,
    /// Session length, when known.
    pub duration_seconds: Option<i32>,
}

/// Key of the reconciliation existence check: one leaderboard row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayKey<'a> {
    /// Machine the leaderboard belongs to.
    pub machine_id: &'a MachineId,
    /// Calendar day the score was set on.
    pub day: NaiveDate,
    /// Score value.
    pub score: i64,
    /// Player initials.
    pub initials: &'a str,
}

/// A Play joined with its Game, for score listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreRecord {
    /// Play identifier.
    pub play_id: i64,
    /// Machine the score was set on.
    pub machine_id: MachineId,
    /// Game date.
    pub date: DateTime<Utc>,
    /// Final score.
    pub score: i64,
    /// Player initials.
    pub initials: String,
    /// Session length, when known.
    pub duration_seconds: Option<i32>,
}

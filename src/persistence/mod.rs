//! Persistence layer: typed repositories over the fleet's durable records.
//!
//! One repository trait per entity ([`MachineRepository`],
//! [`GameRepository`], [`GameStateRepository`], [`PlayRepository`]); the
//! [`Store`] bundle is what jobs and handlers hold. Two implementations are
//! provided: [`postgres::PostgresStore`] backed by `sqlx::PgPool`, and
//! [`memory::MemoryStore`] for development and tests.

pub mod memory;
pub mod postgres;

use std::fmt;

use async_trait::async_trait;

use crate::domain::{
    Game, GameId, GameState, Machine, MachineId, NewGame, NewGameState, NewPlay, Play, PlayKey,
    ScoreRecord,
};

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Query or connection failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failure.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Write rejected by a uniqueness rule.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Referenced row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored row cannot be mapped to a domain record.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Durable Machine rows.
#[async_trait]
pub trait MachineRepository: Send + Sync {
    /// Inserts or replaces the machine keyed by its address.
    async fn upsert_machine(&self, machine: &Machine) -> StorageResult<()>;

    /// Loads one machine.
    async fn get_machine(&self, id: &MachineId) -> StorageResult<Option<Machine>>;

    /// Loads every machine, ordered by address.
    async fn list_machines(&self) -> StorageResult<Vec<Machine>>;
}

/// Game rows.
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Creates a Game.
    ///
    /// Fails with [`StorageError::Conflict`] when `game.active` is set and the
    /// machine already has an active Game.
    async fn create_game(&self, game: NewGame) -> StorageResult<Game>;

    /// Sets the `active` flag of an existing Game.
    async fn set_game_active(&self, id: GameId, active: bool) -> StorageResult<()>;

    /// The machine's current Game: its active Game if it has one, otherwise
    /// its most recent Game by date.
    async fn latest_game(&self, machine: &MachineId) -> StorageResult<Option<Game>>;

    /// The machine's most recent inactive Game by date.
    async fn latest_inactive_game(&self, machine: &MachineId) -> StorageResult<Option<Game>>;

    /// Every Game of the machine, newest first.
    async fn games_for_machine(&self, machine: &MachineId) -> StorageResult<Vec<Game>>;
}

/// Append-only GameState log.
#[async_trait]
pub trait GameStateRepository: Send + Sync {
    /// Appends a state snapshot.
    async fn append_state(&self, state: NewGameState) -> StorageResult<GameState>;

    /// The most recently appended state of a Game.
    async fn latest_state(&self, game: GameId) -> StorageResult<Option<GameState>>;

    /// The full state log of a Game, oldest first.
    async fn states_for_game(&self, game: GameId) -> StorageResult<Vec<GameState>>;
}

/// Play rows.
#[async_trait]
pub trait PlayRepository: Send + Sync {
    /// Inserts a Play.
    async fn insert_play(&self, play: NewPlay) -> StorageResult<Play>;

    /// Returns `true` if a Play with the same machine, calendar day, score
    /// and initials already exists.
    async fn play_exists(&self, key: PlayKey<'_>) -> StorageResult<bool>;

    /// Plays of a Game, in insertion order.
    async fn plays_for_game(&self, game: GameId) -> StorageResult<Vec<Play>>;

    /// Highest scores, optionally restricted to one machine.
    async fn top_scores(
        &self,
        machine: Option<&MachineId>,
        limit: u32,
    ) -> StorageResult<Vec<ScoreRecord>>;
}

/// Every repository behind one handle.
pub trait Store:
    MachineRepository + GameRepository + GameStateRepository + PlayRepository + fmt::Debug
{
}

impl<T> Store for T where
    T: MachineRepository + GameRepository + GameStateRepository + PlayRepository + fmt::Debug
{
}

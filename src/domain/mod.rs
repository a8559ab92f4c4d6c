//! Domain layer: identifiers, durable records, and session logic.
//!
//! This module contains the fleet model: machine and game identity, the
//! records persisted by the storage layer, the in-memory table of live
//! machines kept by discovery, and the per-machine session state machine.

pub mod ids;
pub mod known_machines;
pub mod models;
pub mod session;

pub use ids::{GameId, MachineId};
pub use known_machines::{KnownMachine, KnownMachines};
pub use models::{
    Game, GameState, Machine, NewGame, NewGameState, NewPlay, Play, PlayKey, ScoreRecord,
};
pub use session::{SessionPhase, SessionTransition, StoredSession, plan_transition};

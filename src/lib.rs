//! # bragboard
//!
//! Fleet ingestion service for networked pinball and arcade machines.
//!
//! Machines announce themselves, broadcast live game state and publish
//! end-of-game score tables over UDP, and serve their own high-score tables
//! over HTTP. This crate listens to all of it on fixed cadences, turns the
//! stream into Machines, Games, GameStates and Plays, and exposes the result
//! through a small read-only REST API.
//!
//! ## Architecture
//!
//! ```text
//! Machines (UDP broadcasts, HTTP leaderboards)
//!     │
//!     ├── DatagramListener / LeaderboardClient (net/)
//!     ├── Typed decoders (protocol/)
//!     │
//!     ├── Scheduler + four Jobs (jobs/)
//!     ├── KnownMachines, session state machine (domain/)
//!     │
//!     ├── Store: PostgreSQL or in-memory (persistence/)
//!     │
//!     └── REST Handlers (api/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod jobs;
pub mod net;
pub mod persistence;
pub mod protocol;

//! Wire formats spoken by the machines.
//!
//! Three UDP broadcast payloads (announcement, game state, final score) and
//! the HTTP leaderboard document. Every decoder returns [`ProtocolError`] on
//! malformed input so callers can drop the message and move on.

pub mod announcement;
pub mod final_score;
pub mod game_state;
pub mod leaderboard;

use std::net::SocketAddr;

pub use announcement::Announcement;
pub use final_score::{FinalScoreReport, ScoreSlot};
pub use game_state::GameStateReport;
pub use leaderboard::LeaderboardEntry;

use crate::domain::MachineId;

/// Decode failure for a single message.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Payload is not valid JSON of the expected shape.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field is absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// A field is present but unusable.
    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// Resolves which machine a datagram belongs to.
///
/// The packet source address wins. A self-reported address that disagrees is
/// only logged.
#[must_use]
pub fn resolve_machine(source: SocketAddr, reported: Option<&str>) -> MachineId {
    let machine = MachineId::from_ip(source.ip());
    if let Some(reported) = reported
        && reported != machine.as_str()
    {
        tracing::debug!(
            %source,
            reported,
            "self-reported address differs from packet source; using source"
        );
    }
    machine
}

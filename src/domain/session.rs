//! Per-machine game-session state machine.
//!
//! The state is not held in memory: it is reconstructed for every incoming
//! report from the machine's most recent Game and that Game's latest stored
//! GameState. [`plan_transition`] is a pure function from that stored view
//! and the report to the single storage action the tracker must perform.
//!
//! ```text
//!            report active, stored idle
//!   Idle ─────────────────────────────────▶ Active ──┐ report active,
//!    ▲ │                                      │  ▲   │ payload changed:
//!    │ └─ report inactive: ignore             │  └───┘ record state
//!    └────────────────────────────────────────┘
//!            report inactive, stored active
//! ```

use serde_json::{Number, Value};

use super::{Game, GameId};

/// Phase of a machine as derived from storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No Game, or the most recent Game is inactive.
    Idle,
    /// The most recent Game is active.
    Active(GameId),
}

impl SessionPhase {
    /// Derives the phase from the machine's most recent Game.
    #[must_use]
    pub fn of(latest: Option<&Game>) -> Self {
        match latest {
            Some(game) if game.active => Self::Active(game.id),
            _ => Self::Idle,
        }
    }
}

/// Stored view of a machine's session used to plan a transition.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    /// Most recent Game for the machine.
    pub game: Game,
    /// Payload of that Game's latest GameState, if any.
    pub latest_state: Option<Value>,
}

/// What the tracker must do with one state report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    /// Idle → Active: create an active Game and record the report as its first state.
    Open,
    /// Active → Active with a changed payload: append a GameState.
    Record(GameId),
    /// Active → Active with an identical payload: nothing to store.
    Unchanged(GameId),
    /// Active → Idle: flip the Game to inactive, record nothing.
    Close(GameId),
    /// Idle → Idle: boot or idle noise, nothing to store.
    Ignore,
}

/// Plans the transition for a report of `reported_active` with `payload`.
#[must_use]
pub fn plan_transition(
    stored: Option<&StoredSession>,
    reported_active: bool,
    payload: &Value,
) -> SessionTransition {
    let phase = SessionPhase::of(stored.map(|s| &s.game));
    match (phase, reported_active) {
        (SessionPhase::Idle, false) => SessionTransition::Ignore,
        (SessionPhase::Idle, true) => SessionTransition::Open,
        (SessionPhase::Active(game_id), false) => SessionTransition::Close(game_id),
        (SessionPhase::Active(game_id), true) => {
            let latest = stored.and_then(|s| s.latest_state.as_ref());
            if latest.is_some_and(|latest| same_payload(latest, payload)) {
                SessionTransition::Unchanged(game_id)
            } else {
                SessionTransition::Record(game_id)
            }
        }
    }
}

/// Structural payload equality that ignores key order and numeric
/// representation, so `100` and `100.0` (or `1e2` read back from JSONB) match.
#[must_use]
pub fn same_payload(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => same_number(x, y),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| same_payload(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| same_payload(x, y)))
        }
        _ => a == b,
    }
}

fn same_number(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    a.as_f64() == b.as_f64()
}

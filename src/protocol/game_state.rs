//! Live game-state broadcast: `{"game_ip": .., "game_status": {"GameActive": bool, ..}}`.

use serde::Deserialize;
use serde_json::Value;

use super::ProtocolError;

#[derive(Debug, Deserialize)]
struct RawGameStateReport {
    game_ip: Option<String>,
    game_status: Option<Value>,
}

/// A decoded state report.
#[derive(Debug, Clone, PartialEq)]
pub struct GameStateReport {
    /// Address the machine claims to have.
    pub reported_ip: Option<String>,
    /// Value of `game_status.GameActive`.
    pub active: bool,
    /// The whole `game_status` object, stored verbatim as the GameState payload.
    pub status: Value,
}

impl GameStateReport {
    /// Decodes a game-state datagram.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the payload is not JSON, `game_status` is
    /// missing or not an object, or `GameActive` is missing or not a boolean.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let raw: RawGameStateReport = serde_json::from_slice(payload)?;
        let status = raw
            .game_status
            .ok_or(ProtocolError::MissingField("game_status"))?;
        if !status.is_object() {
            return Err(ProtocolError::InvalidField {
                field: "game_status",
                reason: "expected an object".to_string(),
            });
        }
        let active = status
            .get("GameActive")
            .ok_or(ProtocolError::MissingField("GameActive"))?
            .as_bool()
            .ok_or_else(|| ProtocolError::InvalidField {
                field: "GameActive",
                reason: "expected a boolean".to_string(),
            })?;

        Ok(Self {
            reported_ip: raw.game_ip,
            active,
            status,
        })
    }
}

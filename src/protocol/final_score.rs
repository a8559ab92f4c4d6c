//! End-of-game score table: `{"game_ip": .., "game": [seq, [initials, score], ..]}`.
//!
//! The first element of `game` is a sequence marker and carries no score.
//! Unused player slots are sent as `["", 0]`.

use serde::Deserialize;
use serde_json::Value;

use super::ProtocolError;

#[derive(Debug, Deserialize)]
struct RawFinalScoreReport {
    game_ip: Option<String>,
    game: Option<Vec<Value>>,
}

/// One player position of the score table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSlot {
    /// Player initials, empty for unused slots.
    pub initials: String,
    /// Final score, `0` for unused slots.
    pub score: i64,
}

/// A decoded final-score report.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalScoreReport {
    /// Address the machine claims to have.
    pub reported_ip: Option<String>,
    /// Leading sequence marker, kept for logging.
    pub sequence: Value,
    /// Player slots in table order.
    pub slots: Vec<ScoreSlot>,
}

impl FinalScoreReport {
    /// Decodes a final-score datagram.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError`] if the payload is not JSON, `game` is missing
    /// or empty, or a slot is not an `[initials, score]` pair.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let raw: RawFinalScoreReport = serde_json::from_slice(payload)?;
        let mut table = raw
            .game
            .ok_or(ProtocolError::MissingField("game"))?
            .into_iter();
        let sequence = table.next().ok_or_else(|| ProtocolError::InvalidField {
            field: "game",
            reason: "score table is empty".to_string(),
        })?;

        let slots = table
            .map(|slot| {
                let (initials, score): (String, i64) =
                    serde_json::from_value(slot).map_err(|e| ProtocolError::InvalidField {
                        field: "game",
                        reason: format!("bad score slot: {e}"),
                    })?;
                Ok(ScoreSlot { initials, score })
            })
            .collect::<Result<Vec<_>, ProtocolError>>()?;

        Ok(Self {
            reported_ip: raw.game_ip,
            sequence,
            slots,
        })
    }

    /// Slots that hold a real score.
    pub fn scored_slots(&self) -> impl Iterator<Item = &ScoreSlot> {
        self.slots.iter().filter(|slot| slot.score != 0)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_table_and_skips_sequence_marker() {
        let payload =
            br#"{"game_ip":"10.0.0.5","game":[0,["ABC",42340],["DEF",1230],["",0],["",0]]}"#;
        let Ok(report) = FinalScoreReport::decode(payload) else {
            panic!("report should decode");
        };
        assert_eq!(report.sequence, json!(0));
        assert_eq!(report.slots.len(), 4);

        let scored: Vec<(&str, i64)> = report
            .scored_slots()
            .map(|s| (s.initials.as_str(), s.score))
            .collect();
        assert_eq!(scored, vec![("ABC", 42340), ("DEF", 1230)]);
    }

    #[test]
    fn large_scores_fit() {
        let Ok(report) = FinalScoreReport::decode(br#"{"game":[3,["MSM",2817420816]]}"#) else {
            panic!("report should decode");
        };
        assert_eq!(report.slots.first().map(|s| s.score), Some(2_817_420_816));
    }

    #[test]
    fn rejects_empty_table() {
        assert!(matches!(
            FinalScoreReport::decode(br#"{"game":[]}"#),
            Err(ProtocolError::InvalidField { field: "game", .. })
        ));
    }

    #[test]
    fn rejects_malformed_slot() {
        assert!(matches!(
            FinalScoreReport::decode(br#"{"game":[0,["ABC"]]}"#),
            Err(ProtocolError::InvalidField { field: "game", .. })
        ));
    }

    #[test]
    fn rejects_missing_table() {
        assert!(matches!(
            FinalScoreReport::decode(br#"{"game_ip":"10.0.0.5"}"#),
            Err(ProtocolError::MissingField("game"))
        ));
    }
}

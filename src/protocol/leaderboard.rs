//! Leaderboard document served at `GET http://<machine>/api/leaders`.
//!
//! ```json
//! [
//!   {"initials": "MSM", "ago": "2m", "full_name": "Maxwell Mullin",
//!    "score": 2817420816, "rank": 1, "date": "02/04/2025"}
//! ]
//! ```
//!
//! Only `date`, `score` and `initials` are persisted.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

use super::ProtocolError;

/// Date format used by the leaderboard (`MM/DD/YYYY`).
pub const LEADERBOARD_DATE_FORMAT: &str = "%m/%d/%Y";

/// One row of a machine's high-score table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LeaderboardEntry {
    /// Player initials.
    pub initials: String,
    /// Full player name, informational.
    #[serde(default)]
    pub full_name: Option<String>,
    /// Score value.
    pub score: i64,
    /// Position in the table, informational.
    #[serde(default)]
    pub rank: Option<u32>,
    /// Day the score was set.
    #[serde(deserialize_with = "deserialize_leaderboard_date")]
    pub date: NaiveDate,
    /// Relative age (`"2m"`, `"1y"`), informational.
    #[serde(default)]
    pub ago: Option<String>,
}

impl LeaderboardEntry {
    /// Decodes a full leaderboard response body.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Json`] if the body is not an array of entries.
    pub fn decode_all(body: &[u8]) -> Result<Vec<Self>, ProtocolError> {
        Ok(serde_json::from_slice(body)?)
    }
}

fn deserialize_leaderboard_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDate::parse_from_str(raw.trim(), LEADERBOARD_DATE_FORMAT).map_err(serde::de::Error::custom)
}

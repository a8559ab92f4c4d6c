//! Score listing DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ScoreRecord;

/// Query parameters of `GET /api/v1/scores`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoreQuery {
    /// Restrict to one machine address.
    pub machine: Option<String>,
    /// Number of rows (1..=100). Defaults to 10.
    pub limit: Option<u32>,
}

impl ScoreQuery {
    /// Default number of rows.
    pub const DEFAULT_LIMIT: u32 = 10;
    /// Largest accepted `limit`.
    pub const MAX_LIMIT: u32 = 100;

    /// `limit` clamped to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn clamped_limit(&self) -> u32 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}

/// One high score.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScoreDto {
    /// Play identifier.
    pub play_id: i64,
    /// Machine address.
    pub machine_id: String,
    /// Game date.
    pub date: DateTime<Utc>,
    /// Final score.
    pub score: i64,
    /// Player initials.
    pub initials: String,
    /// Session length in seconds, when known.
    pub duration_seconds: Option<i32>,
}

impl From<ScoreRecord> for ScoreDto {
    fn from(record: ScoreRecord) -> Self {
        Self {
            play_id: record.play_id,
            machine_id: record.machine_id.to_string(),
            date: record.date,
            score: record.score,
            initials: record.initials,
            duration_seconds: record.duration_seconds,
        }
    }
}

//! Machine listing DTOs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::Machine;

/// A machine as returned by `GET /api/v1/machines`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MachineDto {
    /// Network address.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Firmware/software version.
    pub version: String,
    /// Last announcement time.
    pub last_seen: DateTime<Utc>,
    /// Whether the machine announced itself within the liveness window.
    pub online: bool,
}

impl MachineDto {
    /// Builds the DTO, deriving `online` from `now` and `window`.
    #[must_use]
    pub fn from_machine(machine: Machine, now: DateTime<Utc>, window: chrono::Duration) -> Self {
        let online = machine.is_online(now, window);
        Self {
            id: machine.id.to_string(),
            title: machine.title,
            version: machine.version,
            last_seen: machine.last_seen,
            online,
        }
    }
}

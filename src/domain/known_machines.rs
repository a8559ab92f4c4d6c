//! In-memory table of machines currently announcing on the network.
//!
//! [`KnownMachines`] is owned exclusively by the discovery job and lives for
//! the whole process. Entries are refreshed on every announcement and evicted
//! once they fall outside the liveness window. Eviction only affects this
//! table; durable Machine rows are never deleted.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use super::{Machine, MachineId};

/// Last announcement received from one machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownMachine {
    /// Display title from the announcement.
    pub title: String,
    /// Version string from the announcement.
    pub version: String,
    /// Time the announcement was processed.
    pub last_seen: DateTime<Utc>,
}

/// Live set of machines keyed by address.
#[derive(Debug, Default)]
pub struct KnownMachines {
    machines: HashMap<MachineId, KnownMachine>,
}

impl KnownMachines {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an announcement, replacing whatever was known about `id`.
    ///
    /// Returns `true` if the machine was not in the live set before.
    pub fn record(
        &mut self,
        id: MachineId,
        title: String,
        version: String,
        seen: DateTime<Utc>,
    ) -> bool {
        self.machines
            .insert(
                id,
                KnownMachine {
                    title,
                    version,
                    last_seen: seen,
                },
            )
            .is_none()
    }

    /// Evicts every entry last seen more than `window` before `now` and
    /// returns the evicted ids.
    pub fn prune(&mut self, now: DateTime<Utc>, window: Duration) -> Vec<MachineId> {
        let mut gone = Vec::new();
        self.machines.retain(|id, machine| {
            let alive = now.signed_duration_since(machine.last_seen) <= window;
            if !alive {
                gone.push(id.clone());
            }
            alive
        });
        gone.sort();
        gone
    }

    /// Returns the entry for `id`, if it is live.
    #[must_use]
    pub fn get(&self, id: &MachineId) -> Option<&KnownMachine> {
        self.machines.get(id)
    }

    /// Snapshot of the live set as durable Machine rows.
    #[must_use]
    pub fn to_machines(&self) -> Vec<Machine> {
        let mut machines: Vec<Machine> = self
            .machines
            .iter()
            .map(|(id, known)| Machine {
                id: id.clone(),
                title: known.title.clone(),
                version: known.version.clone(),
                last_seen: known.last_seen,
            })
            .collect();
        machines.sort_by(|a, b| a.id.cmp(&b.id));
        machines
    }

    /// Number of live machines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.machines.len()
    }

    /// Returns `true` if no machine is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(table: &mut KnownMachines, addr: &str, seen: DateTime<Utc>) -> bool {
        table.record(
            MachineId::new(addr),
            "Medieval Madness".to_string(),
            "1.2".to_string(),
            seen,
        )
    }

    #[test]
    fn record_reports_first_sighting_only() {
        let mut table = KnownMachines::new();
        let now = Utc::now();
        assert!(record(&mut table, "10.0.0.5", now));
        assert!(!record(&mut table, "10.0.0.5", now));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn record_keeps_latest_timestamp() {
        let mut table = KnownMachines::new();
        let first = Utc::now();
        let later = first + Duration::seconds(5);
        record(&mut table, "10.0.0.5", first);
        record(&mut table, "10.0.0.5", later);

        let entry = table.get(&MachineId::new("10.0.0.5"));
        assert_eq!(entry.map(|e| e.last_seen), Some(later));
    }

    #[test]
    fn prune_evicts_only_stale_entries() {
        let mut table = KnownMachines::new();
        let now = Utc::now();
        record(&mut table, "10.0.0.1", now - Duration::seconds(120));
        record(&mut table, "10.0.0.2", now - Duration::seconds(10));

        let gone = table.prune(now, Duration::seconds(60));
        assert_eq!(gone, vec![MachineId::new("10.0.0.1")]);
        assert_eq!(table.len(), 1);
        assert!(table.get(&MachineId::new("10.0.0.2")).is_some());
    }

    #[test]
    fn pruned_machine_can_return() {
        let mut table = KnownMachines::new();
        let now = Utc::now();
        record(&mut table, "10.0.0.1", now - Duration::seconds(120));
        let _ = table.prune(now, Duration::seconds(60));
        assert!(table.is_empty());

        assert!(record(&mut table, "10.0.0.1", now));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn to_machines_is_sorted_by_address() {
        let mut table = KnownMachines::new();
        let now = Utc::now();
        record(&mut table, "10.0.0.9", now);
        record(&mut table, "10.0.0.1", now);

        let ids: Vec<String> = table
            .to_machines()
            .into_iter()
            .map(|m| m.id.to_string())
            .collect();
        assert_eq!(ids, vec!["10.0.0.1".to_string(), "10.0.0.9".to_string()]);
    }
}

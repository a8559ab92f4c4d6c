//! Discovery: keeps the live machine table and the Machine rows current.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Job;
use crate::domain::{KnownMachines, MachineId};
use crate::error::IngestError;
use crate::net::{Datagram, DatagramListener};
use crate::persistence::{MachineRepository, Store};
use crate::protocol::{Announcement, resolve_machine};

/// Outcome of one [`DiscoveryJob::sync`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiscoverySummary {
    /// Machines in the live set after pruning.
    pub live: usize,
    /// Machines evicted in this pass.
    pub evicted: Vec<MachineId>,
}

/// Listens for announcements and persists every machine in the live set.
#[derive(Debug)]
pub struct DiscoveryJob {
    listener: DatagramListener,
    known: KnownMachines,
    store: Arc<dyn Store>,
    liveness: chrono::Duration,
    interval: Duration,
}

impl DiscoveryJob {
    /// Creates the job. The listener is bound on the first invocation.
    #[must_use]
    pub fn new(
        listener: DatagramListener,
        store: Arc<dyn Store>,
        liveness: chrono::Duration,
        interval: Duration,
    ) -> Self {
        Self {
            listener,
            known: KnownMachines::new(),
            store,
            liveness,
            interval,
        }
    }

    /// Live machine table.
    #[must_use]
    pub fn known_machines(&self) -> &KnownMachines {
        &self.known
    }

    /// Records one announcement datagram received at `now`.
    ///
    /// Returns the machine it resolved to, or `None` if the payload was
    /// dropped as malformed.
    pub fn observe(&mut self, datagram: &Datagram, now: DateTime<Utc>) -> Option<MachineId> {
        let announcement = match Announcement::decode(&datagram.payload) {
            Ok(announcement) => announcement,
            Err(err) => {
                tracing::debug!(source = %datagram.source, error = %err, "dropping malformed announcement");
                return None;
            }
        };
        let machine = resolve_machine(datagram.source, Some(&announcement.reported_ip));
        if self.known.record(
            machine.clone(),
            announcement.name.clone(),
            announcement.version,
            now,
        ) {
            tracing::info!(machine = %machine, title = %announcement.name, "machine discovered");
        }
        Some(machine)
    }

    /// Prunes stale entries, then upserts every live machine.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Storage`] on the first failed upsert.
    pub async fn sync(&mut self, now: DateTime<Utc>) -> Result<DiscoverySummary, IngestError> {
        let evicted = self.known.prune(now, self.liveness);
        for machine in &evicted {
            tracing::info!(machine = %machine, "machine gone offline");
        }

        let machines = self.known.to_machines();
        for machine in &machines {
            self.store.upsert_machine(machine).await?;
        }

        Ok(DiscoverySummary {
            live: machines.len(),
            evicted,
        })
    }

    /// Local address of the listener, once bound.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr()
    }
}

#[async_trait]
impl Job for DiscoveryJob {
    fn name(&self) -> &'static str {
        "discovery"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&mut self) -> Result<(), IngestError> {
        let datagrams = self.listener.drain()?;
        let now = Utc::now();
        for datagram in &datagrams {
            self.observe(datagram, now);
        }
        let summary = self.sync(now).await?;
        tracing::debug!(
            received = datagrams.len(),
            live = summary.live,
            evicted = summary.evicted.len(),
            "discovery pass complete"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::memory::MemoryStore;
    use std::net::UdpSocket;

    fn job(store: &Arc<MemoryStore>) -> DiscoveryJob {
        let store: Arc<dyn Store> = Arc::clone(store) as Arc<dyn Store>;
        DiscoveryJob::new(
            DatagramListener::new(SocketAddr::from(([127, 0, 0, 1], 0))),
            store,
            chrono::Duration::seconds(60),
            Duration::from_secs(15),
        )
    }

    fn announcement(source: [u8; 4], body: &str) -> Datagram {
        Datagram {
            source: SocketAddr::from((source, 40000)),
            payload: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn announcement_persists_machine() {
        let store = Arc::new(MemoryStore::new());
        let mut job = job(&store);
        let now = Utc::now();

        let seen = job.observe(
            &announcement(
                [10, 0, 0, 5],
                r#"{"name":"Medieval Madness","version":"1.2","ip":"10.0.0.5"}"#,
            ),
            now,
        );
        assert_eq!(seen, Some(MachineId::new("10.0.0.5")));

        let Ok(summary) = job.sync(now).await else {
            panic!("sync failed");
        };
        assert_eq!(summary.live, 1);

        let Ok(Some(machine)) = store.get_machine(&MachineId::new("10.0.0.5")).await else {
            panic!("machine not persisted");
        };
        assert_eq!(machine.title, "Medieval Madness");
        assert_eq!(machine.version, "1.2");
        assert_eq!(machine.last_seen, now);
    }

    #[tokio::test]
    async fn numeric_version_is_stored_as_text() {
        let store = Arc::new(MemoryStore::new());
        let mut job = job(&store);
        let now = Utc::now();

        let seen = job.observe(
            &announcement(
                [10, 0, 0, 5],
                r#"{"name":"Medieval Madness","version":1.2,"ip":"10.0.0.5"}"#,
            ),
            now,
        );
        assert_eq!(seen, Some(MachineId::new("10.0.0.5")));

        let Ok(_) = job.sync(now).await else {
            panic!("sync failed");
        };
        let Ok(Some(machine)) = store.get_machine(&MachineId::new("10.0.0.5")).await else {
            panic!("machine not persisted");
        };
        assert_eq!(machine.version, "1.2");
    }

    #[tokio::test]
    async fn repeated_announcements_keep_one_row() {
        let store = Arc::new(MemoryStore::new());
        let mut job = job(&store);
        let first = Utc::now();
        let body = r#"{"name":"Attack from Mars","version":"2.0","ip":"10.0.0.6"}"#;

        job.observe(&announcement([10, 0, 0, 6], body), first);
        let Ok(_) = job.sync(first).await else {
            panic!("sync failed");
        };
        let later = first + chrono::Duration::seconds(15);
        job.observe(&announcement([10, 0, 0, 6], body), later);
        let Ok(_) = job.sync(later).await else {
            panic!("sync failed");
        };

        let Ok(machines) = store.list_machines().await else {
            panic!("list failed");
        };
        assert_eq!(machines.len(), 1);
        assert!(machines.iter().all(|m| m.last_seen == later));
    }

    #[tokio::test]
    async fn silent_machine_is_evicted_but_row_survives() {
        let store = Arc::new(MemoryStore::new());
        let mut job = job(&store);
        let seen = Utc::now();
        job.observe(
            &announcement([10, 0, 0, 7], r#"{"name":"Twilight Zone","version":"9","ip":"x"}"#),
            seen,
        );
        let Ok(_) = job.sync(seen).await else {
            panic!("sync failed");
        };

        let Ok(summary) = job.sync(seen + chrono::Duration::seconds(61)).await else {
            panic!("sync failed");
        };
        assert_eq!(summary.live, 0);
        assert_eq!(summary.evicted, vec![MachineId::new("10.0.0.7")]);
        assert!(job.known_machines().is_empty());

        let Ok(Some(machine)) = store.get_machine(&MachineId::new("10.0.0.7")).await else {
            panic!("row deleted");
        };
        assert_eq!(machine.last_seen, seen);
    }

    #[tokio::test]
    async fn malformed_announcement_is_dropped() {
        let store = Arc::new(MemoryStore::new());
        let mut job = job(&store);
        let now = Utc::now();
        assert!(job.observe(&announcement([10, 0, 0, 8], "not json"), now).is_none());
        assert!(
            job.observe(&announcement([10, 0, 0, 8], r#"{"version":"1","ip":"x"}"#), now)
                .is_none()
        );
        assert!(job.known_machines().is_empty());
    }

    #[tokio::test]
    async fn run_reads_from_the_socket() {
        let store = Arc::new(MemoryStore::new());
        let mut job = job(&store);
        let Ok(()) = job.run().await else {
            panic!("first run failed");
        };
        let Some(target) = job.local_addr() else {
            panic!("listener not bound");
        };

        let Ok(sender) = UdpSocket::bind("127.0.0.1:0") else {
            panic!("sender bind failed");
        };
        let body = br#"{"name":"Medieval Madness","version":"1.2","ip":"10.0.0.5"}"#;
        let Ok(_) = sender.send_to(body, target) else {
            panic!("send failed");
        };

        for _ in 0..50 {
            let Ok(()) = job.run().await else {
                panic!("run failed");
            };
            if !job.known_machines().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        // Identity comes from the packet source, not the reported ip.
        let Ok(Some(machine)) = store.get_machine(&MachineId::new("127.0.0.1")).await else {
            panic!("machine not persisted");
        };
        assert_eq!(machine.title, "Medieval Madness");
    }
}

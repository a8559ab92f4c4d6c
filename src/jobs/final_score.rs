//! Final-score ingestion: attaches end-of-game score tables to the session
//! that just ended.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::Job;
use crate::domain::{MachineId, NewPlay, Play};
use crate::error::IngestError;
use crate::net::DatagramListener;
use crate::persistence::{GameRepository, PlayRepository, Store};
use crate::protocol::{FinalScoreReport, resolve_machine};

/// Turns final-score datagrams into Play rows.
#[derive(Debug)]
pub struct FinalScoreJob {
    listener: DatagramListener,
    store: Arc<dyn Store>,
    interval: Duration,
}

impl FinalScoreJob {
    /// Creates the job. The listener is bound on the first invocation.
    #[must_use]
    pub fn new(listener: DatagramListener, store: Arc<dyn Store>, interval: Duration) -> Self {
        Self {
            listener,
            store,
            interval,
        }
    }

    /// Local address of the listener, once bound.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr()
    }

    /// Stores every scored slot of `report` against the machine's most
    /// recently ended Game.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::NoSession`] if the machine has no ended Game,
    /// and [`IngestError::Storage`] if a read or insert fails.
    pub async fn apply(
        &self,
        machine: &MachineId,
        report: &FinalScoreReport,
    ) -> Result<Vec<Play>, IngestError> {
        let game = self
            .store
            .latest_inactive_game(machine)
            .await?
            .ok_or_else(|| IngestError::NoSession(machine.clone()))?;

        let mut plays = Vec::new();
        for slot in report.scored_slots() {
            let play = self
                .store
                .insert_play(NewPlay {
                    game_id: game.id,
                    score: slot.score,
                    initials: slot.initials.clone(),
                    duration_seconds: None,
                })
                .await?;
            plays.push(play);
        }
        tracing::info!(
            machine = %machine,
            game = %game.id,
            sequence = %report.sequence,
            plays = plays.len(),
            "final scores stored"
        );
        Ok(plays)
    }
}

#[async_trait]
impl Job for FinalScoreJob {
    fn name(&self) -> &'static str {
        "final_score"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&mut self) -> Result<(), IngestError> {
        let datagrams = self.listener.drain()?;
        for datagram in datagrams {
            let report = match FinalScoreReport::decode(&datagram.payload) {
                Ok(report) => report,
                Err(err) => {
                    tracing::debug!(source = %datagram.source, error = %err, "dropping malformed final score");
                    continue;
                }
            };
            let machine = resolve_machine(datagram.source, report.reported_ip.as_deref());
            match self.apply(&machine, &report).await {
                Ok(_) => {}
                Err(IngestError::NoSession(machine)) => {
                    tracing::warn!(machine = %machine, "final score without an ended game; dropped");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

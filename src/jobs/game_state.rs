//! Game-state tracking: turns live status broadcasts into Games and
//! deduplicated GameState logs.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Job;
use crate::domain::{
    MachineId, NewGame, NewGameState, SessionTransition, StoredSession, plan_transition,
};
use crate::error::IngestError;
use crate::net::DatagramListener;
use crate::persistence::{GameRepository, GameStateRepository, Store};
use crate::protocol::{GameStateReport, resolve_machine};

/// Drives the per-machine session state machine from UDP reports.
#[derive(Debug)]
pub struct GameStateJob {
    listener: DatagramListener,
    store: Arc<dyn Store>,
    interval: Duration,
}

impl GameStateJob {
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

    /// Applies one report from `machine` received at `now`.
    ///
    /// Returns the transition that was carried out.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Storage`] if reading the stored session or
    /// writing the transition fails.
    pub async fn apply(
        &self,
        machine: &MachineId,
        report: &GameStateReport,
        now: DateTime<Utc>,
    ) -> Result<SessionTransition, IngestError> {
        let stored = match self.store.latest_game(machine).await? {
            Some(game) if game.active => {
                let latest_state = self.store.latest_state(game.id).await?.map(|s| s.state);
                Some(StoredSession { game, latest_state })
            }
            Some(game) => Some(StoredSession {
                game,
                latest_state: None,
            }),
            None => None,
        };

        let transition = plan_transition(stored.as_ref(), report.active, &report.status);
        match transition {
            SessionTransition::Open => {
                let game = self
                    .store
                    .create_game(NewGame {
                        machine_id: machine.clone(),
                        date: now,
                        active: true,
                    })
                    .await?;
                self.store
                    .append_state(NewGameState {
                        game_id: game.id,
                        state: report.status.clone(),
                        timestamp: now,
                    })
                    .await?;
                tracing::info!(machine = %machine, game = %game.id, "game started");
            }
            SessionTransition::Record(game_id) => {
                self.store
                    .append_state(NewGameState {
                        game_id,
                        state: report.status.clone(),
                        timestamp: now,
                    })
                    .await?;
                tracing::debug!(machine = %machine, game = %game_id, "game state recorded");
            }
            SessionTransition::Close(game_id) => {
                self.store.set_game_active(game_id, false).await?;
                tracing::info!(machine = %machine, game = %game_id, "game ended");
            }
            SessionTransition::Unchanged(_) | SessionTransition::Ignore => {}
        }
        Ok(transition)
    }
}

#[async_trait]
impl Job for GameStateJob {
    fn name(&self) -> &'static str {
        "game_state"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&mut self) -> Result<(), IngestError> {
        let datagrams = self.listener.drain()?;
        for datagram in datagrams {
            let report = match GameStateReport::decode(&datagram.payload) {
                Ok(report) => report,
                Err(err) => {
                    tracing::debug!(source = %datagram.source, error = %err, "dropping malformed game state");
                    continue;
                }
            };
            let machine = resolve_machine(datagram.source, report.reported_ip.as_deref());
            self.apply(&machine, &report, Utc::now()).await?;
        }
        Ok(())
    }
}

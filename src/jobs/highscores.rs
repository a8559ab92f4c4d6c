//! Highscore reconciliation: backfills scores that were set while the
//! service was not listening, from each machine's own leaderboard.
//!
//! A leaderboard row is already known when a Play with the same score and
//! initials exists on a Game of the same machine dated on the same calendar
//! day (UTC). Unknown rows become an inactive Game dated at midnight of that
//! day plus one Play.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveTime, Utc};

use super::Job;
use crate::domain::{MachineId, NewGame, NewPlay, PlayKey};
use crate::error::IngestError;
use crate::net::LeaderboardClient;
use crate::persistence::{GameRepository, MachineRepository, PlayRepository, Store};
use crate::protocol::LeaderboardEntry;

/// Outcome of reconciling one leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcileSummary {
    /// Rows that created a Game and a Play.
    pub inserted: usize,
    /// Rows that were already stored.
    pub skipped: usize,
}

/// Pulls every known machine's leaderboard and stores the missing rows.
#[derive(Debug)]
pub struct HighscoreJob {
    client: LeaderboardClient,
    store: Arc<dyn Store>,
    interval: Duration,
    skip_offline_after: Option<chrono::Duration>,
}

impl HighscoreJob {
    /// Creates the job.
    ///
    /// With `skip_offline_after` set, machines unseen for longer than that
    /// are not contacted.
    #[must_use]
    pub fn new(
        client: LeaderboardClient,
        store: Arc<dyn Store>,
        interval: Duration,
        skip_offline_after: Option<chrono::Duration>,
    ) -> Self {
        Self {
            client,
            store,
            interval,
            skip_offline_after,
        }
    }

    /// Stores every row of `entries` not already known for `machine`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Storage`] if a lookup or insert fails. Rows
    /// processed before the failure stay stored.
    pub async fn reconcile(
        &self,
        machine: &MachineId,
        entries: &[LeaderboardEntry],
    ) -> Result<ReconcileSummary, IngestError> {
        let mut summary = ReconcileSummary::default();
        for entry in entries {
            let key = PlayKey {
                machine_id: machine,
                day: entry.date,
                score: entry.score,
                initials: &entry.initials,
            };
            if self.store.play_exists(key).await? {
                summary.skipped += 1;
                continue;
            }

            let game = self
                .store
                .create_game(NewGame {
                    machine_id: machine.clone(),
                    date: entry.date.and_time(NaiveTime::MIN).and_utc(),
                    active: false,
                })
                .await?;
            self.store
                .insert_play(NewPlay {
                    game_id: game.id,
                    score: entry.score,
                    initials: entry.initials.clone(),
                    duration_seconds: None,
                })
                .await?;
            summary.inserted += 1;
        }
        Ok(summary)
    }
}

#[async_trait]
impl Job for HighscoreJob {
    fn name(&self) -> &'static str {
        "highscores"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&mut self) -> Result<(), IngestError> {
        let machines = self.store.list_machines().await?;
        let now = Utc::now();
        for machine in machines {
            if let Some(window) = self.skip_offline_after
                && !machine.is_online(now, window)
            {
                tracing::debug!(machine = %machine.id, "skipping offline machine");
                continue;
            }

            let entries = match self.client.fetch(&machine.id).await {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(machine = %machine.id, error = %err, "leaderboard pull failed");
                    continue;
                }
            };
            let summary = self.reconcile(&machine.id, &entries).await?;
            if summary.inserted > 0 {
                tracing::info!(
                    machine = %machine.id,
                    inserted = summary.inserted,
                    skipped = summary.skipped,
                    "leaderboard reconciled"
                );
            }
        }
        Ok(())
    }
}

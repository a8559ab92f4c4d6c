//! Periodic ingestion jobs and the scheduler that drives them.
//!
//! Every unit of background work implements [`Job`]: a name, a cadence and
//! one invocation. The [`Scheduler`] runs each job on its own task and never
//! overlaps two invocations of the same job.
//!
//! | Job                   | Source                    | Default cadence |
//! |-----------------------|---------------------------|-----------------|
//! | [`DiscoveryJob`]      | UDP announcements         | 15 s            |
//! | [`GameStateJob`]      | UDP game-state reports    | 250 ms          |
//! | [`FinalScoreJob`]     | UDP final-score reports   | 1 s             |
//! | [`HighscoreJob`]      | HTTP leaderboard pulls    | 300 s           |

pub mod discovery;
pub mod final_score;
pub mod game_state;
pub mod highscores;
pub mod scheduler;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{BragboardConfig, to_chrono};
use crate::error::IngestError;
use crate::net::{DatagramListener, LeaderboardClient};
use crate::persistence::Store;

pub use discovery::{DiscoveryJob, DiscoverySummary};
pub use final_score::FinalScoreJob;
pub use game_state::GameStateJob;
pub use highscores::{HighscoreJob, ReconcileSummary};
pub use scheduler::{Scheduler, SchedulerHandle};

/// A unit of work triggered on a fixed interval.
#[async_trait]
pub trait Job: Send + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Time between the starts of two invocations.
    fn interval(&self) -> Duration;

    /// Performs one invocation.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] when the invocation had to be aborted. The
    /// scheduler logs it and keeps the job on its cadence.
    async fn run(&mut self) -> Result<(), IngestError>;
}

/// Builds the scheduler with all four ingestion jobs wired to `store`.
///
/// # Errors
///
/// Returns [`IngestError::Http`] if the leaderboard client cannot be built.
pub fn fleet_scheduler(
    config: &BragboardConfig,
    store: &Arc<dyn Store>,
) -> Result<Scheduler, IngestError> {
    let client = LeaderboardClient::new(config.leaderboard_port, config.leaderboard_timeout)?;
    Ok(Scheduler::new()
        .with_job(DiscoveryJob::new(
            DatagramListener::new(config.discovery_addr()),
            Arc::clone(store),
            config.liveness_window(),
            config.discovery_interval,
        ))
        .with_job(GameStateJob::new(
            DatagramListener::new(config.game_state_addr()),
            Arc::clone(store),
            config.game_state_interval,
        ))
        .with_job(FinalScoreJob::new(
            DatagramListener::new(config.final_score_addr()),
            Arc::clone(store),
            config.final_score_interval,
        ))
        .with_job(HighscoreJob::new(
            client,
            Arc::clone(store),
            config.highscore_interval,
            config.highscore_skip_offline_after.map(to_chrono),
        )))
}

//! Interval scheduler for [`Job`]s.
//!
//! Each job gets its own task. The first tick fires immediately, later ticks
//! follow the job's interval. An invocation that overruns its interval delays
//! the next tick instead of queueing a burst, so a job never overlaps itself.
//! Cancellation is only observed between invocations: an in-flight invocation
//! always runs to completion.

use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::Job;

/// Period used for a job that reports a zero interval.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Collection of jobs waiting to be started.
#[derive(Debug, Default)]
pub struct Scheduler {
    jobs: Vec<Box<dyn Job>>,
}

impl Scheduler {
    /// Creates a scheduler with no jobs.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a job.
    #[must_use]
    pub fn with_job(mut self, job: impl Job + 'static) -> Self {
        self.jobs.push(Box::new(job));
        self
    }

    /// Number of registered jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Returns `true` if no job is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Starts every job on the current runtime.
    ///
    /// The jobs stop once `shutdown` is cancelled.
    #[must_use]
    pub fn start(self, shutdown: CancellationToken) -> SchedulerHandle {
        let mut tasks = JoinSet::new();
        for job in self.jobs {
            tracing::info!(job = job.name(), interval = ?job.interval(), "scheduling job");
            tasks.spawn(run_job(job, shutdown.clone()));
        }
        SchedulerHandle { shutdown, tasks }
    }
}

/// Running jobs.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: CancellationToken,
    tasks: JoinSet<()>,
}

impl SchedulerHandle {
    /// Number of job tasks still running.
    #[must_use]
    pub fn running(&self) -> usize {
        self.tasks.len()
    }

    /// Cancels all jobs and waits for in-flight invocations to finish.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        while let Some(result) = self.tasks.join_next().await {
            if let Err(err) = result {
                tracing::error!(error = %err, "job task terminated abnormally");
            }
        }
    }
}

async fn run_job(mut job: Box<dyn Job>, shutdown: CancellationToken) {
    let name = job.name();
    let mut period = job.interval();
    if period.is_zero() {
        tracing::error!(
            job = name,
            fallback = ?MIN_INTERVAL,
            "job interval is zero, using the minimum period"
        );
        period = MIN_INTERVAL;
    }
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let span = tracing::info_span!("job", name);
        if let Err(err) = job.run().instrument(span).await {
            tracing::error!(job = name, error = %err, "job invocation failed");
        }
    }

    tracing::info!(job = name, "job stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct CountingJob {
        runs: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Job for CountingJob {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn interval(&self) -> Duration {
            Duration::from_millis(10)
        }

        async fn run(&mut self) -> Result<(), IngestError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(IngestError::Transport(std::io::Error::other("boom")));
            }
            Ok(())
        }
    }

    #[derive(Debug)]
    struct SlowJob {
        started: Arc<AtomicUsize>,
        finished: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Job for SlowJob {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn interval(&self) -> Duration {
            Duration::from_millis(5)
        }

        async fn run(&mut self) -> Result<(), IngestError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Debug)]
    struct ZeroIntervalJob {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Job for ZeroIntervalJob {
        fn name(&self) -> &'static str {
            "zero"
        }

        fn interval(&self) -> Duration {
            Duration::ZERO
        }

        async fn run(&mut self) -> Result<(), IngestError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn zero_interval_job_runs_at_minimum_period() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = Scheduler::new()
            .with_job(ZeroIntervalJob {
                runs: Arc::clone(&runs),
            })
            .start(CancellationToken::new());
        tokio::time::sleep(MIN_INTERVAL * 6).await;
        handle.shutdown().await;

        let runs = runs.load(Ordering::SeqCst);
        assert!(runs >= 2, "job ran {runs} times");
    }

    #[tokio::test]
    async fn first_tick_fires_immediately() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = Scheduler::new()
            .with_job(CountingJob {
                runs: Arc::clone(&runs),
                fail: false,
            })
            .start(CancellationToken::new());
        tokio::time::sleep(Duration::from_millis(5)).await;
        handle.shutdown().await;
        assert!(runs.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn failing_job_keeps_its_cadence_and_does_not_block_others() {
        let ok_runs = Arc::new(AtomicUsize::new(0));
        let failing_runs = Arc::new(AtomicUsize::new(0));
        let scheduler = Scheduler::new()
            .with_job(CountingJob {
                runs: Arc::clone(&ok_runs),
                fail: false,
            })
            .with_job(CountingJob {
                runs: Arc::clone(&failing_runs),
                fail: true,
            });
        assert_eq!(scheduler.len(), 2);

        let handle = scheduler.start(CancellationToken::new());
        assert_eq!(handle.running(), 2);
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.shutdown().await;

        assert!(ok_runs.load(Ordering::SeqCst) >= 2);
        assert!(failing_runs.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn shutdown_waits_for_in_flight_invocation() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let handle = Scheduler::new()
            .with_job(SlowJob {
                started: Arc::clone(&started),
                finished: Arc::clone(&finished),
            })
            .start(CancellationToken::new());

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.shutdown().await;

        let started = started.load(Ordering::SeqCst);
        assert!(started >= 1);
        assert_eq!(finished.load(Ordering::SeqCst), started);
    }

    #[tokio::test]
    async fn cancelled_token_stops_jobs() {
        let runs = Arc::new(AtomicUsize::new(0));
        let token = CancellationToken::new();
        let handle = Scheduler::new()
            .with_job(CountingJob {
                runs: Arc::clone(&runs),
                fail: false,
            })
            .start(token.clone());
        tokio::time::sleep(Duration::from_millis(30)).await;
        token.cancel();
        handle.shutdown().await;

        let after = runs.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), after);
    }
}

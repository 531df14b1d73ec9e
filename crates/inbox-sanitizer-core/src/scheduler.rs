//! Periodic batch execution with cooperative shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info};

use crate::Result;
use crate::gateway::MailboxGateway;
use crate::runner::{BatchResult, BatchRunner};

/// How often the shutdown flag is checked while idle.
pub const DEFAULT_POLL_TICK: Duration = Duration::from_secs(10);

/// Default time between batches.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Default candidates per batch.
pub const DEFAULT_MAX_MESSAGES: u32 = 100;

/// Cooperative cancellation flag shared between a signal listener and the
/// scheduler loop.
#[derive(Debug, Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    /// Create an untriggered flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`trigger`](Self::trigger) has been called on any clone.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Settings for the periodic loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Time between batch starts.
    pub interval: Duration,
    /// Candidates per batch.
    pub max_messages: u32,
    /// Decide without applying dispositions.
    pub dry_run: bool,
    /// Upper bound on shutdown latency while idle.
    pub poll_tick: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_messages: DEFAULT_MAX_MESSAGES,
            dry_run: false,
            poll_tick: DEFAULT_POLL_TICK,
        }
    }
}

impl ScheduleConfig {
    /// Create a config with the default poll tick, not a dry run.
    #[must_use]
    pub const fn new(interval: Duration, max_messages: u32) -> Self {
        Self {
            interval,
            max_messages,
            dry_run: false,
            poll_tick: DEFAULT_POLL_TICK,
        }
    }

    /// Sets dry-run mode.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sets the shutdown poll tick.
    #[must_use]
    pub const fn with_poll_tick(mut self, poll_tick: Duration) -> Self {
        self.poll_tick = poll_tick;
        self
    }
}

/// Runs batches on a fixed grid until shut down.
#[derive(Debug)]
pub struct Scheduler<G> {
    runner: BatchRunner<G>,
    config: ScheduleConfig,
    runs_completed: u64,
}

impl<G: MailboxGateway> Scheduler<G> {
    /// Create a scheduler.
    #[must_use]
    pub const fn new(runner: BatchRunner<G>, config: ScheduleConfig) -> Self {
        Self {
            runner,
            config,
            runs_completed: 0,
        }
    }

    /// Batches completed so far.
    #[must_use]
    pub const fn runs_completed(&self) -> u64 {
        self.runs_completed
    }

    /// The loop settings.
    #[must_use]
    pub const fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// The underlying batch runner.
    #[must_use]
    pub const fn runner(&self) -> &BatchRunner<G> {
        &self.runner
    }

    /// Run one batch with the configured settings.
    ///
    /// # Errors
    ///
    /// Propagates the batch error; the run counter is not advanced.
    pub async fn run_once(&mut self) -> Result<BatchResult> {
        let result = self
            .runner
            .run_once(self.config.max_messages, self.config.dry_run)
            .await?;
        self.runs_completed += 1;
        Ok(result)
    }

    /// Run immediately, then every `interval` measured from the start,
    /// until `shutdown` is triggered. Returns the number of completed runs.
    ///
    /// The first batch always runs, even if `shutdown` is already set.
    ///
    /// A batch that overruns its slot is never interrupted; the slots it
    /// covered are dropped and the next run lands on the following grid
    /// point. Failed batches are logged and the loop carries on.
    pub async fn run_forever(&mut self, shutdown: &Shutdown) -> u64 {
        info!(
            "Starting inbox sanitizer (checking every {} minutes)",
            self.config.interval.as_secs() / 60
        );

        let start = Instant::now();
        let mut next_due = start;

        loop {
            let now = Instant::now();
            if now >= next_due {
                if let Err(e) = self.run_once().await {
                    error!("Batch failed: {e}");
                }
                next_due = next_slot(start, self.config.interval, self.config.poll_tick, Instant::now());
            } else {
                tokio::time::sleep(self.config.poll_tick.min(next_due - now)).await;
            }
            if shutdown.is_triggered() {
                break;
            }
        }

        info!("Stopped after {} runs", self.runs_completed);
        self.runs_completed
    }
}

/// First grid point `start + k * interval` strictly after `now`.
///
/// A zero interval degenerates to one batch per poll tick.
fn next_slot(start: Instant, interval: Duration, poll_tick: Duration, now: Instant) -> Instant {
    if interval.is_zero() {
        return now + poll_tick;
    }
    let elapsed = now.saturating_duration_since(start).as_nanos();
    let slots = elapsed / interval.as_nanos() + 1;
    let offset = u64::try_from(slots * interval.as_nanos()).unwrap_or(u64::MAX);
    start + Duration::from_nanos(offset)
}

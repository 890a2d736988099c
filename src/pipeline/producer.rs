//! The generate → log → submit → pace loop.

use crate::pipeline::event_log::EventLog;
use crate::pipeline::keygen::{KeyGenError, KeySource};
use crate::pipeline::stats::StatsAggregator;
use crate::pipeline::types::{RunConfig, TaskId};
use crate::pipeline::worker_pool::{PoolError, WorkerPool};
use crate::types::LogTone;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info};

/// Conditions that end a run. Anything else is logged and skipped.
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("key source failed: {0}")]
    KeySource(#[from] KeyGenError),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Result of one producer iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Submitted(TaskId),
    /// Generation failed transiently; nothing was submitted
    Skipped,
}

pub struct ProducerLoop {
    keys: Arc<dyn KeySource>,
    pool: Arc<WorkerPool>,
    stats: Arc<StatsAggregator>,
    log: Arc<EventLog>,
    config: watch::Receiver<RunConfig>,
    success_window: Duration,
}

impl ProducerLoop {
    pub fn new(
        keys: Arc<dyn KeySource>,
        pool: Arc<WorkerPool>,
        stats: Arc<StatsAggregator>,
        log: Arc<EventLog>,
        config: watch::Receiver<RunConfig>,
        success_window: Duration,
    ) -> Self {
        Self {
            keys,
            pool,
            stats,
            log,
            config,
            success_window,
        }
    }

    /// Generate one wallet, log it and hand it to the pool.
    pub async fn step(&self) -> Result<StepOutcome, ProducerError> {
        let wallet = match self.keys.generate() {
            Ok(wallet) => wallet,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                self.log.error(format!("Generation error: {}", e));
                return Ok(StepOutcome::Skipped);
            }
        };

        self.stats.record_generated();
        self.log
            .append(format!("Generated: {}", wallet.address), LogTone::Highlight);
        self.log
            .append(format!("Private: {}", wallet.secret.redacted()), LogTone::Notice);

        let id = self.pool.submit(wallet.address, wallet.secret).await?;
        Ok(StepOutcome::Submitted(id))
    }

    /// Iterate until `running` is cleared or a fatal error occurs.
    ///
    /// Each iteration reads one config snapshot and sleeps off whatever is
    /// left of its `1 / rate` budget, so the rate is a ceiling rather than a
    /// guarantee.
    pub async fn run(&self, running: &AtomicBool) -> Result<u64, ProducerError> {
        info!("Producer loop is running...");
        let mut window_started = Instant::now();
        let mut iterations = 0u64;

        while running.load(Ordering::Acquire) {
            let iteration_started = Instant::now();
            let budget = self.config.borrow().speed_level.iteration_budget();

            self.step().await?;
            iterations += 1;

            if let Some(delay) = budget.checked_sub(iteration_started.elapsed()) {
                tokio::time::sleep(delay).await;
            }

            if window_started.elapsed() >= self.success_window {
                self.stats.roll_success_window();
                window_started = Instant::now();
            }
        }

        debug!(iterations, "Producer loop exited");
        Ok(iterations)
    }
}

//! Command/query surface of a running pipeline.
//!
//! Idle → Running on `start`, Running → Stopping → Idle on `stop`. Each run
//! gets its own continue flag, so a producer that outlives the stop grace
//! period can never be revived by a later `start`.

use crate::pipeline::event_log::{EventLog, LogEntry};
use crate::pipeline::notifier::Notifier;
use crate::pipeline::persistence::PersistenceSink;
use crate::pipeline::producer::ProducerLoop;
use crate::pipeline::stats::StatsAggregator;
use crate::pipeline::types::{PipelineConfig, RunConfig, RunState, SpeedError, SpeedLevel, StatsSnapshot};
use crate::types::{host_name, LogTone};
use anyhow::Result;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const STOPPING: u8 = 2;

fn decode_state(raw: u8) -> RunState {
    match raw {
        RUNNING => RunState::Running,
        STOPPING => RunState::Stopping,
        _ => RunState::Idle,
    }
}

struct ActiveRun {
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

pub struct Pipeline {
    config: PipelineConfig,
    run_config: watch::Sender<RunConfig>,
    stats: Arc<StatsAggregator>,
    log: Arc<EventLog>,
    notifier: Notifier,
    sink: Arc<PersistenceSink>,
    producer: Arc<ProducerLoop>,
    state: Arc<AtomicU8>,
    active: Mutex<Option<ActiveRun>>,
    host: String,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        config: PipelineConfig,
        run_config: watch::Sender<RunConfig>,
        stats: Arc<StatsAggregator>,
        log: Arc<EventLog>,
        notifier: Notifier,
        sink: Arc<PersistenceSink>,
        producer: Arc<ProducerLoop>,
    ) -> Self {
        Self {
            config,
            run_config,
            stats,
            log,
            notifier,
            sink,
            producer,
            state: Arc::new(AtomicU8::new(IDLE)),
            active: Mutex::new(None),
            host: host_name(),
        }
    }

    /// Begin generating. Returns `false` if a run is already active.
    pub async fn start(&self) -> bool {
        {
            // held across the transition so a concurrent stop sees the new run
            let mut active = self.active.lock();
            if self
                .state
                .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return false;
            }

            self.stats.mark_started();
            let running = Arc::new(AtomicBool::new(true));

            let producer = self.producer.clone();
            let flag = running.clone();
            let state = self.state.clone();
            let log = self.log.clone();
            let task = tokio::spawn(async move {
                if let Err(e) = producer.run(&flag).await {
                    log.error(format!("Generation halted: {}", e));
                }
                // still flagged means nobody asked us to stop: the run ended on its own
                if flag.swap(false, Ordering::AcqRel) {
                    let _ = state.compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire);
                }
            });

            *active = Some(ActiveRun { running, task });
        }

        let config = self.run_config();
        info!(speed = config.speed_level.get(), rpc = %config.rpc_endpoint, "Generation started");
        self.log.success("Generation started");
        self.notifier.dispatch(format!(
            "🟢 <b>Wallet generator activated</b>\n\n\
             ⚡ Speed Level: {}/{}\n\
             🌐 RPC: {}\n\
             🖥️ Host: {}",
            config.speed_level.get(),
            SpeedLevel::MAX,
            config.rpc_endpoint,
            self.host
        ));
        true
    }

    /// Stop generating. Waits at most the stop grace period for the producer;
    /// probes already queued or in flight finish on their own.
    pub async fn stop(&self) -> bool {
        let active = {
            let mut active = self.active.lock();
            if self
                .state
                .compare_exchange(RUNNING, STOPPING, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return false;
            }
            active.take()
        };

        if let Some(run) = active {
            run.running.store(false, Ordering::Release);
            if tokio::time::timeout(self.config.stop_grace, run.task)
                .await
                .is_err()
            {
                warn!(
                    "Producer did not exit within {:?}, detaching",
                    self.config.stop_grace
                );
            }
        }
        self.state.store(IDLE, Ordering::Release);

        let stats = self.stats.snapshot();
        self.log.append("Generation stopped", LogTone::Notice);
        self.notifier.dispatch(format!(
            "🔴 <b>Wallet generator stopped</b>\n\n\
             📊 Stats:\n\
             Generated: {}\n\
             With Balance: {}\n\
             Avg Latency: {:.1} ms",
            stats.generated_count, stats.matched_count, stats.avg_latency_ms
        ));
        true
    }

    /// Shift the speed level by `delta`. Fails without change when the level
    /// is already at the bound in that direction.
    pub fn adjust_speed(&self, delta: i32) -> Result<SpeedLevel, SpeedError> {
        let mut outcome = Err(SpeedError::LimitReached(SpeedLevel::default().get()));
        self.run_config.send_if_modified(|config| {
            let next = config.speed_level.shifted(delta);
            if next == config.speed_level {
                outcome = Err(SpeedError::LimitReached(next.get()));
                false
            } else {
                config.speed_level = next;
                outcome = Ok(next);
                true
            }
        });

        if let Ok(level) = outcome {
            if self.is_running() {
                self.log.append(
                    format!("Speed adjusted to level {}/{}", level.get(), SpeedLevel::MAX),
                    LogTone::System,
                );
            }
        }
        outcome
    }

    pub fn clear_log(&self) {
        self.log.clear();
        self.log.append("Console cleared", LogTone::System);
    }

    pub fn get_stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn get_log(&self) -> Vec<LogEntry> {
        self.log.snapshot()
    }

    /// Raw bytes of the primary record store.
    pub async fn export_persisted_records(&self) -> Result<Vec<u8>> {
        self.sink.export().await
    }

    pub fn state(&self) -> RunState {
        decode_state(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    pub fn run_config(&self) -> RunConfig {
        self.run_config.borrow().clone()
    }

    /// Name of the machine running the pipeline.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn event_log(&self) -> &Arc<EventLog> {
        &self.log
    }

    pub fn stats(&self) -> &Arc<StatsAggregator> {
        &self.stats
    }

    /// Direct access to the producer, for driving single iterations.
    pub fn producer(&self) -> &ProducerLoop {
        &self.producer
    }
}

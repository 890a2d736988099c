//! Pipeline module - generate, probe, persist.
//!
//! A producer creates keypairs at a throttled rate and hands them to a bounded
//! worker pool; workers run balance probes and send outcomes to a single
//! aggregator that maintains statistics and persists funded accounts.

pub mod types;
pub mod event_log;
pub mod stats;
pub mod keygen;
pub mod prober;
pub mod notifier;
pub mod persistence;
pub mod worker_pool;
pub mod aggregator;
pub mod producer;
pub mod controller;

// Re-export main types
pub use types::{
    PipelineConfig, RunConfig, RunState, SpeedError, SpeedLevel, StatsSnapshot, TaskId,
    DEFAULT_RPC_URL,
};

// Re-export key components
pub use aggregator::ResultAggregator;
pub use controller::Pipeline;
pub use event_log::{EventLog, LogEntry};
pub use keygen::{KeyGenError, KeySource, SolanaKeyGenerator};
pub use notifier::{NotificationChannel, Notifier, TelegramNotifier};
pub use persistence::PersistenceSink;
pub use prober::{adaptive_timeout, BalanceProber, RpcBalanceProber};
pub use producer::{ProducerError, ProducerLoop, StepOutcome};
pub use stats::StatsAggregator;
pub use worker_pool::{PoolError, WorkerPool};

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;

/// Pipeline builder with sensible defaults.
pub struct PipelineBuilder {
    config: PipelineConfig,
    run_config: RunConfig,
    prober: Option<Arc<dyn BalanceProber>>,
    keys: Option<Arc<dyn KeySource>>,
    channel: Option<Arc<dyn NotificationChannel>>,
}

impl PipelineBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            run_config: RunConfig::default(),
            prober: None,
            keys: None,
            channel: None,
        }
    }

    /// Replace the whole static configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the initial runtime configuration.
    pub fn with_run_config(mut self, run_config: RunConfig) -> Self {
        self.run_config = run_config;
        self
    }

    /// Set the initial speed level.
    pub fn with_speed_level(mut self, level: SpeedLevel) -> Self {
        self.run_config.speed_level = level;
        self
    }

    /// Set the JSON-RPC endpoint used by the default prober.
    pub fn with_rpc_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.run_config.rpc_endpoint = endpoint.into();
        self
    }

    /// Enable or disable notifications.
    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.run_config.notifications_enabled = enabled;
        self
    }

    /// Set the number of concurrent probe workers.
    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.config.worker_count = worker_count;
        self
    }

    /// Set the primary record store.
    pub fn with_wallet_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.wallet_file = path.into();
        self
    }

    /// Set the directory for daily backups.
    pub fn with_backup_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.backup_dir = path.into();
        self
    }

    /// Use a custom balance prober instead of JSON-RPC.
    pub fn with_prober(mut self, prober: Arc<dyn BalanceProber>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Use a custom key source instead of the OS-seeded generator.
    pub fn with_key_source(mut self, keys: Arc<dyn KeySource>) -> Self {
        self.keys = Some(keys);
        self
    }

    /// Deliver notifications through `channel`.
    pub fn with_notification_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Build the static configuration only.
    pub fn build_config(self) -> PipelineConfig {
        self.config
    }

    /// Wire every component and start the worker pool and aggregator.
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> anyhow::Result<Pipeline> {
        let config = self.config;
        let (run_tx, run_rx) = watch::channel(self.run_config);

        let stats = Arc::new(StatsAggregator::new(config.latency_decay));
        let log = Arc::new(EventLog::new(config.log_capacity, config.log_trim_batch));
        let notifier = Notifier::new(self.channel, config.notify_per_minute, run_rx.clone(), log.clone());

        let sink = Arc::new(PersistenceSink::new(
            config.wallet_file.clone(),
            config.backup_dir.clone(),
            config.backup_prefix.clone(),
            stats.clone(),
            log.clone(),
            notifier.clone(),
        ));

        let prober: Arc<dyn BalanceProber> = match self.prober {
            Some(prober) => prober,
            None => Arc::new(RpcBalanceProber::new(run_rx.clone())?),
        };
        let keys: Arc<dyn KeySource> = match self.keys {
            Some(keys) => keys,
            None => Arc::new(SolanaKeyGenerator::new()),
        };

        let (outcome_tx, outcome_rx) = mpsc::channel(config.queue_capacity.max(1) * 2);
        let pool = Arc::new(WorkerPool::spawn(
            config.worker_count,
            config.queue_capacity,
            prober,
            stats.clone(),
            outcome_tx,
        ));

        let aggregator = ResultAggregator::new(stats.clone(), log.clone(), sink.clone());
        tokio::spawn(aggregator.run(outcome_rx));

        let producer = Arc::new(ProducerLoop::new(
            keys,
            pool,
            stats.clone(),
            log.clone(),
            run_rx,
            config.success_window,
        ));

        info!(
            workers = config.worker_count,
            wallet_file = %config.wallet_file.display(),
            "Pipeline assembled"
        );

        Ok(Pipeline::new(config, run_tx, stats, log, notifier, sink, producer))
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

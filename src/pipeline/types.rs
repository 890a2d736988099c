//! Configuration, snapshots and channel types for the probing pipeline.

use crate::types::{Address, ProbeResult, Secret};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default Solana JSON-RPC endpoint.
pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

/// Discrete throughput target, 1 (slowest) to 5 (fastest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SpeedLevel(u8);

impl SpeedLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Wallets per second for each level.
    const RATES: [f64; 5] = [2.0, 5.0, 10.0, 20.0, 50.0];

    pub fn new(level: u8) -> Result<Self, SpeedError> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(SpeedError::OutOfRange(level))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Target wallets per second.
    pub fn target_rate(self) -> f64 {
        Self::RATES[(self.0 - Self::MIN) as usize]
    }

    /// Budget for one producer iteration at this level.
    pub fn iteration_budget(self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_rate())
    }

    /// Level shifted by `delta`, clamped to the valid range.
    pub fn shifted(self, delta: i32) -> Self {
        let level = (self.0 as i32 + delta).clamp(Self::MIN as i32, Self::MAX as i32);
        Self(level as u8)
    }
}

impl Default for SpeedLevel {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<u8> for SpeedLevel {
    type Error = SpeedError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::new(level)
    }
}

impl From<SpeedLevel> for u8 {
    fn from(level: SpeedLevel) -> Self {
        level.0
    }
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SpeedError {
    #[error("speed level {0} outside 1..=5")]
    OutOfRange(u8),
    #[error("speed limit reached (level {0}/5)")]
    LimitReached(u8),
}

/// Runtime-adjustable settings, swapped as a whole value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub speed_level: SpeedLevel,
    pub rpc_endpoint: String,
    pub notifications_enabled: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            speed_level: SpeedLevel::default(),
            rpc_endpoint: DEFAULT_RPC_URL.to_string(),
            notifications_enabled: true,
        }
    }
}

/// Static pipeline settings fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Concurrent balance probes
    pub worker_count: usize,
    /// Pending probe tasks before `submit` waits
    pub queue_capacity: usize,
    /// Event log entries kept before trimming
    pub log_capacity: usize,
    /// Oldest entries dropped per trim
    pub log_trim_batch: usize,
    /// Success ratio recomputation window
    pub success_window: Duration,
    /// Bounded wait for the producer on stop
    pub stop_grace: Duration,
    /// Weight of the previous average in latency smoothing
    pub latency_decay: f64,
    /// Primary append-only record store
    pub wallet_file: PathBuf,
    /// Directory holding one backup file per day
    pub backup_dir: PathBuf,
    /// Backup file name prefix, followed by `_YYYYMMDD.txt`
    pub backup_prefix: String,
    /// Notifications allowed per minute
    pub notify_per_minute: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: 5,
            queue_capacity: 32,
            log_capacity: 200,
            log_trim_batch: 50,
            success_window: Duration::from_secs(5),
            stop_grace: Duration::from_secs(1),
            latency_decay: 0.9,
            wallet_file: PathBuf::from("solana_wallets.txt"),
            backup_dir: PathBuf::from("backups"),
            backup_prefix: "solana_wallets".to_string(),
            notify_per_minute: 20,
        }
    }
}

/// Point-in-time read of the pipeline statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub generated_count: u64,
    pub matched_count: u64,
    pub probes_succeeded: u64,
    pub probes_failed: u64,
    pub avg_latency_ms: f64,
    pub success_ratio: f64,
    pub last_match_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub uptime_secs: u64,
}

/// Lifecycle of the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Stopping,
}

/// Identifier handed back by the worker pool for each accepted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

/// Work item queued for the worker pool.
#[derive(Debug, Clone)]
pub struct ProbeTask {
    pub id: TaskId,
    pub address: Address,
    pub secret: Secret,
}

/// A finished probe, sent from a worker to the aggregator.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub task: ProbeTask,
    pub result: ProbeResult,
}

pub type ProbeTaskSender = tokio::sync::mpsc::Sender<ProbeTask>;
pub type ProbeTaskReceiver = tokio::sync::mpsc::Receiver<ProbeTask>;
pub type ProbeOutcomeSender = tokio::sync::mpsc::Sender<ProbeOutcome>;
pub type ProbeOutcomeReceiver = tokio::sync::mpsc::Receiver<ProbeOutcome>;

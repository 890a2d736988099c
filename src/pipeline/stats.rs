//! Shared pipeline statistics.
//!
//! Counters are plain atomics; the two floating point gauges are stored as
//! `f64` bit patterns and updated with compare-and-swap, so workers never
//! contend on a lock. Snapshots read each field independently: consistent
//! enough for monitoring, not a ledger.

use crate::pipeline::types::StatsSnapshot;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Lock-free `f64` cell.
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    fn update(&self, f: impl Fn(f64) -> f64) -> f64 {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = f(f64::from_bits(current)).to_bits();
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return f64::from_bits(next),
                Err(actual) => current = actual,
            }
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Timestamps {
    started_at: Option<DateTime<Utc>>,
    last_match_at: Option<DateTime<Utc>>,
}

/// Process-wide statistics shared by the producer, the workers and the aggregator.
pub struct StatsAggregator {
    generated: AtomicU64,
    matched: AtomicU64,
    probes_succeeded: AtomicU64,
    probes_failed: AtomicU64,
    avg_latency_ms: AtomicF64,
    success_ratio: AtomicF64,
    window_total: AtomicU64,
    window_success: AtomicU64,
    latency_decay: f64,
    timestamps: Mutex<Timestamps>,
}

impl StatsAggregator {
    /// `latency_decay` is the weight of the previous average (0.9 keeps 90%).
    pub fn new(latency_decay: f64) -> Self {
        Self {
            generated: AtomicU64::new(0),
            matched: AtomicU64::new(0),
            probes_succeeded: AtomicU64::new(0),
            probes_failed: AtomicU64::new(0),
            avg_latency_ms: AtomicF64::new(0.0),
            success_ratio: AtomicF64::new(100.0),
            window_total: AtomicU64::new(0),
            window_success: AtomicU64::new(0),
            latency_decay: latency_decay.clamp(0.0, 1.0),
            timestamps: Mutex::new(Timestamps::default()),
        }
    }

    pub fn mark_started(&self) {
        self.timestamps.lock().started_at = Some(Utc::now());
    }

    /// A keypair was produced and handed to the pool.
    pub fn record_generated(&self) -> u64 {
        self.window_total.fetch_add(1, Ordering::Relaxed);
        self.generated.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// A probe returned a balance; folds its latency into the moving average.
    pub fn record_probe_success(&self, latency_ms: f64) -> f64 {
        self.probes_succeeded.fetch_add(1, Ordering::Relaxed);
        self.window_success.fetch_add(1, Ordering::Relaxed);
        let decay = self.latency_decay;
        self.avg_latency_ms
            .update(|old| old * decay + latency_ms * (1.0 - decay))
    }

    pub fn record_probe_failure(&self) {
        self.probes_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// A funded account was recorded.
    pub fn record_match(&self) -> u64 {
        self.timestamps.lock().last_match_at = Some(Utc::now());
        self.matched.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Recompute the success ratio from the current window and start a new one.
    ///
    /// Completions are attributed to whichever window is open when they land,
    /// so probes straddling a boundary skew the ratio; it is clamped to 100.
    pub fn roll_success_window(&self) -> f64 {
        let total = self.window_total.swap(0, Ordering::AcqRel);
        let success = self.window_success.swap(0, Ordering::AcqRel);
        let ratio = (success as f64 / total.max(1) as f64 * 100.0).min(100.0);
        self.success_ratio.store(ratio);
        debug!(total, success, ratio, "Rolled success window");
        ratio
    }

    pub fn avg_latency_ms(&self) -> f64 {
        self.avg_latency_ms.load()
    }

    pub fn generated(&self) -> u64 {
        self.generated.load(Ordering::Acquire)
    }

    pub fn matched(&self) -> u64 {
        self.matched.load(Ordering::Acquire)
    }

    /// Probes that have finished, successfully or not.
    pub fn probes_completed(&self) -> u64 {
        self.probes_succeeded.load(Ordering::Relaxed) + self.probes_failed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let timestamps = *self.timestamps.lock();
        let uptime_secs = timestamps
            .started_at
            .map(|t| (Utc::now() - t).num_seconds().max(0) as u64)
            .unwrap_or(0);

        // matched is read first so a concurrent generation can only widen the gap
        let matched_count = self.matched();
        StatsSnapshot {
            generated_count: self.generated(),
            matched_count,
            probes_succeeded: self.probes_succeeded.load(Ordering::Relaxed),
            probes_failed: self.probes_failed.load(Ordering::Relaxed),
            avg_latency_ms: self.avg_latency_ms.load(),
            success_ratio: self.success_ratio.load(),
            last_match_at: timestamps.last_match_at,
            started_at: timestamps.started_at,
            uptime_secs,
        }
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new(0.9)
    }
}

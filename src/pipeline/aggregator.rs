//! Single consumer of probe outcomes.
//!
//! All result handling happens here, one outcome at a time: latency
//! smoothing, success counting, operator log lines and persistence of matches.

use crate::pipeline::event_log::EventLog;
use crate::pipeline::persistence::PersistenceSink;
use crate::pipeline::stats::StatsAggregator;
use crate::pipeline::types::{ProbeOutcome, ProbeOutcomeReceiver};
use crate::types::{group_thousands, lamports_to_sol, short_address, ProbeError};
use std::sync::Arc;
use tracing::info;

pub struct ResultAggregator {
    stats: Arc<StatsAggregator>,
    log: Arc<EventLog>,
    sink: Arc<PersistenceSink>,
}

impl ResultAggregator {
    pub fn new(stats: Arc<StatsAggregator>, log: Arc<EventLog>, sink: Arc<PersistenceSink>) -> Self {
        Self { stats, log, sink }
    }

    /// Drain outcomes until every worker has hung up.
    pub async fn run(self, mut outcomes: ProbeOutcomeReceiver) {
        info!("Result aggregator is running...");
        while let Some(outcome) = outcomes.recv().await {
            self.handle(outcome).await;
        }
        info!("Result aggregator channel closed. Shutting down.");
    }

    pub async fn handle(&self, outcome: ProbeOutcome) {
        let ProbeOutcome { task, result } = outcome;
        let prefix = short_address(&task.address);

        match result.outcome {
            Ok(balance) => {
                if balance > 0 {
                    self.log.success(format!(
                        "FOUND: {} lamports ({:.9} SOL) at {}",
                        group_thousands(balance),
                        lamports_to_sol(balance),
                        task.address
                    ));
                    self.sink.record(&task.address, &task.secret, balance).await;
                } else {
                    self.log.info(format!(
                        "Balance: {} lamports (Response: {:.1}ms)",
                        group_thousands(balance),
                        result.latency_ms
                    ));
                }
                // counted last so a completed probe implies its match is on disk
                self.stats.record_probe_success(result.latency_ms);
            }
            Err(ProbeError::Timeout(ms)) => {
                self.stats.record_probe_failure();
                self.log
                    .warning(format!("Timeout checking balance for {}... ({} ms)", prefix, ms));
            }
            Err(ProbeError::Transport(e)) => {
                self.stats.record_probe_failure();
                self.log
                    .warning(format!("Connection error for {}...: {}", prefix, e));
            }
            Err(ProbeError::Protocol(e)) => {
                self.stats.record_probe_failure();
                self.log.warning(format!("RPC error for {}...: {}", prefix, e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::notifier::Notifier;
    use crate::pipeline::types::{ProbeTask, RunConfig, TaskId};
    use crate::types::{ProbeResult, Secret};
    use tokio::sync::watch;

    fn aggregator(dir: &std::path::Path) -> (ResultAggregator, Arc<StatsAggregator>, Arc<EventLog>) {
        let stats = Arc::new(StatsAggregator::default());
        let log = Arc::new(EventLog::default());
        let (_tx, rx) = watch::channel(RunConfig::default());
        let sink = Arc::new(PersistenceSink::new(
            dir.join("wallets.txt"),
            dir.join("backups"),
            "solana_wallets".to_string(),
            stats.clone(),
            log.clone(),
            Notifier::new(None, 10, rx, log.clone()),
        ));
        (ResultAggregator::new(stats.clone(), log.clone(), sink), stats, log)
    }

    fn outcome(result: ProbeResult) -> ProbeOutcome {
        ProbeOutcome {
            task: ProbeTask {
                id: TaskId(1),
                address: "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin".to_string(),
                secret: Secret::new("secret"),
            },
            result,
        }
    }

    #[tokio::test]
    async fn test_zero_balance_updates_latency_only() {
        let dir = tempfile::tempdir().unwrap();
        let (agg, stats, log) = aggregator(dir.path());

        agg.handle(outcome(ProbeResult::success(0, 200.0))).await;

        let snap = stats.snapshot();
        assert_eq!(snap.matched_count, 0);
        assert_eq!(snap.probes_succeeded, 1);
        assert!((snap.avg_latency_ms - 20.0).abs() < 1e-9);
        assert_eq!(log.snapshot()[0].text, "Balance: 0 lamports (Response: 200.0ms)");
        assert!(!dir.path().join("wallets.txt").exists());
    }

    #[tokio::test]
    async fn test_match_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let (agg, stats, _) = aggregator(dir.path());

        agg.handle(outcome(ProbeResult::success(1000, 50.0))).await;

        assert_eq!(stats.matched(), 1);
        let stored = std::fs::read_to_string(dir.path().join("wallets.txt")).unwrap();
        assert!(stored.contains("Balance: 1,000 lamports"));
    }

    #[tokio::test]
    async fn test_failures_are_counted_and_logged() {
        let dir = tempfile::tempdir().unwrap();
        let (agg, stats, log) = aggregator(dir.path());

        agg.handle(outcome(ProbeResult::failure(ProbeError::Timeout(3000), 0.0)))
            .await;
        agg.handle(outcome(ProbeResult::failure(
            ProbeError::Transport("refused".into()),
            0.0,
        )))
        .await;

        let snap = stats.snapshot();
        assert_eq!(snap.probes_failed, 2);
        assert_eq!(snap.avg_latency_ms, 0.0);
        let lines = log.snapshot();
        assert_eq!(lines[0].text, "Timeout checking balance for 9xQeWv... (3000 ms)");
        assert!(lines[1].text.starts_with("Connection error for 9xQeWv..."));
    }
}

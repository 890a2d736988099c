//! Fixed-size pool of probe workers fed by a bounded queue.
//!
//! Workers pull [`ProbeTask`]s, run one balance probe each and forward the
//! [`ProbeOutcome`] to the single aggregator over a channel. `submit` waits
//! when the queue is full, which is what throttles the producer under load.

use crate::pipeline::prober::{adaptive_timeout, BalanceProber};
use crate::pipeline::stats::StatsAggregator;
use crate::pipeline::types::{
    ProbeOutcome, ProbeOutcomeSender, ProbeTask, ProbeTaskReceiver, ProbeTaskSender, TaskId,
};
use crate::types::{Address, ProbeError, ProbeResult, Secret};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool is shut down")]
    Closed,
}

pub struct WorkerPool {
    sender: ProbeTaskSender,
    next_id: AtomicU64,
    size: usize,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `size` workers sharing a queue of `queue_capacity` pending tasks.
    pub fn spawn(
        size: usize,
        queue_capacity: usize,
        prober: Arc<dyn BalanceProber>,
        stats: Arc<StatsAggregator>,
        outcomes: ProbeOutcomeSender,
    ) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::channel::<ProbeTask>(queue_capacity.max(1));
        let queue = Arc::new(Mutex::new(receiver));

        let workers = (0..size)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    queue.clone(),
                    prober.clone(),
                    stats.clone(),
                    outcomes.clone(),
                ))
            })
            .collect();

        info!("Worker pool started with {} workers", size);

        Self {
            sender,
            next_id: AtomicU64::new(1),
            size,
            workers,
        }
    }

    /// Queue a probe for `address`; waits while the queue is full.
    pub async fn submit(&self, address: Address, secret: Secret) -> Result<TaskId, PoolError> {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.sender
            .send(ProbeTask {
                id,
                address,
                secret,
            })
            .await
            .map_err(|_| PoolError::Closed)?;
        Ok(id)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Tasks waiting for a free worker.
    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Close the queue and wait for workers to finish what was already queued.
    pub async fn shutdown(self) {
        drop(self.sender);
        for (worker_id, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.await {
                warn!(worker_id, "Balance worker ended abnormally: {}", e);
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<Mutex<ProbeTaskReceiver>>,
    prober: Arc<dyn BalanceProber>,
    stats: Arc<StatsAggregator>,
    outcomes: ProbeOutcomeSender,
) {
    loop {
        let task = { queue.lock().await.recv().await };
        let Some(task) = task else {
            break;
        };

        let timeout = adaptive_timeout(stats.avg_latency_ms());
        let result = match tokio::time::timeout(timeout, prober.probe(&task.address, timeout)).await
        {
            Ok(result) => result,
            Err(_) => ProbeResult::failure(ProbeError::Timeout(timeout.as_millis() as u64), 0.0),
        };

        if outcomes.send(ProbeOutcome { task, result }).await.is_err() {
            break;
        }
    }
    debug!(worker_id, "Probe worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FailureKind;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct SlowProber {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl BalanceProber for SlowProber {
        async fn probe(&self, _address: &str, _timeout: Duration) -> ProbeResult {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            ProbeResult::success(0, self.delay.as_secs_f64() * 1000.0)
        }
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let prober = Arc::new(SlowProber {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay: Duration::from_millis(20),
        });
        let (tx, mut rx) = mpsc::channel(64);
        let pool = WorkerPool::spawn(3, 4, prober.clone(), Arc::new(StatsAggregator::default()), tx);

        let collector = tokio::spawn(async move {
            let mut ids = Vec::new();
            while let Some(outcome) = rx.recv().await {
                ids.push(outcome.task.id);
            }
            ids
        });

        for i in 0..20 {
            pool.submit(format!("addr{}", i), Secret::new("s")).await.unwrap();
        }
        pool.shutdown().await;

        let ids = collector.await.unwrap();
        assert_eq!(ids.len(), 20);
        assert!(prober.peak.load(Ordering::SeqCst) <= 3);
    }

    struct HangingProber;

    #[async_trait]
    impl BalanceProber for HangingProber {
        async fn probe(&self, _address: &str, _timeout: Duration) -> ProbeResult {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_bounded_by_timeout() {
        let (tx, mut rx) = mpsc::channel(4);
        let pool = WorkerPool::spawn(1, 1, Arc::new(HangingProber), Arc::new(StatsAggregator::default()), tx);

        pool.submit("addr".into(), Secret::new("s")).await.unwrap();
        let outcome = rx.recv().await.unwrap();
        assert_eq!(outcome.result.failure_kind(), FailureKind::Timeout);
        assert_eq!(outcome.result.outcome, Err(ProbeError::Timeout(10_000)));
    }

    #[derive(Default)]
    struct TimeoutRecorder {
        seen: parking_lot::Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl BalanceProber for TimeoutRecorder {
        async fn probe(&self, _address: &str, timeout: Duration) -> ProbeResult {
            self.seen.lock().push(timeout);
            ProbeResult::success(0, 1.0)
        }
    }

    #[tokio::test]
    async fn test_timeout_follows_smoothed_latency() {
        let stats = Arc::new(StatsAggregator::default());
        let prober = Arc::new(TimeoutRecorder::default());
        let (tx, mut rx) = mpsc::channel(4);
        let pool = WorkerPool::spawn(1, 2, prober.clone(), stats.clone(), tx);

        pool.submit("fast".into(), Secret::new("s")).await.unwrap();
        rx.recv().await.unwrap();

        // one 80 s sample lifts the average to 8 s
        stats.record_probe_success(80_000.0);
        pool.submit("slow".into(), Secret::new("s")).await.unwrap();
        rx.recv().await.unwrap();

        let seen = prober.seen.lock().clone();
        assert_eq!(seen, vec![Duration::from_secs(10), Duration::from_secs(7)]);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let (tx, mut rx) = mpsc::channel(8);
        let pool = WorkerPool::spawn(
            2,
            8,
            Arc::new(TimeoutRecorder::default()),
            Arc::new(StatsAggregator::default()),
            tx,
        );
        for i in 0..5 {
            pool.submit(format!("addr{}", i), Secret::new("s")).await.unwrap();
        }
        pool.shutdown().await;

        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }
        assert_eq!(received, 5);
    }

    #[tokio::test]
    async fn test_task_ids_are_sequential() {
        let (tx, _rx) = mpsc::channel(16);
        let pool = WorkerPool::spawn(
            1,
            8,
            Arc::new(HangingProber),
            Arc::new(StatsAggregator::default()),
            tx,
        );
        let a = pool.submit("a".into(), Secret::new("s")).await.unwrap();
        let b = pool.submit("b".into(), Secret::new("s")).await.unwrap();
        assert_eq!(b.0, a.0 + 1);
        assert_eq!(pool.size(), 1);
    }
}

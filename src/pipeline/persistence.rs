//! Durable record of funded accounts.
//!
//! Each match is appended as a text block to the primary store and to a
//! per-day backup file. Both writes are best effort: a failure is logged and
//! the match still counts and still notifies.

use crate::pipeline::event_log::EventLog;
use crate::pipeline::notifier::Notifier;
use crate::pipeline::stats::StatsAggregator;
use crate::types::{group_thousands, lamports_to_sol, short_address, Secret};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{error, info, instrument};

const RECORD_DELIMITER_WIDTH: usize = 60;

pub struct PersistenceSink {
    wallet_file: PathBuf,
    backup_dir: PathBuf,
    backup_prefix: String,
    stats: Arc<StatsAggregator>,
    log: Arc<EventLog>,
    notifier: Notifier,
}

impl PersistenceSink {
    pub fn new(
        wallet_file: PathBuf,
        backup_dir: PathBuf,
        backup_prefix: String,
        stats: Arc<StatsAggregator>,
        log: Arc<EventLog>,
        notifier: Notifier,
    ) -> Self {
        Self {
            wallet_file,
            backup_dir,
            backup_prefix,
            stats,
            log,
            notifier,
        }
    }

    pub fn wallet_file(&self) -> &Path {
        &self.wallet_file
    }

    /// Backup partition for the calendar day of `at`.
    pub fn backup_path(&self, at: &DateTime<Local>) -> PathBuf {
        self.backup_dir
            .join(format!("{}_{}.txt", self.backup_prefix, at.format("%Y%m%d")))
    }

    /// Persist a match, notify, and count it.
    #[instrument(skip(self, secret), fields(address = %short_address(address)))]
    pub async fn record(&self, address: &str, secret: &Secret, balance: u64) {
        let now = Local::now();
        let block = format_record(&now, address, secret, balance);

        match append(&self.wallet_file, &block).await {
            Ok(()) => info!(path = %self.wallet_file.display(), "Recorded wallet"),
            Err(e) => {
                error!("Primary store write failed: {:#}", e);
                self.log.error(format!("Failed to save wallet: {:#}", e));
            }
        }

        let backup = self.backup_path(&now);
        let backup_result = match fs::create_dir_all(&self.backup_dir).await {
            Ok(()) => append(&backup, &block).await,
            Err(e) => Err(e).with_context(|| {
                format!("creating backup directory {}", self.backup_dir.display())
            }),
        };
        if let Err(e) = backup_result {
            error!("Backup write failed: {:#}", e);
            self.log.error(format!("Failed to write backup: {:#}", e));
        }

        self.notifier.dispatch(format!(
            "💰 <b>SOLANA WALLET FOUND!</b> 💰\n\n\
             ⏰ <b>Time:</b> {}\n\
             📌 <b>Address:</b> <code>{}</code>\n\
             💎 <b>Balance:</b> {:.9} SOL\n\n\
             Key material saved locally.",
            now.format("%Y-%m-%d %H:%M:%S"),
            address,
            lamports_to_sol(balance),
        ));

        self.stats.record_match();
    }

    /// Full contents of the primary store; empty if nothing has been recorded yet.
    pub async fn export(&self) -> Result<Vec<u8>> {
        match fs::read(&self.wallet_file).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => {
                Err(e).with_context(|| format!("reading {}", self.wallet_file.display()))
            }
        }
    }
}

/// Human readable record block, terminated by a delimiter line.
pub fn format_record(at: &DateTime<Local>, address: &str, secret: &Secret, balance: u64) -> String {
    format!(
        "SOLANA WALLET FOUND\n\
         Timestamp: {}\n\
         Address: {}\n\
         Private Key: {}\n\
         Balance: {} lamports ({:.9} SOL)\n\
         {}\n",
        at.format("%Y-%m-%d %H:%M:%S"),
        address,
        secret.expose(),
        group_thousands(balance),
        lamports_to_sol(balance),
        "=".repeat(RECORD_DELIMITER_WIDTH),
    )
}

async fn append(path: &Path, block: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    file.write_all(block.as_bytes())
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::RunConfig;
    use tokio::sync::watch;

    fn sink(dir: &Path, wallet_file: PathBuf) -> (PersistenceSink, Arc<StatsAggregator>, Arc<EventLog>) {
        let stats = Arc::new(StatsAggregator::default());
        let log = Arc::new(EventLog::default());
        let (_tx, rx) = watch::channel(RunConfig::default());
        let notifier = Notifier::new(None, 10, rx, log.clone());
        let sink = PersistenceSink::new(
            wallet_file,
            dir.join("backups"),
            "solana_wallets".to_string(),
            stats.clone(),
            log.clone(),
            notifier,
        );
        (sink, stats, log)
    }

    #[test]
    fn test_record_format() {
        let at = Local::now();
        let block = format_record(&at, "Addr111", &Secret::new("SecretXYZ"), 1_500_000_000);
        let lines: Vec<&str> = block.lines().collect();
        assert_eq!(lines[0], "SOLANA WALLET FOUND");
        assert!(lines[1].starts_with("Timestamp: "));
        assert_eq!(lines[2], "Address: Addr111");
        assert_eq!(lines[3], "Private Key: SecretXYZ");
        assert_eq!(lines[4], "Balance: 1,500,000,000 lamports (1.500000000 SOL)");
        assert_eq!(lines[5], "=".repeat(60));
    }

    #[tokio::test]
    async fn test_record_writes_primary_and_backup() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, stats, _) = sink(dir.path(), dir.path().join("wallets.txt"));

        sink.record("Addr1", &Secret::new("Secret1"), 1000).await;
        sink.record("Addr2", &Secret::new("Secret2"), 2000).await;

        let primary = String::from_utf8(sink.export().await.unwrap()).unwrap();
        assert_eq!(primary.matches("SOLANA WALLET FOUND").count(), 2);
        assert!(primary.contains("Address: Addr2"));

        let backup = std::fs::read_to_string(sink.backup_path(&Local::now())).unwrap();
        assert_eq!(backup, primary);

        let snap = stats.snapshot();
        assert_eq!(snap.matched_count, 2);
        assert!(snap.last_match_at.is_some());
    }

    #[tokio::test]
    async fn test_write_failure_still_counts_match() {
        let dir = tempfile::tempdir().unwrap();
        // a directory cannot be opened for appending
        let (sink, stats, log) = sink(dir.path(), dir.path().to_path_buf());

        sink.record("Addr1", &Secret::new("Secret1"), 1000).await;

        assert_eq!(stats.matched(), 1);
        assert!(log
            .snapshot()
            .iter()
            .any(|e| e.text.starts_with("Failed to save wallet")));
    }

    #[tokio::test]
    async fn test_export_before_any_match_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, _, _) = sink(dir.path(), dir.path().join("missing.txt"));
        assert!(sink.export().await.unwrap().is_empty());
    }
}

//! keyprobe binary: wire the pipeline, serve the dashboard, stop on ctrl-c.

use anyhow::{Context, Result};
use clap::Parser;
use keyprobe::dashboard::{DashboardConfig, DashboardServer};
use keyprobe::types::LogTone;
use keyprobe::pipeline::{
    NotificationChannel, PipelineBuilder, RunConfig, SpeedLevel, TelegramNotifier, DEFAULT_RPC_URL,
};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn, Level};

#[derive(Debug, Parser)]
#[command(name = "keyprobe", version, about = "Solana keypair generator with balance probing")]
struct Args {
    /// Dashboard port
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Dashboard bind address
    #[arg(long, default_value = "127.0.0.1")]
    bind: IpAddr,

    /// Solana JSON-RPC endpoint
    #[arg(long, env = "SOLANA_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc: String,

    /// Initial speed level (1-5)
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=5))]
    speed: u8,

    /// Disable Telegram notifications
    #[arg(long)]
    no_telegram: bool,

    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    telegram_token: Option<String>,

    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    telegram_chat_id: Option<String>,

    /// Concurrent balance probes
    #[arg(long, default_value_t = 5)]
    workers: usize,

    /// Primary store for funded accounts
    #[arg(long, default_value = "solana_wallets.txt")]
    wallet_file: PathBuf,

    /// Directory for daily backup files
    #[arg(long, default_value = "backups")]
    backup_dir: PathBuf,

    /// Start generating immediately
    #[arg(long)]
    autostart: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

fn telegram_channel(args: &Args) -> Option<Arc<dyn NotificationChannel>> {
    if args.no_telegram {
        return None;
    }
    let (token, chat_id) = match (&args.telegram_token, &args.telegram_chat_id) {
        (Some(token), Some(chat_id)) => (token, chat_id),
        _ => {
            info!("Telegram credentials not set, notifications disabled");
            return None;
        }
    };
    match TelegramNotifier::new(token, chat_id) {
        Ok(notifier) => Some(Arc::new(notifier)),
        Err(e) => {
            warn!("Telegram notifier unavailable: {}", e);
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    info!("Starting keyprobe");

    let channel = telegram_channel(&args);
    let run_config = RunConfig {
        speed_level: SpeedLevel::new(args.speed)?,
        rpc_endpoint: args.rpc.clone(),
        notifications_enabled: channel.is_some(),
    };

    let mut builder = PipelineBuilder::new()
        .with_run_config(run_config)
        .with_workers(args.workers)
        .with_wallet_file(args.wallet_file.clone())
        .with_backup_dir(args.backup_dir.clone());
    if let Some(channel) = channel {
        builder = builder.with_notification_channel(channel);
    }
    let pipeline = Arc::new(builder.build().context("Failed to assemble pipeline")?);

    let log = pipeline.event_log();
    let run_config = pipeline.run_config();
    log.append("Solana Wallet Generator initialized", LogTone::System);
    log.append(format!("RPC endpoint: {}", run_config.rpc_endpoint), LogTone::System);
    log.append(format!(
        "Speed level: {}/{} ({} wallets/s), {} workers",
        run_config.speed_level.get(),
        SpeedLevel::MAX,
        run_config.speed_level.target_rate(),
        pipeline.config().worker_count
    ), LogTone::System);
    log.append(format!(
        "Records: {} (backups in {})",
        pipeline.config().wallet_file.display(),
        pipeline.config().backup_dir.display()
    ), LogTone::System);
    log.append(format!(
        "Notifications: {}",
        if run_config.notifications_enabled { "enabled" } else { "disabled" }
    ), LogTone::System);

    if args.autostart {
        pipeline.start().await;
    }

    let server = DashboardServer::new(
        DashboardConfig {
            listen_addr: SocketAddr::new(args.bind, args.port),
        },
        pipeline.clone(),
    );

    let shutdown_pipeline = pipeline.clone();
    server
        .serve(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested");
            shutdown_pipeline.stop().await;
        })
        .await?;

    info!("keyprobe exited");
    Ok(())
}

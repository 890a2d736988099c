//! Outbound operator notifications.
//!
//! Delivery always happens on a spawned task; callers never wait on the
//! network and a failed delivery only produces a log line.

use crate::pipeline::event_log::EventLog;
use crate::pipeline::types::RunConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client;
use serde_json::json;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A message sink such as a chat bot.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}

/// Telegram Bot API `sendMessage`.
pub struct TelegramNotifier {
    http_client: Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str) -> Result<Self> {
        if bot_token.is_empty() {
            return Err(anyhow!("Bot token is empty"));
        }
        if chat_id.is_empty() {
            return Err(anyhow!("Chat ID is empty"));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http_client,
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
        })
    }
}

#[async_trait]
impl NotificationChannel for TelegramNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let payload = json!({
            "chat_id": self.chat_id,
            "text": message,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });

        let response = self
            .http_client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .context("Telegram connection error")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Telegram error {}: {}", status, body));
        }

        debug!("Sent Telegram notification (length={})", message.len());
        Ok(())
    }
}

/// Fire-and-forget dispatcher in front of an optional [`NotificationChannel`].
#[derive(Clone)]
pub struct Notifier {
    channel: Option<Arc<dyn NotificationChannel>>,
    limiter: Arc<DefaultDirectRateLimiter>,
    config: watch::Receiver<RunConfig>,
    log: Arc<EventLog>,
}

impl Notifier {
    pub fn new(
        channel: Option<Arc<dyn NotificationChannel>>,
        per_minute: u32,
        config: watch::Receiver<RunConfig>,
        log: Arc<EventLog>,
    ) -> Self {
        let per_minute = NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN);
        Self::with_quota(channel, Quota::per_minute(per_minute), config, log)
    }

    pub fn with_quota(
        channel: Option<Arc<dyn NotificationChannel>>,
        quota: Quota,
        config: watch::Receiver<RunConfig>,
        log: Arc<EventLog>,
    ) -> Self {
        Self {
            channel,
            limiter: Arc::new(RateLimiter::direct(quota)),
            config,
            log,
        }
    }

    pub fn is_active(&self) -> bool {
        self.channel.is_some() && self.config.borrow().notifications_enabled
    }

    /// Queue `message` for delivery. Returns the delivery task, or `None` when
    /// notifications are off. Past the rate limit the task waits for quota
    /// instead of dropping the message.
    pub fn dispatch(&self, message: String) -> Option<JoinHandle<bool>> {
        if !self.is_active() {
            return None;
        }
        let channel = self.channel.clone()?;
        let limiter = self.limiter.clone();
        let log = self.log.clone();

        Some(tokio::spawn(async move {
            if limiter.check().is_err() {
                debug!("Notification rate limit reached, delaying message");
                limiter.until_ready().await;
            }
            match channel.notify(&message).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Notification delivery failed: {:#}", e);
                    log.error(format!("Notification failed: {:#}", e));
                    false
                }
            }
        }))
    }
}

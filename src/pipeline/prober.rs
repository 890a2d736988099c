//! Balance lookups against a Solana JSON-RPC node.

use crate::pipeline::types::RunConfig;
use crate::types::{short_address, ProbeError, ProbeResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, instrument};

/// Lower bound on the probe timeout, in seconds.
pub const MIN_TIMEOUT_SECS: f64 = 3.0;
/// Upper bound on the probe timeout, in seconds.
pub const MAX_TIMEOUT_SECS: f64 = 10.0;
const TIMEOUT_BASE_SECS: f64 = 15.0;

/// Probe timeout for the current smoothed latency: `clamp(15 - avg_s, 3, 10)`.
pub fn adaptive_timeout(avg_latency_ms: f64) -> Duration {
    let avg_secs = if avg_latency_ms.is_finite() {
        avg_latency_ms.max(0.0) / 1000.0
    } else {
        TIMEOUT_BASE_SECS
    };
    Duration::from_secs_f64((TIMEOUT_BASE_SECS - avg_secs).clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS))
}

/// One balance lookup. Implementations capture every failure in the result.
#[async_trait]
pub trait BalanceProber: Send + Sync {
    async fn probe(&self, address: &str, timeout: Duration) -> ProbeResult;
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<BalanceResult>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct BalanceResult {
    #[serde(default)]
    value: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// `getBalance` over HTTP against the endpoint in the current [`RunConfig`].
pub struct RpcBalanceProber {
    http_client: Client,
    config: watch::Receiver<RunConfig>,
}

impl RpcBalanceProber {
    pub fn new(config: watch::Receiver<RunConfig>) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs_f64(MAX_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    fn classify(error: reqwest::Error, timeout: Duration) -> ProbeError {
        if error.is_timeout() {
            ProbeError::Timeout(timeout.as_millis() as u64)
        } else if error.is_decode() {
            ProbeError::Protocol(error.to_string())
        } else {
            ProbeError::Transport(error.to_string())
        }
    }

    /// Interpret a JSON-RPC body; a missing `value` reads as zero.
    fn parse_balance(body: &[u8]) -> Result<u64, ProbeError> {
        let response: RpcResponse = serde_json::from_slice(body)
            .map_err(|e| ProbeError::Protocol(format!("malformed response: {}", e)))?;

        if let Some(err) = response.error {
            return Err(ProbeError::Protocol(format!(
                "rpc error {}: {}",
                err.code, err.message
            )));
        }

        Ok(response.result.and_then(|r| r.value).unwrap_or(0))
    }
}

#[async_trait]
impl BalanceProber for RpcBalanceProber {
    #[instrument(skip(self, address), fields(address = %short_address(address)))]
    async fn probe(&self, address: &str, timeout: Duration) -> ProbeResult {
        let endpoint = self.config.borrow().rpc_endpoint.clone();
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getBalance",
            "params": [address],
        });

        let started = Instant::now();
        let response = match self
            .http_client
            .post(&endpoint)
            .json(&payload)
            .timeout(timeout)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return ProbeResult::failure(Self::classify(e, timeout), 0.0),
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return ProbeResult::failure(Self::classify(e, timeout), 0.0),
        };
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            let text: String = text.chars().take(200).collect();
            return ProbeResult::failure(
                ProbeError::Protocol(format!("HTTP {}: {}", status, text)),
                latency_ms,
            );
        }

        match Self::parse_balance(&body) {
            Ok(balance) => {
                debug!(balance, latency_ms, "Balance probe succeeded");
                ProbeResult::success(balance, latency_ms)
            }
            Err(e) => ProbeResult::failure(e, latency_ms),
        }
    }
}

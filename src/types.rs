//! Core types and data structures shared across the probing pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A base58 Solana address (public key)
pub type Address = String;

/// Exportable secret material (base58 of the 64-byte secret||public encoding).
///
/// `Debug` and `Display` only ever print the redacted form; the full value is
/// reachable through [`Secret::expose`] and should only flow into persistence.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Full secret value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short prefix and suffix of the secret, e.g. `4dQv8Wm1Xk9Z...7hTqPa`.
    pub fn redacted(&self) -> String {
        redact(&self.0, 12, 6)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", self.redacted())
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Keep `head` leading and `tail` trailing characters, joined by `...`.
/// Values too short to hide anything are masked entirely.
pub fn redact(value: &str, head: usize, tail: usize) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= head + tail {
        return "*".repeat(chars.len());
    }
    let prefix: String = chars[..head].iter().collect();
    let suffix: String = chars[chars.len() - tail..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

/// First six characters of an address, used in diagnostics.
pub fn short_address(address: &str) -> &str {
    match address.char_indices().nth(6) {
        Some((idx, _)) => &address[..idx],
        None => address,
    }
}

/// Host name from the environment or `/etc/hostname`, `unknown` if neither is set.
pub fn host_name() -> String {
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .chain(std::fs::read_to_string("/etc/hostname").ok())
        .map(|name| name.trim().to_string())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// A freshly generated wallet.
#[derive(Debug, Clone)]
pub struct GeneratedWallet {
    pub address: Address,
    pub secret: Secret,
}

/// Classification of a probe failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    None,
    Timeout,
    TransportError,
    ProtocolError,
}

/// Why a balance probe did not produce a balance.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("request timed out after {0} ms")]
    Timeout(u64),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ProbeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ProbeError::Timeout(_) => FailureKind::Timeout,
            ProbeError::Transport(_) => FailureKind::TransportError,
            ProbeError::Protocol(_) => FailureKind::ProtocolError,
        }
    }
}

/// Outcome of one balance lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    /// Round trip time in milliseconds (0 when the request never completed)
    pub latency_ms: f64,
    /// Balance in lamports, or the classified failure
    pub outcome: Result<u64, ProbeError>,
}

impl ProbeResult {
    pub fn success(balance: u64, latency_ms: f64) -> Self {
        Self {
            latency_ms,
            outcome: Ok(balance),
        }
    }

    pub fn failure(error: ProbeError, latency_ms: f64) -> Self {
        Self {
            latency_ms,
            outcome: Err(error),
        }
    }

    pub fn balance(&self) -> Option<u64> {
        self.outcome.as_ref().ok().copied()
    }

    pub fn failure_kind(&self) -> FailureKind {
        match &self.outcome {
            Ok(_) => FailureKind::None,
            Err(e) => e.kind(),
        }
    }
}

/// Display tone of a log line; the dashboard maps each tone to a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTone {
    Info,
    Success,
    Warning,
    Error,
    Highlight,
    Notice,
    System,
}

/// Lamports per SOL.
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Convert lamports into SOL for display.
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// Format an integer with `,` thousands separators.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_never_prints_full_value() {
        let secret = Secret::new("4dQv8Wm1Xk9ZabcdefghijklmnopqrstuvwxyZ7hTqPa");
        let shown = format!("{} {:?}", secret, secret);
        assert!(!shown.contains(secret.expose()));
        assert_eq!(secret.redacted(), "4dQv8Wm1Xk9Z...7hTqPa");
    }

    #[test]
    fn test_redact_short_values_are_masked() {
        assert_eq!(redact("abc", 12, 6), "***");
    }

    #[test]
    fn test_short_address() {
        assert_eq!(short_address("9xQeWvG816bUx9EP"), "9xQeWv");
        assert_eq!(short_address("abc"), "abc");
    }

    #[test]
    fn test_host_name_is_never_empty() {
        let host = host_name();
        assert!(!host.is_empty());
        assert_eq!(host, host.trim());
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1_234_567_890), "1,234,567,890");
    }

    #[test]
    fn test_probe_result_projection() {
        let ok = ProbeResult::success(5, 12.0);
        assert_eq!(ok.balance(), Some(5));
        assert_eq!(ok.failure_kind(), FailureKind::None);

        let timed_out = ProbeResult::failure(ProbeError::Timeout(3000), 0.0);
        assert_eq!(timed_out.balance(), None);
        assert_eq!(timed_out.failure_kind(), FailureKind::Timeout);
    }
}

//! keyprobe - Solana keypair generator with balance probing
//!
//! Generates random ed25519 keypairs at a throttled rate, probes each address's
//! balance over JSON-RPC through a bounded worker pool, and persists any funded
//! account. A small web dashboard exposes statistics and run controls.

pub mod types;
pub mod pipeline;
pub mod dashboard;

// Re-export main types for convenience
pub use pipeline::{Pipeline, PipelineBuilder, PipelineConfig, RunConfig, SpeedLevel, StatsSnapshot};
pub use types::{GeneratedWallet, ProbeError, ProbeResult, Secret};

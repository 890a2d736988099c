//! Solana keypair generation.

use crate::types::{GeneratedWallet, Secret};
use rand::rngs::OsRng;
use rand::RngCore;
use solana_sdk::signer::keypair::keypair_from_seed;
use solana_sdk::signer::Signer;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyGenError {
    /// The OS randomness source failed; nothing sound can be generated after this.
    #[error("randomness source unavailable: {0}")]
    Entropy(String),
    #[error("key derivation failed: {0}")]
    Derivation(String),
}

impl KeyGenError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, KeyGenError::Entropy(_))
    }
}

/// Source of fresh wallets.
pub trait KeySource: Send + Sync {
    fn generate(&self) -> Result<GeneratedWallet, KeyGenError>;
}

/// Ed25519 keypairs seeded from the OS CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct SolanaKeyGenerator;

impl SolanaKeyGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl KeySource for SolanaKeyGenerator {
    fn generate(&self) -> Result<GeneratedWallet, KeyGenError> {
        let mut seed = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| KeyGenError::Entropy(e.to_string()))?;

        let keypair =
            keypair_from_seed(&seed).map_err(|e| KeyGenError::Derivation(e.to_string()))?;
        seed.fill(0);

        Ok(GeneratedWallet {
            address: keypair.pubkey().to_string(),
            secret: Secret::new(keypair.to_base58_string()),
        })
    }
}

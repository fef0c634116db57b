//! Entropy guard
//!
//! Checks the kernel's available-entropy estimate before any signing and,
//! when it is below the configured minimum, mixes bytes from an external
//! randomness provider (KMS in production) into the pool.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::Options;
use crate::error::{IssuerError, Result};

pub const ENTROPY_AVAIL_PATH: &str = "/proc/sys/kernel/random/entropy_avail";
pub const URANDOM_PATH: &str = "/dev/urandom";

/// The OS randomness pool.
pub trait EntropyPool: Send + Sync {
    /// Current available-entropy estimate in bits.
    fn available_bits(&self) -> Result<u32>;

    /// Mix `seed` into the pool.
    fn reseed(&self, seed: &[u8]) -> Result<()>;
}

/// Source of random bytes independent of the local pool.
#[async_trait]
pub trait RandomnessProvider: Send + Sync {
    async fn generate_random(&self, number_of_bytes: u32) -> Result<Vec<u8>>;
}

// =============================================================================
// OS pool
// =============================================================================

/// Linux entropy pool via procfs and `/dev/urandom`.
#[derive(Debug, Clone)]
pub struct OsEntropyPool {
    entropy_avail: PathBuf,
    urandom: PathBuf,
}

impl OsEntropyPool {
    pub fn new() -> Self {
        Self::with_paths(ENTROPY_AVAIL_PATH, URANDOM_PATH)
    }

    pub fn with_paths(entropy_avail: impl Into<PathBuf>, urandom: impl Into<PathBuf>) -> Self {
        Self {
            entropy_avail: entropy_avail.into(),
            urandom: urandom.into(),
        }
    }
}

impl Default for OsEntropyPool {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropyPool for OsEntropyPool {
    fn available_bits(&self) -> Result<u32> {
        let raw = std::fs::read_to_string(&self.entropy_avail).map_err(|e| {
            IssuerError::Entropy(format!(
                "cannot read {}: {e}",
                self.entropy_avail.display()
            ))
        })?;

        raw.trim().parse().map_err(|e| {
            IssuerError::Entropy(format!(
                "unparseable entropy estimate {:?}: {e}",
                raw.trim()
            ))
        })
    }

    fn reseed(&self, seed: &[u8]) -> Result<()> {
        let mut urandom = std::fs::OpenOptions::new()
            .write(true)
            .open(&self.urandom)
            .map_err(|e| {
                IssuerError::Entropy(format!("cannot open {}: {e}", self.urandom.display()))
            })?;

        urandom
            .write_all(seed)
            .and_then(|_| urandom.flush())
            .map_err(|e| {
                IssuerError::Entropy(format!("cannot write {}: {e}", self.urandom.display()))
            })
    }
}

// =============================================================================
// Guard
// =============================================================================

pub struct EntropyGuard {
    pool: Arc<dyn EntropyPool>,
    provider: Arc<dyn RandomnessProvider>,
}

impl EntropyGuard {
    pub fn new(pool: Arc<dyn EntropyPool>, provider: Arc<dyn RandomnessProvider>) -> Self {
        Self { pool, provider }
    }

    /// Reseed the pool if it holds fewer than `entropy_minimum_bits`.
    pub async fn ensure(&self, options: &Options) -> Result<()> {
        let entropy = self.pool.available_bits()?;
        debug!(entropy, "system entropy");

        if entropy >= options.entropy_minimum_bits {
            return Ok(());
        }

        info!(
            entropy,
            entropy_minimum = options.entropy_minimum_bits,
            "System entropy is below the minimum, seeding the pool from the randomness provider"
        );

        let seed = self
            .provider
            .generate_random(options.random_seed_bytes)
            .await?;

        if seed.len() != options.random_seed_bytes as usize {
            return Err(IssuerError::Entropy(format!(
                "randomness provider returned {} bytes, expected {}",
                seed.len(),
                options.random_seed_bytes
            )));
        }

        self.pool.reseed(&seed)
    }
}

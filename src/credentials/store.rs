//! Process-lifetime credential store.
//!
//! The embedding process creates one [`CredentialStore`] and keeps it for as
//! long as the execution environment lives, so repeated invocations reuse the
//! decrypted CA key. Calls carrying explicit overrides build a private
//! context and never touch the shared slot.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::DEFAULT_CONFIG_FILE;
use crate::error::{IssuerError, Result};

use super::context::SigningContext;
use super::loader::SigningContextLoader;

/// Per-invocation overrides. Any value present bypasses the shared slot.
#[derive(Default)]
pub struct CacheOverrides {
    pub ca_private_key_password: Option<Zeroizing<String>>,
    pub config_file: Option<PathBuf>,
}

impl CacheOverrides {
    pub fn is_isolated(&self) -> bool {
        self.ca_private_key_password.is_some() || self.config_file.is_some()
    }
}

/// Counters for the shared slot.
#[derive(Debug, Default)]
pub struct StoreStats {
    pub hits: AtomicU64,
    pub constructions: AtomicU64,
    pub isolated: AtomicU64,
}

/// Snapshot of store statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatsSnapshot {
    pub hits: u64,
    pub constructions: u64,
    pub isolated: u64,
}

pub struct CredentialStore {
    loader: Arc<dyn SigningContextLoader>,

    /// Directory holding the default deploy file; `None` means the working
    /// directory at the time the file is needed
    config_dir: Option<PathBuf>,

    /// Shared slot; the lock is held across construction
    slot: Mutex<Option<Arc<SigningContext>>>,

    stats: StoreStats,
}

impl CredentialStore {
    /// Store whose default deploy file lives in the process working directory.
    ///
    /// The directory is resolved when a context is built, not here.
    pub fn new(loader: Arc<dyn SigningContextLoader>) -> Self {
        Self::build(loader, None)
    }

    pub fn with_config_dir(loader: Arc<dyn SigningContextLoader>, config_dir: PathBuf) -> Self {
        Self::build(loader, Some(config_dir))
    }

    fn build(loader: Arc<dyn SigningContextLoader>, config_dir: Option<PathBuf>) -> Self {
        Self {
            loader,
            config_dir,
            slot: Mutex::new(None),
            stats: StoreStats::default(),
        }
    }

    pub fn default_config_path(&self) -> Result<PathBuf> {
        let dir = match &self.config_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().map_err(|e| {
                IssuerError::Config(format!("cannot determine working directory: {e}"))
            })?,
        };
        Ok(dir.join(DEFAULT_CONFIG_FILE))
    }

    /// Get the signing context for this invocation.
    pub async fn get(&self, overrides: &CacheOverrides) -> Result<Arc<SigningContext>> {
        if overrides.is_isolated() {
            return self.load_isolated(overrides).await;
        }

        let mut slot = self.slot.lock().await;
        if let Some(context) = slot.as_ref() {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(context));
        }

        let path = self.default_config_path()?;
        debug!(config = %path.display(), "Shared signing context is cold, constructing");

        let context = match self.loader.load(None, &path).await {
            Ok(context) => Arc::new(context),
            Err(e) => {
                warn!(error = %e, "Signing context construction failed, slot left empty");
                return Err(e);
            }
        };

        *slot = Some(Arc::clone(&context));
        self.stats.constructions.fetch_add(1, Ordering::Relaxed);
        info!("Shared signing context cached");

        Ok(context)
    }

    async fn load_isolated(&self, overrides: &CacheOverrides) -> Result<Arc<SigningContext>> {
        let path = match &overrides.config_file {
            Some(path) => path.clone(),
            None => self.default_config_path()?,
        };
        let password = overrides.ca_private_key_password.as_deref().map(String::as_str);

        debug!(config = %path.display(), "Constructing isolated signing context");
        let context = self.loader.load(password, &path).await?;
        self.stats.isolated.fetch_add(1, Ordering::Relaxed);

        Ok(Arc::new(context))
    }

    /// Whether the shared slot holds a context.
    pub async fn is_warm(&self) -> bool {
        self.slot.lock().await.is_some()
    }

    pub fn stats(&self) -> StoreStatsSnapshot {
        StoreStatsSnapshot {
            hits: self.stats.hits.load(Ordering::Relaxed),
            constructions: self.stats.constructions.load(Ordering::Relaxed),
            isolated: self.stats.isolated.load(Ordering::Relaxed),
        }
    }
}

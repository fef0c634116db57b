//! CA credential management
//!
//! The CA private key is stored sealed in the deploy file (Argon2id +
//! ChaCha20-Poly1305) and decrypted into a [`SigningContext`] at most once
//! per execution environment.
//!
//! - [`CredentialStore`] owns the shared slot and the isolation rules
//! - [`SigningContextLoader`] is the decryption/config seam
//! - [`FileContextLoader`] is the production loader

pub mod context;
pub mod crypto;
pub mod loader;
pub mod store;

pub use context::{CaPrivateKey, SigningContext};
pub use loader::{seal_ca_key, unseal_ca_key, FileContextLoader, SigningContextLoader};
pub use store::{CacheOverrides, CredentialStore, StoreStatsSnapshot};

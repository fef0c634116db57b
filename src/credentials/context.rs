//! The warmed signing context: decrypted CA key plus resolved options.

use std::fmt;

use ed25519_dalek::SigningKey;
use zeroize::Zeroize;

use crate::config::Options;

use super::crypto::{openssh_public_key, PRIVATE_KEY_LEN};

/// Decrypted CA private key.
///
/// The key bytes are zeroized when dropped and never printed.
pub struct CaPrivateKey {
    key_bytes: [u8; PRIVATE_KEY_LEN],
}

impl CaPrivateKey {
    pub fn from_bytes(bytes: &[u8; PRIVATE_KEY_LEN]) -> Self {
        Self { key_bytes: *bytes }
    }

    /// Ed25519 signing key (reconstructed from bytes).
    pub fn signing_key(&self) -> SigningKey {
        SigningKey::from_bytes(&self.key_bytes)
    }
}

impl Drop for CaPrivateKey {
    fn drop(&mut self) {
        self.key_bytes.zeroize();
    }
}

impl fmt::Debug for CaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CaPrivateKey(<redacted>)")
    }
}

/// Everything a certificate signer needs, built once and never mutated.
#[derive(Debug)]
pub struct SigningContext {
    ca_private_key: CaPrivateKey,
    ca_public_key: String,
    options: Options,
}

impl SigningContext {
    pub fn new(ca_private_key: CaPrivateKey, comment: &str, options: Options) -> Self {
        let ca_public_key = openssh_public_key(&ca_private_key.signing_key().verifying_key(), comment);
        Self {
            ca_private_key,
            ca_public_key,
            options,
        }
    }

    pub fn ca_private_key(&self) -> &CaPrivateKey {
        &self.ca_private_key
    }

    /// CA public key in OpenSSH form.
    pub fn ca_public_key(&self) -> &str {
        &self.ca_public_key
    }

    pub fn options(&self) -> &Options {
        &self.options
    }
}

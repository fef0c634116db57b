//! Building a [`SigningContext`] from a deploy file.

use std::path::Path;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::config::{CaKeyConfig, DeployConfig};
use crate::error::{IssuerError, Result};

use super::context::{CaPrivateKey, SigningContext};
use super::crypto::{
    openssh_public_key, seal_private_key, unseal_private_key, SealedKey, NONCE_LEN, SALT_LEN,
};

/// Decrypts the CA key and resolves configuration.
#[async_trait]
pub trait SigningContextLoader: Send + Sync {
    /// `password` overrides whatever password source the config names.
    async fn load(&self, password: Option<&str>, config_path: &Path) -> Result<SigningContext>;
}

/// Loader for TOML deploy files holding a sealed Ed25519 CA key.
#[derive(Debug, Default, Clone)]
pub struct FileContextLoader;

impl FileContextLoader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SigningContextLoader for FileContextLoader {
    async fn load(&self, password: Option<&str>, config_path: &Path) -> Result<SigningContext> {
        let config = DeployConfig::from_file(config_path)?;

        let password = match password {
            Some(p) => Zeroizing::new(p.to_string()),
            None => Zeroizing::new(std::env::var(&config.ca.password_env).map_err(|_| {
                IssuerError::CredentialConstruction(format!(
                    "CA key password not provided and {} is unset",
                    config.ca.password_env
                ))
            })?),
        };

        let private_key = unseal_ca_key(&config.ca, &password)?;
        let context = SigningContext::new(private_key, &config.ca.public_key_comment, config.options);

        info!(
            config = %config_path.display(),
            ca_public_key = %context.ca_public_key(),
            "Signing context constructed"
        );
        Ok(context)
    }
}

fn decode_field(name: &str, value: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(value)
        .map_err(|e| IssuerError::CredentialConstruction(format!("Invalid {name} encoding: {e}")))
}

fn decode_array<const N: usize>(name: &str, value: &str) -> Result<[u8; N]> {
    decode_field(name, value)?.try_into().map_err(|raw: Vec<u8>| {
        IssuerError::CredentialConstruction(format!(
            "Invalid {name} length: expected {N}, got {}",
            raw.len()
        ))
    })
}

/// Decrypt the `[ca]` section with `password`.
pub fn unseal_ca_key(ca: &CaKeyConfig, password: &str) -> Result<CaPrivateKey> {
    let sealed = SealedKey {
        ciphertext: decode_field("ciphertext", &ca.encrypted_private_key)?,
        salt: decode_array::<SALT_LEN>("salt", &ca.key_derivation_salt)?,
        nonce: decode_array::<NONCE_LEN>("nonce", &ca.encryption_nonce)?,
    };

    let seed = unseal_private_key(&sealed, password.as_bytes())?;
    Ok(CaPrivateKey::from_bytes(&seed))
}

/// Generate a fresh CA keypair and seal it with `password`.
///
/// Returns the `[ca]` section to store and the public key in OpenSSH form.
pub fn seal_ca_key(password: &str, comment: &str) -> Result<(CaKeyConfig, String)> {
    let signing_key = SigningKey::generate(&mut OsRng);
    let seed = Zeroizing::new(signing_key.to_bytes());
    let sealed = seal_private_key(&seed, password.as_bytes())?;

    let ca = CaKeyConfig {
        encrypted_private_key: BASE64.encode(&sealed.ciphertext),
        key_derivation_salt: BASE64.encode(sealed.salt),
        encryption_nonce: BASE64.encode(sealed.nonce),
        password_env: "CA_PRIVATE_KEY_PASSWORD".to_string(),
        public_key_comment: comment.to_string(),
    };
    let public_key = openssh_public_key(&signing_key.verifying_key(), comment);

    debug!(public_key = %public_key, "Sealed new CA keypair");

    Ok((ca, public_key))
}

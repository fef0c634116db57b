//! Deploy configuration
//!
//! A TOML file with an `[options]` table (runtime behaviour) and a `[ca]`
//! table (sealed CA key material). The file is read once per
//! [`SigningContext`](crate::credentials::SigningContext) construction and is
//! read-only afterwards.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{IssuerError, Result};
use crate::logging::{self, LogFormat};

/// File name looked up in the working directory when no override is given.
pub const DEFAULT_CONFIG_FILE: &str = "issuer_deploy.toml";

/// Placeholder substituted with a remote username in the group template.
pub const GROUP_TEMPLATE_PLACEHOLDER: &str = "{}";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default)]
    pub options: Options,
    pub ca: CaKeyConfig,
}

/// Runtime options resolved alongside the CA key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    /// Log level name (trace, debug, info, warn/warning, error/critical, off)
    #[serde(default = "default_logging_level")]
    pub logging_level: String,

    /// Output format for the log subscriber
    #[serde(default)]
    pub log_format: LogFormat,

    /// Reseed the OS pool when available entropy drops below this many bits
    #[serde(default = "default_entropy_minimum_bits")]
    pub entropy_minimum_bits: u32,

    /// How many random bytes to request from the randomness provider
    #[serde(default = "default_random_seed_bytes")]
    pub random_seed_bytes: u32,

    /// Require the bastion user to belong to a group per remote username
    #[serde(default)]
    pub remote_usernames_against_iam_groups: bool,

    /// Group name template, `{}` is replaced by the remote username
    #[serde(default = "default_group_template")]
    pub iam_group_name_validation_format: String,

    /// Return the CA public key and trust lines with each certificate
    #[serde(default = "default_true")]
    pub include_ca_public_key: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            logging_level: default_logging_level(),
            log_format: LogFormat::default(),
            entropy_minimum_bits: default_entropy_minimum_bits(),
            random_seed_bytes: default_random_seed_bytes(),
            remote_usernames_against_iam_groups: false,
            iam_group_name_validation_format: default_group_template(),
            include_ca_public_key: true,
        }
    }
}

/// Sealed CA private key, as produced by
/// [`seal_ca_key`](crate::credentials::seal_ca_key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaKeyConfig {
    /// Encrypted Ed25519 private key (base64)
    pub encrypted_private_key: String,

    /// Argon2id salt (base64)
    pub key_derivation_salt: String,

    /// ChaCha20-Poly1305 nonce (base64)
    pub encryption_nonce: String,

    /// Environment variable holding the key password
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// Comment appended to the OpenSSH form of the CA public key
    #[serde(default = "default_public_key_comment")]
    pub public_key_comment: String,
}

fn default_logging_level() -> String { "INFO".to_string() }
fn default_entropy_minimum_bits() -> u32 { 2048 }
fn default_random_seed_bytes() -> u32 { 256 }
fn default_group_template() -> String { "ssh-{}".to_string() }
fn default_password_env() -> String { "CA_PRIVATE_KEY_PASSWORD".to_string() }
fn default_public_key_comment() -> String { "ssh-cert-issuer".to_string() }
fn default_true() -> bool { true }

impl DeployConfig {
    /// Read and validate a deploy file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            IssuerError::CredentialConstruction(format!(
                "cannot read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate deploy config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: DeployConfig = toml::from_str(content).map_err(|e| {
            IssuerError::CredentialConstruction(format!("malformed config: {e}"))
        })?;
        config.options.validate()?;
        Ok(config)
    }
}

impl Options {
    /// Reject values that would only fail later, mid-request.
    pub fn validate(&self) -> Result<()> {
        logging::parse_level(&self.logging_level)?;

        if !self
            .iam_group_name_validation_format
            .contains(GROUP_TEMPLATE_PLACEHOLDER)
        {
            return Err(IssuerError::Config(format!(
                "iam_group_name_validation_format must contain {}: {:?}",
                GROUP_TEMPLATE_PLACEHOLDER, self.iam_group_name_validation_format
            )));
        }

        if self.random_seed_bytes == 0 {
            return Err(IssuerError::Config(
                "random_seed_bytes must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Group a bastion user must belong to for `remote_username`.
    pub fn required_group(&self, remote_username: &str) -> String {
        self.iam_group_name_validation_format
            .replacen(GROUP_TEMPLATE_PLACEHOLDER, remote_username, 1)
    }
}

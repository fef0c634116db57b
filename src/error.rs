//! Error types for the issuance pipeline
//!
//! Every failure that can stop a request is an [`IssuerError`]. Errors travel
//! unmodified up to the handler boundary, where [`IssuerError::kind`] becomes
//! the `errorType` of the structured error payload.

use thiserror::Error;

/// Errors raised while handling a signing request.
#[derive(Debug, Error)]
pub enum IssuerError {
    /// Invalid or missing configuration value (e.g. unknown logging level)
    #[error("{0}")]
    Config(String),

    /// The entropy pool could not be read or reseeded
    #[error("{0}")]
    Entropy(String),

    /// CA key decryption or deploy config load failed
    #[error("{0}")]
    CredentialConstruction(String),

    /// Request shape does not match exactly one known variant
    #[error("{0}")]
    Classification(String),

    /// Group membership service was unreachable or returned garbage
    #[error("{0}")]
    GroupDirectory(String),

    /// The external certificate signer failed
    #[error("{0}")]
    Signing(String),
}

impl IssuerError {
    /// Wire name of this error, used as `errorType` in responses.
    pub fn kind(&self) -> &'static str {
        match self {
            IssuerError::Config(_) => "ConfigError",
            IssuerError::Entropy(_) => "EntropyError",
            IssuerError::CredentialConstruction(_) => "CredentialConstructionError",
            IssuerError::Classification(_) => "ClassificationError",
            IssuerError::GroupDirectory(_) => "GroupDirectoryError",
            IssuerError::Signing(_) => "SigningError",
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IssuerError>;

//! ssh-cert-issuer - request-handling core for short-lived SSH certificates
//!
//! Given a host or user signing request, the core decides whether the caller
//! may have a certificate, keeps the decrypted CA key warm across invocations
//! of the same execution environment, and makes sure the OS entropy pool is
//! healthy before anything is signed.
//!
//! ## Pieces
//!
//! - **Router**: picks the host or user handler from the request shape
//! - **Credentials**: sealed CA key, decrypted once into a shared context
//! - **Entropy**: reseeds the kernel pool from KMS when it runs low
//! - **Access**: remote usernames checked against IAM group membership
//! - **Response**: success / error payloads
//!
//! Certificate encoding and signing are supplied by the embedder through
//! [`CertificateSigner`].

pub mod access;
pub mod aws;
pub mod config;
pub mod credentials;
pub mod entropy;
pub mod error;
pub mod handler;
pub mod logging;
pub mod request;
pub mod response;
pub mod router;

pub use access::{AccessValidator, AuthorizationDecision, GroupDirectory};
pub use config::{DeployConfig, Options};
pub use credentials::{CacheOverrides, CredentialStore, FileContextLoader, SigningContext};
pub use entropy::{EntropyGuard, EntropyPool, OsEntropyPool, RandomnessProvider};
pub use error::{IssuerError, Result};
pub use handler::{CertificateSigner, InvocationOptions, IssuerServices, RequestHandler};
pub use request::{HostRequest, InboundRequest, UserRequest};
pub use response::Response;
pub use router::RequestRouter;

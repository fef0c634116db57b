//! Host and user request handlers
//!
//! Each handler runs the full pipeline on its own:
//!
//! 1. fetch the signing context from the credential store
//! 2. apply the configured log level
//! 3. convert the raw request into its typed variant
//! 4. guard the entropy pool
//! 5. authorize remote usernames (user requests only)
//! 6. hand the request to the certificate signer
//!
//! Every failure becomes a structured error response here; nothing below
//! this layer formats responses.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn, Instrument};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::access::{AccessValidator, AuthorizationDecision};
use crate::credentials::{CacheOverrides, CredentialStore, SigningContext};
use crate::entropy::EntropyGuard;
use crate::error::Result;
use crate::logging;
use crate::request::{HostRequest, InboundRequest, UserRequest};
use crate::response::{Response, VALIDATION_ERROR};

/// Produces certificates. Encoding and the signing primitive live behind
/// this trait.
#[async_trait]
pub trait CertificateSigner: Send + Sync {
    async fn sign_host(&self, request: &HostRequest, context: &SigningContext) -> Result<String>;

    async fn sign_user(&self, request: &UserRequest, context: &SigningContext) -> Result<String>;
}

/// Knobs a caller (usually a test harness) can set per invocation.
pub struct InvocationOptions {
    /// Decrypt with this password instead of the configured source
    pub ca_private_key_password: Option<Zeroizing<String>>,

    /// Load this deploy file instead of the default one
    pub config_file: Option<PathBuf>,

    /// Run the entropy guard. Only test harnesses turn this off.
    pub entropy_check: bool,
}

impl Default for InvocationOptions {
    fn default() -> Self {
        Self {
            ca_private_key_password: None,
            config_file: None,
            entropy_check: true,
        }
    }
}

impl InvocationOptions {
    fn cache_overrides(&self) -> CacheOverrides {
        CacheOverrides {
            ca_private_key_password: self.ca_private_key_password.clone(),
            config_file: self.config_file.clone(),
        }
    }
}

/// Something that turns a raw request into a response.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: InboundRequest, invocation: &InvocationOptions) -> Response;
}

/// Collaborators shared by both handlers.
pub struct IssuerServices {
    pub store: Arc<CredentialStore>,
    pub entropy: Arc<EntropyGuard>,
    pub validator: Arc<AccessValidator>,
    pub signer: Arc<dyn CertificateSigner>,
}

impl IssuerServices {
    async fn prepare(&self, invocation: &InvocationOptions) -> Result<Arc<SigningContext>> {
        let context = self.store.get(&invocation.cache_overrides()).await?;
        logging::apply(context.options())?;
        Ok(context)
    }

    async fn guard_entropy(
        &self,
        context: &SigningContext,
        invocation: &InvocationOptions,
    ) -> Result<()> {
        if invocation.entropy_check {
            self.entropy.ensure(context.options()).await
        } else {
            warn!("Entropy check disabled for this invocation");
            Ok(())
        }
    }

    fn success(&self, certificate: String, context: &SigningContext) -> Response {
        let ca_public_key = context
            .options()
            .include_ca_public_key
            .then(|| context.ca_public_key());
        Response::success(certificate, ca_public_key)
    }
}

// =============================================================================
// Host
// =============================================================================

pub struct HostRequestHandler {
    services: Arc<IssuerServices>,
}

impl HostRequestHandler {
    pub fn new(services: Arc<IssuerServices>) -> Self {
        Self { services }
    }

    async fn run(&self, raw: InboundRequest, invocation: &InvocationOptions) -> Result<Response> {
        let context = self.services.prepare(invocation).await?;
        let request = HostRequest::try_from(&raw)?;

        self.services.guard_entropy(&context, invocation).await?;

        let certificate = self.services.signer.sign_host(&request, &context).await?;
        info!(hostnames = %request.hostnames, "Issued host certificate");

        Ok(self.services.success(certificate, &context))
    }
}

#[async_trait]
impl RequestHandler for HostRequestHandler {
    async fn handle(&self, request: InboundRequest, invocation: &InvocationOptions) -> Response {
        let span = tracing::info_span!("host_request", request_id = %Uuid::new_v4());
        async move {
            self.run(request, invocation).await.unwrap_or_else(|e| {
                warn!(error_type = e.kind(), error = %e, "Host request failed");
                e.into()
            })
        }
        .instrument(span)
        .await
    }
}

// =============================================================================
// User
// =============================================================================

pub struct UserRequestHandler {
    services: Arc<IssuerServices>,
}

impl UserRequestHandler {
    pub fn new(services: Arc<IssuerServices>) -> Self {
        Self { services }
    }

    async fn run(&self, raw: InboundRequest, invocation: &InvocationOptions) -> Result<Response> {
        let context = self.services.prepare(invocation).await?;
        let request = UserRequest::try_from(&raw)?;

        self.services.guard_entropy(&context, invocation).await?;

        let decision = self
            .services
            .validator
            .validate(context.options(), &request)
            .await?;
        if let AuthorizationDecision::Denied { reason } = decision {
            return Ok(Response::error(VALIDATION_ERROR, reason));
        }

        let certificate = self.services.signer.sign_user(&request, &context).await?;
        info!(
            bastion_user = %request.bastion_user,
            remote_usernames = %request.remote_usernames.joined(),
            "Issued user certificate"
        );

        Ok(self.services.success(certificate, &context))
    }
}

#[async_trait]
impl RequestHandler for UserRequestHandler {
    async fn handle(&self, request: InboundRequest, invocation: &InvocationOptions) -> Response {
        let span = tracing::info_span!("user_request", request_id = %Uuid::new_v4());
        async move {
            self.run(request, invocation).await.unwrap_or_else(|e| {
                warn!(error_type = e.kind(), error = %e, "User request failed");
                e.into()
            })
        }
        .instrument(span)
        .await
    }
}

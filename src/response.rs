//! Response payloads
//!
//! The success payload carries the certificate and, optionally, the CA public
//! key with `known_hosts` trust lines for the deployment region. The error
//! payload is the only user-visible error channel.

use serde::{Deserialize, Serialize};

use crate::error::IssuerError;

/// Environment variable naming the deployment region.
pub const REGION_ENV: &str = "AWS_REGION";

/// Error type reported when authorization is denied.
pub const VALIDATION_ERROR: &str = "ValidationError";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Success(SuccessPayload),
    Error(ErrorPayload),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessPayload {
    pub certificate: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_pub_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ca: Option<[String; 2]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub error_type: String,
    pub error_message: String,
}

impl Response {
    /// Success response, trust lines scoped to `AWS_REGION` as set right now.
    pub fn success(certificate: impl Into<String>, ca_public_key: Option<&str>) -> Self {
        let region = std::env::var(REGION_ENV).ok();
        Self::success_in_region(certificate, ca_public_key, region.as_deref())
    }

    /// Success response for an explicit region. A missing region leaves the
    /// region segment of the trust lines blank.
    pub fn success_in_region(
        certificate: impl Into<String>,
        ca_public_key: Option<&str>,
        region: Option<&str>,
    ) -> Self {
        let region = region.unwrap_or_default();
        let (ca_pub_key, client_ca) = match ca_public_key {
            Some(key) => (
                Some(key.to_string()),
                Some([
                    format!("@cert-authority *.{region}.compute.amazonaws.com"),
                    format!("@cert-authority *.{region}.compute.internal"),
                ]),
            ),
            None => (None, None),
        };

        Response::Success(SuccessPayload {
            certificate: certificate.into(),
            ca_pub_key,
            client_ca,
        })
    }

    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Response::Error(ErrorPayload {
            error_type: kind.into(),
            error_message: message.into(),
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    pub fn error_type(&self) -> Option<&str> {
        match self {
            Response::Error(e) => Some(&e.error_type),
            Response::Success(_) => None,
        }
    }
}

impl From<IssuerError> for Response {
    fn from(err: IssuerError) -> Self {
        Response::error(err.kind(), err.to_string())
    }
}

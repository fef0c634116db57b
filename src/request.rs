//! Inbound signing requests
//!
//! The wire shape is a single JSON object whose field presence decides the
//! variant. [`InboundRequest`] is that raw shape; handlers convert it once
//! into a typed [`HostRequest`] or [`UserRequest`] and reject anything that
//! does not fit exactly one of them.

use serde::{Deserialize, Serialize};

use crate::error::{IssuerError, Result};

/// Raw request as received from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostnames: Option<String>,

    #[serde(default, alias = "remote_usernames", skip_serializing_if = "Option::is_none")]
    pub remote_usernames: Option<String>,

    #[serde(default, alias = "bastion_user", skip_serializing_if = "Option::is_none")]
    pub bastion_user: Option<String>,

    #[serde(default, alias = "public_key_to_sign")]
    pub public_key_to_sign: String,
}

/// Which handler a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Host,
    User,
}

impl InboundRequest {
    /// A non-null `hostnames` field selects the host path.
    pub fn kind(&self) -> RequestKind {
        if self.hostnames.is_some() {
            RequestKind::Host
        } else {
            RequestKind::User
        }
    }
}

/// Request for a host certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRequest {
    /// Comma-separated host principals, passed through to the signer
    pub hostnames: String,
    pub public_key_to_sign: String,
}

/// Request for a user certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRequest {
    pub remote_usernames: RemoteUsernames,
    pub bastion_user: String,
    pub public_key_to_sign: String,
}

/// Ordered, de-duplicated set of target account names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteUsernames(Vec<String>);

impl RemoteUsernames {
    /// Split the comma-separated wire value. Duplicates keep their first
    /// position; empty entries are rejected.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut names: Vec<String> = Vec::new();
        for name in raw.split(',') {
            if name.is_empty() {
                return Err(IssuerError::Classification(format!(
                    "remoteUsernames contains an empty entry: {raw:?}"
                )));
            }
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        Ok(Self(names))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Wire form, comma-joined.
    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}

fn require_public_key(raw: &InboundRequest) -> Result<String> {
    if raw.public_key_to_sign.is_empty() {
        return Err(IssuerError::Classification(
            "publicKeyToSign is required".to_string(),
        ));
    }
    Ok(raw.public_key_to_sign.clone())
}

impl TryFrom<&InboundRequest> for HostRequest {
    type Error = IssuerError;

    fn try_from(raw: &InboundRequest) -> Result<Self> {
        let hostnames = match raw.hostnames.as_deref() {
            Some(h) if !h.is_empty() => h.to_string(),
            Some(_) => {
                return Err(IssuerError::Classification(
                    "hostnames must not be empty".to_string(),
                ))
            }
            None => {
                return Err(IssuerError::Classification(
                    "host request without hostnames".to_string(),
                ))
            }
        };

        if raw.remote_usernames.is_some() || raw.bastion_user.is_some() {
            return Err(IssuerError::Classification(
                "ambiguous request: hostnames combined with user fields".to_string(),
            ));
        }

        Ok(Self {
            hostnames,
            public_key_to_sign: require_public_key(raw)?,
        })
    }
}

impl TryFrom<&InboundRequest> for UserRequest {
    type Error = IssuerError;

    fn try_from(raw: &InboundRequest) -> Result<Self> {
        if raw.hostnames.is_some() {
            return Err(IssuerError::Classification(
                "user request must not carry hostnames".to_string(),
            ));
        }

        let remote_usernames = raw
            .remote_usernames
            .as_deref()
            .ok_or_else(|| IssuerError::Classification("remoteUsernames is required".into()))?;
        let bastion_user = match raw.bastion_user.as_deref() {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => {
                return Err(IssuerError::Classification(
                    "bastionUser is required".to_string(),
                ))
            }
        };

        Ok(Self {
            remote_usernames: RemoteUsernames::parse(remote_usernames)?,
            bastion_user,
            public_key_to_sign: require_public_key(raw)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIExample user@example";

    fn user_raw(remotes: &str) -> InboundRequest {
        InboundRequest {
            remote_usernames: Some(remotes.to_string()),
            bastion_user: Some("alice".to_string()),
            public_key_to_sign: KEY.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_kind_by_hostnames_presence() {
        let host: InboundRequest = serde_json::from_value(json!({
            "hostnames": "host.example.com",
            "publicKeyToSign": KEY,
        }))
        .unwrap();
        assert_eq!(host.kind(), RequestKind::Host);

        let user: InboundRequest = serde_json::from_value(json!({
            "remoteUsernames": "user",
            "bastionUser": "user",
            "publicKeyToSign": KEY,
        }))
        .unwrap();
        assert_eq!(user.kind(), RequestKind::User);

        let null_hosts: InboundRequest = serde_json::from_value(json!({
            "hostnames": null,
            "publicKeyToSign": KEY,
        }))
        .unwrap();
        assert_eq!(null_hosts.kind(), RequestKind::User);
    }

    #[test]
    fn test_snake_case_aliases() {
        let raw: InboundRequest = serde_json::from_value(json!({
            "remote_usernames": "root",
            "bastion_user": "bob",
            "public_key_to_sign": KEY,
        }))
        .unwrap();
        let request = UserRequest::try_from(&raw).unwrap();
        assert_eq!(request.bastion_user, "bob");
        assert_eq!(request.remote_usernames.joined(), "root");
    }

    #[test]
    fn test_remote_usernames_ordered_and_deduplicated() {
        let names = RemoteUsernames::parse("bob,alice,bob,carol").unwrap();
        let collected: Vec<&str> = names.iter().collect();
        assert_eq!(collected, vec!["bob", "alice", "carol"]);
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_remote_usernames_empty_entry_rejected() {
        assert!(RemoteUsernames::parse("alice,,bob").is_err());
        assert!(RemoteUsernames::parse("").is_err());
    }

    #[test]
    fn test_user_request_requires_bastion_user() {
        let mut raw = user_raw("alice");
        raw.bastion_user = None;
        let err = UserRequest::try_from(&raw).unwrap_err();
        assert_eq!(err.kind(), "ClassificationError");
    }

    #[test]
    fn test_neither_shape_is_classification_error() {
        let raw = InboundRequest {
            public_key_to_sign: KEY.to_string(),
            ..Default::default()
        };
        assert_eq!(raw.kind(), RequestKind::User);
        assert!(UserRequest::try_from(&raw).is_err());
    }

    #[test]
    fn test_host_with_user_fields_is_ambiguous() {
        let mut raw = user_raw("alice");
        raw.hostnames = Some("host.example.com".to_string());
        assert_eq!(raw.kind(), RequestKind::Host);

        let err = HostRequest::try_from(&raw).unwrap_err();
        assert!(err.to_string().contains("ambiguous"));
    }

    #[test]
    fn test_missing_public_key() {
        let raw = InboundRequest {
            hostnames: Some("host.example.com".to_string()),
            ..Default::default()
        };
        assert!(HostRequest::try_from(&raw).is_err());
    }
}

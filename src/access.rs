//! Remote username authorization
//!
//! A bastion user may only request certificates for remote usernames whose
//! derived group (from `iam_group_name_validation_format`) they belong to.
//! The check fails closed and stops at the first missing group.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Options;
use crate::error::Result;
use crate::request::UserRequest;

/// Group membership lookup.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    async fn list_groups_for_user(&self, user: &str) -> Result<HashSet<String>>;
}

/// Outcome of an authorization check. Computed per request, never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationDecision {
    Authorized,
    Denied { reason: String },
}

impl AuthorizationDecision {
    pub fn is_authorized(&self) -> bool {
        matches!(self, AuthorizationDecision::Authorized)
    }
}

impl fmt::Display for AuthorizationDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorizationDecision::Authorized => write!(f, "authorized"),
            AuthorizationDecision::Denied { reason } => write!(f, "denied: {reason}"),
        }
    }
}

pub struct AccessValidator {
    directory: Arc<dyn GroupDirectory>,
}

impl AccessValidator {
    pub fn new(directory: Arc<dyn GroupDirectory>) -> Self {
        Self { directory }
    }

    pub async fn validate(
        &self,
        options: &Options,
        request: &UserRequest,
    ) -> Result<AuthorizationDecision> {
        if !options.remote_usernames_against_iam_groups {
            return Ok(AuthorizationDecision::Authorized);
        }

        let groups = self
            .directory
            .list_groups_for_user(&request.bastion_user)
            .await?;

        for remote in request.remote_usernames.iter() {
            let required_group = options.required_group(remote);
            if !groups.contains(&required_group) {
                warn!(
                    bastion_user = %request.bastion_user,
                    remote_username = remote,
                    required_group = %required_group,
                    "Remote username rejected, bastion user lacks group"
                );
                return Ok(AuthorizationDecision::Denied {
                    reason: format!(
                        "user {} is not in the {} iam group",
                        request.bastion_user, required_group
                    ),
                });
            }
            debug!(remote_username = remote, required_group = %required_group, "group present");
        }

        Ok(AuthorizationDecision::Authorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IssuerError;
    use crate::request::RemoteUsernames;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StaticDirectory {
        groups: HashSet<String>,
        lookups: AtomicU32,
    }

    impl StaticDirectory {
        fn new(groups: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                groups: groups.iter().map(|g| g.to_string()).collect(),
                lookups: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl GroupDirectory for StaticDirectory {
        async fn list_groups_for_user(&self, _user: &str) -> Result<HashSet<String>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.groups.clone())
        }
    }

    struct UnreachableDirectory;

    #[async_trait]
    impl GroupDirectory for UnreachableDirectory {
        async fn list_groups_for_user(&self, _user: &str) -> Result<HashSet<String>> {
            Err(IssuerError::GroupDirectory("connection refused".into()))
        }
    }

    fn request(remotes: &str) -> UserRequest {
        UserRequest {
            remote_usernames: RemoteUsernames::parse(remotes).unwrap(),
            bastion_user: "carol".to_string(),
            public_key_to_sign: "ssh-ed25519 AAAA".to_string(),
        }
    }

    fn enabled() -> Options {
        Options {
            remote_usernames_against_iam_groups: true,
            iam_group_name_validation_format: "ssh-{}".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_disabled_toggle_always_authorizes() {
        let directory = StaticDirectory::new(&[]);
        let validator = AccessValidator::new(directory.clone());

        let decision = validator
            .validate(&Options::default(), &request("root,admin"))
            .await
            .unwrap();

        assert_eq!(decision, AuthorizationDecision::Authorized);
        assert_eq!(directory.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_groups_present() {
        let validator = AccessValidator::new(StaticDirectory::new(&["ssh-alice", "ssh-bob", "other"]));
        let decision = validator.validate(&enabled(), &request("alice,bob")).await.unwrap();
        assert!(decision.is_authorized());
    }

    #[tokio::test]
    async fn test_missing_group_denied_naming_group() {
        let validator = AccessValidator::new(StaticDirectory::new(&["ssh-alice"]));
        let decision = validator.validate(&enabled(), &request("alice,bob")).await.unwrap();

        assert_eq!(
            decision,
            AuthorizationDecision::Denied {
                reason: "user carol is not in the ssh-bob iam group".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_first_missing_group_short_circuits() {
        let validator = AccessValidator::new(StaticDirectory::new(&["ssh-carol"]));
        let decision = validator
            .validate(&enabled(), &request("alice,bob,carol"))
            .await
            .unwrap();

        let AuthorizationDecision::Denied { reason } = decision else {
            panic!("expected denial");
        };
        assert!(reason.contains("ssh-alice"));
        assert!(!reason.contains("ssh-bob"));
    }

    #[tokio::test]
    async fn test_group_match_is_exact() {
        let validator = AccessValidator::new(StaticDirectory::new(&["ssh-alice-admins", "SSH-ALICE"]));
        let decision = validator.validate(&enabled(), &request("alice")).await.unwrap();
        assert!(!decision.is_authorized());
    }

    #[tokio::test]
    async fn test_directory_failure_propagates() {
        let validator = AccessValidator::new(Arc::new(UnreachableDirectory));
        let err = validator.validate(&enabled(), &request("alice")).await.unwrap_err();
        assert_eq!(err.kind(), "GroupDirectoryError");
    }
}

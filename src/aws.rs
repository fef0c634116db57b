//! AWS-backed collaborators
//!
//! - [`KmsRandomness`]: KMS `GenerateRandom` as the reseed source
//! - [`IamGroupDirectory`]: IAM `ListGroupsForUser` for authorization
//!
//! Neither retries on its own; the SDK's retry policy is the only one.

use std::collections::HashSet;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use tracing::{debug, instrument};

use crate::access::GroupDirectory;
use crate::entropy::RandomnessProvider;
use crate::error::{IssuerError, Result};

/// Shared SDK config for the region in `AWS_REGION` (or the default chain).
pub async fn load_sdk_config() -> aws_config::SdkConfig {
    aws_config::defaults(BehaviorVersion::latest()).load().await
}

// =============================================================================
// KMS
// =============================================================================

#[derive(Debug, Clone)]
pub struct KmsRandomness {
    client: aws_sdk_kms::Client,
}

impl KmsRandomness {
    pub fn new(client: aws_sdk_kms::Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(aws_sdk_kms::Client::new(config))
    }
}

#[async_trait]
impl RandomnessProvider for KmsRandomness {
    #[instrument(skip(self))]
    async fn generate_random(&self, number_of_bytes: u32) -> Result<Vec<u8>> {
        let count = i32::try_from(number_of_bytes).map_err(|_| {
            IssuerError::Entropy(format!("random_seed_bytes too large: {number_of_bytes}"))
        })?;

        let response = self
            .client
            .generate_random()
            .number_of_bytes(count)
            .send()
            .await
            .map_err(|e| {
                IssuerError::Entropy(format!(
                    "KMS GenerateRandom failed: {}",
                    aws_sdk_kms::error::DisplayErrorContext(&e)
                ))
            })?;

        let plaintext = response
            .plaintext()
            .ok_or_else(|| IssuerError::Entropy("KMS GenerateRandom returned no plaintext".into()))?;

        debug!(bytes = plaintext.as_ref().len(), "KMS random bytes received");
        Ok(plaintext.as_ref().to_vec())
    }
}

// =============================================================================
// IAM
// =============================================================================

#[derive(Debug, Clone)]
pub struct IamGroupDirectory {
    client: aws_sdk_iam::Client,
}

impl IamGroupDirectory {
    pub fn new(client: aws_sdk_iam::Client) -> Self {
        Self { client }
    }

    pub fn from_sdk_config(config: &aws_config::SdkConfig) -> Self {
        Self::new(aws_sdk_iam::Client::new(config))
    }
}

#[async_trait]
impl GroupDirectory for IamGroupDirectory {
    #[instrument(skip(self))]
    async fn list_groups_for_user(&self, user: &str) -> Result<HashSet<String>> {
        let mut pages = self
            .client
            .list_groups_for_user()
            .user_name(user)
            .into_paginator()
            .send();

        let mut groups = HashSet::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| {
                IssuerError::GroupDirectory(format!(
                    "IAM ListGroupsForUser failed for {user}: {}",
                    aws_sdk_iam::error::DisplayErrorContext(&e)
                ))
            })?;
            groups.extend(page.groups().iter().map(|g| g.group_name().to_string()));
        }

        debug!(user, groups = groups.len(), "IAM groups listed");
        Ok(groups)
    }
}

// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::time::SystemTime;

use aws_config::sts::AssumeRoleProvider;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use tokio::sync::RwLock;

use crate::configuration::{WorkflowConfig, sts_endpoint};
use crate::constants;
use crate::errors::SearchError;
use crate::models::Credential;

struct CachedCredential {
    credential: Credential,
    expires_at: Option<SystemTime>,
}

/// Holds the assumed-role session between requests. A session is reused until
/// it is within [`constants::CREDENTIAL_REFRESH_BUFFER`] of its expiry, then
/// the provider is asked to assume the role again.
pub struct CredentialCache {
    provider: SharedCredentialsProvider,
    cached: RwLock<Option<CachedCredential>>,
}

impl CredentialCache {
    pub fn new(provider: impl ProvideCredentials + 'static) -> Self {
        Self {
            provider: SharedCredentialsProvider::new(provider),
            cached: RwLock::new(None),
        }
    }

    pub async fn get_credentials(&self) -> Result<Credential, SearchError> {
        {
            let cache = self.cached.read().await;
            if let Some(ref cached) = *cache
                && self.is_valid(cached)
            {
                return Ok(cached.credential.clone());
            }
        }

        self.refresh().await
    }

    fn is_valid(&self, cached: &CachedCredential) -> bool {
        match cached.expires_at {
            Some(expires_at) => {
                SystemTime::now()
                    .checked_add(constants::CREDENTIAL_REFRESH_BUFFER)
                    .is_some_and(|threshold| threshold < expires_at)
            }
            // static sources, e.g. in tests
            None => true,
        }
    }

    async fn refresh(&self) -> Result<Credential, SearchError> {
        let mut cache = self.cached.write().await;

        // concurrent callers queue on the write lock; only the first assumes the role
        if let Some(ref cached) = *cache
            && self.is_valid(cached)
        {
            return Ok(cached.credential.clone());
        }

        let credentials = self.provider.provide_credentials().await?;
        let expires_at = credentials.expiry();

        tracing::debug!(
            "[ingestion] assumed role session valid until {:?}",
            expires_at
        );

        let credential: Credential = credentials.into();
        *cache = Some(CachedCredential {
            credential: credential.clone(),
            expires_at,
        });

        Ok(credential)
    }
}

/// Assumes the ingestion role through the regional STS endpoint, presenting
/// the external id. The source identity is the default chain of the execution
/// environment.
#[tracing::instrument(skip_all, fields(role = %config.role_arn))]
pub async fn assume_role_provider(config: &WorkflowConfig) -> AssumeRoleProvider {
    let region = Region::new(config.region.clone());
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(region.clone())
        .endpoint_url(sts_endpoint(&config.region))
        .load()
        .await;

    AssumeRoleProvider::builder(config.role_arn.clone())
        .external_id(config.external_id.clone())
        .session_name(constants::SESSION_NAME)
        .region(region)
        .configure(&sdk_config)
        .build()
        .await
}

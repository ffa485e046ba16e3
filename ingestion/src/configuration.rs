// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::fmt;

use aoss_provisioning::parameters::{
    DEFAULT_INDEX_NAME, is_valid_index_name, validate_aws_region,
};
use clap::Parser;

use crate::constants::{
    ENV_COLLECTION_ID, ENV_EXTERNAL_ID, ENV_INDEX_NAME, ENV_REGION, ENV_ROLE_ARN,
};
use crate::errors::ConfigError;

#[derive(Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct IngestOptions {
    #[arg(long, env("AOSS_REGION"))]
    pub region: Option<String>,
    #[arg(long, env("AOSS_COLLECTION_ID"))]
    pub collection_id: Option<String>,
    #[arg(long, env("INGESTION_ROLE_ARN"))]
    pub role_arn: Option<String>,
    #[arg(long, env("INGESTION_ROLE_EXTERNAL_ID"))]
    pub external_id: Option<String>,
    #[arg(long, default_value = "user-data", env("AOSS_INDEX_NAME"))]
    pub index_name: String,
    /// Overrides the collection endpoint derived from id and region.
    #[arg(long, env("AOSS_ENDPOINT"))]
    pub endpoint: Option<String>,
    /// Set by the Lambda service; its presence switches to serving invocations.
    #[arg(long, env("AWS_LAMBDA_RUNTIME_API"))]
    pub runtime_api: Option<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        IngestOptions {
            region: None,
            collection_id: None,
            role_arn: None,
            external_id: None,
            index_name: DEFAULT_INDEX_NAME.to_string(),
            endpoint: None,
            runtime_api: None,
        }
    }
}

// the external id is redacted
impl fmt::Debug for IngestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestOptions")
            .field("region", &self.region)
            .field("collection_id", &self.collection_id)
            .field("role_arn", &self.role_arn)
            .field("external_id", &self.external_id.as_ref().map(|_| "[REDACTED]"))
            .field("index_name", &self.index_name)
            .field("endpoint", &self.endpoint)
            .field("runtime_api", &self.runtime_api)
            .finish()
    }
}

fn required(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(ConfigError::Missing(name)),
    }
}

impl IngestOptions {
    /// Resolves the workflow configuration. Every required value is checked
    /// before anything touches the network; empty counts as absent.
    pub fn resolve(&self) -> Result<WorkflowConfig, ConfigError> {
        let region = required(&self.region, ENV_REGION)?;
        let collection_id = required(&self.collection_id, ENV_COLLECTION_ID)?;
        let role_arn = required(&self.role_arn, ENV_ROLE_ARN)?;
        let external_id = required(&self.external_id, ENV_EXTERNAL_ID)?;

        validate_aws_region(&region).map_err(|_| ConfigError::Invalid {
            name: ENV_REGION,
            reason: format!("{region:?} is not a region"),
        })?;

        if !is_valid_collection_id(&collection_id) {
            return Err(ConfigError::Invalid {
                name: ENV_COLLECTION_ID,
                reason: format!("{collection_id:?} is not a collection id"),
            });
        }

        let index_name = match self.index_name.trim() {
            "" => DEFAULT_INDEX_NAME.to_string(),
            name => name.to_string(),
        };
        if !is_valid_index_name(&index_name) {
            return Err(ConfigError::Invalid {
                name: ENV_INDEX_NAME,
                reason: format!("{index_name:?} is not an index name"),
            });
        }

        let endpoint = match self.endpoint.as_deref().map(str::trim) {
            Some(endpoint) if !endpoint.is_empty() => endpoint.trim_end_matches('/').to_string(),
            _ => collection_endpoint(&collection_id, &region),
        };

        Ok(WorkflowConfig {
            region,
            collection_id,
            role_arn,
            external_id,
            index_name,
            endpoint,
        })
    }
}

/// Collection ids become the first label of the endpoint host, so only
/// lowercase letters and digits are accepted.
pub fn is_valid_collection_id(collection_id: &str) -> bool {
    !collection_id.is_empty()
        && collection_id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// `https://{collection_id}.{region}.aoss.amazonaws.com`
pub fn collection_endpoint(collection_id: &str, region: &str) -> String {
    format!("https://{collection_id}.{region}.aoss.amazonaws.com")
}

/// `https://sts.{region}.amazonaws.com`
pub fn sts_endpoint(region: &str) -> String {
    format!("https://sts.{region}.amazonaws.com")
}

#[derive(Clone, PartialEq, Eq)]
pub struct WorkflowConfig {
    pub region: String,
    pub collection_id: String,
    pub role_arn: String,
    pub external_id: String,
    pub index_name: String,
    pub endpoint: String,
}

impl fmt::Debug for WorkflowConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowConfig")
            .field("region", &self.region)
            .field("collection_id", &self.collection_id)
            .field("role_arn", &self.role_arn)
            .field("external_id", &"[REDACTED]")
            .field("index_name", &self.index_name)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

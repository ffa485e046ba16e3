// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Stack outputs: the only channel between the two deployable units.
//!
//! Outputs files use the shape written by `cdk deploy --outputs-file`:
//!
//! ```json
//! { "IngestionStack": { "VpcEndpointId": "vpce-0123" } }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::BootstrapError;

pub const INGESTION_STACK: &str = "IngestionStack";
pub const SEARCH_STACK: &str = "SearchStack";

// ingestion stack
pub const VPC_ENDPOINT_ID: &str = "VpcEndpointId";
pub const SAMPLE_INGESTION_ROLE: &str = "SampleIngestionRole";
pub const TARGET_COLLECTION_ID: &str = "TargetCollectionId";

// search stack
pub const COLLECTION_ID: &str = "CollectionId";
pub const COLLECTION_ENDPOINT: &str = "CollectionEndpoint";
pub const INGESTION_ROLE_ARN: &str = "IngestionRoleArn";
pub const ALLOWED_VPC_ENDPOINT_ID: &str = "AllowedVpcEndpointId";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackOutputs {
    values: BTreeMap<String, String>,
}

impl StackOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns a non-empty output value or [`BootstrapError::MissingOutput`].
    pub fn require(&self, stack: &str, key: &str) -> Result<&str, BootstrapError> {
        match self.get(key) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(BootstrapError::MissingOutput {
                stack: stack.to_string(),
                key: key.to_string(),
            }),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StackOutputs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Outputs of every deployed stack, keyed by stack name.
pub type OutputsFile = BTreeMap<String, StackOutputs>;

/// Reads an outputs file. A missing file means nothing has been deployed yet.
pub async fn read_outputs_file(path: &Path) -> Result<OutputsFile, BootstrapError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("[bootstrap] no outputs file at {}", path.display());
            Ok(OutputsFile::new())
        }
        Err(err) => Err(BootstrapError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }),
    }
}

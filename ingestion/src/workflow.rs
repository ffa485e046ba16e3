// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! The signed-access workflow.
//!
//! ```text
//! resolve config -> establish identity -> ensure index -> write then read
//! ```
//!
//! Steps run strictly in sequence. Each returns a [`StepOutcome`] or a fatal
//! [`WorkflowError`]. Only ensuring the index may end in
//! [`StepOutcome::Skipped`]: a write against a missing index fails on its own.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::client::SignedClient;
use crate::configuration::{IngestOptions, WorkflowConfig};
use crate::credentials::{CredentialCache, assume_role_provider};
use crate::errors::WorkflowError;
use crate::models::{Person, index_mapping, match_query};
use crate::search::SearchApi;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum StepOutcome {
    Completed,
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowReport {
    pub index_name: String,
    pub ensure_index: StepOutcome,
    pub indexed: Value,
    pub search_response: Value,
}

/// Step 1.
pub fn resolve_config(options: &IngestOptions) -> Result<WorkflowConfig, WorkflowError> {
    let config = options.resolve()?;
    tracing::info!("[ingestion] {:?}", &config);
    Ok(config)
}

/// Step 2. Fetches credentials once so a rejected assume-role call fails here
/// rather than on the first request.
#[tracing::instrument(skip_all)]
pub async fn establish_identity(credentials: &CredentialCache) -> Result<StepOutcome, WorkflowError> {
    credentials
        .get_credentials()
        .await
        .map_err(|e| WorkflowError::AssumeRole(e.to_string()))?;
    tracing::info!("[ingestion] assumed ingestion role");
    Ok(StepOutcome::Completed)
}

/// Step 3. Creates the index unless it exists. Never fails: any error is
/// logged and reported as a skip.
#[tracing::instrument(skip(api))]
pub async fn ensure_index<S: SearchApi>(api: &S, index: &str) -> StepOutcome {
    match api.index_exists(index).await {
        Ok(true) => {
            tracing::info!("[ingestion] index {} already exists", index);
            return StepOutcome::Completed;
        }
        Ok(false) => {}
        Err(err) => {
            tracing::error!("[ingestion] unable to check index {}: {}", index, err);
            return StepOutcome::Skipped {
                reason: err.to_string(),
            };
        }
    }

    match api.create_index(index, &index_mapping()).await {
        Ok(response) => {
            tracing::info!("[ingestion] created index {}: {}", index, response);
            StepOutcome::Completed
        }
        Err(err) => {
            tracing::error!("[ingestion] unable to create index {}: {}", index, err);
            StepOutcome::Skipped {
                reason: err.to_string(),
            }
        }
    }
}

/// Step 4. Indexes the sample document, then queries it back by first name.
#[tracing::instrument(skip(api))]
pub async fn write_then_read<S: SearchApi>(
    api: &S,
    index: &str,
) -> Result<(Value, Value), WorkflowError> {
    let person = Person::sample()?;
    let document = serde_json::to_value(&person)
        .map_err(crate::errors::SearchError::from)?;

    let indexed = api.index_document(index, &document).await?;
    tracing::info!("[ingestion] indexed document: {}", indexed);

    let response = api
        .search(index, &match_query("firstName", &person.first_name))
        .await?;
    tracing::info!("[ingestion] search response: {}", response);

    Ok((indexed, response))
}

/// Steps 3 and 4 against any search backend.
pub async fn execute<S: SearchApi>(api: &S, index: &str) -> Result<WorkflowReport, WorkflowError> {
    let ensure = ensure_index(api, index).await;
    let (indexed, search_response) = write_then_read(api, index).await?;
    Ok(WorkflowReport {
        index_name: index.to_string(),
        ensure_index: ensure,
        indexed,
        search_response,
    })
}

/// Steps 2 to 4 with the given credential source.
pub async fn run_with_credentials(
    config: &WorkflowConfig,
    credentials: Arc<CredentialCache>,
) -> Result<WorkflowReport, WorkflowError> {
    establish_identity(&credentials).await?;
    let client = SignedClient::new(&config.endpoint, &config.region, credentials)?;
    execute(&client, &config.index_name).await
}

/// Steps 2 to 4, assuming the configured role.
pub async fn run(config: &WorkflowConfig) -> Result<WorkflowReport, WorkflowError> {
    let provider = assume_role_provider(config).await;
    run_with_credentials(config, Arc::new(CredentialCache::new(provider))).await
}

/// [`run`] bounded by `limit`.
pub async fn run_with_timeout(
    config: &WorkflowConfig,
    limit: Duration,
) -> Result<WorkflowReport, WorkflowError> {
    tokio::time::timeout(limit, run(config))
        .await
        .map_err(|_| WorkflowError::Timeout(limit))?
}

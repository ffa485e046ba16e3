// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::sync::Arc;

use anyhow::Result;
use aoss_ingestion::configuration::IngestOptions;
use aoss_ingestion::constants::WORKFLOW_TIMEOUT;
use aoss_ingestion::credentials::{CredentialCache, assume_role_provider};
use aoss_ingestion::runtime::{ErrorReport, RuntimeClient};
use aoss_ingestion::workflow;
use aoss_provisioning::telemetry;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let options = IngestOptions::parse();

    tracing::info!("[ingestion] {:?}", &options);

    match options.runtime_api.as_deref() {
        Some(api) => serve(&options, api).await,
        None => {
            let config = workflow::resolve_config(&options)?;
            let report = workflow::run_with_timeout(&config, WORKFLOW_TIMEOUT).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

/// Runs inside Lambda: configuration is resolved once at init, credentials
/// are cached across warm invocations.
async fn serve(options: &IngestOptions, api: &str) -> Result<()> {
    let runtime = RuntimeClient::new(api);

    let config = match workflow::resolve_config(options) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("[ingestion] init failed: {}", err);
            runtime.init_error(&ErrorReport::from(&err)).await?;
            return Err(err.into());
        }
    };

    let credentials = Arc::new(CredentialCache::new(assume_role_provider(&config).await));
    let config = &config;

    runtime
        .serve(|_invocation| {
            let credentials = credentials.clone();
            async move { workflow::run_with_credentials(config, credentials).await }
        })
        .await?;

    Ok(())
}

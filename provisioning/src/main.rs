// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::path::PathBuf;

use anyhow::Result;
use aoss_provisioning::bootstrap::{BootstrapStep, reconcile};
use aoss_provisioning::outputs::{INGESTION_STACK, SEARCH_STACK, read_outputs_file};
use aoss_provisioning::parameters::BootstrapState;
use aoss_provisioning::telemetry;
use clap::{ArgAction, Parser};

/// Applies one bootstrap reconciliation pass and prints the next deployment.
#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
struct BootstrapOptions {
    #[arg(long, default_value = "bootstrap.json", env("AOSS_BOOTSTRAP_STATE"))]
    state: PathBuf,
    #[arg(long, default_value = "outputs.json", env("AOSS_BOOTSTRAP_OUTPUTS"))]
    outputs: PathBuf,
    /// Write the sample state file if none exists yet.
    #[arg(long, default_value = "false", action = ArgAction::SetTrue)]
    init: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let options = BootstrapOptions::parse();

    tracing::info!("[bootstrap] {:?}", &options);

    let mut state = if options.init && !tokio::fs::try_exists(&options.state).await? {
        tracing::warn!("[bootstrap] writing sample state to {}", options.state.display());
        BootstrapState::default()
    } else {
        BootstrapState::load(&options.state).await?
    };

    let outputs = read_outputs_file(&options.outputs).await?;
    let step = reconcile(
        &mut state,
        outputs.get(INGESTION_STACK),
        outputs.get(SEARCH_STACK),
    )?;

    state.save(&options.state).await?;

    match &step {
        BootstrapStep::Complete => tracing::info!("[bootstrap] {}", step),
        _ => tracing::info!("[bootstrap] next: {}", step),
    }
    println!("{step}");

    Ok(())
}

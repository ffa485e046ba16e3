// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::path::PathBuf;

use anyhow::Result;
use aoss_ingestion::execution::CodeLocation;
use aoss_ingestion::stack::IngestionStack;
use aoss_provisioning::parameters::BootstrapState;
use aoss_provisioning::telemetry;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Print the ingestion stack template for the current bootstrap state.
    Synth {
        #[arg(long, default_value = "bootstrap.json", env("AOSS_BOOTSTRAP_STATE"))]
        state: PathBuf,
        /// Bucket holding the packaged function.
        #[arg(long, env("AOSS_CODE_BUCKET"))]
        code_bucket: String,
        #[arg(long, default_value = "aoss-ingestion/bootstrap.zip", env("AOSS_CODE_KEY"))]
        code_key: String,
        /// Write the template to a file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let cli = Cli::parse();

    tracing::info!("[ingestion] {:?}", &cli);

    match cli.command {
        Command::Synth {
            state,
            code_bucket,
            code_key,
            out,
        } => {
            let state = BootstrapState::load(&state).await?;
            let code = CodeLocation::new(code_bucket, code_key);
            let template = IngestionStack::synth(&state.ingestion, &code)?;
            let rendered = template.to_json_pretty()?;
            match out {
                Some(path) => {
                    tokio::fs::write(&path, rendered).await?;
                    tracing::info!("[ingestion] template written to {}", path.display());
                }
                None => println!("{rendered}"),
            }
        }
    }

    Ok(())
}

// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::path::PathBuf;

use anyhow::Result;
use aoss_provisioning::parameters::BootstrapState;
use aoss_provisioning::telemetry;
use aoss_search_stack::stack::SearchStack;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Print the search stack template for the current bootstrap state.
    Synth {
        #[arg(long, default_value = "bootstrap.json", env("AOSS_BOOTSTRAP_STATE"))]
        state: PathBuf,
        /// Write the template to a file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let cli = Cli::parse();

    tracing::info!("[search] {:?}", &cli);

    match cli.command {
        Command::Synth { state, out } => {
            let state = BootstrapState::load(&state).await?;
            let template = SearchStack::synth(&state.search)?;
            let rendered = template.to_json_pretty()?;
            match out {
                Some(path) => {
                    tokio::fs::write(&path, rendered).await?;
                    tracing::info!("[search] template written to {}", path.display());
                }
                None => println!("{rendered}"),
            }
        }
    }

    Ok(())
}

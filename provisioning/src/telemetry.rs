// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use tracing_subscriber::EnvFilter;

/// One JSON object per line on stdout, filtered by `RUST_LOG` (default
/// `info`). Shared by the bootstrap, synth and ingestion binaries.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        // span fields already appear on each event
        .with_current_span(false)
        // Lambda captures stdout into CloudWatch, which timestamps each line
        .without_time()
        .with_ansi(false)
        .with_target(false)
        .init();
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use anyhow::Context;
use tokio::io::BufReader;
use tracing::info;

use crate::cli::{Cli, RunArgs};
use crate::error::BinResult;
use crate::runtime::RuntimeBuilder;

/// Executes the `run` command, reading events from `--input` or stdin.
pub async fn run(cli: &Cli, args: RunArgs) -> BinResult<()> {
    let runtime = RuntimeBuilder::new().config_path(&cli.config).build()?;

    match args.input {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("opening input {}", path.display()))?;
            info!(input = %path.display(), "Reading events from file");
            runtime.run(BufReader::new(file)).await?;
        }
        None => {
            info!("Reading events from stdin");
            runtime.run(BufReader::new(tokio::io::stdin())).await?;
        }
    }

    Ok(())
}

// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! spool - batched event backup to disk or S3.

use spool_bin::cli::{Cli, LogFormat};
use spool_bin::error::report_error_and_exit;
use spool_bin::{commands, init_logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    // A broken config file is reported by the command itself.
    let logging = spool_config::load_config(&cli.config)
        .map(|config| config.logging)
        .unwrap_or_default();
    init_logging(
        cli.effective_log_level(logging.level.as_str()),
        cli.effective_log_format(LogFormat::from(logging.format)),
    );

    if let Err(e) = commands::execute(cli).await {
        report_error_and_exit(e);
    }
}

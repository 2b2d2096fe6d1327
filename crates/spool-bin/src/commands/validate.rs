// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use spool_config::{BackendConfig, SecretValue, SpoolConfig};

use crate::cli::{Cli, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Executes the `validate` command to validate configuration.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config_path = &cli.config;

    if !config_path.exists() {
        return Err(BinError::config(format!(
            "Configuration file not found: {}",
            config_path.display()
        )));
    }

    let config = spool_config::load_config(config_path)
        .map_err(|e| BinError::from(e).with_context("Configuration validation failed"))?;

    println!("✓ Configuration is valid: {}", config_path.display());
    println!();
    println!("Summary:");
    for line in summary_lines(&config)? {
        println!("  {}", line);
    }

    let warnings = collect_warnings(&config);
    if !warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &warnings {
            println!("  ⚠ {}", warning);
        }
    }

    if args.show_config {
        let shown = serde_json::to_string_pretty(&redacted(&config))
            .map_err(|e| BinError::runtime(format!("Failed to render configuration: {}", e)))?;
        println!();
        println!("Parsed configuration:");
        println!("{}", shown);
    }

    Ok(())
}

fn summary_lines(config: &SpoolConfig) -> BinResult<Vec<String>> {
    let backup = &config.backup;
    let mut lines = Vec::new();

    match backup.backend()? {
        BackendConfig::Disk { dir } => {
            lines.push("Backend: disk".to_string());
            lines.push(format!("Directory: {}", dir.display()));
        }
        BackendConfig::S3 {
            bucket,
            region,
            access_key_id,
            endpoint,
            prefix,
            ..
        } => {
            lines.push("Backend: s3".to_string());
            lines.push(format!("Bucket: {} ({})", bucket, region));
            if let Some(endpoint) = endpoint {
                lines.push(format!("Endpoint: {}", endpoint));
            }
            if let Some(prefix) = prefix {
                lines.push(format!("Prefix: {}", prefix));
            }
            lines.push(format!(
                "Credentials: {}",
                if access_key_id.is_some() { "static" } else { "environment" }
            ));
        }
    }

    lines.push(format!("Max buffer size: {}", backup.max_buffer_size));
    lines.push(format!("Flush interval: {}ms", backup.flush_interval_ms));
    lines.push(format!("Flush timeout: {}s", backup.flush_timeout_secs));
    lines.push(format!("Ring capacity: {}", config.ring.capacity));
    lines.push(format!(
        "Metrics: {}",
        if backup.enable_metrics { "enabled" } else { "disabled" }
    ));
    Ok(lines)
}

fn collect_warnings(config: &SpoolConfig) -> Vec<String> {
    let backup = &config.backup;
    let mut warnings = Vec::new();

    if backup.backend_type.trim().eq_ignore_ascii_case("disk") && !backup.dir.exists() {
        warnings.push(format!(
            "Backup directory does not exist yet and will be created: {}",
            backup.dir.display()
        ));
    }

    if backup.flush_timeout() < backup.flush_interval() {
        warnings.push(
            "flush_timeout_secs is shorter than flush_interval_ms; slow backends will time out"
                .to_string(),
        );
    }

    if config.ring.capacity < backup.max_buffer_size {
        warnings.push("Ring capacity is smaller than one batch".to_string());
    }

    warnings
}

fn redacted(config: &SpoolConfig) -> SpoolConfig {
    let mut shown = config.clone();
    let mask = |value: &mut Option<SecretValue>| {
        if value.is_some() {
            *value = Some(SecretValue::new("***"));
        }
    };
    mask(&mut shown.backup.access_key_id);
    mask(&mut shown.backup.secret_access_key);
    shown
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Routes tracing output to `path`. The terminal belongs to the UI, so
/// nothing is written to stdout or stderr. Keep the returned guard alive
/// until exit or buffered lines are lost.
pub fn init_logging(level: &str, path: &Path) -> Result<WorkerGuard> {
    let filter = build_filter(level, std::env::var("RUST_LOG").ok().as_deref())?;

    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("log path {} has no file name", path.display()))?;
    fs::create_dir_all(directory)
        .with_context(|| format!("create log directory {}", directory.display()))?;

    let appender = tracing_appender::rolling::never(directory, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .context("install tracing subscriber")?;

    Ok(guard)
}

/// `RUST_LOG` wins over the configured level when it is set and non-empty.
fn build_filter(level: &str, rust_log: Option<&str>) -> Result<EnvFilter> {
    let directive = match rust_log {
        Some(value) if !value.trim().is_empty() => value,
        _ => level,
    };
    EnvFilter::try_new(directive)
        .with_context(|| format!("invalid log filter {directive:?}; set [log].level or RUST_LOG"))
}

#[cfg(test)]
mod tests {
    use super::build_filter;

    #[test]
    fn configured_level_is_used_without_env() {
        let filter = build_filter("bihin=debug", None).expect("valid directive");
        assert_eq!(filter.to_string(), "bihin=debug");
    }

    #[test]
    fn env_directive_overrides_config() {
        let filter = build_filter("info", Some("warn")).expect("valid directive");
        assert_eq!(filter.to_string(), "warn");

        let filter = build_filter("info", Some("  ")).expect("blank env falls back");
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn bad_directive_is_reported() {
        let error = build_filter("bihin=loud", None).expect_err("invalid level should fail");
        assert!(error.to_string().contains("invalid log filter"));
    }
}

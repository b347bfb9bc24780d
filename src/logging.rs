// src/logging.rs

//! Logging setup for `tz-gin` using `tracing` + `tracing-subscriber`.
//!
//! Which filter wins:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `TZGIN_LOG`, either a bare level (`debug`) or a full `EnvFilter`
//!    directive (`info,tz_gin::watch=trace`)
//! 3. `info`
//!
//! Logs go to STDERR; the supervised application owns STDOUT.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

/// Environment variable consulted when `--log-level` is absent.
pub const LOG_ENV_VAR: &str = "TZGIN_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV_VAR).ok();
    let directive = resolve_directive(cli_level, env_value.as_deref());

    fmt()
        .with_env_filter(EnvFilter::new(&directive))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("installing tracing subscriber: {e}"))?;

    let env_rejected = env_value
        .as_deref()
        .map(str::trim)
        .is_some_and(|v| !v.is_empty() && v != directive);
    if cli_level.is_none() && env_rejected {
        tracing::warn!("ignoring unparseable {LOG_ENV_VAR}; logging at {directive}");
    }
    Ok(())
}

/// Pick the filter directive from the CLI flag and the env var's value.
///
/// An env value that `EnvFilter` cannot parse falls back to the default.
pub fn resolve_directive(cli_level: Option<LogLevel>, env_value: Option<&str>) -> String {
    if let Some(level) = cli_level {
        return level.as_directive().to_string();
    }

    match env_value.map(str::trim) {
        Some(filter) if !filter.is_empty() && EnvFilter::try_new(filter).is_ok() => filter.to_string(),
        _ => DEFAULT_DIRECTIVE.to_string(),
    }
}

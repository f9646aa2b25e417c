// crates/flutnet-cli/src/logging.rs
// ============================================================================
// Module: CLI Logging
// Description: Log level resolution and global subscriber installation.
// Purpose: Route `tracing` events from every Flutnet crate to stderr.
// Dependencies: flutnet-config, tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! The level comes from `--log-level`, then `FLUTNET_LOG`, then
//! `[logging].level` in `flutnet.toml`. Events go to stderr so stdout stays
//! reserved for command output.

use std::str::FromStr;

use flutnet_config::ConfigError;
use flutnet_config::LogLevel;
use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::Layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::util::TryInitError;

/// Environment variable overriding the configured log level.
pub const LOG_ENV_VAR: &str = "FLUTNET_LOG";

/// Where the effective log level came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelSource {
    /// `--log-level`.
    Flag,
    /// [`LOG_ENV_VAR`].
    Environment,
    /// `flutnet.toml`.
    Config,
}

/// Resolves the effective log level.
///
/// # Errors
///
/// Returns the failing source and a [`ConfigError`] when a flag or
/// environment value is not a log level.
pub fn resolve_level(
    flag: Option<&str>,
    env_value: Option<&str>,
    configured: LogLevel,
) -> Result<(LogLevel, LevelSource), (LevelSource, ConfigError)> {
    if let Some(flag) = flag {
        return LogLevel::from_str(flag)
            .map(|level| (level, LevelSource::Flag))
            .map_err(|err| (LevelSource::Flag, err));
    }
    if let Some(value) = env_value.filter(|value| !value.trim().is_empty()) {
        return LogLevel::from_str(value)
            .map(|level| (level, LevelSource::Environment))
            .map_err(|err| (LevelSource::Environment, err));
    }
    Ok((configured, LevelSource::Config))
}

/// Maps a configured level onto a `tracing` level.
#[must_use]
pub const fn tracing_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

/// Installs the global stderr subscriber.
///
/// # Errors
///
/// Returns [`TryInitError`] when a global subscriber is already set.
pub fn try_init(level: LogLevel) -> Result<(), TryInitError> {
    let filter = Targets::new().with_default(tracing_level(level));
    let stderr_log = tracing_subscriber::fmt::layer()
        .compact()
        .with_level(true)
        .with_target(true)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .with_filter(filter);
    tracing_subscriber::registry().with(stderr_log).try_init()
}

// crates/flutnet-config/src/config.rs
// ============================================================================
// Module: Flutnet Configuration
// Description: Configuration loading and validation for the Flutnet toolchain.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: flutnet-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then the `FLUTNET_CONFIG` environment
//! variable, then `flutnet.toml` in the working directory. Only the last is
//! optional: when the default file is absent the built-in defaults apply.
//! Unknown keys and invalid values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use flutnet_core::PackageMetadata;
use flutnet_core::package::validate_package_name;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "flutnet.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "FLUTNET_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 64 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of the Dart SDK constraint.
pub(crate) const MAX_DART_SDK_LENGTH: usize = 64;
/// Name used to validate package fields when no name is configured.
const PLACEHOLDER_PACKAGE_NAME: &str = "flutnet_bridge";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Flutnet toolchain configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FlutnetConfig {
    /// Generated package identity defaults.
    #[serde(default)]
    pub package: PackageConfig,
    /// Output placement.
    #[serde(default)]
    pub output: OutputConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// File the configuration was read from, when any.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl FlutnetConfig {
    /// Loads configuration using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an explicit or environment-provided file
    /// is missing, or when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, origin) = resolve_path(path, env::var(CONFIG_ENV_VAR).ok())?;
        if origin == ConfigOrigin::Default {
            match fs::metadata(&resolved) {
                Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
                Err(err) => return Err(ConfigError::Io(err.to_string())),
                Ok(_) => {}
            }
        }
        Self::load_file(&resolved)
    }

    /// Loads configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path, size, encoding, syntax, or
    /// contents are invalid.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.package.validate()?;
        self.output.validate()?;
        Ok(())
    }
}

/// Package identity defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    /// Dart package name.
    #[serde(default)]
    pub name: Option<String>,
    /// Package description.
    #[serde(default)]
    pub description: Option<String>,
    /// Package version.
    #[serde(default)]
    pub version: Option<String>,
    /// Dart SDK constraint.
    #[serde(default)]
    pub dart_sdk: Option<String>,
}

impl PackageConfig {
    /// Builds package metadata, preferring `name_override` over the
    /// configured name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when no name is available or any
    /// field is invalid.
    pub fn metadata(&self, name_override: Option<&str>) -> Result<PackageMetadata, ConfigError> {
        let name = name_override.or(self.name.as_deref()).ok_or_else(|| {
            ConfigError::Invalid(
                "package name must be given on the command line or as package.name".to_string(),
            )
        })?;
        let mut metadata = PackageMetadata::new(name);
        if let Some(description) = &self.description {
            metadata.description.clone_from(description);
        }
        if let Some(version) = &self.version {
            metadata.version.clone_from(version);
        }
        if let Some(dart_sdk) = &self.dart_sdk {
            validate_dart_sdk(dart_sdk)?;
            metadata.dart_sdk.clone_from(dart_sdk);
        }
        metadata.validate().map_err(|err| ConfigError::Invalid(format!("package: {err}")))?;
        Ok(metadata)
    }

    /// Validates every configured field.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(name) = &self.name {
            validate_package_name(name)
                .map_err(|err| ConfigError::Invalid(format!("package.name: {err}")))?;
        }
        self.metadata(Some(self.name.as_deref().unwrap_or(PLACEHOLDER_PACKAGE_NAME))).map(|_| ())
    }
}

/// Output placement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Output directory; defaults to the package name.
    #[serde(default)]
    pub dir: Option<String>,
    /// Replace an existing non-empty output directory.
    #[serde(default)]
    pub overwrite: bool,
}

impl OutputConfig {
    /// Returns the output directory for `package_name`.
    #[must_use]
    pub fn resolve_dir(&self, package_name: &str) -> PathBuf {
        self.dir.as_deref().map_or_else(|| PathBuf::from(package_name), |dir| PathBuf::from(dir.trim()))
    }

    /// Validates output settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(dir) = &self.dir {
            validate_path_string("output.dir", dir)?;
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum level emitted.
    #[serde(default)]
    pub level: LogLevel,
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Pipeline milestones.
    #[default]
    Info,
    /// Per-call detail.
    Debug,
    /// Everything.
    Trace,
}

impl LogLevel {
    /// Returns the lowercase level name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(ConfigError::Invalid(format!("unknown log level `{value}`"))),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Where a resolved config path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigOrigin {
    /// Passed by the caller.
    Explicit,
    /// Read from [`CONFIG_ENV_VAR`].
    Environment,
    /// The default filename.
    Default,
}

/// Resolves the config path from the caller, the environment, or defaults.
fn resolve_path(
    path: Option<&Path>,
    env_path: Option<String>,
) -> Result<(PathBuf, ConfigOrigin), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), ConfigOrigin::Explicit));
    }
    if let Some(env_path) = env_path.filter(|value| !value.trim().is_empty()) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), ConfigOrigin::Environment));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), ConfigOrigin::Default))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates the Dart SDK constraint string.
fn validate_dart_sdk(value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid("package.dart_sdk must be non-empty".to_string()));
    }
    if value.len() > MAX_DART_SDK_LENGTH {
        return Err(ConfigError::Invalid("package.dart_sdk exceeds max length".to_string()));
    }
    if value.chars().any(|ch| ch.is_control() || matches!(ch, '"' | '\'' | '#')) {
        return Err(ConfigError::Invalid(
            "package.dart_sdk contains characters not allowed in a constraint".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only unwraps are permitted.")]

    use super::*;

    #[test]
    fn explicit_path_wins_over_environment() {
        let (path, origin) =
            resolve_path(Some(Path::new("custom.toml")), Some("env.toml".to_string())).unwrap();
        assert_eq!(path, PathBuf::from("custom.toml"));
        assert_eq!(origin, ConfigOrigin::Explicit);
    }

    #[test]
    fn environment_path_wins_over_default() {
        let (path, origin) = resolve_path(None, Some("env.toml".to_string())).unwrap();
        assert_eq!(path, PathBuf::from("env.toml"));
        assert_eq!(origin, ConfigOrigin::Environment);
    }

    #[test]
    fn blank_environment_falls_back_to_default() {
        let (path, origin) = resolve_path(None, Some("  ".to_string())).unwrap();
        assert_eq!(path, PathBuf::from(DEFAULT_CONFIG_NAME));
        assert_eq!(origin, ConfigOrigin::Default);
    }

    #[test]
    fn oversized_environment_path_is_rejected() {
        let result = resolve_path(None, Some("a".repeat(MAX_TOTAL_PATH_LENGTH + 1)));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn validate_path_string_rejects_whitespace_only() {
        let result = validate_path_string("output.dir", "   ");
        assert!(result.unwrap_err().to_string().contains("output.dir must be non-empty"));
    }

    #[test]
    fn validate_path_string_rejects_component_too_long() {
        let value = format!("out/{}", "a".repeat(MAX_PATH_COMPONENT_LENGTH + 1));
        let result = validate_path_string("output.dir", &value);
        assert!(result.unwrap_err().to_string().contains("path component too long"));
    }

    #[test]
    fn log_levels_parse_case_insensitively() {
        assert_eq!("DEBUG".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn dart_sdk_rejects_quotes() {
        assert!(validate_dart_sdk(">=3.0.0 <4.0.0").is_ok());
        assert!(validate_dart_sdk("\">=3.0.0\"").is_err());
        assert!(validate_dart_sdk("").is_err());
    }
}

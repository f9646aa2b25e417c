// crates/flutnet-cli/src/exec.rs
// ============================================================================
// Module: Exec Actions
// Description: JSON request/response handlers behind `flutnet exec`.
// Purpose: Serve tooling that drives Flutnet through input/output files.
// Dependencies: flutnet-config, flutnet-core, serde, serde_json
// ============================================================================

//! ## Overview
//! `flutnet exec --input request.json --output response.json` runs one
//! auxiliary action. Requests are tagged by `action`:
//!
//! - `validate`: diagnostics for an assembly metadata document.
//! - `describe`: the validated contract model and its fingerprint.
//! - `scaffold`: a starter `flutnet.toml` for a new bridge project.
//!
//! Failures never abort the process; they are reported in the response with
//! `ok = false`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::path::PathBuf;

use flutnet_config::ConfigError;
use flutnet_config::DEFAULT_CONFIG_NAME;
use flutnet_config::FlutnetConfig;
use flutnet_config::config_toml_example;
use flutnet_core::AggregateFailure;
use flutnet_core::AssemblyMetadata;
use flutnet_core::ContractValidator;
use flutnet_core::MetadataError;
use flutnet_core::PackageMetadataError;
use flutnet_core::hashing::CanonicalJsonError;
use flutnet_core::hashing::contract_fingerprint;
use flutnet_core::package::validate_package_name;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tracing::info;
use tracing::warn;

// ============================================================================
// SECTION: Types
// ============================================================================

/// One exec request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ExecRequest {
    /// Validate assembly metadata and report every diagnostic.
    Validate {
        /// Metadata document path.
        assembly: PathBuf,
    },
    /// Describe the validated contract.
    Describe {
        /// Metadata document path.
        assembly: PathBuf,
    },
    /// Write a starter `flutnet.toml`.
    Scaffold {
        /// Project directory, created when missing.
        directory: PathBuf,
        /// Dart package name.
        package: String,
        /// Replace an existing config file.
        #[serde(default)]
        overwrite: bool,
    },
}

impl ExecRequest {
    /// Returns the action label.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Validate {
                ..
            } => "validate",
            Self::Describe {
                ..
            } => "describe",
            Self::Scaffold {
                ..
            } => "scaffold",
        }
    }
}

/// One exec response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecResponse {
    /// Whether the action succeeded.
    pub ok: bool,
    /// Action output on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Exec action failures.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Metadata could not be loaded.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    /// The contract has blocking diagnostics.
    #[error(transparent)]
    Validation(#[from] AggregateFailure),
    /// Invalid package name.
    #[error(transparent)]
    Package(#[from] PackageMetadataError),
    /// Generated config failed to validate.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The target file already exists.
    #[error("{0} already exists")]
    Exists(PathBuf),
    /// Serialization failure.
    #[error("serialization failed: {0}")]
    Serialization(String),
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(String),
}

impl From<CanonicalJsonError> for ExecError {
    fn from(err: CanonicalJsonError) -> Self {
        Self::Serialization(err.to_string())
    }
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

/// Runs one request and wraps the outcome.
#[must_use]
pub fn execute(request: &ExecRequest) -> ExecResponse {
    let result = match request {
        ExecRequest::Validate {
            assembly,
        } => validate(assembly),
        ExecRequest::Describe {
            assembly,
        } => describe(assembly),
        ExecRequest::Scaffold {
            directory,
            package,
            overwrite,
        } => scaffold(directory, package, *overwrite),
    };
    match result {
        Ok(value) => ExecResponse {
            ok: true,
            result: Some(value),
            error: None,
        },
        Err(err) => {
            warn!(action = request.action(), error = %err, "exec action failed");
            ExecResponse {
                ok: false,
                result: None,
                error: Some(err.to_string()),
            }
        }
    }
}

// ============================================================================
// SECTION: Actions
// ============================================================================

/// Reports every diagnostic for an assembly.
fn validate(assembly: &Path) -> Result<Value, ExecError> {
    let metadata = AssemblyMetadata::load(assembly)?;
    let outcome = ContractValidator::new(&metadata)?.validate();
    let fingerprint = if outcome.report.has_errors() {
        None
    } else {
        Some(contract_fingerprint(&outcome.model)?)
    };
    Ok(json!({
        "assembly": metadata.name,
        "valid": !outcome.report.has_errors(),
        "fingerprint": fingerprint,
        "diagnostics": outcome.report,
    }))
}

/// Returns the validated contract and its fingerprint.
fn describe(assembly: &Path) -> Result<Value, ExecError> {
    let metadata = AssemblyMetadata::load(assembly)?;
    let model = ContractValidator::new(&metadata)?.validate().into_model()?;
    let fingerprint = contract_fingerprint(&model)?;
    let contract =
        serde_json::to_value(&model).map_err(|err| ExecError::Serialization(err.to_string()))?;
    Ok(json!({
        "fingerprint": fingerprint,
        "contract": contract,
    }))
}

/// Writes a starter `flutnet.toml`.
fn scaffold(directory: &Path, package: &str, overwrite: bool) -> Result<Value, ExecError> {
    validate_package_name(package)?;
    let content = config_toml_example(package);
    FlutnetConfig::from_toml_str(&content)?;
    let path = directory.join(DEFAULT_CONFIG_NAME);
    if !overwrite && fs::symlink_metadata(&path).is_ok() {
        return Err(ExecError::Exists(path));
    }
    fs::create_dir_all(directory).map_err(|err| ExecError::Io(err.to_string()))?;
    fs::write(&path, content).map_err(|err| ExecError::Io(err.to_string()))?;
    info!(path = %path.display(), "scaffolded config");
    Ok(json!({ "config": path }))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only unwraps are permitted.")]

    use super::*;

    const GREETER: &str = r#"{
      "name": "Acme.Greeting",
      "types": [
        {
          "name": "Acme.Greeting.Greeter",
          "kind": "interface",
          "service": true,
          "methods": [
            { "name": "Hello", "operation": true, "parameters": [{ "name": "name", "type": "System.String" }], "returns": "System.String" },
            { "name": "Size", "operation": true, "returns": "System.UIntPtr" }
          ]
        }
      ]
    }"#;

    #[test]
    fn requests_parse_by_action_tag() {
        let request: ExecRequest =
            serde_json::from_str(r#"{"action":"scaffold","directory":"app","package":"acme"}"#).unwrap();
        assert_eq!(
            request,
            ExecRequest::Scaffold {
                directory: PathBuf::from("app"),
                package: "acme".to_string(),
                overwrite: false,
            }
        );
    }

    #[test]
    fn validate_reports_errors_without_failing() {
        let dir = tempfile::tempdir().unwrap();
        let assembly = dir.path().join("greeter.json");
        fs::write(&assembly, GREETER).unwrap();
        let response = execute(&ExecRequest::Validate {
            assembly,
        });
        assert!(response.ok);
        let result = response.result.unwrap();
        assert_eq!(result["valid"], json!(false));
        assert_eq!(result["fingerprint"], Value::Null);
        assert_eq!(result["diagnostics"][0]["kind"], json!("invalid_operation_signature"));
    }

    #[test]
    fn describe_refuses_invalid_contracts() {
        let dir = tempfile::tempdir().unwrap();
        let assembly = dir.path().join("greeter.json");
        fs::write(&assembly, GREETER).unwrap();
        let response = execute(&ExecRequest::Describe {
            assembly,
        });
        assert!(!response.ok);
        assert!(response.error.unwrap().contains("contract validation failed"));
    }

    #[test]
    fn scaffold_writes_once_unless_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("app");
        let request = ExecRequest::Scaffold {
            directory: project.clone(),
            package: "acme_bridge".to_string(),
            overwrite: false,
        };
        assert!(execute(&request).ok);
        let config = FlutnetConfig::load_file(&project.join(DEFAULT_CONFIG_NAME)).unwrap();
        assert_eq!(config.package.name.as_deref(), Some("acme_bridge"));
        let again = execute(&request);
        assert!(!again.ok);
        assert!(again.error.unwrap().contains("already exists"));
    }

    #[test]
    fn scaffold_rejects_invalid_package_names() {
        let dir = tempfile::tempdir().unwrap();
        let response = execute(&ExecRequest::Scaffold {
            directory: dir.path().to_path_buf(),
            package: "Acme".to_string(),
            overwrite: false,
        });
        assert!(!response.ok);
    }
}

// crates/flutnet-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic template for project scaffolding.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The example written by `flutnet exec` scaffolding. It must always parse
//! and validate.

/// Returns a canonical example `flutnet.toml` for `package_name`.
#[must_use]
pub fn config_toml_example(package_name: &str) -> String {
    format!(
        r#"[package]
name = "{package_name}"
description = "Flutnet platform bridge"
version = "1.0.0"
dart_sdk = ">=3.0.0 <4.0.0"

[output]
dir = "{package_name}"
overwrite = false

[logging]
level = "info"
"#
    )
}

// crates/flutnet-core/src/package.rs
// ============================================================================
// Module: Package Metadata
// Description: Name, description, and version of a generated Dart package.
// Purpose: Validate user-supplied package identity before generation.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! The invoking tool supplies package identity. Dart enforces its own rules
//! for package names (lowercase identifiers, no reserved words), so the
//! metadata is validated up front and generation never emits a package the
//! Dart toolchain would reject.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum package name length.
pub const MAX_PACKAGE_NAME_LENGTH: usize = 64;
/// Maximum description length.
pub const MAX_DESCRIPTION_LENGTH: usize = 180;
/// Default Dart SDK constraint for generated packages.
pub const DEFAULT_DART_SDK: &str = ">=3.0.0 <4.0.0";
/// Default package version.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Dart reserved words that cannot be package names.
pub const DART_RESERVED: &[&str] = &[
    "abstract", "as", "assert", "async", "await", "break", "case", "catch", "class", "const",
    "continue", "covariant", "default", "deferred", "do", "dynamic", "else", "enum", "export",
    "extends", "extension", "external", "factory", "false", "final", "finally", "for", "function",
    "get", "hide", "if", "implements", "import", "in", "interface", "is", "late", "library",
    "mixin", "new", "null", "on", "operator", "part", "required", "rethrow", "return", "set",
    "show", "static", "super", "switch", "sync", "this", "throw", "true", "try", "typedef", "var",
    "void", "while", "with", "yield",
];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Invalid package metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PackageMetadataError {
    /// Package name violates Dart naming rules.
    #[error("invalid package name `{name}`: {reason}")]
    InvalidName {
        /// Offending name.
        name: String,
        /// Violated rule.
        reason: String,
    },
    /// Version is not `MAJOR.MINOR.PATCH` with optional suffix.
    #[error("invalid package version `{0}`")]
    InvalidVersion(String),
    /// Description is too long or spans multiple lines.
    #[error("invalid package description: {0}")]
    InvalidDescription(String),
}

// ============================================================================
// SECTION: Package Metadata
// ============================================================================

/// Identity of a generated package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Dart package name.
    pub name: String,
    /// One-line description.
    pub description: String,
    /// Package version.
    pub version: String,
    /// Dart SDK constraint.
    pub dart_sdk: String,
}

impl PackageMetadata {
    /// Creates metadata with default description, version, and SDK constraint.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: "Flutnet platform bridge".to_string(),
            version: DEFAULT_VERSION.to_string(),
            dart_sdk: DEFAULT_DART_SDK.to_string(),
        }
    }

    /// Validates the metadata.
    ///
    /// # Errors
    ///
    /// Returns [`PackageMetadataError`] for an invalid name, version, or
    /// description.
    pub fn validate(&self) -> Result<(), PackageMetadataError> {
        validate_package_name(&self.name)?;
        validate_version(&self.version)?;
        if self.description.len() > MAX_DESCRIPTION_LENGTH {
            return Err(PackageMetadataError::InvalidDescription(format!(
                "description exceeds {MAX_DESCRIPTION_LENGTH} characters"
            )));
        }
        if self.description.contains(['\n', '\r']) {
            return Err(PackageMetadataError::InvalidDescription(
                "description must be a single line".to_string(),
            ));
        }
        Ok(())
    }
}

/// Validates a Dart package name.
///
/// # Errors
///
/// Returns [`PackageMetadataError::InvalidName`] when the name is empty, too
/// long, not a lowercase identifier, or a reserved word.
pub fn validate_package_name(name: &str) -> Result<(), PackageMetadataError> {
    let invalid = |reason: &str| PackageMetadataError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };
    let Some(first) = name.chars().next() else {
        return Err(invalid("name is empty"));
    };
    if name.len() > MAX_PACKAGE_NAME_LENGTH {
        return Err(invalid("name is too long"));
    }
    if !(first.is_ascii_lowercase() || first == '_') {
        return Err(invalid("name must start with a lowercase letter or underscore"));
    }
    if !name.chars().all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_') {
        return Err(invalid("name may contain only lowercase letters, digits, and underscores"));
    }
    if DART_RESERVED.contains(&name) {
        return Err(invalid("name is a Dart reserved word"));
    }
    Ok(())
}

/// Validates a `MAJOR.MINOR.PATCH[-pre][+build]` version.
fn validate_version(version: &str) -> Result<(), PackageMetadataError> {
    let core = version.split(['-', '+']).next().unwrap_or_default();
    let parts: Vec<&str> = core.split('.').collect();
    let numeric = parts.len() == 3
        && parts.iter().all(|part| !part.is_empty() && part.chars().all(|ch| ch.is_ascii_digit()));
    let suffix_ok = version
        .get(core.len() ..)
        .unwrap_or_default()
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '+'));
    if numeric && suffix_ok && !version.ends_with(['-', '+', '.']) {
        Ok(())
    } else {
        Err(PackageMetadataError::InvalidVersion(version.to_string()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

// crates/flutnet-bridge-gen/src/types.rs
// ============================================================================
// Module: Package Types
// Description: Generated artifacts and the package manifest.
// Purpose: Provide canonical shapes for the files a synthesis produces.
// Dependencies: flutnet-core, serde
// ============================================================================

//! ## Overview
//! A synthesis yields a [`PackageBundle`]: every generated file as an
//! [`Artifact`] plus the [`PackageManifest`] written to `index.json`. The
//! manifest lists each artifact with its SHA-256 digest so drift checks and
//! forced regeneration know exactly which files are generated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use flutnet_core::PackageMetadata;
use flutnet_core::hashing::ContentDigest;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Manifest file name at the package root.
pub const MANIFEST_FILE: &str = "index.json";

/// Generator identifier recorded in headers and the manifest.
pub const GENERATOR_NAME: &str = "flutnet-bridge-gen";

// ============================================================================
// SECTION: Artifacts
// ============================================================================

/// Which side of the bridge an artifact belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSide {
    /// Dart package source or manifest.
    Dart,
    /// Native registration stub or contract document.
    Native,
}

/// One generated file.
///
/// # Invariants
/// - `path` is relative to the package root and uses `/` separators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Relative path under the package root.
    pub path: String,
    /// Owning side.
    pub side: ArtifactSide,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl Artifact {
    /// Creates a text artifact.
    #[must_use]
    pub fn text(path: impl Into<String>, side: ArtifactSide, content: String) -> Self {
        Self {
            path: path.into(),
            side,
            bytes: content.into_bytes(),
        }
    }
}

// ============================================================================
// SECTION: Manifest
// ============================================================================

/// Manifest entry describing one artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Relative artifact path.
    pub path: String,
    /// Owning side.
    pub side: ArtifactSide,
    /// SHA-256 digest of the artifact bytes.
    pub digest: ContentDigest,
}

/// Manifest describing a generated package.
///
/// # Invariants
/// - `artifacts` are ordered by `path` and never include the manifest itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// Generator identifier.
    pub generator: String,
    /// Generator version.
    pub generator_version: String,
    /// Package identity.
    pub package: PackageMetadata,
    /// Fingerprint of the contract the package was generated from.
    pub contract_fingerprint: ContentDigest,
    /// Generated artifacts ordered by path.
    pub artifacts: Vec<ManifestEntry>,
}

/// Complete synthesis output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageBundle {
    /// Manifest derived from `artifacts`.
    pub manifest: PackageManifest,
    /// Generated artifacts ordered by path.
    pub artifacts: Vec<Artifact>,
}

impl PackageBundle {
    /// Returns the artifact at `path`.
    #[must_use]
    pub fn artifact(&self, path: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|artifact| artifact.path == path)
    }

    /// Returns an artifact's contents as UTF-8 text.
    #[must_use]
    pub fn text(&self, path: &str) -> Option<&str> {
        self.artifact(path).and_then(|artifact| std::str::from_utf8(&artifact.bytes).ok())
    }
}

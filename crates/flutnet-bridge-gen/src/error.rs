// crates/flutnet-bridge-gen/src/error.rs
// ============================================================================
// Module: Synthesis Errors
// Description: Failure modes of package synthesis, writing, and verification.
// Purpose: Give callers one error type for the whole generation pipeline.
// Dependencies: flutnet-core, thiserror
// ============================================================================

//! ## Overview
//! [`SynthesisError`] covers rendering, writing, and drift verification.

use std::path::PathBuf;

use flutnet_core::AggregateFailure;
use flutnet_core::PackageMetadataError;
use flutnet_core::hashing::CanonicalJsonError;
use thiserror::Error;

/// Errors raised while synthesizing or writing a bridge package.
///
/// # Invariants
/// - Variant meanings are stable for automation and tests.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The validation report carries hard errors; nothing was generated.
    #[error(transparent)]
    Validation(#[from] AggregateFailure),
    /// Package identity is invalid.
    #[error(transparent)]
    Package(#[from] PackageMetadataError),
    /// JSON serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Rendering produced an inconsistent artifact set.
    #[error("generation error: {0}")]
    Generation(String),
    /// Target directory already holds files and overwrite was not requested.
    #[error("target directory {} is not empty; pass the overwrite flag to regenerate", .0.display())]
    TargetNotEmpty(PathBuf),
    /// Output path is unsafe or inaccessible.
    #[error("invalid output path: {}", .0.display())]
    OutputPath(PathBuf),
    /// On-disk package differs from a fresh synthesis.
    #[error("package drift: {0}")]
    Drift(String),
    /// IO error while reading or writing files.
    #[error("io error: {0}")]
    Io(String),
}

impl From<CanonicalJsonError> for SynthesisError {
    fn from(err: CanonicalJsonError) -> Self {
        Self::Serialization(err.to_string())
    }
}

// crates/flutnet-bridge-gen/src/synthesizer.rs
// ============================================================================
// Module: Bridge Synthesizer
// Description: Builds, writes, and verifies generated bridge packages.
// Purpose: Turn a validated contract into a deterministic package on disk.
// Dependencies: flutnet-core, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`BridgeSynthesizer`] renders every artifact in memory first, so a
//! contract with hard errors or a naming collision never leaves a partial
//! package behind. Artifacts are sorted by path and hashed into the
//! `index.json` manifest; output bytes depend only on the contract and the
//! package metadata.
//!
//! Writing refuses a non-empty target unless `overwrite` is set. With
//! `overwrite`, files listed in the previous manifest that are no longer
//! generated are removed; files the manifest never listed are left alone.
//! Each file is written to a temporary sibling and renamed into place.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::io::Write;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use flutnet_core::ContractModel;
use flutnet_core::PackageMetadata;
use flutnet_core::ValidationOutcome;
use flutnet_core::hashing::canonical_json_bytes;
use flutnet_core::hashing::contract_fingerprint;
use flutnet_core::hashing::digest_bytes;
use serde::Serialize;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::dart;
use crate::error::SynthesisError;
use crate::native;
use crate::types::Artifact;
use crate::types::ArtifactSide;
use crate::types::GENERATOR_NAME;
use crate::types::MANIFEST_FILE;
use crate::types::ManifestEntry;
use crate::types::PackageBundle;
use crate::types::PackageManifest;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fingerprint prefix length shown in file headers.
const HEADER_FINGERPRINT_LEN: usize = 16;

/// Maximum temporary-name attempts per atomic write.
const MAX_TEMP_ATTEMPTS: u32 = 64;

// ============================================================================
// SECTION: Synthesizer
// ============================================================================

/// Generator for bridge packages.
///
/// # Invariants
/// - `package` has passed [`PackageMetadata::validate`].
/// - Rendering is deterministic for a fixed contract and package.
#[derive(Debug, Clone)]
pub struct BridgeSynthesizer {
    /// Identity of the generated package.
    package: PackageMetadata,
}

impl BridgeSynthesizer {
    /// Creates a synthesizer for a package.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::Package`] when the metadata is invalid.
    pub fn new(package: PackageMetadata) -> Result<Self, SynthesisError> {
        package.validate()?;
        Ok(Self {
            package,
        })
    }

    /// Returns the package metadata.
    #[must_use]
    pub const fn package(&self) -> &PackageMetadata {
        &self.package
    }

    /// Synthesizes a package from a validation outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::Validation`] when the report carries any
    /// hard error, before anything is rendered.
    pub fn synthesize(&self, outcome: &ValidationOutcome) -> Result<PackageBundle, SynthesisError> {
        outcome.report.clone().into_result()?;
        self.render(&outcome.model)
    }

    /// Renders a package from a contract model.
    ///
    /// The model is trusted to be the output of a clean validation, for
    /// example one read back from `contract.json`.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError`] when serialization fails or two artifacts
    /// or identifiers collide.
    pub fn render(&self, model: &ContractModel) -> Result<PackageBundle, SynthesisError> {
        let fingerprint = contract_fingerprint(model)?;
        let short = fingerprint.short(HEADER_FINGERPRINT_LEN);
        let code_header = dart::header("//", short);
        let yaml_header = dart::header("#", short);

        let mut artifacts = vec![
            Artifact::text("pubspec.yaml", ArtifactSide::Dart, dart::render_pubspec(&self.package, &yaml_header)),
            Artifact::text(
                format!("lib/{}.dart", self.package.name),
                ArtifactSide::Dart,
                dart::render_barrel(&self.package, model, &code_header),
            ),
            Artifact::text(dart::BRIDGE_PATH, ArtifactSide::Dart, dart::render_bridge(&code_header)),
            Artifact::text(native::MOD_PATH, ArtifactSide::Native, native::render_mod(model, &code_header)),
            Artifact::text(native::DATA_PATH, ArtifactSide::Native, native::render_data(model, &code_header)?),
            Artifact {
                path: native::CONTRACT_PATH.to_string(),
                side: ArtifactSide::Native,
                bytes: serialize_json_pretty(model)?,
            },
        ];
        for service in &model.services {
            artifacts.push(Artifact::text(
                dart::service_path(&service.name),
                ArtifactSide::Dart,
                dart::render_service(service, &code_header)?,
            ));
            artifacts.push(Artifact::text(
                native::service_path(&service.name),
                ArtifactSide::Native,
                native::render_service(service, &code_header)?,
            ));
        }
        for data in &model.data_types {
            artifacts.push(Artifact::text(
                dart::data_path(&data.name),
                ArtifactSide::Dart,
                dart::render_data_type(model, data, &code_header)?,
            ));
        }

        artifacts.sort_by(|lhs, rhs| lhs.path.cmp(&rhs.path));
        ensure_unique_paths(&artifacts)?;
        let manifest = PackageManifest {
            generator: GENERATOR_NAME.to_string(),
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            package: self.package.clone(),
            contract_fingerprint: fingerprint,
            artifacts: artifacts
                .iter()
                .map(|artifact| ManifestEntry {
                    path: artifact.path.clone(),
                    side: artifact.side,
                    digest: digest_bytes(&artifact.bytes),
                })
                .collect(),
        };
        debug!(artifacts = artifacts.len(), package = %self.package.name, "package rendered");
        Ok(PackageBundle {
            manifest,
            artifacts,
        })
    }

    /// Synthesizes and writes a package into `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::TargetNotEmpty`] when the directory holds
    /// files and `overwrite` is false, plus every synthesis and IO error.
    pub fn write_to(
        &self,
        outcome: &ValidationOutcome,
        output_dir: &Path,
        overwrite: bool,
    ) -> Result<PackageManifest, SynthesisError> {
        let bundle = self.synthesize(outcome)?;
        let previous = prepare_output_dir(output_dir, overwrite)?;
        if let Some(previous) = previous {
            remove_stale(output_dir, &previous, &bundle)?;
        }
        for artifact in &bundle.artifacts {
            let relative = validate_relative_path(&artifact.path)?;
            write_file_atomic(output_dir, &relative, &artifact.bytes)?;
        }
        write_file_atomic(output_dir, Path::new(MANIFEST_FILE), &serialize_json_pretty(&bundle.manifest)?)?;
        info!(
            package = %self.package.name,
            path = %output_dir.display(),
            artifacts = bundle.artifacts.len(),
            "bridge package written"
        );
        Ok(bundle.manifest)
    }

    /// Verifies the on-disk package matches a fresh synthesis byte for byte.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::Drift`] naming the first differing file, plus
    /// every synthesis and IO error.
    pub fn verify(&self, outcome: &ValidationOutcome, output_dir: &Path) -> Result<(), SynthesisError> {
        let bundle = self.synthesize(outcome)?;
        ensure_plain_dir(output_dir)?;
        for artifact in &bundle.artifacts {
            let relative = validate_relative_path(&artifact.path)?;
            compare_file(output_dir, &relative, &artifact.bytes)?;
        }
        compare_file(output_dir, Path::new(MANIFEST_FILE), &serialize_json_pretty(&bundle.manifest)?)?;
        debug!(path = %output_dir.display(), "bridge package verified");
        Ok(())
    }
}

/// Reads the manifest of a generated package.
///
/// # Errors
///
/// Returns [`SynthesisError`] when the manifest is missing or malformed.
pub fn read_manifest(output_dir: &Path) -> Result<PackageManifest, SynthesisError> {
    let path = output_dir.join(MANIFEST_FILE);
    let bytes = fs::read(&path).map_err(|err| SynthesisError::Io(format!("{}: {err}", path.display())))?;
    serde_json::from_slice(&bytes).map_err(|err| SynthesisError::Serialization(err.to_string()))
}

// ============================================================================
// SECTION: Serialization Helpers
// ============================================================================

/// Serializes a value into pretty JSON bytes with canonical key ordering.
fn serialize_json_pretty<T: Serialize>(value: &T) -> Result<Vec<u8>, SynthesisError> {
    let canonical = canonical_json_bytes(value)?;
    let canonical_value: serde_json::Value =
        serde_json::from_slice(&canonical).map_err(|err| SynthesisError::Serialization(err.to_string()))?;
    let mut bytes =
        serde_json::to_vec_pretty(&canonical_value).map_err(|err| SynthesisError::Serialization(err.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Ensures artifact paths are unique.
fn ensure_unique_paths(artifacts: &[Artifact]) -> Result<(), SynthesisError> {
    let mut seen = BTreeSet::new();
    for artifact in artifacts {
        if artifact.path == MANIFEST_FILE || !seen.insert(&artifact.path) {
            return Err(SynthesisError::Generation(format!("duplicate artifact path: {}", artifact.path)));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Output Directory
// ============================================================================

/// Rejects symlinks and non-directories at the output root.
fn ensure_plain_dir(output_dir: &Path) -> Result<(), SynthesisError> {
    let metadata = fs::symlink_metadata(output_dir).map_err(|err| map_io_error(&err, output_dir))?;
    if metadata.file_type().is_symlink() || !metadata.is_dir() {
        return Err(SynthesisError::OutputPath(output_dir.to_path_buf()));
    }
    Ok(())
}

/// Creates or inspects the output directory under the overwrite policy.
///
/// Returns the previous manifest when regenerating over an earlier package.
fn prepare_output_dir(output_dir: &Path, overwrite: bool) -> Result<Option<PackageManifest>, SynthesisError> {
    if output_dir.as_os_str().is_empty() {
        return Err(SynthesisError::OutputPath(output_dir.to_path_buf()));
    }
    match fs::symlink_metadata(output_dir) {
        Err(err) if err.kind() == ErrorKind::NotFound => {
            fs::create_dir_all(output_dir).map_err(|err| map_io_error(&err, output_dir))?;
            return Ok(None);
        }
        Err(err) => return Err(map_io_error(&err, output_dir)),
        Ok(_) => ensure_plain_dir(output_dir)?,
    }
    let mut entries = fs::read_dir(output_dir).map_err(|err| map_io_error(&err, output_dir))?;
    if entries.next().is_none() {
        return Ok(None);
    }
    if !overwrite {
        return Err(SynthesisError::TargetNotEmpty(output_dir.to_path_buf()));
    }
    match read_manifest(output_dir) {
        Ok(manifest) => Ok(Some(manifest)),
        Err(err) => {
            warn!(path = %output_dir.display(), error = %err, "no readable manifest; stale files are kept");
            Ok(None)
        }
    }
}

/// Removes files listed by the previous manifest that are no longer generated.
fn remove_stale(
    output_dir: &Path,
    previous: &PackageManifest,
    bundle: &PackageBundle,
) -> Result<(), SynthesisError> {
    let current: BTreeSet<&str> = bundle.artifacts.iter().map(|artifact| artifact.path.as_str()).collect();
    for entry in &previous.artifacts {
        if current.contains(entry.path.as_str()) {
            continue;
        }
        let relative = validate_relative_path(&entry.path)?;
        let path = output_dir.join(&relative);
        match fs::symlink_metadata(&path) {
            Ok(metadata) if metadata.is_file() => {
                fs::remove_file(&path).map_err(|err| map_io_error(&err, &path))?;
                debug!(path = %entry.path, "removed stale artifact");
            }
            Ok(_) => return Err(SynthesisError::OutputPath(path)),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(map_io_error(&err, &path)),
        }
    }
    Ok(())
}

/// Validates that an artifact path is relative and safe.
fn validate_relative_path(path: &str) -> Result<PathBuf, SynthesisError> {
    if path.trim().is_empty() {
        return Err(SynthesisError::Generation(String::from("artifact path is empty")));
    }
    let candidate = PathBuf::from(path);
    if candidate.is_absolute() {
        return Err(SynthesisError::Generation(format!("artifact path must be relative: {path}")));
    }
    for component in candidate.components() {
        if !matches!(component, Component::Normal(_)) {
            return Err(SynthesisError::Generation(format!("artifact path contains invalid component: {path}")));
        }
    }
    Ok(candidate)
}

/// Maps IO errors into synthesis errors.
fn map_io_error(err: &std::io::Error, path: &Path) -> SynthesisError {
    match err.kind() {
        ErrorKind::NotADirectory | ErrorKind::PermissionDenied => SynthesisError::OutputPath(path.to_path_buf()),
        _ => SynthesisError::Io(format!("{}: {err}", path.display())),
    }
}

// ============================================================================
// SECTION: File IO
// ============================================================================

/// Writes bytes to a relative path through a temporary sibling and rename.
fn write_file_atomic(output_dir: &Path, relative: &Path, bytes: &[u8]) -> Result<(), SynthesisError> {
    let target = output_dir.join(relative);
    let parent = target.parent().map_or_else(|| output_dir.to_path_buf(), Path::to_path_buf);
    fs::create_dir_all(&parent).map_err(|err| map_io_error(&err, &parent))?;
    if fs::symlink_metadata(&target).is_ok_and(|metadata| metadata.file_type().is_symlink()) {
        return Err(SynthesisError::OutputPath(target));
    }
    let file_name = target.file_name().ok_or_else(|| SynthesisError::OutputPath(target.clone()))?;
    for attempt in 0 .. MAX_TEMP_ATTEMPTS {
        let mut temp_name = OsString::from(".tmp-");
        temp_name.push(file_name);
        temp_name.push(format!(".{}.{attempt}", std::process::id()));
        let temp_path = parent.join(temp_name);
        match fs::OpenOptions::new().write(true).create_new(true).open(&temp_path) {
            Ok(mut file) => {
                let written = file.write_all(bytes).and_then(|()| file.sync_all());
                let renamed = written.and_then(|()| fs::rename(&temp_path, &target));
                if let Err(err) = renamed {
                    let _ = fs::remove_file(&temp_path);
                    return Err(map_io_error(&err, &target));
                }
                return Ok(());
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {}
            Err(err) => return Err(map_io_error(&err, &temp_path)),
        }
    }
    Err(SynthesisError::Generation("unable to allocate temporary output file".to_string()))
}

/// Compares a file with expected bytes.
fn compare_file(output_dir: &Path, relative: &Path, expected: &[u8]) -> Result<(), SynthesisError> {
    let path = output_dir.join(relative);
    let metadata = match fs::symlink_metadata(&path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            return Err(SynthesisError::Drift(format!("missing artifact: {}", relative.display())));
        }
        Err(err) => return Err(map_io_error(&err, &path)),
    };
    if !metadata.is_file() {
        return Err(SynthesisError::OutputPath(path));
    }
    let same_len = u64::try_from(expected.len()).is_ok_and(|len| len == metadata.len());
    if !same_len || fs::read(&path).map_err(|err| map_io_error(&err, &path))? != expected {
        return Err(SynthesisError::Drift(format!("artifact mismatch: {}", relative.display())));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

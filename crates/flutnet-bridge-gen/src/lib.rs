// crates/flutnet-bridge-gen/src/lib.rs
// ============================================================================
// Module: Flutnet Bridge Generator Library
// Description: Deterministic generator for Dart bridge packages.
// Purpose: Render validated contracts into Dart proxies and native stubs.
// Dependencies: flutnet-core, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! This crate is the Bridge Synthesizer. Given a validated contract and the
//! package identity it renders a Dart package (`pubspec.yaml`, proxies, data
//! codecs, and a transport-agnostic bridge library) together with native
//! registration stubs for `flutnet-runtime` and the canonical
//! `contract.json` the native dispatcher is built from.
//!
//! ### Design Notes
//! - Output is deterministic: services, operations, and data types keep
//!   their validated declaration order and artifacts are sorted by path.
//! - Synthesis is all-or-nothing. Hard diagnostics abort before rendering,
//!   and nothing is written until every artifact has rendered.
//! - Regeneration over existing output requires an explicit overwrite flag.
//!
//! ## Index
//! - Public API: [`BridgeSynthesizer`], [`SynthesisError`], [`PackageBundle`], [`PackageManifest`]
//! - Rendering: [`dart`], [`native`]

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod dart;
pub mod error;
pub mod native;
pub mod synthesizer;
pub mod types;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::SynthesisError;
pub use synthesizer::BridgeSynthesizer;
pub use synthesizer::read_manifest;
pub use types::Artifact;
pub use types::ArtifactSide;
pub use types::MANIFEST_FILE;
pub use types::ManifestEntry;
pub use types::PackageBundle;
pub use types::PackageManifest;

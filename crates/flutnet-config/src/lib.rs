// crates/flutnet-config/src/lib.rs
// ============================================================================
// Module: Flutnet Config Library
// Description: Canonical config model, resolution, and validation.
// Purpose: Single source of truth for flutnet.toml semantics.
// Dependencies: flutnet-core, serde, toml
// ============================================================================

//! ## Overview
//! `flutnet-config` defines the `flutnet.toml` model shared by the CLI and
//! any embedding tool: package identity defaults, output placement, and the
//! log level. Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;

// crates/flutnet-cli/src/lib.rs
// ============================================================================
// Module: Flutnet CLI Library
// Description: Shared helpers for the Flutnet command-line interface.
// Purpose: Provide reusable components for the CLI binary and tests.
// Dependencies: flutnet-bridge-gen, flutnet-config, flutnet-core, tracing-subscriber
// ============================================================================

//! ## Overview
//! This library houses the message catalog, logging setup, and the `exec`
//! action handlers. The binary entry point (`src/main.rs`) imports these
//! helpers so user-facing output stays consistent.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Auxiliary JSON actions behind `flutnet exec`.
pub mod exec;
/// Message catalog and translation helpers.
pub mod i18n;
/// Global `tracing` subscriber setup.
pub mod logging;

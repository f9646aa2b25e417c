// crates/flutnet-cli/src/i18n.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: Provides the message catalog and substitution for the CLI.
// Purpose: Centralize user-facing strings.
// Dependencies: Standard library collections.
// ============================================================================

//! ## Overview
//! The Flutnet CLI stores user-facing strings in a small catalog so messaging
//! stays consistent. All runtime output should be routed through the
//! [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to the key itself.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// The placeholder name used in message templates (e.g., `"path"`).
    pub key: &'static str,
    /// The formatted string value to substitute for this placeholder.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`] from a key and displayable value.
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Message templates keyed by id.
const CATALOG: &[(&str, &str)] = &[
    ("main.version", "flutnet {version}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("logging.init_failed", "Failed to initialize logging: {error}"),
    ("logging.level_invalid", "Invalid log level from {source}: {error}"),
    ("metadata.load_failed", "Failed to load assembly metadata from {path}: {error}"),
    ("metadata.invalid", "Assembly metadata at {path} is malformed: {error}"),
    ("package.invalid", "Invalid package settings: {error}"),
    ("pack.failed", "Package synthesis failed: {error}"),
    ("pack.ok", "Wrote {count} artifacts for {package} to {path}"),
    ("check.failed", "Package check failed: {error}"),
    ("check.ok", "Package at {path} matches the contract"),
    ("validate.summary", "{assembly}: {services} service(s), {operations} operation(s), {data_types} data type(s)"),
    ("validate.diagnostic", "- {diagnostic}"),
    ("validate.no_diagnostics", "No diagnostics."),
    ("validate.failed", "Contract validation reported {count} error(s)."),
    ("validate.serialize_failed", "Failed to serialize the validation report: {error}"),
    ("exec.read_failed", "Failed to read exec input {path}: {error}"),
    ("exec.parse_failed", "Failed to parse exec input {path}: {error}"),
    ("exec.serialize_failed", "Failed to serialize exec output: {error}"),
    ("exec.write_failed", "Failed to write exec output {path}: {error}"),
    ("exec.action_failed", "Exec action `{action}` failed: {error}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
];

/// Returns the message catalog.
pub(crate) fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    CATALOG_MAP.get_or_init(|| CATALOG.iter().copied().collect())
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Looks up `key` while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a catalog message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}

// ============================================================================
// SECTION: Tests
// ============================================================================

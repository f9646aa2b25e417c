// crates/flutnet-core/src/naming.rs
// ============================================================================
// Module: Flutnet Naming
// Description: Canonical identifiers shared by the generator and dispatcher.
// Purpose: Provide strongly typed names with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque strings at rest. The operation and event id scheme
//! (`<service>.<member>`) is defined here once so the Dart proxies emitted by
//! the bridge generator and the runtime dispatch table always agree.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Separator between the service name and the member name in ids.
pub const MEMBER_SEPARATOR: char = '.';

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Fully qualified .NET type name (for example `Acme.Services.Greeter`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeName(String);

impl TypeName {
    /// Creates a new type name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the simple name without namespace or generic arity suffix.
    #[must_use]
    pub fn simple_name(&self) -> &str {
        let tail = self.0.rsplit(['.', '+']).next().unwrap_or(&self.0);
        tail.split('`').next().unwrap_or(tail)
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TypeName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TypeName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Stable operation identifier used on the wire.
///
/// # Invariants
/// - Built from a service name and an operation name joined by
///   [`MEMBER_SEPARATOR`]; operation names never contain the separator, so the
///   last separator splits the id unambiguously.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(String);

impl OperationId {
    /// Derives the id for an operation of a service.
    #[must_use]
    pub fn for_operation(service: &TypeName, operation: &str) -> Self {
        Self(format!("{service}{MEMBER_SEPARATOR}{operation}"))
    }

    /// Wraps a raw id received from a transport.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the id into service and operation name parts.
    #[must_use]
    pub fn split(&self) -> Option<(&str, &str)> {
        self.0.rsplit_once(MEMBER_SEPARATOR)
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for OperationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for OperationId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Stable event identifier used on the wire.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Derives the id for an event of a service.
    #[must_use]
    pub fn for_event(service: &TypeName, event: &str) -> Self {
        Self(format!("{service}{MEMBER_SEPARATOR}{event}"))
    }

    /// Wraps a raw id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for EventId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Case Helpers
// ============================================================================

/// Converts an identifier to `snake_case` (used for file names and Rust items).
#[must_use]
pub fn snake_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    let chars: Vec<char> = value.chars().collect();
    for (index, ch) in chars.iter().enumerate() {
        if !ch.is_ascii_alphanumeric() {
            if !out.ends_with('_') && !out.is_empty() {
                out.push('_');
            }
            continue;
        }
        if ch.is_ascii_uppercase() {
            let prev_lower = index > 0 && chars[index - 1].is_ascii_lowercase();
            let prev_digit = index > 0 && chars[index - 1].is_ascii_digit();
            let next_lower = chars.get(index + 1).is_some_and(char::is_ascii_lowercase);
            let prev_upper = index > 0 && chars[index - 1].is_ascii_uppercase();
            if !out.is_empty()
                && !out.ends_with('_')
                && (prev_lower || prev_digit || (prev_upper && next_lower))
            {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(*ch);
        }
    }
    out.trim_end_matches('_').to_string()
}

/// Converts an identifier to `lowerCamelCase` (used for Dart members).
#[must_use]
pub fn lower_camel_case(value: &str) -> String {
    let pascal = pascal_case(value);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Converts an identifier to `PascalCase`.
#[must_use]
pub fn pascal_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut upper_next = true;
    for ch in value.chars() {
        if !ch.is_ascii_alphanumeric() {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_id_joins_service_and_operation() {
        let id = OperationId::for_operation(&TypeName::new("Acme.Greeter"), "Hello");
        assert_eq!(id.as_str(), "Acme.Greeter.Hello");
        assert_eq!(id.split(), Some(("Acme.Greeter", "Hello")));
    }

    #[test]
    fn simple_name_strips_namespace_and_arity() {
        assert_eq!(TypeName::new("Acme.Models.Person").simple_name(), "Person");
        assert_eq!(TypeName::new("Acme.Outer+Inner").simple_name(), "Inner");
        assert_eq!(TypeName::new("Acme.Box`1").simple_name(), "Box");
    }

    #[test]
    fn case_helpers_cover_acronyms() {
        assert_eq!(snake_case("GetHTTPStatus"), "get_http_status");
        assert_eq!(snake_case("Hello"), "hello");
        assert_eq!(snake_case("UserId2Name"), "user_id2_name");
        assert_eq!(lower_camel_case("FirstName"), "firstName");
        assert_eq!(pascal_case("first_name"), "FirstName");
    }
}

// crates/flutnet-core/src/signature.rs
// ============================================================================
// Module: Signature Analyzer
// Description: Canonical and formal signatures for platform operations.
// Purpose: Detect overload collisions under Dart's no-overloading rule.
// Dependencies: crate::metadata
// ============================================================================

//! ## Overview
//! Two signatures are computed per method:
//! - The canonical signature is the method name alone. Dart has no overload
//!   resolution, so `Foo(int)` and `Foo(string)` collide even though the host
//!   language tells them apart.
//! - The formal signature (name, parameter kinds, and types without the
//!   return type) is kept for diagnostics. Extension receivers appear in it
//!   as `this T` although they are not invocable parameters.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::metadata::MethodMetadata;
use crate::metadata::ParameterMetadata;
use crate::metadata::TypeRef;

// ============================================================================
// SECTION: Known Type Names
// ============================================================================

/// Non-generic task type.
pub const TASK: &str = "System.Threading.Tasks.Task";
/// Generic task definition.
pub const TASK_OF: &str = "System.Threading.Tasks.Task`1";

// ============================================================================
// SECTION: Signatures
// ============================================================================

/// Returns the canonical (name-only) signature of a method.
#[must_use]
pub fn canonical_signature(method: &MethodMetadata) -> String {
    method.name.clone()
}

/// Returns the formal signature of a method, excluding the return type.
#[must_use]
pub fn formal_signature(method: &MethodMetadata) -> String {
    let mut out = method.name.clone();
    if method.generic_arity > 0 {
        let _ = write!(out, "`{}", method.generic_arity);
    }
    out.push('(');
    for (index, parameter) in method.parameters.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        if index == 0 && method.is_extension {
            out.push_str("this ");
        }
        if let Some(keyword) = parameter.mode.keyword() {
            out.push_str(keyword);
            out.push(' ');
        }
        let _ = write!(out, "{}", parameter.ty);
    }
    out.push(')');
    out
}

/// Returns the parameters a caller supplies, skipping any extension receiver.
#[must_use]
pub fn invokable_parameters(method: &MethodMetadata) -> &[ParameterMetadata] {
    if method.is_extension { method.parameters.get(1 ..).unwrap_or(&[]) } else { &method.parameters }
}

// ============================================================================
// SECTION: Return Forms
// ============================================================================

/// Syntactic form of a method's return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnForm<'a> {
    /// `void`.
    Void,
    /// Plain `Task`.
    Task,
    /// `Task<T>` with its value type.
    TaskOf(&'a TypeRef),
    /// Any other synchronous value.
    Value(&'a TypeRef),
}

/// Analyzes the return type of a method.
#[must_use]
pub fn return_form(returns: &TypeRef) -> ReturnForm<'_> {
    match returns {
        ty if ty.is_void() => ReturnForm::Void,
        TypeRef::Named(name) if name == TASK => ReturnForm::Task,
        TypeRef::Generic {
            generic,
            arguments,
        } if generic == TASK_OF && arguments.len() == 1 => ReturnForm::TaskOf(&arguments[0]),
        other => ReturnForm::Value(other),
    }
}

// ============================================================================
// SECTION: Collision Detection
// ============================================================================

/// Group of operations sharing one canonical signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    /// Shared canonical signature.
    pub canonical: String,
    /// Formal signatures of the colliding operations, in input order.
    pub formal: Vec<String>,
}

/// Finds canonical-signature collisions among methods.
///
/// Results are ordered by canonical signature; each colliding name appears
/// exactly once regardless of how many overloads share it.
#[must_use]
pub fn find_collisions<'a>(methods: impl IntoIterator<Item = &'a MethodMetadata>) -> Vec<Collision> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for method in methods {
        groups.entry(canonical_signature(method)).or_default().push(formal_signature(method));
    }
    groups
        .into_iter()
        .filter(|(_, formal)| formal.len() > 1)
        .map(|(canonical, formal)| Collision {
            canonical,
            formal,
        })
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

// crates/flutnet-core/src/metadata.rs
// ============================================================================
// Module: Assembly Metadata
// Description: Typed description of a compiled library's public surface.
// Purpose: Replace live reflection with an explicit, serializable input model.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The assembly loader (an external collaborator) describes every candidate
//! type as [`TypeMetadata`]: its members, annotation flags, and full type
//! references. The validator operates on this description only, so analysis
//! is portable and repeatable.
//!
//! Metadata documents are untrusted input. [`AssemblyMetadata::load`] enforces
//! [`MAX_METADATA_BYTES`] and fails closed on parse errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum metadata document size accepted by the loader.
pub const MAX_METADATA_BYTES: u64 = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised for unreadable or structurally malformed metadata.
///
/// # Invariants
/// - These are input-integrity failures, not contract violations; contract
///   problems are reported as diagnostics instead.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// IO error while reading the metadata document.
    #[error("metadata io error: {0}")]
    Io(String),
    /// JSON parsing error.
    #[error("metadata parse error: {0}")]
    Parse(String),
    /// Structurally invalid metadata (empty or duplicate names, size limits).
    #[error("invalid metadata: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Type References
// ============================================================================

/// Reference to a type as written in a member signature.
///
/// Serialized compactly: a bare string names a type, `{"array": T}` is an
/// array, and `{"generic": "...`N", "arguments": [...]}` is a constructed
/// generic type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeRef {
    /// Non-generic named type such as `System.Int32`.
    Named(String),
    /// Single-dimension array.
    Array {
        /// Element type.
        array: Box<TypeRef>,
    },
    /// Constructed generic type.
    Generic {
        /// Open generic definition name including arity (``List`1``).
        generic: String,
        /// Type arguments in declaration order.
        arguments: Vec<TypeRef>,
    },
}

impl TypeRef {
    /// Builds a named type reference.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Builds an array type reference.
    #[must_use]
    pub fn array(element: Self) -> Self {
        Self::Array {
            array: Box::new(element),
        }
    }

    /// Builds a constructed generic type reference.
    #[must_use]
    pub fn generic(definition: impl Into<String>, arguments: Vec<Self>) -> Self {
        Self::Generic {
            generic: definition.into(),
            arguments,
        }
    }

    /// Returns true for `System.Void`.
    #[must_use]
    pub fn is_void(&self) -> bool {
        matches!(self, Self::Named(name) if name == "System.Void")
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Array {
                array,
            } => write!(f, "{array}[]"),
            Self::Generic {
                generic,
                arguments,
            } => {
                let base = generic.split('`').next().unwrap_or(generic);
                write!(f, "{base}<")?;
                for (index, argument) in arguments.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{argument}")?;
                }
                f.write_str(">")
            }
        }
    }
}

// ============================================================================
// SECTION: Member Metadata
// ============================================================================

/// Kind of a described type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// Reference type.
    Class,
    /// Interface type.
    Interface,
    /// Value type.
    Struct,
    /// Enumeration.
    Enum,
}

/// Member accessibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Public member.
    #[default]
    Public,
    /// Assembly-internal member.
    Internal,
    /// Protected member.
    Protected,
    /// Private member.
    Private,
}

/// Parameter passing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassMode {
    /// Passed by value.
    #[default]
    Value,
    /// Passed by reference (`ref`).
    Ref,
    /// Output parameter (`out`).
    Out,
}

impl PassMode {
    /// Returns the keyword used in formal signatures, if any.
    #[must_use]
    pub const fn keyword(self) -> Option<&'static str> {
        match self {
            Self::Value => None,
            Self::Ref => Some("ref"),
            Self::Out => Some("out"),
        }
    }
}

/// Method parameter description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterMetadata {
    /// Parameter name.
    pub name: String,
    /// Parameter type.
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// Passing mode.
    #[serde(default)]
    pub mode: PassMode,
}

/// Method description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodMetadata {
    /// Declared method name.
    pub name: String,
    /// Accessibility.
    #[serde(default)]
    pub visibility: Visibility,
    /// True for static methods.
    #[serde(default)]
    pub is_static: bool,
    /// True when the first parameter is an extension receiver.
    #[serde(default)]
    pub is_extension: bool,
    /// Interface implemented explicitly by this method, if any.
    #[serde(default)]
    pub explicit_interface: Option<String>,
    /// True when the method carries the platform operation marker.
    #[serde(default)]
    pub operation: bool,
    /// Number of generic type parameters declared on the method.
    #[serde(default)]
    pub generic_arity: u32,
    /// Parameters in declaration order (including any extension receiver).
    #[serde(default)]
    pub parameters: Vec<ParameterMetadata>,
    /// Return type.
    pub returns: TypeRef,
}

/// Field or property description of a data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMetadata {
    /// Member name as serialized on the wire.
    pub name: String,
    /// Member type.
    #[serde(rename = "type")]
    pub ty: TypeRef,
}

/// Event description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Event name.
    pub name: String,
    /// Delegate type of the event handler.
    pub handler: TypeRef,
}

/// Description of a single candidate type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMetadata {
    /// Fully qualified type name.
    pub name: String,
    /// Type kind.
    pub kind: TypeKind,
    /// Base type name, when the type derives from a non-root type.
    #[serde(default)]
    pub base: Option<String>,
    /// Directly implemented interfaces.
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// True when the type carries the platform service marker.
    #[serde(default)]
    pub service: bool,
    /// True when the type carries the platform data marker.
    #[serde(default)]
    pub data: bool,
    /// Declared methods.
    #[serde(default)]
    pub methods: Vec<MethodMetadata>,
    /// Public fields and properties in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldMetadata>,
    /// Declared events.
    #[serde(default)]
    pub events: Vec<EventMetadata>,
    /// Enumeration member names in declaration order.
    #[serde(default)]
    pub members: Vec<String>,
}

impl TypeMetadata {
    /// Creates an empty description of the given kind.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            base: None,
            interfaces: Vec::new(),
            service: false,
            data: false,
            methods: Vec::new(),
            fields: Vec::new(),
            events: Vec::new(),
            members: Vec::new(),
        }
    }
}

// ============================================================================
// SECTION: Assembly Metadata
// ============================================================================

/// Description of a compiled library handed to the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyMetadata {
    /// Assembly name.
    pub name: String,
    /// Candidate types in declaration order.
    pub types: Vec<TypeMetadata>,
}

impl AssemblyMetadata {
    /// Loads a metadata document from disk.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError`] when the file cannot be read, exceeds
    /// [`MAX_METADATA_BYTES`], or is not valid metadata JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MetadataError> {
        let bytes = read_limited(path.as_ref())?;
        Self::from_slice(&bytes)
    }

    /// Parses a metadata document from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Parse`] when the bytes are not metadata JSON.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MetadataError> {
        serde_json::from_slice(bytes).map_err(|err| MetadataError::Parse(err.to_string()))
    }
}

/// Reads a file while enforcing the metadata size limit.
fn read_limited(path: &Path) -> Result<Vec<u8>, MetadataError> {
    let file = fs::File::open(path).map_err(|err| MetadataError::Io(err.to_string()))?;
    let metadata = file.metadata().map_err(|err| MetadataError::Io(err.to_string()))?;
    if metadata.len() > MAX_METADATA_BYTES {
        return Err(MetadataError::Invalid(format!(
            "metadata input exceeds {MAX_METADATA_BYTES} bytes"
        )));
    }
    let mut bytes = Vec::new();
    let mut limited = file.take(MAX_METADATA_BYTES + 1);
    limited.read_to_end(&mut bytes).map_err(|err| MetadataError::Io(err.to_string()))?;
    let size = u64::try_from(bytes.len())
        .map_err(|_| MetadataError::Invalid("metadata size exceeds addressable memory".into()))?;
    if size > MAX_METADATA_BYTES {
        return Err(MetadataError::Invalid(format!(
            "metadata input exceeds {MAX_METADATA_BYTES} bytes"
        )));
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

    use super::*;

    #[test]
    fn type_refs_parse_from_compact_json() {
        let parsed: TypeRef = serde_json::from_str(
            r#"{"generic": "System.Collections.Generic.Dictionary`2",
                "arguments": ["System.String", {"array": "System.Int32"}]}"#,
        )
        .unwrap();
        assert_eq!(
            parsed,
            TypeRef::generic(
                "System.Collections.Generic.Dictionary`2",
                vec![TypeRef::named("System.String"), TypeRef::array(TypeRef::named("System.Int32"))],
            )
        );
        assert_eq!(
            parsed.to_string(),
            "System.Collections.Generic.Dictionary<System.String, System.Int32[]>"
        );
    }

    #[test]
    fn type_metadata_defaults_optional_members() {
        let parsed: TypeMetadata =
            serde_json::from_str(r#"{"name": "Acme.Empty", "kind": "class"}"#).unwrap();
        assert_eq!(parsed, TypeMetadata::new("Acme.Empty", TypeKind::Class));
    }

    #[test]
    fn load_rejects_oversized_documents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.json");
        let size = usize::try_from(MAX_METADATA_BYTES + 1).unwrap();
        fs::write(&path, vec![b' '; size]).unwrap();
        assert!(matches!(AssemblyMetadata::load(&path), Err(MetadataError::Invalid(_))));
    }
}

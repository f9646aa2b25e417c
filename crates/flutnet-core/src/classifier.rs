// crates/flutnet-core/src/classifier.rs
// ============================================================================
// Module: Type Classifier
// Description: Decides which .NET types have a legal Dart representation.
// Purpose: Map type references to semantic types or report why they cannot cross.
// Dependencies: crate::{metadata, model}
// ============================================================================

//! ## Overview
//! Classification is a pure function of the type graph. The primitive table
//! is explicit and asymmetric: signed integers, floats, booleans, chars,
//! strings, and the single unsigned byte map to Dart primitives, while wider
//! unsigned and pointer-sized integers are rejected because Dart has no safe
//! representation for them.
//!
//! Generic collections classify recursively. User-defined types are accepted
//! only when marked as platform data; looking like data is not enough.
//! Unsupported results carry every offending leaf so callers can aggregate
//! them into diagnostics.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::metadata::AssemblyMetadata;
use crate::metadata::TypeKind;
use crate::metadata::TypeMetadata;
use crate::metadata::TypeRef;
pub use crate::model::PrimitiveKind;
use crate::model::SemanticType;
use crate::naming::TypeName;

// ============================================================================
// SECTION: Known Type Names
// ============================================================================

/// CLR primitives with no safe Dart mapping.
const UNSUPPORTED_PRIMITIVES: &[&str] = &[
    "System.UInt16",
    "System.UInt32",
    "System.UInt64",
    "System.IntPtr",
    "System.UIntPtr",
    "System.Object",
    "System.Decimal",
    "System.Void",
];

/// Generic definitions classified as lists.
const LIST_GENERICS: &[&str] = &[
    "System.Collections.Generic.List`1",
    "System.Collections.Generic.IList`1",
    "System.Collections.Generic.ICollection`1",
    "System.Collections.Generic.IReadOnlyList`1",
    "System.Collections.Generic.IReadOnlyCollection`1",
];

/// Generic definitions classified as enumerables.
const ENUMERABLE_GENERICS: &[&str] = &["System.Collections.Generic.IEnumerable`1"];

/// Generic definitions classified as maps.
const MAP_GENERICS: &[&str] = &[
    "System.Collections.Generic.Dictionary`2",
    "System.Collections.Generic.IDictionary`2",
    "System.Collections.Generic.IReadOnlyDictionary`2",
];

/// Nullable wrapper definition.
pub const NULLABLE_GENERIC: &str = "System.Nullable`1";

/// Returns the supported primitive for a CLR type name.
#[must_use]
pub fn primitive_for(name: &str) -> Option<PrimitiveKind> {
    PrimitiveKind::all().into_iter().find(|primitive| primitive.clr_name() == name)
}

/// Returns true when the CLR type name is an explicitly unsupported primitive.
#[must_use]
pub fn is_unsupported_primitive(name: &str) -> bool {
    UNSUPPORTED_PRIMITIVES.contains(&name)
}

// ============================================================================
// SECTION: Classification Results
// ============================================================================

/// Reason a type cannot cross the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedReason {
    /// Primitive without a Dart mapping (wide unsigned, pointer-sized, ...).
    UnsupportedPrimitive,
    /// Map key other than `System.String`.
    NonStringMapKey,
    /// Generic definition outside the supported collection set.
    UnsupportedGeneric,
    /// User-defined type not marked as platform data.
    NotMarked,
    /// Platform service or interface used as a value.
    ServiceType,
    /// Type not described by the metadata.
    UnknownType,
}

impl fmt::Display for UnsupportedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UnsupportedPrimitive => "primitive has no Dart representation",
            Self::NonStringMapKey => "map keys must be System.String",
            Self::UnsupportedGeneric => "generic type is not supported",
            Self::NotMarked => "type is not marked as platform data",
            Self::ServiceType => "service types cannot be passed as data",
            Self::UnknownType => "type is not part of the analyzed metadata",
        };
        f.write_str(text)
    }
}

/// One offending type found during classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsupportedCause {
    /// Display form of the offending type.
    pub type_name: String,
    /// Reason it is unsupported.
    pub reason: UnsupportedReason,
}

impl fmt::Display for UnsupportedCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.type_name, self.reason)
    }
}

/// Classification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The type crosses the boundary as the given semantic type.
    Supported(SemanticType),
    /// The type cannot cross; every offending leaf is listed.
    Unsupported(Vec<UnsupportedCause>),
}

impl Classification {
    /// Returns the semantic type when supported.
    #[must_use]
    pub fn supported(self) -> Option<SemanticType> {
        match self {
            Self::Supported(ty) => Some(ty),
            Self::Unsupported(_) => None,
        }
    }

    /// Builds a single-cause unsupported result.
    fn single(ty: &impl fmt::Display, reason: UnsupportedReason) -> Self {
        Self::Unsupported(vec![UnsupportedCause {
            type_name: ty.to_string(),
            reason,
        }])
    }
}

// ============================================================================
// SECTION: Type Classifier
// ============================================================================

/// Classifier over the candidate types of one assembly.
#[derive(Debug, Clone)]
pub struct TypeClassifier<'a> {
    /// Candidate types keyed by qualified name.
    types: BTreeMap<&'a str, &'a TypeMetadata>,
}

impl<'a> TypeClassifier<'a> {
    /// Indexes the candidate types of an assembly.
    #[must_use]
    pub fn new(assembly: &'a AssemblyMetadata) -> Self {
        let types = assembly.types.iter().map(|ty| (ty.name.as_str(), ty)).collect();
        Self {
            types,
        }
    }

    /// Returns the metadata for a candidate type.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&'a TypeMetadata> {
        self.types.get(name).copied()
    }

    /// Classifies a type reference.
    #[must_use]
    pub fn classify(&self, ty: &TypeRef) -> Classification {
        match ty {
            TypeRef::Named(name) => self.classify_named(name),
            TypeRef::Array {
                array,
            } => map_supported(self.classify(array), SemanticType::list),
            TypeRef::Generic {
                generic,
                arguments,
            } => self.classify_generic(ty, generic, arguments),
        }
    }

    /// Classifies a non-generic named type.
    fn classify_named(&self, name: &str) -> Classification {
        if let Some(primitive) = primitive_for(name) {
            return Classification::Supported(SemanticType::primitive(primitive));
        }
        if is_unsupported_primitive(name) {
            return Classification::single(&name, UnsupportedReason::UnsupportedPrimitive);
        }
        let Some(candidate) = self.lookup(name) else {
            return Classification::single(&name, UnsupportedReason::UnknownType);
        };
        if candidate.kind == TypeKind::Interface || (candidate.service && !candidate.data) {
            return Classification::single(&name, UnsupportedReason::ServiceType);
        }
        if !candidate.data {
            return Classification::single(&name, UnsupportedReason::NotMarked);
        }
        let name = TypeName::new(name);
        if candidate.kind == TypeKind::Enum {
            Classification::Supported(SemanticType::Enum {
                name,
            })
        } else {
            Classification::Supported(SemanticType::Data {
                name,
            })
        }
    }

    /// Classifies a constructed generic type.
    fn classify_generic(&self, ty: &TypeRef, generic: &str, arguments: &[TypeRef]) -> Classification {
        match arguments {
            [single] if generic == NULLABLE_GENERIC => {
                map_supported(self.classify(single), SemanticType::nullable)
            }
            [single] if LIST_GENERICS.contains(&generic) || ENUMERABLE_GENERICS.contains(&generic) => {
                map_supported(self.classify(single), SemanticType::list)
            }
            [key, value] if MAP_GENERICS.contains(&generic) => {
                let mut causes = Vec::new();
                if !matches!(key, TypeRef::Named(name) if name == PrimitiveKind::String.clr_name())
                {
                    causes.push(UnsupportedCause {
                        type_name: key.to_string(),
                        reason: UnsupportedReason::NonStringMapKey,
                    });
                }
                match self.classify(value) {
                    Classification::Supported(value) if causes.is_empty() => {
                        Classification::Supported(SemanticType::map(value))
                    }
                    Classification::Supported(_) => Classification::Unsupported(causes),
                    Classification::Unsupported(inner) => {
                        causes.extend(inner);
                        Classification::Unsupported(causes)
                    }
                }
            }
            _ => Classification::single(ty, UnsupportedReason::UnsupportedGeneric),
        }
    }
}

/// Applies a wrapper to a supported classification.
fn map_supported(
    classification: Classification,
    wrap: impl FnOnce(SemanticType) -> SemanticType,
) -> Classification {
    match classification {
        Classification::Supported(inner) => Classification::Supported(wrap(inner)),
        unsupported @ Classification::Unsupported(_) => unsupported,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

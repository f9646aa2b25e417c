// crates/flutnet-core/src/model.rs
// ============================================================================
// Module: Contract Model
// Description: Validated cross-language contract produced by the validator.
// Purpose: Provide immutable service, operation, data, and event definitions.
// Dependencies: crate::naming, serde
// ============================================================================

//! ## Overview
//! The contract model is the validator's output and the only input of the
//! bridge generator. It is serialized into every generated package
//! (`native/contract.json`) so the runtime dispatcher checks arguments against
//! exactly the shapes the Dart proxies were generated from.
//!
//! Definitions are built once during validation and never mutated afterwards.
//! Ordering is declaration order, which keeps generated output stable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::metadata::PassMode;
use crate::naming::EventId;
use crate::naming::OperationId;
use crate::naming::TypeName;

// ============================================================================
// SECTION: Semantic Types
// ============================================================================

/// Primitive types with a safe Dart representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    /// `System.Boolean`.
    Bool,
    /// `System.Byte`, the only supported unsigned integer.
    U8,
    /// `System.SByte`.
    I8,
    /// `System.Int16`.
    I16,
    /// `System.Int32`.
    I32,
    /// `System.Int64`.
    I64,
    /// `System.Single`.
    F32,
    /// `System.Double`.
    F64,
    /// `System.Char`.
    Char,
    /// `System.String`.
    String,
}

impl PrimitiveKind {
    /// Returns the CLR type name of the primitive.
    #[must_use]
    pub const fn clr_name(self) -> &'static str {
        match self {
            Self::Bool => "System.Boolean",
            Self::U8 => "System.Byte",
            Self::I8 => "System.SByte",
            Self::I16 => "System.Int16",
            Self::I32 => "System.Int32",
            Self::I64 => "System.Int64",
            Self::F32 => "System.Single",
            Self::F64 => "System.Double",
            Self::Char => "System.Char",
            Self::String => "System.String",
        }
    }

    /// Returns the inclusive integer range for integer primitives.
    #[must_use]
    pub const fn integer_range(self) -> Option<(i64, i64)> {
        match self {
            Self::U8 => Some((0, 255)),
            Self::I8 => Some((-128, 127)),
            Self::I16 => Some((-32_768, 32_767)),
            Self::I32 => Some((-2_147_483_648, 2_147_483_647)),
            Self::I64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    /// Returns every supported primitive.
    #[must_use]
    pub const fn all() -> [Self; 10] {
        [
            Self::Bool,
            Self::U8,
            Self::I8,
            Self::I16,
            Self::I32,
            Self::I64,
            Self::F32,
            Self::F64,
            Self::Char,
            Self::String,
        ]
    }
}

/// Classified type able to cross the language boundary.
///
/// # Invariants
/// - `Data` and `Enum` always name a marked data type of the same model.
/// - `Nullable` never wraps another `Nullable`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SemanticType {
    /// Primitive value.
    Primitive {
        /// Primitive kind.
        primitive: PrimitiveKind,
    },
    /// Nullable wrapper (`Nullable<T>`), rendered as `T?` in Dart.
    Nullable {
        /// Wrapped type.
        inner: Box<SemanticType>,
    },
    /// Array, list, or enumerable.
    List {
        /// Element type.
        element: Box<SemanticType>,
    },
    /// Map keyed by strings.
    Map {
        /// Value type.
        value: Box<SemanticType>,
    },
    /// Marked composite data type.
    Data {
        /// Data type name.
        name: TypeName,
    },
    /// Marked enumeration.
    Enum {
        /// Enumeration name.
        name: TypeName,
    },
}

impl SemanticType {
    /// Shorthand for a primitive type.
    #[must_use]
    pub const fn primitive(primitive: PrimitiveKind) -> Self {
        Self::Primitive {
            primitive,
        }
    }

    /// Shorthand for a list type.
    #[must_use]
    pub fn list(element: Self) -> Self {
        Self::List {
            element: Box::new(element),
        }
    }

    /// Shorthand for a string-keyed map type.
    #[must_use]
    pub fn map(value: Self) -> Self {
        Self::Map {
            value: Box::new(value),
        }
    }

    /// Shorthand for a nullable wrapper.
    #[must_use]
    pub fn nullable(inner: Self) -> Self {
        match inner {
            Self::Nullable {
                ..
            } => inner,
            other => Self::Nullable {
                inner: Box::new(other),
            },
        }
    }

    /// Returns true for nullable wrappers.
    #[must_use]
    pub const fn is_nullable(&self) -> bool {
        matches!(self, Self::Nullable { .. })
    }

    /// Collects the user-defined types referenced by this type.
    pub fn collect_named(&self, out: &mut BTreeSet<TypeName>) {
        match self {
            Self::Primitive {
                ..
            } => {}
            Self::Nullable {
                inner: nested,
            }
            | Self::List {
                element: nested,
            }
            | Self::Map {
                value: nested,
            } => nested.collect_named(out),
            Self::Data {
                name,
            }
            | Self::Enum {
                name,
            } => {
                out.insert(name.clone());
            }
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive {
                primitive,
            } => f.write_str(primitive.clr_name()),
            Self::Nullable {
                inner,
            } => write!(f, "{inner}?"),
            Self::List {
                element,
            } => write!(f, "List<{element}>"),
            Self::Map {
                value,
            } => write!(f, "Map<System.String, {value}>"),
            Self::Data {
                name,
            }
            | Self::Enum {
                name,
            } => name.fmt(f),
        }
    }
}

// ============================================================================
// SECTION: Operations
// ============================================================================

/// Return shape of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ReturnShape {
    /// `void`: no reply is expected.
    FireAndForget,
    /// Synchronous value-returning call.
    Sync {
        /// Returned value type.
        value: SemanticType,
    },
    /// Asynchronous call; the reply is sent when the task resolves.
    Async {
        /// Resolved value type, `None` for a plain `Task`.
        value: Option<SemanticType>,
    },
}

impl ReturnShape {
    /// Returns the value type carried by a reply, if any.
    #[must_use]
    pub const fn value(&self) -> Option<&SemanticType> {
        match self {
            Self::FireAndForget => None,
            Self::Sync {
                value,
            } => Some(value),
            Self::Async {
                value,
            } => value.as_ref(),
        }
    }
}

/// Invocable parameter of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    /// Parameter name.
    pub name: String,
    /// Classified parameter type.
    #[serde(rename = "type")]
    pub ty: SemanticType,
    /// Passing mode (always by-value for accepted operations).
    pub mode: PassMode,
}

/// One invocable platform operation.
///
/// # Invariants
/// - `canonical_signature` is unique within the owning service.
/// - `parameters` excludes any extension receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationDefinition {
    /// Declared operation name.
    pub name: String,
    /// Wire operation id.
    pub id: OperationId,
    /// Invocable parameters in declaration order.
    pub parameters: Vec<ParameterDefinition>,
    /// Return shape.
    pub returns: ReturnShape,
    /// True when bound to a static context rather than an instance.
    pub is_static: bool,
    /// Name-only key used for collision detection.
    pub canonical_signature: String,
    /// Declarative signature kept for diagnostics.
    pub formal_signature: String,
}

// ============================================================================
// SECTION: Events
// ============================================================================

/// Platform event observable from Dart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDefinition {
    /// Event name.
    pub name: String,
    /// Wire event id.
    pub id: EventId,
    /// Payload type; `None` for the no-payload handler shape.
    pub payload: Option<SemanticType>,
}

// ============================================================================
// SECTION: Services
// ============================================================================

/// Validated platform service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    /// Qualified service name.
    pub name: TypeName,
    /// Accepted operations in declaration order.
    pub operations: Vec<OperationDefinition>,
    /// Accepted events in declaration order.
    pub events: Vec<EventDefinition>,
    /// Data types referenced by operations and events.
    pub data_types: BTreeSet<TypeName>,
}

// ============================================================================
// SECTION: Data Types
// ============================================================================

/// Field of a composite data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name as serialized on the wire.
    pub name: String,
    /// Classified field type.
    #[serde(rename = "type")]
    pub ty: SemanticType,
}

/// Shape of a user-defined data type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataKind {
    /// Composite with declared fields and an optional marked base.
    Composite {
        /// Fields declared on this type (inherited fields live on the base).
        fields: Vec<FieldDefinition>,
        /// Marked base data type.
        base: Option<TypeName>,
    },
    /// Enumeration with member names in declaration order.
    Enumeration {
        /// Member names.
        members: Vec<String>,
    },
}

/// Marked data type crossing the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTypeDefinition {
    /// Qualified type name.
    pub name: TypeName,
    /// Composite or enumeration shape.
    #[serde(flatten)]
    pub kind: DataKind,
}

// ============================================================================
// SECTION: Contract Model
// ============================================================================

/// Validated contract for one assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractModel {
    /// Source assembly name.
    pub assembly: String,
    /// Services in declaration order.
    pub services: Vec<ServiceDefinition>,
    /// Data types in declaration order.
    pub data_types: Vec<DataTypeDefinition>,
}

impl ContractModel {
    /// Looks up a service by name.
    #[must_use]
    pub fn service(&self, name: &TypeName) -> Option<&ServiceDefinition> {
        self.services.iter().find(|service| &service.name == name)
    }

    /// Looks up an operation and its owning service by operation id.
    #[must_use]
    pub fn operation(&self, id: &OperationId) -> Option<(&ServiceDefinition, &OperationDefinition)> {
        self.services.iter().find_map(|service| {
            service.operations.iter().find(|op| &op.id == id).map(|op| (service, op))
        })
    }

    /// Looks up an event by id.
    #[must_use]
    pub fn event(&self, id: &EventId) -> Option<&EventDefinition> {
        self.services.iter().flat_map(|service| service.events.iter()).find(|ev| &ev.id == id)
    }

    /// Looks up a data type by name.
    #[must_use]
    pub fn data_type(&self, name: &TypeName) -> Option<&DataTypeDefinition> {
        self.data_types.iter().find(|data| &data.name == name)
    }

    /// Returns the full field list of a composite, inherited fields first.
    ///
    /// Returns an empty list for enumerations and unknown names. Cycles in
    /// the base chain are cut at the first repeated type.
    #[must_use]
    pub fn all_fields(&self, name: &TypeName) -> Vec<&FieldDefinition> {
        let mut chain = Vec::new();
        let mut seen = BTreeSet::new();
        let mut current = Some(name);
        while let Some(type_name) = current {
            if !seen.insert(type_name) {
                break;
            }
            match self.data_type(type_name).map(|data| &data.kind) {
                Some(DataKind::Composite {
                    fields,
                    base,
                }) => {
                    chain.push(fields);
                    current = base.as_ref();
                }
                _ => break,
            }
        }
        chain.into_iter().rev().flat_map(|fields| fields.iter()).collect()
    }
}

// crates/flutnet-runtime/src/codec.rs
// ============================================================================
// Module: Wire Codec
// Description: Contract-driven encoding of values crossing the boundary.
// Purpose: Check transport values against semantic types and convert data trees.
// Dependencies: flutnet-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The codec interprets `serde_json::Value` payloads under a
//! [`SemanticType`] from the contract model. Composite values are JSON objects
//! keyed by field name with inherited fields first; enums travel as member
//! names; chars as one-character strings; nullables as `null` or the inner
//! value. There is no polymorphic type tag, so a subtype value decodes as
//! exactly the declared type.
//!
//! [`WireCodec::check`] is what the dispatcher uses to reject malformed
//! arguments before any native code runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use flutnet_core::ContractModel;
use flutnet_core::DataKind;
use flutnet_core::PrimitiveKind;
use flutnet_core::SemanticType;
use flutnet_core::TypeName;
use serde_json::Map;
use serde_json::Number;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Data Values
// ============================================================================

/// Decoded value tree.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// Absent nullable value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Any integer primitive.
    Integer(i64),
    /// Any floating-point primitive.
    Float(f64),
    /// Single character.
    Char(char),
    /// String.
    String(String),
    /// List elements.
    List(Vec<DataValue>),
    /// String-keyed map.
    Map(BTreeMap<String, DataValue>),
    /// Composite fields in contract order, inherited fields first.
    Record(Vec<(String, DataValue)>),
    /// Enumeration member name.
    Enum(String),
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Mismatch between a value and its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Value has the wrong JSON shape.
    #[error("{path}: expected {expected}, found {found}")]
    Mismatch {
        /// Location inside the value.
        path: String,
        /// Expected type.
        expected: String,
        /// Found value kind.
        found: String,
    },
    /// Number outside the primitive's range.
    #[error("{path}: {value} is out of range for {expected}")]
    OutOfRange {
        /// Location inside the value.
        path: String,
        /// Offending number.
        value: String,
        /// Expected primitive.
        expected: String,
    },
    /// Required field absent from a composite.
    #[error("{path}: missing field `{field}`")]
    MissingField {
        /// Location of the composite.
        path: String,
        /// Missing field.
        field: String,
    },
    /// Field not declared by the composite.
    #[error("{path}: unknown field `{field}`")]
    UnknownField {
        /// Location of the composite.
        path: String,
        /// Unexpected field.
        field: String,
    },
    /// Name that is not a member of the enumeration.
    #[error("{path}: `{member}` is not a member of {type_name}")]
    UnknownMember {
        /// Location inside the value.
        path: String,
        /// Offending member.
        member: String,
        /// Enumeration name.
        type_name: String,
    },
    /// Data type absent from the contract.
    #[error("{path}: type {type_name} is not part of the contract")]
    UnknownType {
        /// Location inside the value.
        path: String,
        /// Missing type.
        type_name: String,
    },
}

// ============================================================================
// SECTION: Codec
// ============================================================================

/// Codec bound to one contract model.
#[derive(Debug, Clone, Copy)]
pub struct WireCodec<'a> {
    /// Model resolving data type names.
    model: &'a ContractModel,
}

impl<'a> WireCodec<'a> {
    /// Creates a codec over a model.
    #[must_use]
    pub const fn new(model: &'a ContractModel) -> Self {
        Self {
            model,
        }
    }

    /// Checks that a transport value matches a type.
    ///
    /// # Errors
    ///
    /// Returns the first [`CodecError`] found.
    pub fn check(&self, value: &Value, ty: &SemanticType) -> Result<(), CodecError> {
        self.decode_at(value, ty, "$").map(|_| ())
    }

    /// Decodes a transport value into a [`DataValue`] tree.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when the value does not match `ty`.
    pub fn decode(&self, value: &Value, ty: &SemanticType) -> Result<DataValue, CodecError> {
        self.decode_at(value, ty, "$")
    }

    /// Encodes a [`DataValue`] tree into a transport value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when the tree does not match `ty`.
    pub fn encode(&self, value: &DataValue, ty: &SemanticType) -> Result<Value, CodecError> {
        self.encode_at(value, ty, "$")
    }

    // ------------------------------------------------------------------------
    // Decoding
    // ------------------------------------------------------------------------

    /// Decodes a value at a path.
    fn decode_at(&self, value: &Value, ty: &SemanticType, path: &str) -> Result<DataValue, CodecError> {
        match ty {
            SemanticType::Primitive {
                primitive,
            } => decode_primitive(value, *primitive, path),
            SemanticType::Nullable {
                inner,
            } => match value {
                Value::Null => Ok(DataValue::Null),
                other => self.decode_at(other, inner, path),
            },
            SemanticType::List {
                element,
            } => {
                let Value::Array(items) = value else {
                    return Err(mismatch(path, ty, value));
                };
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| self.decode_at(item, element, &format!("{path}[{index}]")))
                    .collect::<Result<_, _>>()
                    .map(DataValue::List)
            }
            SemanticType::Map {
                value: value_ty,
            } => {
                let Value::Object(entries) = value else {
                    return Err(mismatch(path, ty, value));
                };
                entries
                    .iter()
                    .map(|(key, item)| {
                        self.decode_at(item, value_ty, &format!("{path}.{key}"))
                            .map(|decoded| (key.clone(), decoded))
                    })
                    .collect::<Result<_, _>>()
                    .map(DataValue::Map)
            }
            SemanticType::Data {
                name,
            } => self.decode_record(value, name, path),
            SemanticType::Enum {
                name,
            } => {
                let Value::String(member) = value else {
                    return Err(mismatch(path, ty, value));
                };
                self.enum_member(name, member, path)?;
                Ok(DataValue::Enum(member.clone()))
            }
        }
    }

    /// Decodes a composite object.
    fn decode_record(&self, value: &Value, name: &TypeName, path: &str) -> Result<DataValue, CodecError> {
        let Value::Object(entries) = value else {
            return Err(CodecError::Mismatch {
                path: path.to_string(),
                expected: name.to_string(),
                found: kind_of(value).to_string(),
            });
        };
        let fields = self.record_fields(name, path)?;
        if let Some(unknown) = entries.keys().find(|key| !fields.iter().any(|(field, _)| *field == key.as_str())) {
            return Err(CodecError::UnknownField {
                path: path.to_string(),
                field: unknown.clone(),
            });
        }
        let mut decoded = Vec::with_capacity(fields.len());
        for (field, field_ty) in fields {
            let field_path = format!("{path}.{field}");
            let item = match entries.get(field) {
                Some(item) => self.decode_at(item, field_ty, &field_path)?,
                None if field_ty.is_nullable() => DataValue::Null,
                None => {
                    return Err(CodecError::MissingField {
                        path: path.to_string(),
                        field: field.to_string(),
                    });
                }
            };
            decoded.push((field.to_string(), item));
        }
        Ok(DataValue::Record(decoded))
    }

    // ------------------------------------------------------------------------
    // Encoding
    // ------------------------------------------------------------------------

    /// Encodes a value at a path.
    fn encode_at(&self, value: &DataValue, ty: &SemanticType, path: &str) -> Result<Value, CodecError> {
        let shape_error = || CodecError::Mismatch {
            path: path.to_string(),
            expected: ty.to_string(),
            found: data_kind_of(value).to_string(),
        };
        match (ty, value) {
            (
                SemanticType::Nullable {
                    ..
                },
                DataValue::Null,
            ) => Ok(Value::Null),
            (
                SemanticType::Nullable {
                    inner,
                },
                other,
            ) => self.encode_at(other, inner, path),
            (
                SemanticType::Primitive {
                    primitive,
                },
                _,
            ) => encode_primitive(value, *primitive, path).ok_or_else(shape_error)?,
            (
                SemanticType::List {
                    element,
                },
                DataValue::List(items),
            ) => items
                .iter()
                .enumerate()
                .map(|(index, item)| self.encode_at(item, element, &format!("{path}[{index}]")))
                .collect::<Result<_, _>>()
                .map(Value::Array),
            (
                SemanticType::Map {
                    value: value_ty,
                },
                DataValue::Map(entries),
            ) => entries
                .iter()
                .map(|(key, item)| {
                    self.encode_at(item, value_ty, &format!("{path}.{key}")).map(|encoded| (key.clone(), encoded))
                })
                .collect::<Result<Map<_, _>, _>>()
                .map(Value::Object),
            (
                SemanticType::Data {
                    name,
                },
                DataValue::Record(entries),
            ) => self.encode_record(entries, name, path),
            (
                SemanticType::Enum {
                    name,
                },
                DataValue::Enum(member),
            ) => {
                self.enum_member(name, member, path)?;
                Ok(Value::String(member.clone()))
            }
            _ => Err(shape_error()),
        }
    }

    /// Encodes a composite record.
    fn encode_record(
        &self,
        entries: &[(String, DataValue)],
        name: &TypeName,
        path: &str,
    ) -> Result<Value, CodecError> {
        let fields = self.record_fields(name, path)?;
        if let Some((unknown, _)) =
            entries.iter().find(|(key, _)| !fields.iter().any(|(field, _)| *field == key.as_str()))
        {
            return Err(CodecError::UnknownField {
                path: path.to_string(),
                field: unknown.clone(),
            });
        }
        let mut object = Map::new();
        for (field, field_ty) in fields {
            let field_path = format!("{path}.{field}");
            let encoded = match entries.iter().find(|(key, _)| key.as_str() == field) {
                Some((_, item)) => self.encode_at(item, field_ty, &field_path)?,
                None if field_ty.is_nullable() => Value::Null,
                None => {
                    return Err(CodecError::MissingField {
                        path: path.to_string(),
                        field: field.to_string(),
                    });
                }
            };
            object.insert(field.to_string(), encoded);
        }
        Ok(Value::Object(object))
    }

    // ------------------------------------------------------------------------
    // Model lookups
    // ------------------------------------------------------------------------

    /// Returns the full field list of a composite.
    fn record_fields(&self, name: &TypeName, path: &str) -> Result<Vec<(&'a str, &'a SemanticType)>, CodecError> {
        match self.model.data_type(name).map(|data| &data.kind) {
            Some(DataKind::Composite {
                ..
            }) => Ok(self
                .model
                .all_fields(name)
                .into_iter()
                .map(|field| (field.name.as_str(), &field.ty))
                .collect()),
            _ => Err(CodecError::UnknownType {
                path: path.to_string(),
                type_name: name.to_string(),
            }),
        }
    }

    /// Checks that `member` belongs to the enumeration `name`.
    fn enum_member(&self, name: &TypeName, member: &str, path: &str) -> Result<(), CodecError> {
        match self.model.data_type(name).map(|data| &data.kind) {
            Some(DataKind::Enumeration {
                members,
            }) if members.iter().any(|candidate| candidate == member) => Ok(()),
            Some(DataKind::Enumeration {
                ..
            }) => Err(CodecError::UnknownMember {
                path: path.to_string(),
                member: member.to_string(),
                type_name: name.to_string(),
            }),
            _ => Err(CodecError::UnknownType {
                path: path.to_string(),
                type_name: name.to_string(),
            }),
        }
    }
}

// ============================================================================
// SECTION: Primitive Helpers
// ============================================================================

/// Decodes a primitive value.
fn decode_primitive(value: &Value, primitive: PrimitiveKind, path: &str) -> Result<DataValue, CodecError> {
    let expected = SemanticType::primitive(primitive);
    match (primitive, value) {
        (PrimitiveKind::Bool, Value::Bool(flag)) => Ok(DataValue::Bool(*flag)),
        (PrimitiveKind::String, Value::String(text)) => Ok(DataValue::String(text.clone())),
        (PrimitiveKind::Char, Value::String(text)) => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Ok(DataValue::Char(ch)),
                _ => Err(CodecError::Mismatch {
                    path: path.to_string(),
                    expected: expected.to_string(),
                    found: format!("string of {} characters", text.chars().count()),
                }),
            }
        }
        (PrimitiveKind::F32 | PrimitiveKind::F64, Value::Number(number)) => {
            let float = number.as_f64().ok_or_else(|| mismatch(path, &expected, value))?;
            if primitive == PrimitiveKind::F32 && float.abs() > f64::from(f32::MAX) {
                return Err(out_of_range(path, number, &expected));
            }
            Ok(DataValue::Float(float))
        }
        (_, Value::Number(number)) => {
            let Some((min, max)) = primitive.integer_range() else {
                return Err(mismatch(path, &expected, value));
            };
            let integer = number.as_i64().ok_or_else(|| out_of_range(path, number, &expected))?;
            if integer < min || integer > max {
                return Err(out_of_range(path, number, &expected));
            }
            Ok(DataValue::Integer(integer))
        }
        _ => Err(mismatch(path, &expected, value)),
    }
}

/// Encodes a primitive value, or `None` on a shape mismatch.
fn encode_primitive(
    value: &DataValue,
    primitive: PrimitiveKind,
    path: &str,
) -> Option<Result<Value, CodecError>> {
    let expected = SemanticType::primitive(primitive);
    let encoded = match (primitive, value) {
        (PrimitiveKind::Bool, DataValue::Bool(flag)) => Ok(Value::Bool(*flag)),
        (PrimitiveKind::String, DataValue::String(text)) => Ok(Value::String(text.clone())),
        (PrimitiveKind::Char, DataValue::Char(ch)) => Ok(Value::String(ch.to_string())),
        (PrimitiveKind::F32 | PrimitiveKind::F64, DataValue::Float(float)) => Number::from_f64(*float)
            .filter(|_| primitive == PrimitiveKind::F64 || float.abs() <= f64::from(f32::MAX))
            .map(Value::Number)
            .ok_or_else(|| CodecError::OutOfRange {
                path: path.to_string(),
                value: float.to_string(),
                expected: expected.to_string(),
            }),
        (_, DataValue::Integer(integer)) => {
            let (min, max) = primitive.integer_range()?;
            if *integer < min || *integer > max {
                Err(CodecError::OutOfRange {
                    path: path.to_string(),
                    value: integer.to_string(),
                    expected: expected.to_string(),
                })
            } else {
                Ok(Value::Number((*integer).into()))
            }
        }
        _ => return None,
    };
    Some(encoded)
}

/// Builds a shape mismatch error.
fn mismatch(path: &str, expected: &SemanticType, found: &Value) -> CodecError {
    CodecError::Mismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        found: kind_of(found).to_string(),
    }
}

/// Builds a range error.
fn out_of_range(path: &str, number: &Number, expected: &SemanticType) -> CodecError {
    CodecError::OutOfRange {
        path: path.to_string(),
        value: number.to_string(),
        expected: expected.to_string(),
    }
}

/// Describes the JSON kind of a value.
const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Describes the kind of a data value.
const fn data_kind_of(value: &DataValue) -> &'static str {
    match value {
        DataValue::Null => "null",
        DataValue::Bool(_) => "boolean",
        DataValue::Integer(_) => "integer",
        DataValue::Float(_) => "float",
        DataValue::Char(_) => "char",
        DataValue::String(_) => "string",
        DataValue::List(_) => "list",
        DataValue::Map(_) => "map",
        DataValue::Record(_) => "record",
        DataValue::Enum(_) => "enum member",
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

    use flutnet_core::DataTypeDefinition;
    use flutnet_core::FieldDefinition;
    use serde_json::json;

    use super::*;

    fn model() -> ContractModel {
        ContractModel {
            assembly: "Acme".to_string(),
            services: Vec::new(),
            data_types: vec![
                DataTypeDefinition {
                    name: TypeName::new("Acme.Mood"),
                    kind: DataKind::Enumeration {
                        members: vec!["Happy".to_string(), "Sad".to_string()],
                    },
                },
                DataTypeDefinition {
                    name: TypeName::new("Acme.Person"),
                    kind: DataKind::Composite {
                        fields: vec![
                            FieldDefinition {
                                name: "Name".to_string(),
                                ty: SemanticType::primitive(PrimitiveKind::String),
                            },
                            FieldDefinition {
                                name: "Mood".to_string(),
                                ty: SemanticType::nullable(SemanticType::Enum {
                                    name: TypeName::new("Acme.Mood"),
                                }),
                            },
                        ],
                        base: None,
                    },
                },
            ],
        }
    }

    fn person() -> SemanticType {
        SemanticType::Data {
            name: TypeName::new("Acme.Person"),
        }
    }

    #[test]
    fn optional_nullable_fields_may_be_omitted() {
        let model = model();
        let codec = WireCodec::new(&model);
        let decoded = codec.decode(&json!({ "Name": "Ada" }), &person()).unwrap();
        assert_eq!(
            decoded,
            DataValue::Record(vec![
                ("Name".to_string(), DataValue::String("Ada".to_string())),
                ("Mood".to_string(), DataValue::Null),
            ])
        );
        assert_eq!(codec.encode(&decoded, &person()).unwrap(), json!({ "Name": "Ada", "Mood": null }));
    }

    #[test]
    fn errors_name_the_offending_path() {
        let model = model();
        let codec = WireCodec::new(&model);
        let list = SemanticType::list(person());
        let err = codec.check(&json!([{ "Name": "Ada", "Mood": "Angry" }]), &list).unwrap_err();
        assert_eq!(
            err,
            CodecError::UnknownMember {
                path: "$[0].Mood".to_string(),
                member: "Angry".to_string(),
                type_name: "Acme.Mood".to_string(),
            }
        );
        let err = codec.check(&json!({ "Mood": null }), &person()).unwrap_err();
        assert!(matches!(err, CodecError::MissingField { field, .. } if field == "Name"));
        let err = codec.check(&json!({ "Name": "A", "Age": 3 }), &person()).unwrap_err();
        assert!(matches!(err, CodecError::UnknownField { field, .. } if field == "Age"));
    }

    #[test]
    fn integer_ranges_are_enforced() {
        let model = model();
        let codec = WireCodec::new(&model);
        let byte = SemanticType::primitive(PrimitiveKind::U8);
        assert!(codec.check(&json!(255), &byte).is_ok());
        assert!(matches!(codec.check(&json!(256), &byte), Err(CodecError::OutOfRange { .. })));
        assert!(matches!(codec.check(&json!(1.5), &byte), Err(CodecError::OutOfRange { .. })));
        assert!(codec.check(&json!("x"), &SemanticType::primitive(PrimitiveKind::Char)).is_ok());
        assert!(codec.check(&json!("xy"), &SemanticType::primitive(PrimitiveKind::Char)).is_err());
    }
}

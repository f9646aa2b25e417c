// crates/flutnet-core/src/validator/tests.rs
// ============================================================================
// Module: Contract Validator Tests
// Description: Rule-by-rule coverage of contract validation.
// Purpose: Pin diagnostics, exclusions, and model shapes per rule.
// Dependencies: crate::validator, serde_json
// ============================================================================

//! ## Overview
//! Each test builds a small assembly description from JSON and checks the
//! diagnostics and the resulting model.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use serde_json::json;

use super::*;
use crate::diagnostics::Severity;
use crate::model::PrimitiveKind;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn assembly(types: serde_json::Value) -> AssemblyMetadata {
    serde_json::from_value(json!({ "name": "Acme", "types": types })).unwrap()
}

fn validate(types: serde_json::Value) -> ValidationOutcome {
    let assembly = assembly(types);
    ContractValidator::new(&assembly).unwrap().validate()
}

fn kinds(outcome: &ValidationOutcome) -> Vec<DiagnosticKind> {
    outcome.report.diagnostics().iter().map(|diag| diag.kind).collect()
}

fn op(name: &str, params: serde_json::Value, returns: serde_json::Value) -> serde_json::Value {
    json!({ "name": name, "operation": true, "parameters": params, "returns": returns })
}

// ============================================================================
// SECTION: Construction
// ============================================================================

#[test]
fn new_rejects_duplicate_type_names() {
    let assembly = assembly(json!([
        { "name": "Acme.A", "kind": "class" },
        { "name": "Acme.A", "kind": "class" }
    ]));
    assert!(matches!(ContractValidator::new(&assembly), Err(MetadataError::Invalid(_))));
}

#[test]
fn new_rejects_empty_names() {
    let assembly = assembly(json!([{ "name": " ", "kind": "class" }]));
    assert!(ContractValidator::new(&assembly).is_err());
}

// ============================================================================
// SECTION: Services and Operations
// ============================================================================

#[test]
fn greeter_interface_validates_cleanly() {
    let outcome = validate(json!([{
        "name": "Acme.Greeter",
        "kind": "interface",
        "service": true,
        "methods": [op("Hello", json!([{ "name": "name", "type": "System.String" }]), json!("System.String"))]
    }]));
    assert!(outcome.report.is_empty(), "{}", outcome.report);
    let service = &outcome.model.services[0];
    let hello = &service.operations[0];
    assert_eq!(hello.id.as_str(), "Acme.Greeter.Hello");
    assert_eq!(
        hello.returns,
        ReturnShape::Sync {
            value: SemanticType::primitive(PrimitiveKind::String)
        }
    );
    assert_eq!(hello.parameters[0].name, "name");
}

#[test]
fn overloads_yield_one_duplicate_diagnostic() {
    let outcome = validate(json!([{
        "name": "Acme.Calc",
        "kind": "class",
        "service": true,
        "methods": [
            op("Foo", json!([{ "name": "x", "type": "System.Int32" }]), json!("System.Void")),
            op("Foo", json!([{ "name": "x", "type": "System.String" }]), json!("System.Void")),
            op("Bar", json!([]), json!("System.Void"))
        ]
    }]));
    assert_eq!(kinds(&outcome), vec![DiagnosticKind::DuplicateOperationName]);
    let diagnostic = &outcome.report.diagnostics()[0];
    assert!(diagnostic.subject.ends_with("Foo"));
    assert_eq!(diagnostic.related.len(), 2);
    let names: Vec<&str> =
        outcome.model.services[0].operations.iter().map(|op| op.name.as_str()).collect();
    assert_eq!(names, vec!["Bar"]);
}

#[test]
fn class_implementing_marked_interface_is_a_service() {
    let outcome = validate(json!([
        {
            "name": "Acme.IBase",
            "kind": "interface",
            "service": true,
            "methods": [op("Ping", json!([]), json!("System.Void"))]
        },
        {
            "name": "Acme.IDerived",
            "kind": "interface",
            "interfaces": ["Acme.IBase"]
        },
        {
            "name": "Acme.Impl",
            "kind": "class",
            "interfaces": ["Acme.IDerived"],
            "methods": [
                op("Ping", json!([]), json!("System.Void")),
                op("Extra", json!([]), json!("System.Threading.Tasks.Task"))
            ]
        }
    ]));
    assert!(outcome.report.is_empty(), "{}", outcome.report);
    let names: Vec<&str> = outcome.model.services.iter().map(|svc| svc.name.as_str()).collect();
    assert_eq!(names, vec!["Acme.IBase", "Acme.IDerived", "Acme.Impl"]);
    let impl_ops: Vec<&str> =
        outcome.model.services[2].operations.iter().map(|op| op.name.as_str()).collect();
    assert_eq!(impl_ops, vec!["Ping", "Extra"]);
    assert_eq!(
        outcome.model.services[2].operations[1].returns,
        ReturnShape::Async {
            value: None
        }
    );
}

#[test]
fn collisions_span_merged_interfaces() {
    let outcome = validate(json!([
        {
            "name": "Acme.IA",
            "kind": "interface",
            "service": true,
            "methods": [op("Run", json!([{ "name": "x", "type": "System.Int32" }]), json!("System.Void"))]
        },
        {
            "name": "Acme.Impl",
            "kind": "class",
            "interfaces": ["Acme.IA"],
            "methods": [op("Run", json!([]), json!("System.Void"))]
        }
    ]));
    assert_eq!(outcome.report.of_kind(DiagnosticKind::DuplicateOperationName).count(), 1);
    assert!(outcome.model.services[1].operations.is_empty());
}

#[test]
fn interface_overloads_are_reported_once_for_every_inheritor() {
    let outcome = validate(json!([
        {
            "name": "Acme.IGreeter",
            "kind": "interface",
            "service": true,
            "methods": [
                op("Foo", json!([{ "name": "x", "type": "System.Int32" }]), json!("System.Void")),
                op("Foo", json!([{ "name": "x", "type": "System.String" }]), json!("System.Void"))
            ]
        },
        { "name": "Acme.IChild", "kind": "interface", "interfaces": ["Acme.IGreeter"] },
        { "name": "Acme.Greeter", "kind": "class", "interfaces": ["Acme.IGreeter"] }
    ]));
    let duplicates: Vec<&Diagnostic> =
        outcome.report.of_kind(DiagnosticKind::DuplicateOperationName).collect();
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].subject, "Acme.IGreeter.Foo");
    assert_eq!(outcome.report.len(), 1);
    assert_eq!(outcome.model.services.len(), 3);
    assert!(outcome.model.services.iter().all(|service| service.operations.is_empty()));
}

#[test]
fn interface_member_errors_name_the_declaring_interface() {
    let outcome = validate(json!([
        {
            "name": "Acme.IBad",
            "kind": "interface",
            "service": true,
            "methods": [op("Get", json!([]), json!("System.UInt32"))],
            "events": [{ "name": "Changed", "handler": "System.Action" }]
        },
        { "name": "Acme.First", "kind": "class", "interfaces": ["Acme.IBad"] },
        { "name": "Acme.Second", "kind": "class", "interfaces": ["Acme.IBad"],
          "methods": [op("Own", json!([]), json!("System.UInt64"))] }
    ]));
    let invalid: Vec<&str> = outcome
        .report
        .of_kind(DiagnosticKind::InvalidOperationSignature)
        .map(|diag| diag.subject.as_str())
        .collect();
    assert_eq!(invalid.len(), 2);
    assert!(invalid[0].starts_with("Acme.IBad.Get"));
    assert!(invalid[1].starts_with("Acme.Second.Own"));
    let events: Vec<&Diagnostic> = outcome.report.of_kind(DiagnosticKind::UnsupportedEventShape).collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].subject, "Acme.IBad.Changed");
}

#[test]
fn unsupported_parameter_rejects_whole_operation() {
    let outcome = validate(json!([{
        "name": "Acme.Svc",
        "kind": "class",
        "service": true,
        "methods": [
            op("Count", json!([{ "name": "n", "type": "System.UInt32" }]), json!("System.Int32")),
            op("Ok", json!([]), json!({ "generic": "System.Threading.Tasks.Task`1", "arguments": ["System.Int64"] }))
        ]
    }]));
    assert_eq!(kinds(&outcome), vec![DiagnosticKind::InvalidOperationSignature]);
    let diagnostic = &outcome.report.diagnostics()[0];
    assert_eq!(diagnostic.causes[0].type_name, "System.UInt32");
    let ops = &outcome.model.services[0].operations;
    assert_eq!(ops.len(), 1);
    assert_eq!(
        ops[0].returns,
        ReturnShape::Async {
            value: Some(SemanticType::primitive(PrimitiveKind::I64))
        }
    );
}

#[test]
fn ref_out_and_generic_methods_are_invalid() {
    let outcome = validate(json!([{
        "name": "Acme.Svc",
        "kind": "class",
        "service": true,
        "methods": [
            op("TryGet", json!([{ "name": "v", "type": "System.Int32", "mode": "out" }]), json!("System.Boolean")),
            { "name": "Make", "operation": true, "generic_arity": 1, "returns": "System.Void" }
        ]
    }]));
    assert_eq!(
        kinds(&outcome),
        vec![DiagnosticKind::InvalidOperationSignature, DiagnosticKind::InvalidOperationSignature]
    );
    assert!(outcome.report.diagnostics()[0].subject.contains("out System.Int32"));
}

#[test]
fn non_public_and_explicit_operations_warn() {
    let outcome = validate(json!([{
        "name": "Acme.Svc",
        "kind": "class",
        "service": true,
        "methods": [
            { "name": "Hidden", "operation": true, "visibility": "private", "returns": "System.Void" },
            { "name": "Dispose", "operation": true, "explicit_interface": "System.IDisposable", "returns": "System.Void" },
            { "name": "Unmarked", "returns": "System.Void" }
        ]
    }]));
    assert_eq!(
        kinds(&outcome),
        vec![DiagnosticKind::NonPublicOperation, DiagnosticKind::ExplicitInterfaceOperation]
    );
    assert!(outcome.report.diagnostics().iter().all(|diag| diag.severity == Severity::Warning));
    assert!(outcome.model.services[0].operations.is_empty());
    assert!(outcome.into_model().is_ok());
}

#[test]
fn extension_receiver_is_not_invocable() {
    let outcome = validate(json!([{
        "name": "Acme.Extensions",
        "kind": "class",
        "service": true,
        "methods": [{
            "name": "Shout",
            "operation": true,
            "is_static": true,
            "is_extension": true,
            "parameters": [
                { "name": "text", "type": "System.String" },
                { "name": "times", "type": "System.Int32" }
            ],
            "returns": "System.String"
        }]
    }]));
    assert!(outcome.report.is_empty(), "{}", outcome.report);
    let shout = &outcome.model.services[0].operations[0];
    assert!(shout.is_static);
    assert_eq!(shout.parameters.len(), 1);
    assert_eq!(shout.formal_signature, "Shout(this System.String, System.Int32)");
}

// ============================================================================
// SECTION: Events
// ============================================================================

#[test]
fn events_accept_two_handler_shapes() {
    let outcome = validate(json!([{
        "name": "Acme.Svc",
        "kind": "class",
        "service": true,
        "events": [
            { "name": "Ticked", "handler": "System.EventHandler" },
            { "name": "Changed", "handler": { "generic": "System.EventHandler`1", "arguments": ["System.Int32"] } },
            { "name": "Custom", "handler": "Acme.CustomHandler" },
            { "name": "Bad", "handler": { "generic": "System.EventHandler`1", "arguments": ["System.UInt64"] } }
        ]
    }]));
    assert_eq!(
        kinds(&outcome),
        vec![DiagnosticKind::UnsupportedEventShape, DiagnosticKind::UnsupportedEventShape]
    );
    let events = &outcome.model.services[0].events;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].payload, None);
    assert_eq!(events[1].payload, Some(SemanticType::primitive(PrimitiveKind::I32)));
    assert_eq!(events[1].id.as_str(), "Acme.Svc.Changed");
}

// ============================================================================
// SECTION: Data Types
// ============================================================================

#[test]
fn marked_subtype_of_unmarked_base_is_reported_once() {
    let outcome = validate(json!([
        { "name": "Acme.Animal", "kind": "class" },
        { "name": "Acme.Dog", "kind": "class", "base": "Acme.Animal", "data": true },
        { "name": "Acme.Cat", "kind": "class", "base": "Acme.Animal", "data": true }
    ]));
    let inherited: Vec<&Diagnostic> =
        outcome.report.of_kind(DiagnosticKind::UnsupportedInheritedDataType).collect();
    assert_eq!(inherited.len(), 1);
    assert_eq!(inherited[0].subject, "Acme.Animal");
    assert_eq!(inherited[0].related, vec!["Acme.Dog".to_string(), "Acme.Cat".to_string()]);
    assert!(outcome.into_model().is_err());
}

#[test]
fn unmarked_subtype_of_marked_base_is_informational() {
    let outcome = validate(json!([
        { "name": "Acme.Shape", "kind": "class", "data": true,
          "fields": [{ "name": "Name", "type": "System.String" }] },
        { "name": "Acme.Circle", "kind": "class", "base": "Acme.Shape" },
        { "name": "Acme.Square", "kind": "class", "base": "Acme.Shape", "data": true,
          "fields": [{ "name": "Side", "type": "System.Double" }] }
    ]));
    assert_eq!(kinds(&outcome), vec![DiagnosticKind::UnmarkedDataSubtype]);
    let square = outcome.model.data_type(&TypeName::new("Acme.Square")).unwrap();
    assert_eq!(
        square.kind,
        DataKind::Composite {
            fields: vec![FieldDefinition {
                name: "Side".to_string(),
                ty: SemanticType::primitive(PrimitiveKind::F64),
            }],
            base: Some(TypeName::new("Acme.Shape")),
        }
    );
    let all: Vec<&str> = outcome
        .model
        .all_fields(&TypeName::new("Acme.Square"))
        .iter()
        .map(|field| field.name.as_str())
        .collect();
    assert_eq!(all, vec!["Name", "Side"]);
}

#[test]
fn nested_unmarked_composite_is_named_as_cause() {
    let outcome = validate(json!([
        { "name": "Acme.Address", "kind": "class",
          "fields": [{ "name": "Street", "type": "System.String" }] },
        { "name": "Acme.Person", "kind": "class", "data": true,
          "fields": [
              { "name": "Name", "type": "System.String" },
              { "name": "Home", "type": "Acme.Address" }
          ] }
    ]));
    assert_eq!(kinds(&outcome), vec![DiagnosticKind::UnsupportedDataType]);
    let diagnostic = &outcome.report.diagnostics()[0];
    assert_eq!(diagnostic.subject, "Acme.Person");
    assert_eq!(diagnostic.causes[0].type_name, "Acme.Address");
    assert!(outcome.model.data_types.is_empty());
}

#[test]
fn service_records_referenced_data_types() {
    let outcome = validate(json!([
        { "name": "Acme.Mood", "kind": "enum", "data": true, "members": ["Happy", "Sad"] },
        { "name": "Acme.Person", "kind": "struct", "data": true,
          "fields": [{ "name": "Mood", "type": { "generic": "System.Nullable`1", "arguments": ["Acme.Mood"] } }] },
        { "name": "Acme.People", "kind": "interface", "service": true,
          "methods": [op("All", json!([]), json!({ "array": "Acme.Person" }))] }
    ]));
    assert!(outcome.report.is_empty(), "{}", outcome.report);
    let service = &outcome.model.services[0];
    assert_eq!(service.data_types.iter().map(TypeName::as_str).collect::<Vec<_>>(), vec!["Acme.Person"]);
    assert_eq!(outcome.model.data_types.len(), 2);
    assert_eq!(
        outcome.model.data_types[0].kind,
        DataKind::Enumeration {
            members: vec!["Happy".to_string(), "Sad".to_string()]
        }
    );
}

#[test]
fn empty_enumerations_are_rejected() {
    let outcome = validate(json!([
        { "name": "Acme.Empty", "kind": "enum", "data": true, "members": [] }
    ]));
    assert_eq!(kinds(&outcome), vec![DiagnosticKind::UnsupportedDataType]);
    assert_eq!(outcome.report.diagnostics()[0].subject, "Acme.Empty");
    assert!(outcome.model.data_types.is_empty());
}

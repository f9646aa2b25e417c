// crates/flutnet-core/tests/proptest_classifier.rs
// ============================================================================
// Module: Classifier Property-Based Tests
// Description: Property tests for type classification and inheritance rules.
// Purpose: Check classifier and validator invariants over generated inputs.
// ============================================================================

//! Property-based tests for classification invariants.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic_in_result_fn,
    reason = "Test-only assertions and helpers are permitted."
)]

use flutnet_core::AssemblyMetadata;
use flutnet_core::Classification;
use flutnet_core::ContractValidator;
use flutnet_core::DiagnosticKind;
use flutnet_core::PrimitiveKind;
use flutnet_core::SemanticType;
use flutnet_core::TypeClassifier;
use flutnet_core::TypeKind;
use flutnet_core::TypeMetadata;
use flutnet_core::TypeRef;
use proptest::prelude::*;

const UNSUPPORTED: &[&str] =
    &["System.UInt16", "System.UInt32", "System.UInt64", "System.IntPtr", "System.UIntPtr"];

fn empty_assembly() -> AssemblyMetadata {
    AssemblyMetadata {
        name: "Acme".to_string(),
        types: Vec::new(),
    }
}

fn primitive_strategy() -> impl Strategy<Value = PrimitiveKind> {
    prop::sample::select(PrimitiveKind::all().to_vec())
}

/// Wraps a type reference in a random stack of list and map constructors.
fn wrapped(leaf: TypeRef, wrappers: &[u8]) -> TypeRef {
    wrappers.iter().fold(leaf, |inner, wrapper| match wrapper % 3 {
        0 => TypeRef::array(inner),
        1 => TypeRef::generic("System.Collections.Generic.List`1", vec![inner]),
        _ => TypeRef::generic(
            "System.Collections.Generic.Dictionary`2",
            vec![TypeRef::named("System.String"), inner],
        ),
    })
}

proptest! {
    #[test]
    fn supported_primitives_always_classify(primitive in primitive_strategy()) {
        let assembly = empty_assembly();
        let classifier = TypeClassifier::new(&assembly);
        let result = classifier.classify(&TypeRef::named(primitive.clr_name()));
        prop_assert_eq!(result, Classification::Supported(SemanticType::primitive(primitive)));
    }

    #[test]
    fn unsupported_primitives_never_classify(
        index in 0 .. UNSUPPORTED.len(),
        wrappers in prop::collection::vec(any::<u8>(), 0 .. 4),
    ) {
        let assembly = empty_assembly();
        let classifier = TypeClassifier::new(&assembly);
        let ty = wrapped(TypeRef::named(UNSUPPORTED[index]), &wrappers);
        match classifier.classify(&ty) {
            Classification::Unsupported(causes) => {
                prop_assert_eq!(causes.len(), 1);
                prop_assert_eq!(causes[0].type_name.as_str(), UNSUPPORTED[index]);
            }
            Classification::Supported(found) => prop_assert!(false, "unexpected {found}"),
        }
    }

    #[test]
    fn wrapping_preserves_support(
        primitive in primitive_strategy(),
        wrappers in prop::collection::vec(any::<u8>(), 0 .. 5),
    ) {
        let assembly = empty_assembly();
        let classifier = TypeClassifier::new(&assembly);
        let ty = wrapped(TypeRef::named(primitive.clr_name()), &wrappers);
        prop_assert!(classifier.classify(&ty).supported().is_some());
    }

    #[test]
    fn marked_subtype_of_unmarked_base_reports_exactly_once(
        subtypes in 1usize .. 5,
        base_marked in any::<bool>(),
    ) {
        let mut base = TypeMetadata::new("Acme.Base", TypeKind::Class);
        base.data = base_marked;
        let mut types = vec![base];
        for index in 0 .. subtypes {
            let mut subtype = TypeMetadata::new(format!("Acme.Sub{index}"), TypeKind::Class);
            subtype.base = Some("Acme.Base".to_string());
            subtype.data = true;
            types.push(subtype);
        }
        let assembly = AssemblyMetadata {
            name: "Acme".to_string(),
            types,
        };
        let outcome = ContractValidator::new(&assembly).unwrap().validate();
        let found: Vec<_> =
            outcome.report.of_kind(DiagnosticKind::UnsupportedInheritedDataType).collect();
        if base_marked {
            prop_assert!(found.is_empty());
        } else {
            prop_assert_eq!(found.len(), 1);
            prop_assert_eq!(found[0].related.len(), subtypes);
        }
    }
}

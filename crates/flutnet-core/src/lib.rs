// crates/flutnet-core/src/lib.rs
// ============================================================================
// Module: Flutnet Core Library
// Description: Public API surface for Flutnet contract analysis.
// Purpose: Expose the input model, classifier, signatures, and validator.
// Dependencies: crate::{metadata, classifier, signature, validator}
// ============================================================================

//! ## Overview
//! Flutnet core turns a typed description of a compiled .NET library into a
//! validated cross-language contract. The pipeline is pure and deterministic:
//! metadata goes through the [`TypeClassifier`] and the signature helpers,
//! then the [`ContractValidator`] produces a [`ContractModel`] together with a
//! [`MultiDiagnosticReport`] listing every problem found in one pass.
//!
//! The validated model is the shared vocabulary of the bridge generator and
//! the runtime dispatcher; both derive operation ids through [`naming`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod classifier;
pub mod diagnostics;
pub mod hashing;
pub mod metadata;
pub mod model;
pub mod naming;
pub mod package;
pub mod signature;
pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use classifier::Classification;
pub use classifier::PrimitiveKind;
pub use classifier::TypeClassifier;
pub use classifier::UnsupportedCause;
pub use classifier::UnsupportedReason;
pub use diagnostics::AggregateFailure;
pub use diagnostics::Diagnostic;
pub use diagnostics::DiagnosticKind;
pub use diagnostics::MultiDiagnosticReport;
pub use diagnostics::Severity;
pub use metadata::AssemblyMetadata;
pub use metadata::EventMetadata;
pub use metadata::FieldMetadata;
pub use metadata::MetadataError;
pub use metadata::MethodMetadata;
pub use metadata::ParameterMetadata;
pub use metadata::PassMode;
pub use metadata::TypeKind;
pub use metadata::TypeMetadata;
pub use metadata::TypeRef;
pub use metadata::Visibility;
pub use model::ContractModel;
pub use model::DataKind;
pub use model::DataTypeDefinition;
pub use model::EventDefinition;
pub use model::FieldDefinition;
pub use model::OperationDefinition;
pub use model::ParameterDefinition;
pub use model::ReturnShape;
pub use model::SemanticType;
pub use model::ServiceDefinition;
pub use naming::EventId;
pub use naming::OperationId;
pub use naming::TypeName;
pub use package::PackageMetadata;
pub use package::PackageMetadataError;
pub use validator::ContractValidator;
pub use validator::ValidationOutcome;

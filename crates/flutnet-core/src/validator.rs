// crates/flutnet-core/src/validator.rs
// ============================================================================
// Module: Contract Validator
// Description: Turns assembly metadata into a validated contract model.
// Purpose: Apply every contract rule and aggregate all findings in one pass.
// Dependencies: crate::{classifier, diagnostics, metadata, model, signature}, tracing
// ============================================================================

//! ## Overview
//! Validation never stops at the first problem. Each rule appends to a
//! [`MultiDiagnosticReport`] and excludes only the offending member, so one
//! run tells the contract author everything that needs fixing. The outcome
//! always carries a model; callers must consult the report (or use
//! [`ValidationOutcome::into_model`]) before generating code from it.
//!
//! Rules applied:
//! - Services are types marked as services or implementing a marked
//!   interface, directly or through interface inheritance. Operations are the
//!   union of the type's own marked methods and those of every marked
//!   interface it implements.
//! - Operation parameters and return types must classify; `ref`/`out`
//!   parameters and generic methods are rejected.
//! - Canonical signatures are unique per service.
//! - Findings about interface members name the declaring interface and are
//!   reported once, however many services inherit them.
//! - Marked non-public and explicit interface methods are reported and skipped.
//! - Marked data types must have marked bases and classifiable fields.
//! - Events use the no-payload or single-payload handler shape.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use tracing::debug;
use tracing::info;

use crate::classifier::Classification;
use crate::classifier::TypeClassifier;
use crate::classifier::UnsupportedCause;
use crate::diagnostics::AggregateFailure;
use crate::diagnostics::Diagnostic;
use crate::diagnostics::DiagnosticKind;
use crate::diagnostics::MultiDiagnosticReport;
use crate::metadata::AssemblyMetadata;
use crate::metadata::EventMetadata;
use crate::metadata::MetadataError;
use crate::metadata::MethodMetadata;
use crate::metadata::PassMode;
use crate::metadata::TypeKind;
use crate::metadata::TypeMetadata;
use crate::metadata::TypeRef;
use crate::metadata::Visibility;
use crate::model::ContractModel;
use crate::model::DataKind;
use crate::model::DataTypeDefinition;
use crate::model::EventDefinition;
use crate::model::FieldDefinition;
use crate::model::OperationDefinition;
use crate::model::ParameterDefinition;
use crate::model::ReturnShape;
use crate::model::SemanticType;
use crate::model::ServiceDefinition;
use crate::naming::EventId;
use crate::naming::OperationId;
use crate::naming::TypeName;
use crate::signature::ReturnForm;
use crate::signature::canonical_signature;
use crate::signature::find_collisions;
use crate::signature::formal_signature;
use crate::signature::invokable_parameters;
use crate::signature::return_form;

// ============================================================================
// SECTION: Known Type Names
// ============================================================================

/// Handler delegate without payload.
pub const EVENT_HANDLER: &str = "System.EventHandler";
/// Handler delegate with a single payload.
pub const EVENT_HANDLER_OF: &str = "System.EventHandler`1";

/// Base names that mean "no user-defined base".
const ROOT_BASES: &[&str] = &["System.Object", "System.ValueType", "System.Enum"];

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Result of one validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// Contract built from every member that passed validation.
    pub model: ContractModel,
    /// All findings in emission order.
    pub report: MultiDiagnosticReport,
}

impl ValidationOutcome {
    /// Returns the model when no blocking diagnostic was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateFailure`] listing every blocking diagnostic.
    pub fn into_model(self) -> Result<ContractModel, AggregateFailure> {
        self.report.into_result().map(|_| self.model)
    }
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Operation declaration considered for a service.
#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    /// Type declaring the method.
    declaring: &'a TypeMetadata,
    /// Declared method.
    method: &'a MethodMetadata,
}

/// Contract validator over one assembly.
#[derive(Debug, Clone)]
pub struct ContractValidator<'a> {
    /// Assembly under validation.
    assembly: &'a AssemblyMetadata,
    /// Classifier over the assembly's types.
    classifier: TypeClassifier<'a>,
}

impl<'a> ContractValidator<'a> {
    /// Creates a validator after checking the metadata's structure.
    ///
    /// # Errors
    ///
    /// Returns [`MetadataError::Invalid`] when a type or member name is empty
    /// or two types share a name.
    pub fn new(assembly: &'a AssemblyMetadata) -> Result<Self, MetadataError> {
        let mut seen = BTreeSet::new();
        for ty in &assembly.types {
            if ty.name.trim().is_empty() {
                return Err(MetadataError::Invalid("type name must be non-empty".to_string()));
            }
            if !seen.insert(ty.name.as_str()) {
                return Err(MetadataError::Invalid(format!("duplicate type name: {}", ty.name)));
            }
            let empty_member = ty.methods.iter().any(|method| method.name.trim().is_empty())
                || ty.fields.iter().any(|field| field.name.trim().is_empty())
                || ty.events.iter().any(|event| event.name.trim().is_empty());
            if empty_member {
                return Err(MetadataError::Invalid(format!(
                    "type {} declares a member with an empty name",
                    ty.name
                )));
            }
        }
        Ok(Self {
            assembly,
            classifier: TypeClassifier::new(assembly),
        })
    }

    /// Validates the assembly.
    #[must_use]
    pub fn validate(&self) -> ValidationOutcome {
        let mut report = MultiDiagnosticReport::new();
        self.check_inheritance(&mut report);
        let data_types = self
            .assembly
            .types
            .iter()
            .filter(|ty| ty.data)
            .filter_map(|ty| self.build_data_type(ty, &mut report))
            .collect();
        let services = self
            .assembly
            .types
            .iter()
            .filter(|ty| self.is_service(ty))
            .map(|ty| self.build_service(ty, &mut report))
            .collect::<Vec<_>>();
        let model = ContractModel {
            assembly: self.assembly.name.clone(),
            services,
            data_types,
        };
        info!(
            assembly = %model.assembly,
            services = model.services.len(),
            data_types = model.data_types.len(),
            diagnostics = report.len(),
            errors = report.errors().count(),
            "contract validated"
        );
        ValidationOutcome {
            model,
            report,
        }
    }

    // ------------------------------------------------------------------------
    // Service recognition
    // ------------------------------------------------------------------------

    /// Returns the interfaces of a type, transitively, each once.
    fn interface_closure(&self, ty: &'a TypeMetadata) -> Vec<&'a TypeMetadata> {
        let mut seen = BTreeSet::new();
        let mut ordered = Vec::new();
        let mut pending: Vec<&str> = ty.interfaces.iter().rev().map(String::as_str).collect();
        while let Some(name) = pending.pop() {
            if !seen.insert(name) {
                continue;
            }
            let Some(interface) = self.classifier.lookup(name) else {
                continue;
            };
            if interface.kind != TypeKind::Interface {
                continue;
            }
            ordered.push(interface);
            pending.extend(interface.interfaces.iter().rev().map(String::as_str));
        }
        ordered
    }

    /// Returns true when the type is exposed as a platform service.
    fn is_service(&self, ty: &'a TypeMetadata) -> bool {
        ty.kind != TypeKind::Enum
            && (ty.service || self.interface_closure(ty).iter().any(|interface| interface.service))
    }

    /// Returns the type itself followed by its marked interfaces.
    fn member_sources(&self, ty: &'a TypeMetadata) -> Vec<&'a TypeMetadata> {
        let mut sources = vec![ty];
        sources.extend(self.interface_closure(ty).into_iter().filter(|interface| interface.service));
        sources
    }

    /// Builds the service definition of a recognized type.
    fn build_service(&self, ty: &'a TypeMetadata, report: &mut MultiDiagnosticReport) -> ServiceDefinition {
        let name = TypeName::new(ty.name.as_str());
        let sources = self.member_sources(ty);
        let candidates = self.operation_candidates(&name, &sources, report);

        let collisions = find_collisions(candidates.iter().map(|candidate| candidate.method));
        let mut colliding = BTreeSet::new();
        for collision in collisions {
            let owner = Self::collision_owner(&name, &candidates, &collision.canonical);
            report.push_unique(
                Diagnostic::new(
                    DiagnosticKind::DuplicateOperationName,
                    OperationId::for_operation(&owner, &collision.canonical).as_str(),
                    format!(
                        "{} operations share the name `{}`; Dart does not support overloading",
                        collision.formal.len(),
                        collision.canonical
                    ),
                )
                .with_related(collision.formal),
            );
            colliding.insert(collision.canonical);
        }

        let mut operations = Vec::new();
        for candidate in candidates {
            if colliding.contains(&canonical_signature(candidate.method)) {
                continue;
            }
            match self.build_operation(&name, candidate) {
                Ok(operation) => operations.push(operation),
                Err(diagnostic) => {
                    report.push_unique(diagnostic);
                }
            }
        }

        let mut events = Vec::new();
        let mut event_names = BTreeSet::new();
        for source in &sources {
            for event in &source.events {
                if !event_names.insert(event.name.as_str()) {
                    continue;
                }
                match self.build_event(&name, source, event) {
                    Ok(definition) => events.push(definition),
                    Err(diagnostic) => {
                        report.push_unique(diagnostic);
                    }
                }
            }
        }

        let mut data_types = BTreeSet::new();
        for operation in &operations {
            for parameter in &operation.parameters {
                parameter.ty.collect_named(&mut data_types);
            }
            if let Some(value) = operation.returns.value() {
                value.collect_named(&mut data_types);
            }
        }
        for event in &events {
            if let Some(payload) = &event.payload {
                payload.collect_named(&mut data_types);
            }
        }

        debug!(
            service = %name,
            operations = operations.len(),
            events = events.len(),
            "service built"
        );
        ServiceDefinition {
            name,
            operations,
            events,
            data_types,
        }
    }

    /// Returns the type a collision is reported against.
    ///
    /// A collision declared entirely by one interface belongs to that
    /// interface, so every service inheriting it reports the same finding.
    fn collision_owner(service: &TypeName, candidates: &[Candidate<'a>], canonical: &str) -> TypeName {
        let declaring: BTreeSet<&str> = candidates
            .iter()
            .filter(|candidate| canonical_signature(candidate.method) == canonical)
            .map(|candidate| candidate.declaring.name.as_str())
            .collect();
        match declaring.into_iter().collect::<Vec<_>>().as_slice() {
            [single] => TypeName::new(*single),
            _ => service.clone(),
        }
    }

    /// Collects the marked, public, non-explicit methods offered by a service.
    fn operation_candidates(
        &self,
        service: &TypeName,
        sources: &[&'a TypeMetadata],
        report: &mut MultiDiagnosticReport,
    ) -> Vec<Candidate<'a>> {
        let mut candidates: Vec<Candidate<'a>> = Vec::new();
        for &declaring in sources {
            for method in declaring.methods.iter().filter(|method| method.operation) {
                let subject = format!("{}.{}", declaring.name, formal_signature(method));
                if let Some(interface) = &method.explicit_interface {
                    report.push_unique(Diagnostic::new(
                        DiagnosticKind::ExplicitInterfaceOperation,
                        subject,
                        format!("explicit implementation of {interface} is not exposed"),
                    ));
                    continue;
                }
                if declaring.kind != TypeKind::Interface && method.visibility != Visibility::Public {
                    report.push_unique(Diagnostic::new(
                        DiagnosticKind::NonPublicOperation,
                        subject,
                        "marked operation is not public and is not exposed",
                    ));
                    continue;
                }
                let formal = formal_signature(method);
                let implements_existing = candidates.iter().any(|existing| {
                    existing.declaring.name != declaring.name
                        && formal_signature(existing.method) == formal
                });
                if implements_existing {
                    debug!(service = %service, operation = %formal, "merged inherited declaration");
                    continue;
                }
                candidates.push(Candidate {
                    declaring,
                    method,
                });
            }
        }
        candidates
    }

    // ------------------------------------------------------------------------
    // Operations and events
    // ------------------------------------------------------------------------

    /// Builds an operation definition or the diagnostic rejecting it.
    ///
    /// Diagnostics name the declaring type, not the service.
    fn build_operation(
        &self,
        service: &TypeName,
        candidate: Candidate<'a>,
    ) -> Result<OperationDefinition, Diagnostic> {
        let method = candidate.method;
        let id = OperationId::for_operation(service, &method.name);
        let formal = formal_signature(method);
        let subject = format!("{}.{formal}", candidate.declaring.name);
        if method.generic_arity > 0 {
            return Err(Diagnostic::new(
                DiagnosticKind::InvalidOperationSignature,
                subject,
                "generic methods cannot be expressed in Dart",
            ));
        }

        let mut causes = Vec::new();
        let mut problems = Vec::new();
        let mut parameters = Vec::new();
        for parameter in invokable_parameters(method) {
            if parameter.mode != PassMode::Value {
                problems.push(format!(
                    "parameter `{}` is passed by {}",
                    parameter.name,
                    parameter.mode.keyword().unwrap_or("value")
                ));
                continue;
            }
            match self.classifier.classify(&parameter.ty) {
                Classification::Supported(ty) => parameters.push(ParameterDefinition {
                    name: parameter.name.clone(),
                    ty,
                    mode: parameter.mode,
                }),
                Classification::Unsupported(found) => {
                    problems.push(format!("parameter `{}` has an unsupported type", parameter.name));
                    causes.extend(found);
                }
            }
        }

        let returns = match return_form(&method.returns) {
            ReturnForm::Void => Some(ReturnShape::FireAndForget),
            ReturnForm::Task => Some(ReturnShape::Async {
                value: None,
            }),
            ReturnForm::TaskOf(ty) => self.classify_into(ty, &mut causes).map(|value| ReturnShape::Async {
                value: Some(value),
            }),
            ReturnForm::Value(ty) => self.classify_into(ty, &mut causes).map(|value| ReturnShape::Sync {
                value,
            }),
        };
        if returns.is_none() {
            problems.push("return type is unsupported".to_string());
        }

        match returns {
            Some(returns) if problems.is_empty() => Ok(OperationDefinition {
                name: method.name.clone(),
                id,
                parameters,
                returns,
                is_static: method.is_static,
                canonical_signature: canonical_signature(method),
                formal_signature: formal,
            }),
            _ => Err(Diagnostic::new(
                DiagnosticKind::InvalidOperationSignature,
                subject,
                problems.join("; "),
            )
            .with_causes(causes)),
        }
    }

    /// Classifies a type, moving unsupported causes into `causes`.
    fn classify_into(&self, ty: &TypeRef, causes: &mut Vec<UnsupportedCause>) -> Option<SemanticType> {
        match self.classifier.classify(ty) {
            Classification::Supported(semantic) => Some(semantic),
            Classification::Unsupported(found) => {
                causes.extend(found);
                None
            }
        }
    }

    /// Builds an event definition or the diagnostic rejecting it.
    fn build_event(
        &self,
        service: &TypeName,
        declaring: &TypeMetadata,
        event: &EventMetadata,
    ) -> Result<EventDefinition, Diagnostic> {
        let id = EventId::for_event(service, &event.name);
        let subject = format!("{}.{}", declaring.name, event.name);
        match &event.handler {
            TypeRef::Named(name) if name == EVENT_HANDLER => Ok(EventDefinition {
                name: event.name.clone(),
                id,
                payload: None,
            }),
            TypeRef::Generic {
                generic,
                arguments,
            } if generic == EVENT_HANDLER_OF && arguments.len() == 1 => {
                match self.classifier.classify(&arguments[0]) {
                    Classification::Supported(payload) => Ok(EventDefinition {
                        name: event.name.clone(),
                        id,
                        payload: Some(payload),
                    }),
                    Classification::Unsupported(causes) => Err(Diagnostic::new(
                        DiagnosticKind::UnsupportedEventShape,
                        subject,
                        format!("event payload of {} is unsupported", event.handler),
                    )
                    .with_causes(causes)),
                }
            }
            other => Err(Diagnostic::new(
                DiagnosticKind::UnsupportedEventShape,
                subject,
                format!(
                    "handler {other} is not supported; use {EVENT_HANDLER} or {}<T>",
                    EVENT_HANDLER
                ),
            )),
        }
    }

    // ------------------------------------------------------------------------
    // Data types
    // ------------------------------------------------------------------------

    /// Returns the user-defined base of a type, ignoring root types.
    fn user_base(ty: &TypeMetadata) -> Option<&str> {
        ty.base.as_deref().filter(|base| !ROOT_BASES.contains(base))
    }

    /// Applies the marked-subtype/marked-base rule and its converse note.
    fn check_inheritance(&self, report: &mut MultiDiagnosticReport) {
        let mut unmarked_bases: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        let mut unmarked_subtypes: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        let mut base_order = Vec::new();
        for ty in &self.assembly.types {
            let Some(base) = Self::user_base(ty) else {
                continue;
            };
            let base_marked = self.classifier.lookup(base).is_some_and(|base| base.data);
            if ty.data && !base_marked {
                if !unmarked_bases.contains_key(base) && !unmarked_subtypes.contains_key(base) {
                    base_order.push(base);
                }
                unmarked_bases.entry(base).or_default().push(ty.name.clone());
            } else if !ty.data && base_marked && ty.kind != TypeKind::Interface {
                if !unmarked_bases.contains_key(base) && !unmarked_subtypes.contains_key(base) {
                    base_order.push(base);
                }
                unmarked_subtypes.entry(base).or_default().push(ty.name.clone());
            }
        }
        for base in base_order {
            if let Some(subtypes) = unmarked_bases.remove(base) {
                report.push(
                    Diagnostic::new(
                        DiagnosticKind::UnsupportedInheritedDataType,
                        base,
                        "base type must be marked as platform data because marked subtypes derive from it",
                    )
                    .with_related(subtypes),
                );
            }
            if let Some(subtypes) = unmarked_subtypes.remove(base) {
                report.push(
                    Diagnostic::new(
                        DiagnosticKind::UnmarkedDataSubtype,
                        base,
                        "unmarked subtypes of this data type are not exposed",
                    )
                    .with_related(subtypes),
                );
            }
        }
    }

    /// Builds the definition of a marked data type.
    fn build_data_type(
        &self,
        ty: &TypeMetadata,
        report: &mut MultiDiagnosticReport,
    ) -> Option<DataTypeDefinition> {
        let name = TypeName::new(ty.name.as_str());
        match ty.kind {
            TypeKind::Enum if ty.members.is_empty() => {
                report.push(Diagnostic::new(
                    DiagnosticKind::UnsupportedDataType,
                    name.as_str(),
                    "enumerations must declare at least one member",
                ));
                None
            }
            TypeKind::Enum => Some(DataTypeDefinition {
                name,
                kind: DataKind::Enumeration {
                    members: ty.members.clone(),
                },
            }),
            TypeKind::Interface => {
                report.push(Diagnostic::new(
                    DiagnosticKind::UnsupportedDataType,
                    name.as_str(),
                    "interfaces cannot be marked as platform data",
                ));
                None
            }
            TypeKind::Class | TypeKind::Struct => {
                let mut causes = Vec::new();
                let fields: Vec<FieldDefinition> = ty
                    .fields
                    .iter()
                    .filter_map(|field| {
                        self.classify_into(&field.ty, &mut causes).map(|ty| FieldDefinition {
                            name: field.name.clone(),
                            ty,
                        })
                    })
                    .collect();
                if !causes.is_empty() {
                    report.push(
                        Diagnostic::new(
                            DiagnosticKind::UnsupportedDataType,
                            name.as_str(),
                            "data type has fields that cannot cross the boundary",
                        )
                        .with_causes(causes),
                    );
                    return None;
                }
                let base = Self::user_base(ty)
                    .filter(|base| self.classifier.lookup(base).is_some_and(|base| base.data))
                    .map(TypeName::new);
                Some(DataTypeDefinition {
                    name,
                    kind: DataKind::Composite {
                        fields,
                        base,
                    },
                })
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;

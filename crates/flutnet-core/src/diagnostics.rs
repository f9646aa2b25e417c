// crates/flutnet-core/src/diagnostics.rs
// ============================================================================
// Module: Contract Diagnostics
// Description: Validation findings and their aggregate report.
// Purpose: Collect every contract problem in one pass instead of failing fast.
// Dependencies: crate::classifier, serde, thiserror
// ============================================================================

//! ## Overview
//! Each validation rule emits [`Diagnostic`] values into a
//! [`MultiDiagnosticReport`]. Severity decides whether code generation may
//! proceed: any [`Severity::Error`] aborts synthesis, warnings and
//! informational notes do not. A report with errors converts into an
//! [`AggregateFailure`] whose message lists every finding with a 1-based
//! index.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::classifier::UnsupportedCause;

// ============================================================================
// SECTION: Kinds and Severities
// ============================================================================

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational note.
    Info,
    /// Suspicious but non-blocking.
    Warning,
    /// Blocks code generation.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// Category of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A type cannot cross the boundary.
    UnsupportedDataType,
    /// A marked subtype derives from an unmarked base.
    UnsupportedInheritedDataType,
    /// An operation has unsupported parameters, return type, or shape.
    InvalidOperationSignature,
    /// Two operations of one service share a canonical signature.
    DuplicateOperationName,
    /// An event handler has an unsupported delegate shape.
    UnsupportedEventShape,
    /// A non-public method carries the operation marker.
    NonPublicOperation,
    /// An explicit interface implementation carries the operation marker.
    ExplicitInterfaceOperation,
    /// A marked base has unmarked subtypes; they are not exposed.
    UnmarkedDataSubtype,
}

impl DiagnosticKind {
    /// Returns the severity attached to this kind.
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::UnsupportedDataType
            | Self::UnsupportedInheritedDataType
            | Self::InvalidOperationSignature
            | Self::DuplicateOperationName
            | Self::UnsupportedEventShape => Severity::Error,
            Self::NonPublicOperation | Self::ExplicitInterfaceOperation => Severity::Warning,
            Self::UnmarkedDataSubtype => Severity::Info,
        }
    }

    /// Returns the stable name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnsupportedDataType => "UnsupportedDataType",
            Self::UnsupportedInheritedDataType => "UnsupportedInheritedDataType",
            Self::InvalidOperationSignature => "InvalidOperationSignature",
            Self::DuplicateOperationName => "DuplicateOperationName",
            Self::UnsupportedEventShape => "UnsupportedEventShape",
            Self::NonPublicOperation => "NonPublicOperation",
            Self::ExplicitInterfaceOperation => "ExplicitInterfaceOperation",
            Self::UnmarkedDataSubtype => "UnmarkedDataSubtype",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Diagnostic
// ============================================================================

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Finding category.
    pub kind: DiagnosticKind,
    /// Severity derived from the kind.
    pub severity: Severity,
    /// Primary subject (type, `Type.Member`, or signature).
    pub subject: String,
    /// Related names: offending subtypes, colliding signatures, and so on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,
    /// Unsupported leaf types behind the finding.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<UnsupportedCause>,
    /// Human-readable detail.
    pub detail: String,
}

impl Diagnostic {
    /// Creates a diagnostic with the kind's default severity.
    #[must_use]
    pub fn new(kind: DiagnosticKind, subject: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            subject: subject.into(),
            related: Vec::new(),
            causes: Vec::new(),
            detail: detail.into(),
        }
    }

    /// Attaches related names.
    #[must_use]
    pub fn with_related(mut self, related: Vec<String>) -> Self {
        self.related = related;
        self
    }

    /// Attaches unsupported causes.
    #[must_use]
    pub fn with_causes(mut self, causes: Vec<UnsupportedCause>) -> Self {
        self.causes = causes;
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}: {}", self.severity, self.kind, self.subject, self.detail)?;
        if !self.related.is_empty() {
            write!(f, " (related: {})", self.related.join(", "))?;
        }
        if !self.causes.is_empty() {
            f.write_str(" (caused by: ")?;
            for (index, cause) in self.causes.iter().enumerate() {
                if index > 0 {
                    f.write_str("; ")?;
                }
                write!(f, "{cause}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Ordered collection of diagnostics from one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultiDiagnosticReport {
    /// Diagnostics in emission order.
    diagnostics: Vec<Diagnostic>,
}

impl MultiDiagnosticReport {
    /// Creates an empty report.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            diagnostics: Vec::new(),
        }
    }

    /// Appends a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Appends a diagnostic unless an equal one is already recorded.
    ///
    /// Returns true when the diagnostic was added.
    pub fn push_unique(&mut self, diagnostic: Diagnostic) -> bool {
        if self.diagnostics.contains(&diagnostic) {
            return false;
        }
        self.diagnostics.push(diagnostic);
        true
    }

    /// Returns every diagnostic in emission order.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Returns true when no diagnostics were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Returns the number of diagnostics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Returns true when any diagnostic blocks code generation.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|diag| diag.severity == Severity::Error)
    }

    /// Iterates over blocking diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|diag| diag.severity == Severity::Error)
    }

    /// Iterates over diagnostics of one kind.
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |diag| diag.kind == kind)
    }

    /// Converts a report with blocking diagnostics into an error.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateFailure`] carrying only the blocking diagnostics
    /// when [`Self::has_errors`] is true.
    pub fn into_result(self) -> Result<Self, AggregateFailure> {
        if self.has_errors() {
            Err(AggregateFailure {
                diagnostics: self.errors().cloned().collect(),
            })
        } else {
            Ok(self)
        }
    }
}

impl fmt::Display for MultiDiagnosticReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_indexed(f, &self.diagnostics)
    }
}

/// Writes diagnostics as a 1-based numbered list.
fn write_indexed(f: &mut fmt::Formatter<'_>, diagnostics: &[Diagnostic]) -> fmt::Result {
    for (index, diagnostic) in diagnostics.iter().enumerate() {
        if index > 0 {
            f.write_str("\n")?;
        }
        write!(f, "{}. {diagnostic}", index + 1)?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Aggregate Failure
// ============================================================================

/// Validation failure carrying every blocking diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct AggregateFailure {
    /// Blocking diagnostics in emission order.
    pub diagnostics: Vec<Diagnostic>,
}

impl fmt::Display for AggregateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "contract validation failed with {} error(s):", self.diagnostics.len())?;
        write_indexed(f, &self.diagnostics)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_follows_kind() {
        assert_eq!(DiagnosticKind::DuplicateOperationName.severity(), Severity::Error);
        assert_eq!(DiagnosticKind::NonPublicOperation.severity(), Severity::Warning);
        assert_eq!(DiagnosticKind::UnmarkedDataSubtype.severity(), Severity::Info);
    }

    #[test]
    fn warnings_do_not_block() {
        let mut report = MultiDiagnosticReport::new();
        report.push(Diagnostic::new(DiagnosticKind::NonPublicOperation, "Acme.Svc.Hidden", "private"));
        assert!(!report.has_errors());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn push_unique_skips_equal_findings() {
        let mut report = MultiDiagnosticReport::new();
        let finding = Diagnostic::new(DiagnosticKind::DuplicateOperationName, "Acme.IGreeter.Foo", "dup");
        assert!(report.push_unique(finding.clone()));
        assert!(!report.push_unique(finding));
        assert!(report.push_unique(Diagnostic::new(
            DiagnosticKind::DuplicateOperationName,
            "Acme.Greeter.Foo",
            "dup"
        )));
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn aggregate_failure_enumerates_errors() {
        let mut report = MultiDiagnosticReport::new();
        report.push(Diagnostic::new(DiagnosticKind::DuplicateOperationName, "Acme.Svc.Foo", "dup"));
        report.push(Diagnostic::new(DiagnosticKind::NonPublicOperation, "Acme.Svc.Bar", "hidden"));
        report.push(Diagnostic::new(DiagnosticKind::UnsupportedDataType, "Acme.Box", "unmarked"));
        let Err(failure) = report.into_result() else {
            unreachable!("report with errors must fail");
        };
        assert_eq!(failure.diagnostics.len(), 2);
        let message = failure.to_string();
        assert!(message.contains("2 error(s)"));
        assert!(message.contains("1. error [DuplicateOperationName] Acme.Svc.Foo"));
        assert!(message.contains("2. error [UnsupportedDataType] Acme.Box"));
    }
}

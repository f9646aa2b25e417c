// crates/flutnet-runtime/src/envelope.rs
// ============================================================================
// Module: Wire Envelopes
// Description: Call, reply, and event envelopes exchanged with Dart.
// Purpose: Define the logical message shapes and the structured error kinds.
// Dependencies: flutnet-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Envelopes are the only values that cross the boundary. Transport bytes are
//! the channel's concern; the dispatcher works on these logical shapes with
//! `serde_json::Value` payloads. Every runtime failure is converted into an
//! [`ErrorEnvelope`] before it leaves the dispatcher.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use flutnet_core::EventId;
use flutnet_core::OperationId;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Identifiers
// ============================================================================

/// Caller-chosen id pairing an asynchronous reply with its call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(u64);

impl CorrelationId {
    /// Wraps a raw correlation id.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Error Kinds
// ============================================================================

/// Structured dispatch failure kinds surfaced to Dart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The operation id is unknown or has no native binding.
    OperationNotImplemented,
    /// The number of arguments differs from the declared parameters.
    OperationArgumentCountMismatch,
    /// An argument does not match its declared type.
    InvalidOperationArguments,
    /// An argument matched the contract but could not be materialized.
    OperationArgumentParsingError,
    /// The native implementation failed or panicked.
    OperationFailed,
    /// The call was canceled before completion.
    OperationCanceled,
    /// The runtime has not been initialized.
    EnvironmentNotInitialized,
}

impl ErrorKind {
    /// Returns the stable wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OperationNotImplemented => "OperationNotImplemented",
            Self::OperationArgumentCountMismatch => "OperationArgumentCountMismatch",
            Self::InvalidOperationArguments => "InvalidOperationArguments",
            Self::OperationArgumentParsingError => "OperationArgumentParsingError",
            Self::OperationFailed => "OperationFailed",
            Self::OperationCanceled => "OperationCanceled",
            Self::EnvironmentNotInitialized => "EnvironmentNotInitialized",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure returned by native operation code.
///
/// Implementations return this from generated service traits; anything that
/// is not a parsing problem should use [`InvocationError::failed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct InvocationError {
    /// Failure kind.
    pub kind: ErrorKind,
    /// Diagnostic message.
    pub message: String,
}

impl InvocationError {
    /// Creates an error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Reports a failure inside the operation itself.
    #[must_use]
    pub fn failed(message: impl fmt::Display) -> Self {
        Self::new(ErrorKind::OperationFailed, message.to_string())
    }

    /// Reports an argument that could not be materialized.
    #[must_use]
    pub fn parsing(message: impl fmt::Display) -> Self {
        Self::new(ErrorKind::OperationArgumentParsingError, message.to_string())
    }
}

// ============================================================================
// SECTION: Envelopes
// ============================================================================

/// Inbound operation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEnvelope {
    /// Target operation id.
    pub operation_id: OperationId,
    /// Positional arguments.
    #[serde(default)]
    pub arguments: Vec<Value>,
    /// Correlation id for asynchronous replies and cancellation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
}

impl CallEnvelope {
    /// Creates a call without correlation id.
    #[must_use]
    pub fn new(operation_id: impl Into<OperationId>, arguments: Vec<Value>) -> Self {
        Self {
            operation_id: operation_id.into(),
            arguments,
            correlation_id: None,
        }
    }

    /// Sets the correlation id.
    #[must_use]
    pub const fn with_correlation(mut self, id: CorrelationId) -> Self {
        self.correlation_id = Some(id);
        self
    }
}

/// Structured error carried by a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Failure kind.
    pub kind: ErrorKind,
    /// Diagnostic message.
    pub message: String,
}

impl From<InvocationError> for ErrorEnvelope {
    fn from(error: InvocationError) -> Self {
        Self {
            kind: error.kind,
            message: error.message,
        }
    }
}

/// Reply payload: a result value or a structured error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyPayload {
    /// Successful result (`null` for operations without a value).
    Result(Value),
    /// Failure.
    Error(ErrorEnvelope),
}

/// Outbound reply to a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    /// Operation the reply belongs to.
    pub operation_id: OperationId,
    /// Correlation id copied from the call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,
    /// Result or error.
    pub payload: ReplyPayload,
}

impl ReplyEnvelope {
    /// Builds a successful reply.
    #[must_use]
    pub const fn success(
        operation_id: OperationId,
        correlation_id: Option<CorrelationId>,
        result: Value,
    ) -> Self {
        Self {
            operation_id,
            correlation_id,
            payload: ReplyPayload::Result(result),
        }
    }

    /// Builds an error reply.
    #[must_use]
    pub fn failure(
        operation_id: OperationId,
        correlation_id: Option<CorrelationId>,
        error: InvocationError,
    ) -> Self {
        Self {
            operation_id,
            correlation_id,
            payload: ReplyPayload::Error(error.into()),
        }
    }

    /// Returns the result value of a successful reply.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        match &self.payload {
            ReplyPayload::Result(value) => Some(value),
            ReplyPayload::Error(_) => None,
        }
    }

    /// Returns the error kind of a failed reply.
    #[must_use]
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        match &self.payload {
            ReplyPayload::Result(_) => None,
            ReplyPayload::Error(error) => Some(error.kind),
        }
    }
}

/// Outbound platform event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Event id.
    pub event_id: EventId,
    /// Payload for single-payload events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Message leaving the native side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Reply to a call.
    Reply(ReplyEnvelope),
    /// Event notification.
    Event(EventEnvelope),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

    use serde_json::json;

    use super::*;

    #[test]
    fn call_envelope_parses_minimal_json() {
        let call: CallEnvelope =
            serde_json::from_value(json!({ "operation_id": "Acme.Greeter.Hello" })).unwrap();
        assert!(call.arguments.is_empty());
        assert_eq!(call.correlation_id, None);
    }

    #[test]
    fn error_reply_serializes_kind_by_name() {
        let reply = ReplyEnvelope::failure(
            OperationId::new("nonexistent_op"),
            Some(CorrelationId::new(7)),
            InvocationError::new(ErrorKind::OperationNotImplemented, "unknown"),
        );
        let value = serde_json::to_value(OutboundMessage::Reply(reply)).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "reply",
                "operation_id": "nonexistent_op",
                "correlation_id": 7,
                "payload": { "error": { "kind": "OperationNotImplemented", "message": "unknown" } }
            })
        );
    }
}

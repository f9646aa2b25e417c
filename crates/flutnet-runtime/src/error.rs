// crates/flutnet-runtime/src/error.rs
// ============================================================================
// Module: Runtime Errors
// Description: Errors raised while wiring or driving the dispatcher.
// Purpose: Separate native-side setup failures from wire-level error replies.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`RuntimeError`] covers failures seen by native code: building the
//! dispatch table, initializing the process-wide runtime, emitting events,
//! and delivering outbound messages. Failures of individual calls never use
//! this type; they travel to Dart as error replies.

use thiserror::Error;

use crate::codec::CodecError;

/// Native-side runtime failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Two bindings registered for one operation id.
    #[error("operation {0} is already bound")]
    DuplicateBinding(String),
    /// A binding names an operation absent from the contract.
    #[error("operation {0} is not part of the contract")]
    UnknownOperation(String),
    /// An event id absent from the contract.
    #[error("event {0} is not part of the contract")]
    UnknownEvent(String),
    /// Event payload does not match the contract.
    #[error("invalid payload for event {event}: {detail}")]
    InvalidEventPayload {
        /// Event id.
        event: String,
        /// Mismatch detail.
        detail: String,
    },
    /// Contract document could not be parsed.
    #[error("invalid contract document: {0}")]
    InvalidContract(String),
    /// The process-wide runtime was initialized twice.
    #[error("flutnet runtime is already initialized")]
    AlreadyInitialized,
    /// The outbound channel is closed.
    #[error("outbound channel closed")]
    ChannelClosed,
}

impl RuntimeError {
    /// Wraps a codec error for an event payload.
    pub(crate) fn event_payload(event: &str, error: &CodecError) -> Self {
        Self::InvalidEventPayload {
            event: event.to_string(),
            detail: error.to_string(),
        }
    }
}

// crates/flutnet-runtime/src/events.rs
// ============================================================================
// Module: Event Emitter
// Description: Validated delivery of platform events to Dart subscribers.
// Purpose: Keep event payloads consistent with the generated Dart streams.
// Dependencies: flutnet-core, serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! Native code raises events through an [`EventEmitter`]. The emitter checks
//! the event id and payload against the contract before handing an
//! [`EventEnvelope`] to the sink, so Dart never receives an event its
//! generated stream cannot decode.

use std::sync::Arc;

use flutnet_core::ContractModel;
use flutnet_core::EventId;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::codec::WireCodec;
use crate::dispatcher::ReplySink;
use crate::envelope::EventEnvelope;
use crate::envelope::OutboundMessage;
use crate::error::RuntimeError;

/// Emits contract-checked events.
#[derive(Clone)]
pub struct EventEmitter {
    /// Contract declaring the events.
    model: Arc<ContractModel>,
    /// Outbound sink.
    sink: Arc<dyn ReplySink>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter").field("assembly", &self.model.assembly).finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter.
    #[must_use]
    pub fn new(model: Arc<ContractModel>, sink: Arc<dyn ReplySink>) -> Self {
        Self {
            model,
            sink,
        }
    }

    /// Emits an event with an optional JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownEvent`] for ids outside the contract,
    /// [`RuntimeError::InvalidEventPayload`] when the payload presence or
    /// shape differs from the declaration, and any sink error.
    pub fn emit(&self, event_id: &EventId, payload: Option<Value>) -> Result<(), RuntimeError> {
        let event =
            self.model.event(event_id).ok_or_else(|| RuntimeError::UnknownEvent(event_id.to_string()))?;
        match (&event.payload, &payload) {
            (None, None) => {}
            (Some(ty), Some(value)) => WireCodec::new(&self.model)
                .check(value, ty)
                .map_err(|err| RuntimeError::event_payload(event_id.as_str(), &err))?,
            (None, Some(_)) => {
                return Err(RuntimeError::InvalidEventPayload {
                    event: event_id.to_string(),
                    detail: "event declares no payload".to_string(),
                });
            }
            (Some(_), None) => {
                return Err(RuntimeError::InvalidEventPayload {
                    event: event_id.to_string(),
                    detail: "event requires a payload".to_string(),
                });
            }
        }
        debug!(event = %event_id, "emitting event");
        self.sink.send(OutboundMessage::Event(EventEnvelope {
            event_id: event_id.clone(),
            payload,
        }))
    }

    /// Serializes a payload and emits it.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::InvalidEventPayload`] when serialization fails,
    /// plus every error of [`EventEmitter::emit`].
    pub fn emit_serialized<T: Serialize + ?Sized>(&self, event_id: &EventId, payload: &T) -> Result<(), RuntimeError> {
        let value = serde_json::to_value(payload).map_err(|err| RuntimeError::InvalidEventPayload {
            event: event_id.to_string(),
            detail: err.to_string(),
        })?;
        self.emit(event_id, Some(value))
    }
}

// crates/flutnet-runtime/src/lib.rs
// ============================================================================
// Module: Flutnet Runtime Library
// Description: Native-side invocation dispatcher for generated bridges.
// Purpose: Route Dart calls to native implementations and return structured replies.
// Dependencies: dashmap, flutnet-core, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! The runtime is the native half of a generated bridge. Generated
//! registration code binds service implementations into a [`DispatchTable`];
//! a [`Dispatcher`] built from that table and the package's contract model
//! receives [`CallEnvelope`] values from the platform channel and answers
//! with [`ReplyEnvelope`] values. Failures never cross the boundary as panics:
//! every error becomes an [`ErrorKind`] in the reply.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod codec;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod events;
pub mod global;
pub mod table;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use codec::CodecError;
pub use codec::DataValue;
pub use codec::WireCodec;
pub use dispatcher::ChannelSink;
pub use dispatcher::DispatchOutcome;
pub use dispatcher::Dispatcher;
pub use dispatcher::ReplySink;
pub use envelope::CallEnvelope;
pub use envelope::CorrelationId;
pub use envelope::ErrorEnvelope;
pub use envelope::ErrorKind;
pub use envelope::EventEnvelope;
pub use envelope::InvocationError;
pub use envelope::OutboundMessage;
pub use envelope::ReplyEnvelope;
pub use envelope::ReplyPayload;
pub use error::RuntimeError;
pub use events::EventEmitter;
pub use global::dispatch_global;
pub use global::initialize;
pub use global::runtime;
pub use table::DispatchTable;
pub use table::InvocationThunk;
pub use table::OperationBinding;
pub use table::argument;
pub use table::to_value;

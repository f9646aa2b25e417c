// crates/flutnet-runtime/src/dispatcher.rs
// ============================================================================
// Module: Invocation Dispatcher
// Description: Routes call envelopes to native bindings and produces replies.
// Purpose: Turn every call into a structured reply without crashing the host.
// Dependencies: dashmap, flutnet-core, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! The dispatcher resolves a call's operation id against the contract model
//! and the [`DispatchTable`], checks the arguments with the [`WireCodec`],
//! then invokes the cached thunk.
//!
//! - Synchronous thunks run on the calling thread; their reply is returned
//!   directly as [`DispatchOutcome::Completed`].
//! - Asynchronous thunks are spawned on the tokio runtime and reply later
//!   through the caller's [`ReplySink`]. Calls carrying a correlation id can be
//!   canceled with [`Dispatcher::cancel`].
//! - Fire-and-forget operations never reply; their failures are logged.
//!
//! Panics inside native code are caught and reported as `OperationFailed`.
//! That covers thunk factories, synchronous bodies, the code an asynchronous
//! binding runs before returning its future, and the future itself.
//!
//! ## Invariants
//! - Each thunk is built at most once per dispatcher (the cache entry is
//!   held while the factory runs). A factory that panics caches nothing.
//! - The in-flight registry never holds two entries for one correlation id.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::any::Any;
use std::collections::BTreeMap;
use std::panic;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use flutnet_core::ContractModel;
use flutnet_core::OperationDefinition;
use flutnet_core::OperationId;
use flutnet_core::ReturnShape;
use flutnet_core::SemanticType;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::task::JoinError;
use tracing::debug;
use tracing::warn;

use crate::codec::WireCodec;
use crate::envelope::CallEnvelope;
use crate::envelope::CorrelationId;
use crate::envelope::ErrorKind;
use crate::envelope::InvocationError;
use crate::envelope::OutboundMessage;
use crate::envelope::ReplyEnvelope;
use crate::error::RuntimeError;
use crate::events::EventEmitter;
use crate::table::AsyncThunk;
use crate::table::DispatchTable;
use crate::table::InvocationThunk;
use crate::table::OperationBinding;
use crate::table::SyncThunk;

// ============================================================================
// SECTION: Reply Sinks
// ============================================================================

/// Destination for deferred replies and events.
pub trait ReplySink: Send + Sync {
    /// Delivers an outbound message.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::ChannelClosed`] when the message cannot be
    /// delivered.
    fn send(&self, message: OutboundMessage) -> Result<(), RuntimeError>;
}

/// Sink forwarding messages into a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    /// Channel sender.
    sender: mpsc::UnboundedSender<OutboundMessage>,
}

impl ChannelSink {
    /// Creates a sink and the receiver draining it.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
            },
            receiver,
        )
    }
}

impl ReplySink for ChannelSink {
    fn send(&self, message: OutboundMessage) -> Result<(), RuntimeError> {
        self.sender.send(message).map_err(|_| RuntimeError::ChannelClosed)
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Immediate result of dispatching one call.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The reply is available now.
    Completed(ReplyEnvelope),
    /// The operation does not reply.
    NoReply,
    /// The reply will be delivered through the sink.
    Deferred,
}

impl DispatchOutcome {
    /// Returns the immediate reply, if any.
    #[must_use]
    pub const fn reply(&self) -> Option<&ReplyEnvelope> {
        match self {
            Self::Completed(reply) => Some(reply),
            Self::NoReply | Self::Deferred => None,
        }
    }
}

/// Registry of cancelable in-flight calls.
type InFlight = Arc<Mutex<BTreeMap<CorrelationId, oneshot::Sender<()>>>>;

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Runtime dispatcher bound to one contract.
#[derive(Debug)]
pub struct Dispatcher {
    /// Contract the Dart proxies were generated from.
    model: Arc<ContractModel>,
    /// Native bindings.
    table: DispatchTable,
    /// Thunks built so far.
    thunks: DashMap<OperationId, InvocationThunk>,
    /// Runtime used for asynchronous operations.
    handle: Option<Handle>,
    /// Cancelable calls keyed by correlation id.
    in_flight: InFlight,
}

impl Dispatcher {
    /// Creates a dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::UnknownOperation`] when the table binds an id
    /// the contract does not declare.
    pub fn new(model: ContractModel, table: DispatchTable) -> Result<Self, RuntimeError> {
        if let Some(unknown) = table.ids().find(|id| model.operation(id).is_none()) {
            return Err(RuntimeError::UnknownOperation(unknown.to_string()));
        }
        Ok(Self {
            model: Arc::new(model),
            table,
            thunks: DashMap::new(),
            handle: None,
            in_flight: Arc::new(Mutex::new(BTreeMap::new())),
        })
    }

    /// Creates a dispatcher from a `contract.json` document.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::InvalidContract`] when the document does not
    /// parse, or any error from [`Dispatcher::new`].
    pub fn from_contract_json(bytes: &[u8], table: DispatchTable) -> Result<Self, RuntimeError> {
        let model: ContractModel =
            serde_json::from_slice(bytes).map_err(|err| RuntimeError::InvalidContract(err.to_string()))?;
        Self::new(model, table)
    }

    /// Pins asynchronous operations to a runtime handle.
    ///
    /// Without a handle the dispatcher uses the ambient runtime, if any.
    #[must_use]
    pub fn with_handle(mut self, handle: Handle) -> Self {
        self.handle = Some(handle);
        self
    }

    /// Returns the contract model.
    #[must_use]
    pub fn model(&self) -> &ContractModel {
        &self.model
    }

    /// Creates an event emitter sharing this dispatcher's contract.
    #[must_use]
    pub fn event_emitter(&self, sink: Arc<dyn ReplySink>) -> EventEmitter {
        EventEmitter::new(Arc::clone(&self.model), sink)
    }

    /// Dispatches one call.
    ///
    /// Never panics on behalf of native code; every failure becomes an error
    /// reply (or a log line for fire-and-forget operations).
    pub fn dispatch(&self, call: CallEnvelope, sink: &Arc<dyn ReplySink>) -> DispatchOutcome {
        let CallEnvelope {
            operation_id,
            arguments,
            correlation_id,
        } = call;
        debug!(operation = %operation_id, arguments = arguments.len(), "dispatching call");

        let Some((_, operation)) = self.model.operation(&operation_id) else {
            return DispatchOutcome::Completed(ReplyEnvelope::failure(
                operation_id.clone(),
                correlation_id,
                InvocationError::new(
                    ErrorKind::OperationNotImplemented,
                    format!("operation {operation_id} is not part of the contract"),
                ),
            ));
        };
        let call = CallContext {
            operation_id: operation_id.clone(),
            correlation_id,
            fire_and_forget: operation.returns == ReturnShape::FireAndForget,
        };
        let Some(binding) = self.table.get(&operation_id) else {
            return call.reject(InvocationError::new(
                ErrorKind::OperationNotImplemented,
                format!("operation {operation_id} has no native binding"),
            ));
        };
        if let Err(error) = self.check_arguments(operation, &arguments) {
            return call.reject(error);
        }

        let expected = operation.returns.value().cloned();
        let thunk = match self.thunk(&operation_id, binding) {
            Ok(thunk) => thunk,
            Err(error) => return call.reject(error),
        };
        match thunk {
            InvocationThunk::Sync(body) => {
                let result = invoke_sync(&body, &arguments)
                    .and_then(|value| check_result(&self.model, expected.as_ref(), value));
                match call.settle(result) {
                    Some(reply) => DispatchOutcome::Completed(reply),
                    None => DispatchOutcome::NoReply,
                }
            }
            InvocationThunk::Async(body) => self.spawn_async(call, body, arguments, expected, sink),
        }
    }

    /// Dispatches a call and waits for its reply.
    ///
    /// Returns `None` for fire-and-forget operations.
    pub async fn call(&self, call: CallEnvelope) -> Option<ReplyEnvelope> {
        let (sink, mut receiver) = ChannelSink::new();
        let sink: Arc<dyn ReplySink> = Arc::new(sink);
        match self.dispatch(call, &sink) {
            DispatchOutcome::Completed(reply) => Some(reply),
            DispatchOutcome::NoReply => None,
            DispatchOutcome::Deferred => {
                drop(sink);
                while let Some(message) = receiver.recv().await {
                    if let OutboundMessage::Reply(reply) = message {
                        return Some(reply);
                    }
                }
                None
            }
        }
    }

    /// Cancels an in-flight asynchronous call.
    ///
    /// Returns true when a pending call was signaled; its reply carries
    /// `OperationCanceled`.
    pub fn cancel(&self, correlation_id: CorrelationId) -> bool {
        let sender = lock(&self.in_flight).remove(&correlation_id);
        let signaled = sender.is_some_and(|sender| sender.send(()).is_ok());
        debug!(correlation = %correlation_id, signaled, "cancel requested");
        signaled
    }

    /// Returns the number of cancelable calls in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        lock(&self.in_flight).len()
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Returns the cached thunk for an operation, building it once.
    fn thunk(&self, id: &OperationId, binding: &OperationBinding) -> Result<InvocationThunk, InvocationError> {
        match self.thunks.entry(id.clone()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let thunk = catch_native(|| binding.build())?;
                debug!(operation = %id, "thunk built");
                Ok(entry.insert(thunk).value().clone())
            }
        }
    }

    /// Checks argument count and types against the contract.
    fn check_arguments(&self, operation: &OperationDefinition, arguments: &[Value]) -> Result<(), InvocationError> {
        if arguments.len() != operation.parameters.len() {
            return Err(InvocationError::new(
                ErrorKind::OperationArgumentCountMismatch,
                format!(
                    "{} expects {} argument(s), received {}",
                    operation.id,
                    operation.parameters.len(),
                    arguments.len()
                ),
            ));
        }
        let codec = WireCodec::new(&self.model);
        for (parameter, argument) in operation.parameters.iter().zip(arguments) {
            codec.check(argument, &parameter.ty).map_err(|err| {
                InvocationError::new(
                    ErrorKind::InvalidOperationArguments,
                    format!("argument `{}`: {err}", parameter.name),
                )
            })?;
        }
        Ok(())
    }

    /// Spawns an asynchronous thunk and its reply supervisor.
    fn spawn_async(
        &self,
        call: CallContext,
        body: AsyncThunk,
        arguments: Vec<Value>,
        expected: Option<SemanticType>,
        sink: &Arc<dyn ReplySink>,
    ) -> DispatchOutcome {
        let Some(handle) = self.handle.clone().or_else(|| Handle::try_current().ok()) else {
            return call.reject(InvocationError::new(
                ErrorKind::EnvironmentNotInitialized,
                "no async runtime is available for asynchronous operations",
            ));
        };
        let cancel = match call.correlation_id {
            Some(id) => match self.register(id) {
                Ok(receiver) => Some(receiver),
                Err(error) => return call.reject(error),
            },
            None => None,
        };
        let deferred =
            if call.fire_and_forget { DispatchOutcome::NoReply } else { DispatchOutcome::Deferred };

        let future = match catch_native(|| (*body)(arguments)) {
            Ok(future) => future,
            Err(error) => {
                if let Some(id) = call.correlation_id {
                    lock(&self.in_flight).remove(&id);
                }
                return call.reject(error);
            }
        };

        let in_flight = Arc::clone(&self.in_flight);
        let model = Arc::clone(&self.model);
        let sink = Arc::clone(sink);
        let task = handle.spawn(future);
        handle.spawn(async move {
            let abort = task.abort_handle();
            let result = match cancel {
                Some(cancel) => tokio::select! {
                    joined = task => joined_result(joined),
                    Ok(()) = cancel => {
                        abort.abort();
                        Err(InvocationError::new(ErrorKind::OperationCanceled, "operation was canceled"))
                    }
                },
                None => joined_result(task.await),
            };
            if let Some(id) = call.correlation_id {
                lock(&in_flight).remove(&id);
            }
            let result = result.and_then(|value| check_result(&model, expected.as_ref(), value));
            if let Some(reply) = call.settle(result)
                && let Err(err) = sink.send(OutboundMessage::Reply(reply))
            {
                warn!(operation = %call.operation_id, error = %err, "deferred reply dropped");
            }
        });
        deferred
    }

    /// Registers a cancelable call.
    fn register(&self, id: CorrelationId) -> Result<oneshot::Receiver<()>, InvocationError> {
        let mut in_flight = lock(&self.in_flight);
        if in_flight.contains_key(&id) {
            return Err(InvocationError::new(
                ErrorKind::InvalidOperationArguments,
                format!("correlation id {id} is already in flight"),
            ));
        }
        let (sender, receiver) = oneshot::channel();
        in_flight.insert(id, sender);
        Ok(receiver)
    }
}

// ============================================================================
// SECTION: Call Context
// ============================================================================

/// Reply routing data of one call.
#[derive(Debug, Clone)]
struct CallContext {
    /// Operation id.
    operation_id: OperationId,
    /// Correlation id from the call.
    correlation_id: Option<CorrelationId>,
    /// True when no reply is expected.
    fire_and_forget: bool,
}

impl CallContext {
    /// Turns a result into a reply, or logs it for fire-and-forget calls.
    fn settle(&self, result: Result<Value, InvocationError>) -> Option<ReplyEnvelope> {
        match (result, self.fire_and_forget) {
            (Ok(_), true) => None,
            (Err(error), true) => {
                warn!(operation = %self.operation_id, error = %error, "fire-and-forget operation failed");
                None
            }
            (Ok(value), false) => {
                Some(ReplyEnvelope::success(self.operation_id.clone(), self.correlation_id, value))
            }
            (Err(error), false) => {
                debug!(operation = %self.operation_id, error = %error, "operation failed");
                Some(ReplyEnvelope::failure(self.operation_id.clone(), self.correlation_id, error))
            }
        }
    }

    /// Rejects a call before invocation.
    fn reject(&self, error: InvocationError) -> DispatchOutcome {
        match self.settle(Err(error)) {
            Some(reply) => DispatchOutcome::Completed(reply),
            None => DispatchOutcome::NoReply,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Locks the in-flight registry, recovering from poisoning.
fn lock(in_flight: &InFlight) -> MutexGuard<'_, BTreeMap<CorrelationId, oneshot::Sender<()>>> {
    in_flight.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs native code, converting a panic into an `OperationFailed` error.
fn catch_native<T>(native: impl FnOnce() -> T) -> Result<T, InvocationError> {
    panic::catch_unwind(AssertUnwindSafe(native)).map_err(|payload| {
        InvocationError::failed(format!("operation panicked: {}", panic_message(payload.as_ref())))
    })
}

/// Runs a synchronous thunk, converting panics into failures.
fn invoke_sync(body: &SyncThunk, arguments: &[Value]) -> Result<Value, InvocationError> {
    catch_native(|| (**body)(arguments))?
}

/// Maps a joined task result into an operation result.
fn joined_result(joined: Result<Result<Value, InvocationError>, JoinError>) -> Result<Value, InvocationError> {
    match joined {
        Ok(result) => result,
        Err(err) if err.is_panic() => {
            let payload = err.into_panic();
            Err(InvocationError::failed(format!("operation panicked: {}", panic_message(payload.as_ref()))))
        }
        Err(_) => Err(InvocationError::new(ErrorKind::OperationCanceled, "operation task was aborted")),
    }
}

/// Extracts a readable message from a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Checks a result against the declared return type.
fn check_result(
    model: &ContractModel,
    expected: Option<&SemanticType>,
    value: Value,
) -> Result<Value, InvocationError> {
    let Some(ty) = expected else {
        return Ok(Value::Null);
    };
    WireCodec::new(model)
        .check(&value, ty)
        .map_err(|err| InvocationError::failed(format!("result does not match the contract: {err}")))?;
    Ok(value)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;

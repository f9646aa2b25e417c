// crates/flutnet-runtime/src/global.rs
// ============================================================================
// Module: Process Runtime Slot
// Description: One-time, process-wide dispatcher installation.
// Purpose: Give platform channel callbacks a dispatcher without threading state.
// Dependencies: std::sync::OnceLock, tracing
// ============================================================================

//! ## Overview
//! Platform channel callbacks are free functions with no user state. The host
//! installs its [`Dispatcher`] once with [`initialize`]; callbacks then use
//! [`dispatch_global`]. Calls arriving before initialization are answered with
//! `EnvironmentNotInitialized` instead of failing silently.

use std::sync::Arc;
use std::sync::OnceLock;

use tracing::info;

use crate::dispatcher::DispatchOutcome;
use crate::dispatcher::Dispatcher;
use crate::dispatcher::ReplySink;
use crate::envelope::CallEnvelope;
use crate::envelope::ErrorKind;
use crate::envelope::InvocationError;
use crate::envelope::ReplyEnvelope;
use crate::error::RuntimeError;

/// Installed dispatcher.
static RUNTIME: OnceLock<Dispatcher> = OnceLock::new();

/// Installs the process-wide dispatcher.
///
/// # Errors
///
/// Returns [`RuntimeError::AlreadyInitialized`] when a dispatcher is already
/// installed; the argument is dropped in that case.
pub fn initialize(dispatcher: Dispatcher) -> Result<&'static Dispatcher, RuntimeError> {
    let mut installed = false;
    let runtime = RUNTIME.get_or_init(|| {
        installed = true;
        dispatcher
    });
    if !installed {
        return Err(RuntimeError::AlreadyInitialized);
    }
    info!(
        assembly = %runtime.model().assembly,
        services = runtime.model().services.len(),
        "flutnet runtime initialized"
    );
    Ok(runtime)
}

/// Returns the installed dispatcher.
#[must_use]
pub fn runtime() -> Option<&'static Dispatcher> {
    RUNTIME.get()
}

/// Dispatches through the installed dispatcher.
pub fn dispatch_global(call: CallEnvelope, sink: &Arc<dyn ReplySink>) -> DispatchOutcome {
    match RUNTIME.get() {
        Some(dispatcher) => dispatcher.dispatch(call, sink),
        None => DispatchOutcome::Completed(ReplyEnvelope::failure(
            call.operation_id,
            call.correlation_id,
            InvocationError::new(ErrorKind::EnvironmentNotInitialized, "flutnet runtime is not initialized"),
        )),
    }
}

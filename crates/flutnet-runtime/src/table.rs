// crates/flutnet-runtime/src/table.rs
// ============================================================================
// Module: Dispatch Table
// Description: Operation id to native invocation thunk bindings.
// Purpose: Let generated registration code bind implementations by id.
// Dependencies: flutnet-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Generated `register_*` functions fill a [`DispatchTable`] at startup with
//! one [`OperationBinding`] per operation id. A binding holds a factory; the
//! dispatcher builds each [`InvocationThunk`] lazily on first call and caches
//! it. Thunks receive the positional JSON arguments after the dispatcher has
//! checked them against the contract, and use [`argument`] and [`to_value`]
//! to cross between JSON and Rust types.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use flutnet_core::OperationId;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::envelope::InvocationError;
use crate::error::RuntimeError;

// ============================================================================
// SECTION: Thunks
// ============================================================================

/// Boxed future returned by asynchronous thunks.
pub type OperationFuture = Pin<Box<dyn Future<Output = Result<Value, InvocationError>> + Send>>;

/// Synchronous thunk body.
pub type SyncThunk = Arc<dyn Fn(&[Value]) -> Result<Value, InvocationError> + Send + Sync>;

/// Asynchronous thunk body.
pub type AsyncThunk = Arc<dyn Fn(Vec<Value>) -> OperationFuture + Send + Sync>;

/// Callable bound to one operation.
#[derive(Clone)]
pub enum InvocationThunk {
    /// Runs to completion on the dispatching thread.
    Sync(SyncThunk),
    /// Returns a future driven by the runtime handle.
    Async(AsyncThunk),
}

impl fmt::Debug for InvocationThunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("InvocationThunk::Sync"),
            Self::Async(_) => f.write_str("InvocationThunk::Async"),
        }
    }
}

/// Factory building a thunk on first use.
pub type ThunkFactory = Arc<dyn Fn() -> InvocationThunk + Send + Sync>;

// ============================================================================
// SECTION: Bindings
// ============================================================================

/// Native binding of one operation.
#[derive(Clone)]
pub struct OperationBinding {
    /// Thunk factory.
    factory: ThunkFactory,
}

impl OperationBinding {
    /// Binds a synchronous function.
    #[must_use]
    pub fn sync<F>(body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, InvocationError> + Send + Sync + 'static,
    {
        let body: SyncThunk = Arc::new(body);
        Self::lazy(move || InvocationThunk::Sync(Arc::clone(&body)))
    }

    /// Binds an asynchronous function.
    #[must_use]
    pub fn asynchronous<F, Fut>(body: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, InvocationError>> + Send + 'static,
    {
        let body: AsyncThunk = Arc::new(move |args| -> OperationFuture { Box::pin(body(args)) });
        Self::lazy(move || InvocationThunk::Async(Arc::clone(&body)))
    }

    /// Binds a factory invoked the first time the operation is called.
    #[must_use]
    pub fn lazy<F>(factory: F) -> Self
    where
        F: Fn() -> InvocationThunk + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
        }
    }

    /// Builds a thunk.
    pub(crate) fn build(&self) -> InvocationThunk {
        (*self.factory)()
    }
}

impl fmt::Debug for OperationBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OperationBinding")
    }
}

// ============================================================================
// SECTION: Dispatch Table
// ============================================================================

/// Operation bindings keyed by id.
#[derive(Debug, Clone, Default)]
pub struct DispatchTable {
    /// Bindings in id order.
    bindings: BTreeMap<OperationId, OperationBinding>,
}

impl DispatchTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a binding.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::DuplicateBinding`] when the id is already bound.
    pub fn register(
        &mut self,
        id: impl Into<OperationId>,
        binding: OperationBinding,
    ) -> Result<(), RuntimeError> {
        let id = id.into();
        if self.bindings.contains_key(&id) {
            return Err(RuntimeError::DuplicateBinding(id.to_string()));
        }
        self.bindings.insert(id, binding);
        Ok(())
    }

    /// Returns the binding for an id.
    #[must_use]
    pub fn get(&self, id: &OperationId) -> Option<&OperationBinding> {
        self.bindings.get(id)
    }

    /// Iterates over bound ids.
    pub fn ids(&self) -> impl Iterator<Item = &OperationId> {
        self.bindings.keys()
    }

    /// Returns the number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true when nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// ============================================================================
// SECTION: Argument Helpers
// ============================================================================

/// Deserializes the positional argument at `index`.
///
/// # Errors
///
/// Returns an [`InvocationError`] of kind `OperationArgumentParsingError`
/// when the argument is missing or cannot be deserialized into `T`.
pub fn argument<T: DeserializeOwned>(args: &[Value], index: usize) -> Result<T, InvocationError> {
    let value = args
        .get(index)
        .ok_or_else(|| InvocationError::parsing(format!("missing argument {index}")))?;
    serde_json::from_value(value.clone()).map_err(|err| InvocationError::parsing(format!("argument {index}: {err}")))
}

/// Serializes an operation result.
///
/// # Errors
///
/// Returns an [`InvocationError`] of kind `OperationFailed` when the value
/// cannot be serialized.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, InvocationError> {
    serde_json::to_value(value).map_err(|err| InvocationError::failed(format!("result serialization failed: {err}")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Tests use unwrap on deterministic fixtures.")]

    use serde_json::json;

    use super::*;
    use crate::envelope::ErrorKind;

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut table = DispatchTable::new();
        table.register("Acme.Svc.Ping", OperationBinding::sync(|_| Ok(Value::Null))).unwrap();
        let err = table.register("Acme.Svc.Ping", OperationBinding::sync(|_| Ok(Value::Null)));
        assert_eq!(err, Err(RuntimeError::DuplicateBinding("Acme.Svc.Ping".to_string())));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn argument_reports_parsing_errors() {
        let args = vec![json!("Ada"), json!(3)];
        let name: String = argument(&args, 0).unwrap();
        assert_eq!(name, "Ada");
        let err = argument::<String>(&args, 1).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OperationArgumentParsingError);
        let err = argument::<i32>(&args, 5).unwrap_err();
        assert_eq!(err.kind, ErrorKind::OperationArgumentParsingError);
    }
}

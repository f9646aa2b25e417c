// crates/flutnet-runtime/tests/global_runtime.rs
// ============================================================================
// Module: Global Runtime Tests
// Description: Lifecycle of the process-wide dispatcher slot.
// Purpose: Pin behavior before and after one-time initialization.
// ============================================================================

//! The slot is process-global, so the whole lifecycle lives in one test.

#![allow(
    clippy::unwrap_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::collections::BTreeSet;
use std::sync::Arc;

use flutnet_core::ContractModel;
use flutnet_core::OperationDefinition;
use flutnet_core::OperationId;
use flutnet_core::ReturnShape;
use flutnet_core::ServiceDefinition;
use flutnet_core::TypeName;
use flutnet_runtime::CallEnvelope;
use flutnet_runtime::ChannelSink;
use flutnet_runtime::DispatchTable;
use flutnet_runtime::Dispatcher;
use flutnet_runtime::ErrorKind;
use flutnet_runtime::OperationBinding;
use flutnet_runtime::ReplySink;
use flutnet_runtime::RuntimeError;
use flutnet_runtime::dispatch_global;
use flutnet_runtime::initialize;
use flutnet_runtime::runtime;
use serde_json::Value;

fn dispatcher() -> Dispatcher {
    let service = TypeName::new("Acme.Ping");
    let model = ContractModel {
        assembly: "Acme".to_string(),
        services: vec![ServiceDefinition {
            operations: vec![OperationDefinition {
                name: "Ping".to_string(),
                id: OperationId::for_operation(&service, "Ping"),
                parameters: Vec::new(),
                returns: ReturnShape::Async {
                    value: None,
                },
                is_static: false,
                canonical_signature: "Ping".to_string(),
                formal_signature: "Ping()".to_string(),
            }],
            events: Vec::new(),
            data_types: BTreeSet::new(),
            name: service,
        }],
        data_types: Vec::new(),
    };
    let mut table = DispatchTable::new();
    table.register("Acme.Ping.Ping", OperationBinding::sync(|_| Ok(Value::Null))).unwrap();
    Dispatcher::new(model, table).unwrap()
}

#[test]
fn global_runtime_lifecycle() {
    let (sink, _receiver) = ChannelSink::new();
    let sink: Arc<dyn ReplySink> = Arc::new(sink);

    assert!(runtime().is_none());
    let early = dispatch_global(CallEnvelope::new("Acme.Ping.Ping", Vec::new()), &sink);
    assert_eq!(early.reply().and_then(|reply| reply.error_kind()), Some(ErrorKind::EnvironmentNotInitialized));

    initialize(dispatcher()).unwrap();
    let reply = dispatch_global(CallEnvelope::new("Acme.Ping.Ping", Vec::new()), &sink);
    assert_eq!(reply.reply().and_then(|reply| reply.result()), Some(&Value::Null));

    assert_eq!(initialize(dispatcher()).err(), Some(RuntimeError::AlreadyInitialized));
    assert!(runtime().is_some());
}

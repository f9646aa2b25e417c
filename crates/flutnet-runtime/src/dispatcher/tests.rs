// crates/flutnet-runtime/src/dispatcher/tests.rs
// ============================================================================
// Module: Dispatcher Tests
// Description: Error-kind and lifecycle coverage for call dispatch.
// Purpose: Pin the reply produced for every failure class.
// Dependencies: crate::dispatcher, tokio
// ============================================================================

//! ## Overview
//! Tests build a small contract by hand and bind closures into the table.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::collections::BTreeSet;
use std::sync::Barrier;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use flutnet_core::ParameterDefinition;
use flutnet_core::PassMode;
use flutnet_core::PrimitiveKind;
use flutnet_core::ServiceDefinition;
use flutnet_core::TypeName;
use serde_json::json;

use super::*;
use crate::table::argument;
use crate::table::to_value;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const SERVICE: &str = "Acme.Greeter";

fn string() -> SemanticType {
    SemanticType::primitive(PrimitiveKind::String)
}

fn operation(name: &str, parameters: &[(&str, SemanticType)], returns: ReturnShape) -> OperationDefinition {
    OperationDefinition {
        name: name.to_string(),
        id: OperationId::for_operation(&TypeName::new(SERVICE), name),
        parameters: parameters
            .iter()
            .map(|(name, ty)| ParameterDefinition {
                name: (*name).to_string(),
                ty: ty.clone(),
                mode: PassMode::Value,
            })
            .collect(),
        returns,
        is_static: false,
        canonical_signature: name.to_string(),
        formal_signature: format!("{name}()"),
    }
}

fn model() -> ContractModel {
    let int = SemanticType::primitive(PrimitiveKind::I32);
    ContractModel {
        assembly: "Acme".to_string(),
        services: vec![ServiceDefinition {
            name: TypeName::new(SERVICE),
            operations: vec![
                operation("Hello", &[("name", string())], ReturnShape::Sync {
                    value: string(),
                }),
                operation("Notify", &[("message", string())], ReturnShape::FireAndForget),
                operation("Fetch", &[("id", int.clone())], ReturnShape::Async {
                    value: Some(string()),
                }),
                operation("Wait", &[], ReturnShape::Async {
                    value: None,
                }),
                operation("Boom", &[], ReturnShape::Sync {
                    value: int.clone(),
                }),
                operation("Narrow", &[("value", int.clone())], ReturnShape::Sync {
                    value: int.clone(),
                }),
                operation("Wrong", &[], ReturnShape::Sync {
                    value: int,
                }),
                operation("Unbound", &[], ReturnShape::Sync {
                    value: string(),
                }),
            ],
            events: Vec::new(),
            data_types: BTreeSet::new(),
        }],
        data_types: Vec::new(),
    }
}

fn id(name: &str) -> String {
    format!("{SERVICE}.{name}")
}

fn table() -> DispatchTable {
    let mut table = DispatchTable::new();
    table
        .register(
            id("Hello"),
            OperationBinding::sync(|args| {
                let name: String = argument(args, 0)?;
                to_value(&format!("Hi, {name}"))
            }),
        )
        .unwrap();
    table
        .register(
            id("Notify"),
            OperationBinding::sync(|_| Err(InvocationError::failed("notification backend offline"))),
        )
        .unwrap();
    table
        .register(
            id("Fetch"),
            OperationBinding::asynchronous(|args| async move {
                let id: i32 = argument(&args, 0)?;
                to_value(&format!("item-{id}"))
            }),
        )
        .unwrap();
    table
        .register(id("Wait"), OperationBinding::asynchronous(|_| std::future::pending()))
        .unwrap();
    table.register(id("Boom"), OperationBinding::sync(|_| panic!("native crash"))).unwrap();
    table
        .register(
            id("Narrow"),
            OperationBinding::sync(|args| {
                let value: u8 = argument(args, 0)?;
                to_value(&value)
            }),
        )
        .unwrap();
    table.register(id("Wrong"), OperationBinding::sync(|_| Ok(json!("not a number")))).unwrap();
    table
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new(model(), table()).unwrap()
}

fn sink() -> (Arc<dyn ReplySink>, mpsc::UnboundedReceiver<OutboundMessage>) {
    let (sink, receiver) = ChannelSink::new();
    (Arc::new(sink), receiver)
}

fn error_kind(outcome: &DispatchOutcome) -> Option<ErrorKind> {
    outcome.reply().and_then(ReplyEnvelope::error_kind)
}

// ============================================================================
// SECTION: Synchronous Dispatch
// ============================================================================

#[test]
fn sync_operation_replies_immediately() {
    let (sink, _receiver) = sink();
    let outcome = dispatcher().dispatch(CallEnvelope::new(id("Hello"), vec![json!("Ada")]), &sink);
    assert_eq!(outcome.reply().and_then(ReplyEnvelope::result), Some(&json!("Hi, Ada")));
}

#[test]
fn unknown_and_unbound_operations_are_not_implemented() {
    let (sink, _receiver) = sink();
    let dispatcher = dispatcher();
    let unknown = dispatcher.dispatch(CallEnvelope::new("nonexistent_op", Vec::new()), &sink);
    assert_eq!(error_kind(&unknown), Some(ErrorKind::OperationNotImplemented));
    let unbound = dispatcher.dispatch(CallEnvelope::new(id("Unbound"), Vec::new()), &sink);
    assert_eq!(error_kind(&unbound), Some(ErrorKind::OperationNotImplemented));
    let silent = dispatcher.dispatch(CallEnvelope::new(id("Notify"), Vec::new()), &sink);
    assert_eq!(silent, DispatchOutcome::NoReply);
}

#[test]
fn argument_errors_map_to_distinct_kinds() {
    let (sink, _receiver) = sink();
    let dispatcher = dispatcher();
    let count = dispatcher.dispatch(CallEnvelope::new(id("Hello"), Vec::new()), &sink);
    assert_eq!(error_kind(&count), Some(ErrorKind::OperationArgumentCountMismatch));
    let invalid = dispatcher.dispatch(CallEnvelope::new(id("Hello"), vec![json!(5)]), &sink);
    assert_eq!(error_kind(&invalid), Some(ErrorKind::InvalidOperationArguments));
    let parsing = dispatcher.dispatch(CallEnvelope::new(id("Narrow"), vec![json!(300)]), &sink);
    assert_eq!(error_kind(&parsing), Some(ErrorKind::OperationArgumentParsingError));
}

#[test]
fn panics_and_bad_results_become_operation_failed() {
    let (sink, _receiver) = sink();
    let dispatcher = dispatcher();
    let boom = dispatcher.dispatch(CallEnvelope::new(id("Boom"), Vec::new()), &sink);
    assert_eq!(error_kind(&boom), Some(ErrorKind::OperationFailed));
    let Some(ReplyEnvelope {
        payload: crate::envelope::ReplyPayload::Error(error),
        ..
    }) = boom.reply()
    else {
        panic!("expected error reply");
    };
    assert!(error.message.contains("native crash"));
    let wrong = dispatcher.dispatch(CallEnvelope::new(id("Wrong"), Vec::new()), &sink);
    assert_eq!(error_kind(&wrong), Some(ErrorKind::OperationFailed));
}

#[test]
fn fire_and_forget_never_replies() {
    let (sink, mut receiver) = sink();
    let outcome = dispatcher().dispatch(CallEnvelope::new(id("Notify"), vec![json!("hi")]), &sink);
    assert_eq!(outcome, DispatchOutcome::NoReply);
    assert!(receiver.try_recv().is_err());
}

#[test]
fn thunks_are_built_once() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    let mut table = DispatchTable::new();
    table
        .register(
            id("Hello"),
            OperationBinding::lazy(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                InvocationThunk::Sync(Arc::new(|_: &[Value]| Ok::<_, InvocationError>(json!("hi"))))
            }),
        )
        .unwrap();
    let dispatcher = Dispatcher::new(model(), table).unwrap();
    let (sink, _receiver) = sink();
    for _ in 0 .. 3 {
        dispatcher.dispatch(CallEnvelope::new(id("Hello"), vec![json!("x")]), &sink);
    }
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn racing_calls_build_the_thunk_once() {
    const CALLERS: usize = 8;
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    let mut table = DispatchTable::new();
    table
        .register(
            id("Hello"),
            OperationBinding::lazy(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                InvocationThunk::Sync(Arc::new(|_: &[Value]| Ok::<_, InvocationError>(json!("hi"))))
            }),
        )
        .unwrap();
    let dispatcher = Arc::new(Dispatcher::new(model(), table).unwrap());
    let barrier = Arc::new(Barrier::new(CALLERS));
    let callers: Vec<_> = (0 .. CALLERS)
        .map(|_| {
            let dispatcher = Arc::clone(&dispatcher);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let (sink, _receiver) = sink();
                barrier.wait();
                dispatcher.dispatch(CallEnvelope::new(id("Hello"), vec![json!("x")]), &sink)
            })
        })
        .collect();
    for caller in callers {
        let outcome = caller.join().unwrap();
        assert_eq!(outcome.reply().and_then(ReplyEnvelope::result), Some(&json!("hi")));
    }
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn panicking_thunk_factory_is_operation_failed() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let mut table = DispatchTable::new();
    table
        .register(
            id("Hello"),
            OperationBinding::lazy(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                panic!("factory crash")
            }),
        )
        .unwrap();
    let dispatcher = Dispatcher::new(model(), table).unwrap();
    let (sink, _receiver) = sink();
    for _ in 0 .. 2 {
        let outcome = dispatcher.dispatch(CallEnvelope::new(id("Hello"), vec![json!("x")]), &sink);
        assert_eq!(error_kind(&outcome), Some(ErrorKind::OperationFailed));
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[test]
fn bindings_must_exist_in_contract() {
    let mut table = DispatchTable::new();
    table.register("Acme.Other.Op", OperationBinding::sync(|_| Ok(Value::Null))).unwrap();
    assert_eq!(
        Dispatcher::new(model(), table).err(),
        Some(RuntimeError::UnknownOperation("Acme.Other.Op".to_string()))
    );
}

#[test]
fn async_operation_without_runtime_is_not_initialized() {
    let (sink, _receiver) = sink();
    let outcome = dispatcher().dispatch(CallEnvelope::new(id("Fetch"), vec![json!(1)]), &sink);
    assert_eq!(error_kind(&outcome), Some(ErrorKind::EnvironmentNotInitialized));
}

// ============================================================================
// SECTION: Asynchronous Dispatch
// ============================================================================

#[tokio::test]
async fn async_operation_replies_through_sink() {
    let dispatcher = dispatcher();
    let call = CallEnvelope::new(id("Fetch"), vec![json!(7)]).with_correlation(CorrelationId::new(1));
    let reply = dispatcher.call(call).await.unwrap();
    assert_eq!(reply.correlation_id, Some(CorrelationId::new(1)));
    assert_eq!(reply.result(), Some(&json!("item-7")));
    assert_eq!(dispatcher.in_flight(), 0);
}

#[tokio::test]
async fn cancel_interrupts_pending_call() {
    let dispatcher = dispatcher();
    let (sink, mut receiver) = sink();
    let correlation = CorrelationId::new(42);
    let call = CallEnvelope::new(id("Wait"), Vec::new()).with_correlation(correlation);
    assert_eq!(dispatcher.dispatch(call.clone(), &sink), DispatchOutcome::Deferred);
    assert_eq!(dispatcher.in_flight(), 1);

    let duplicate = dispatcher.dispatch(call, &sink);
    assert_eq!(error_kind(&duplicate), Some(ErrorKind::InvalidOperationArguments));

    assert!(dispatcher.cancel(correlation));
    let Some(OutboundMessage::Reply(reply)) = receiver.recv().await else {
        panic!("expected a reply");
    };
    assert_eq!(reply.error_kind(), Some(ErrorKind::OperationCanceled));
    assert_eq!(reply.correlation_id, Some(correlation));
    assert_eq!(dispatcher.in_flight(), 0);
    assert!(!dispatcher.cancel(correlation));
}

#[tokio::test]
async fn async_binding_panicking_before_its_future_is_operation_failed() {
    let mut table = DispatchTable::new();
    table
        .register(
            id("Fetch"),
            OperationBinding::asynchronous(|args: Vec<Value>| {
                if args.len() < 5 {
                    panic!("setup crash");
                }
                std::future::ready(Ok::<_, InvocationError>(Value::Null))
            }),
        )
        .unwrap();
    let dispatcher = Dispatcher::new(model(), table).unwrap();
    let (sink, mut receiver) = sink();
    let correlation = CorrelationId::new(9);
    let call = CallEnvelope::new(id("Fetch"), vec![json!(1)]).with_correlation(correlation);
    let outcome = dispatcher.dispatch(call, &sink);
    assert_eq!(error_kind(&outcome), Some(ErrorKind::OperationFailed));
    assert_eq!(outcome.reply().and_then(|reply| reply.correlation_id), Some(correlation));
    assert_eq!(dispatcher.in_flight(), 0);
    assert!(receiver.try_recv().is_err());
}

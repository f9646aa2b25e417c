// crates/flutnet-bridge-gen/tests/greeter_package.rs
// ============================================================================
// Module: Greeter Package Tests
// Description: Integration tests for package synthesis, writing, and drift checks.
// Purpose: Validate determinism, the overwrite policy, and all-or-nothing failure.
// Dependencies: flutnet-bridge-gen, flutnet-core, tempfile
// ============================================================================

//! ## Overview
//! Integration tests that run the full metadata to package pipeline against
//! a temporary directory.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::error::Error;
use std::fs;
use std::path::Path;

use flutnet_bridge_gen::BridgeSynthesizer;
use flutnet_bridge_gen::MANIFEST_FILE;
use flutnet_bridge_gen::SynthesisError;
use flutnet_bridge_gen::read_manifest;
use flutnet_core::AssemblyMetadata;
use flutnet_core::ContractModel;
use flutnet_core::ContractValidator;
use flutnet_core::PackageMetadata;
use flutnet_core::ValidationOutcome;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

const GREETER: &str = r#"{
  "name": "Acme.Greeting",
  "types": [
    {
      "name": "Acme.Greeting.Greeter",
      "kind": "interface",
      "service": true,
      "methods": [
        {
          "name": "Hello",
          "operation": true,
          "parameters": [{ "name": "name", "type": "System.String" }],
          "returns": "System.String"
        }
      ]
    }
  ]
}"#;

const REGISTRY: &str = r#"{
  "name": "Acme.Lookup",
  "types": [
    {
      "name": "Acme.Lookup.Registry",
      "kind": "interface",
      "service": true,
      "methods": [
        {
          "name": "Find",
          "operation": true,
          "parameters": [
            { "name": "service", "type": "System.String" },
            { "name": "args", "type": "System.Int32" },
            { "name": "result", "type": "System.Int32" }
          ],
          "returns": "System.String"
        }
      ]
    }
  ]
}"#;

const OVERLOADED: &str = r#"{
  "name": "Acme.Calc",
  "types": [
    {
      "name": "Acme.Calc.Calculator",
      "kind": "class",
      "service": true,
      "methods": [
        { "name": "Foo", "operation": true, "parameters": [{ "name": "a", "type": "System.Int32" }], "returns": "System.Void" },
        { "name": "Foo", "operation": true, "parameters": [{ "name": "a", "type": "System.String" }], "returns": "System.Void" }
      ]
    }
  ]
}"#;

fn outcome(source: &str) -> Result<ValidationOutcome, Box<dyn Error>> {
    let assembly = AssemblyMetadata::from_slice(source.as_bytes())?;
    Ok(ContractValidator::new(&assembly)?.validate())
}

fn synthesizer() -> Result<BridgeSynthesizer, SynthesisError> {
    BridgeSynthesizer::new(PackageMetadata::new("greeter_bridge"))
}

fn snapshot(root: &Path) -> Result<Vec<(String, Vec<u8>)>, Box<dyn Error>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let relative = path.strip_prefix(root)?.to_string_lossy().replace('\\', "/");
                files.push((relative, fs::read(&path)?));
            }
        }
    }
    files.sort();
    Ok(files)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn greeter_package_has_expected_layout() -> Result<(), Box<dyn Error>> {
    let bundle = synthesizer()?.synthesize(&outcome(GREETER)?)?;
    let paths: Vec<&str> = bundle.artifacts.iter().map(|artifact| artifact.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "lib/greeter_bridge.dart",
            "lib/src/bridge.dart",
            "lib/src/services/greeter.dart",
            "native/contract.json",
            "native/data.rs",
            "native/greeter.rs",
            "native/mod.rs",
            "pubspec.yaml",
        ]
    );
    let proxy = bundle.text("lib/src/services/greeter.dart").ok_or("missing proxy")?;
    assert!(proxy.contains("This file is @generated by flutnet-bridge-gen. DO NOT EDIT."));
    assert!(proxy.contains("Future<String> hello(String name) async {"));
    let stub = bundle.text("native/greeter.rs").ok_or("missing stub")?;
    assert!(stub.contains("pub trait Greeter: Send + Sync + 'static {"));
    assert!(stub.contains("fn hello(&self, name: String) -> Result<String, InvocationError>;"));
    assert!(stub.contains("pub fn register_greeter<T: Greeter>("));
    assert!(stub.contains("\"Acme.Greeting.Greeter.Hello\""));
    let pubspec = bundle.text("pubspec.yaml").ok_or("missing pubspec")?;
    assert!(pubspec.contains("name: greeter_bridge\n"));
    assert!(pubspec.contains("version: 1.0.0\n"));
    Ok(())
}

#[test]
fn parameters_named_like_generated_locals_are_escaped() -> Result<(), Box<dyn Error>> {
    let outcome = outcome(REGISTRY)?;
    assert!(outcome.report.is_empty());
    let bundle = synthesizer()?.synthesize(&outcome)?;
    let stub = bundle.text("native/registry.rs").ok_or("missing stub")?;
    assert!(stub.contains("fn find(&self, service_: String, args_: i32, result: i32) -> Result<String, InvocationError>;"));
    assert!(stub.contains("let service_: String = argument(args, 0)?;"));
    assert!(stub.contains("let args_: i32 = argument(args, 1)?;"));
    assert!(stub.contains("let result: i32 = argument(args, 2)?;"));
    assert!(stub.contains("to_value(&service.find(service_, args_, result)?)"));
    let proxy = bundle.text("lib/src/services/registry.dart").ok_or("missing proxy")?;
    assert!(proxy.contains("Future<String> find(String service, int args, int result_) async {"));
    assert!(proxy.contains("<Object?>[service, args, result_]"));
    assert!(proxy.contains("final result = unwrapReply("));
    Ok(())
}

#[test]
fn contract_json_round_trips_to_the_model() -> Result<(), Box<dyn Error>> {
    let outcome = outcome(GREETER)?;
    let bundle = synthesizer()?.synthesize(&outcome)?;
    let contract = bundle.artifact("native/contract.json").ok_or("missing contract")?;
    let model: ContractModel = serde_json::from_slice(&contract.bytes)?;
    assert_eq!(model, outcome.model);
    Ok(())
}

#[test]
fn forced_regeneration_is_byte_identical() -> Result<(), Box<dyn Error>> {
    let temp = tempfile::tempdir()?;
    let out = temp.path().join("greeter_bridge");
    let outcome = outcome(GREETER)?;
    let synthesizer = synthesizer()?;
    let first_manifest = synthesizer.write_to(&outcome, &out, false)?;
    let first = snapshot(&out)?;
    let second_manifest = synthesizer.write_to(&outcome, &out, true)?;
    let second = snapshot(&out)?;
    assert_eq!(first, second);
    assert_eq!(first_manifest, second_manifest);
    assert_eq!(read_manifest(&out)?, first_manifest);
    synthesizer.verify(&outcome, &out)?;
    Ok(())
}

#[test]
fn existing_output_requires_overwrite() -> Result<(), Box<dyn Error>> {
    let temp = tempfile::tempdir()?;
    let out = temp.path().join("greeter_bridge");
    let outcome = outcome(GREETER)?;
    let synthesizer = synthesizer()?;
    synthesizer.write_to(&outcome, &out, false)?;
    let Err(err) = synthesizer.write_to(&outcome, &out, false) else {
        return Err("expected regeneration without overwrite to be refused".into());
    };
    assert!(matches!(err, SynthesisError::TargetNotEmpty(_)));
    Ok(())
}

#[test]
fn verify_reports_drift() -> Result<(), Box<dyn Error>> {
    let temp = tempfile::tempdir()?;
    let out = temp.path().join("greeter_bridge");
    let outcome = outcome(GREETER)?;
    let synthesizer = synthesizer()?;
    synthesizer.write_to(&outcome, &out, false)?;

    fs::write(out.join("lib/src/services/greeter.dart"), "// edited\n")?;
    let Err(err) = synthesizer.verify(&outcome, &out) else {
        return Err("expected edited proxy to be reported".into());
    };
    assert!(matches!(err, SynthesisError::Drift(message) if message.contains("greeter.dart")));

    synthesizer.write_to(&outcome, &out, true)?;
    fs::remove_file(out.join(MANIFEST_FILE))?;
    assert!(matches!(synthesizer.verify(&outcome, &out), Err(SynthesisError::Drift(_))));
    Ok(())
}

#[test]
fn hard_errors_abort_before_anything_is_written() -> Result<(), Box<dyn Error>> {
    let temp = tempfile::tempdir()?;
    let out = temp.path().join("calc_bridge");
    let Err(err) = synthesizer()?.write_to(&outcome(OVERLOADED)?, &out, false) else {
        return Err("expected validation failure".into());
    };
    let SynthesisError::Validation(failure) = err else {
        return Err("expected validation error".into());
    };
    assert_eq!(failure.diagnostics.len(), 1);
    assert!(!out.exists());
    Ok(())
}

#[test]
fn invalid_package_names_are_rejected() {
    assert!(matches!(
        BridgeSynthesizer::new(PackageMetadata::new("Greeter-Bridge")),
        Err(SynthesisError::Package(_))
    ));
}

// crates/flutnet-bridge-gen/src/native.rs
// ============================================================================
// Module: Native Rendering
// Description: Rust registration stubs for the native side of a bridge.
// Purpose: Bind service implementations to dispatch ids matching the Dart proxies.
// Dependencies: flutnet-core
// ============================================================================

//! ## Overview
//! For each service the native side gets a trait with one method per
//! operation and a `register_<service>` function that binds an implementation
//! into a `flutnet_runtime::DispatchTable` under the same operation ids the
//! Dart proxies send. Data types become serde structs and enums whose field
//! names are renamed to the wire names. `mod.rs` ties the files together and
//! embeds `contract.json`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt::Write;

use flutnet_core::ContractModel;
use flutnet_core::DataKind;
use flutnet_core::OperationDefinition;
use flutnet_core::PrimitiveKind;
use flutnet_core::ReturnShape;
use flutnet_core::SemanticType;
use flutnet_core::ServiceDefinition;
use flutnet_core::TypeName;
use flutnet_core::naming::pascal_case;
use flutnet_core::naming::snake_case;

use crate::error::SynthesisError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Rust keywords that need the raw identifier prefix.
const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false",
    "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
    "ref", "return", "static", "struct", "trait", "true", "type", "unsafe", "use", "where",
    "while", "abstract", "become", "box", "do", "final", "macro", "override", "priv", "try",
    "typeof", "unsized", "virtual", "yield",
];

/// Identifiers that cannot be raw identifiers.
const RUST_RESERVED_PATHS: &[&str] = &["self", "Self", "super", "crate"];

/// Names a registration closure binds or calls besides the decoded arguments.
const BINDING_LOCALS: &[&str] = &["args", "argument", "service", "table", "to_value"];

/// Path of the native data module.
pub const DATA_PATH: &str = "native/data.rs";

/// Path of the native module root.
pub const MOD_PATH: &str = "native/mod.rs";

/// Path of the serialized contract.
pub const CONTRACT_PATH: &str = "native/contract.json";

// ============================================================================
// SECTION: Names
// ============================================================================

/// Returns the Rust module name of a service.
pub fn module_name(name: &TypeName) -> String {
    rust_identifier(&snake_case(name.simple_name()))
}

/// Returns the path of a service stub.
pub fn service_path(name: &TypeName) -> String {
    format!("native/{}.rs", snake_case(name.simple_name()))
}

/// Escapes identifiers that collide with Rust keywords.
fn rust_identifier(raw: &str) -> String {
    if raw.is_empty() || raw.starts_with(|ch: char| ch.is_ascii_digit()) {
        return format!("v{raw}");
    }
    if RUST_RESERVED_PATHS.contains(&raw) {
        return format!("{raw}_");
    }
    if RUST_KEYWORDS.contains(&raw) {
        return format!("r#{raw}");
    }
    raw.to_string()
}

/// Returns the Rust type name of a data type.
fn type_ident(name: &TypeName) -> String {
    rust_identifier(&pascal_case(name.simple_name()))
}

/// Returns the Rust type for a semantic type.
pub fn rust_type(ty: &SemanticType) -> String {
    match ty {
        SemanticType::Primitive {
            primitive,
        } => match primitive {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::U8 => "u8",
            PrimitiveKind::I8 => "i8",
            PrimitiveKind::I16 => "i16",
            PrimitiveKind::I32 => "i32",
            PrimitiveKind::I64 => "i64",
            PrimitiveKind::F32 => "f32",
            PrimitiveKind::F64 => "f64",
            PrimitiveKind::Char => "char",
            PrimitiveKind::String => "String",
        }
        .to_string(),
        SemanticType::Nullable {
            inner,
        } => format!("Option<{}>", rust_type(inner)),
        SemanticType::List {
            element,
        } => format!("Vec<{}>", rust_type(element)),
        SemanticType::Map {
            value,
        } => format!("BTreeMap<String, {}>", rust_type(value)),
        SemanticType::Data {
            name,
        }
        | SemanticType::Enum {
            name,
        } => type_ident(name),
    }
}

/// Returns true when a type mentions a map.
fn uses_map(ty: &SemanticType) -> bool {
    match ty {
        SemanticType::Map {
            ..
        } => true,
        SemanticType::Nullable {
            inner,
        } => uses_map(inner),
        SemanticType::List {
            element,
        } => uses_map(element),
        SemanticType::Primitive {
            ..
        }
        | SemanticType::Data {
            ..
        }
        | SemanticType::Enum {
            ..
        } => false,
    }
}

/// Fails when two generated identifiers in one scope collide.
fn ensure_unique<'a>(scope: &str, idents: impl IntoIterator<Item = &'a str>) -> Result<(), SynthesisError> {
    let mut seen = BTreeSet::new();
    for ident in idents {
        if !seen.insert(ident) {
            return Err(SynthesisError::Generation(format!("{scope} renders two members as `{ident}` in Rust")));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Module Root
// ============================================================================

/// Renders `native/mod.rs`.
pub fn render_mod(model: &ContractModel, header: &str) -> String {
    let mut modules: BTreeSet<String> = model.services.iter().map(|service| module_name(&service.name)).collect();
    modules.insert("data".to_string());
    let mut out = String::from(header);
    let _ = writeln!(out, "\n//! Native bindings for the `{}` assembly.\n", model.assembly);
    for module in &modules {
        let _ = writeln!(out, "pub mod {module};");
    }
    out.push_str("\n/// Validated contract the Dart package was generated from.\n");
    out.push_str("pub const CONTRACT_JSON: &str = include_str!(\"contract.json\");\n");
    out
}

// ============================================================================
// SECTION: Services
// ============================================================================

/// Renders one service stub.
///
/// # Errors
///
/// Returns [`SynthesisError::Generation`] when two operations or parameters
/// render to the same Rust identifier.
pub fn render_service(service: &ServiceDefinition, header: &str) -> Result<String, SynthesisError> {
    let trait_name = type_ident(&service.name);
    let methods: Vec<String> = service.operations.iter().map(|op| rust_identifier(&snake_case(&op.name))).collect();
    ensure_unique(service.name.as_str(), methods.iter().map(String::as_str))?;
    let needs_map = service
        .operations
        .iter()
        .any(|op| op.parameters.iter().any(|param| uses_map(&param.ty)) || op.returns.value().is_some_and(uses_map));

    let mut out = String::from(header);
    out.push('\n');
    if needs_map {
        out.push_str("use std::collections::BTreeMap;\n");
    }
    out.push_str(
        "use std::sync::Arc;\n\nuse flutnet_runtime::DispatchTable;\nuse \
         flutnet_runtime::InvocationError;\nuse flutnet_runtime::OperationBinding;\nuse \
         flutnet_runtime::RuntimeError;\n",
    );
    let needs_argument = service.operations.iter().any(|op| !op.parameters.is_empty());
    if needs_argument {
        out.push_str("use flutnet_runtime::argument;\n");
    }
    if !service.operations.is_empty() {
        out.push_str("use flutnet_runtime::to_value;\n");
    }
    if !service.data_types.is_empty() {
        out.push('\n');
        for name in &service.data_types {
            let _ = writeln!(out, "use super::data::{};", type_ident(name));
        }
    }

    let _ = write!(out, "\n/// Native implementation of the `{}` platform service.\npub trait {trait_name}: Send + Sync + 'static {{\n", service.name);
    for (index, (operation, method)) in service.operations.iter().zip(&methods).enumerate() {
        if index > 0 {
            out.push('\n');
        }
        render_trait_method(&mut out, operation, method)?;
    }
    out.push_str("}\n");

    let _ = write!(
        out,
        "\n/// Binds `service` to the operation ids of `{}`.\n///\n/// # Errors\n///\n/// Returns \
         [`RuntimeError::DuplicateBinding`] when an id is already bound.\npub fn register_{}<T: \
         {trait_name}>(table: &mut DispatchTable, service: Arc<T>) -> Result<(), RuntimeError> {{\n",
        service.name,
        snake_case(service.name.simple_name())
    );
    for (operation, method) in service.operations.iter().zip(&methods) {
        render_binding(&mut out, operation, method);
    }
    if service.operations.is_empty() {
        out.push_str("    let _ = (table, service);\n");
    }
    out.push_str("    Ok(())\n}\n");
    Ok(out)
}

/// Returns the parameter identifiers of an operation.
fn parameter_names(operation: &OperationDefinition) -> Vec<String> {
    operation
        .parameters
        .iter()
        .map(|param| {
            let ident = rust_identifier(&snake_case(&param.name));
            if BINDING_LOCALS.contains(&ident.as_str()) { format!("{ident}_") } else { ident }
        })
        .collect()
}

/// Renders one trait method declaration.
fn render_trait_method(out: &mut String, operation: &OperationDefinition, method: &str) -> Result<(), SynthesisError> {
    let names = parameter_names(operation);
    ensure_unique(operation.id.as_str(), names.iter().map(String::as_str))?;
    let params: String = operation
        .parameters
        .iter()
        .zip(&names)
        .map(|(param, name)| format!(", {name}: {}", rust_type(&param.ty)))
        .collect();
    let value = operation.returns.value().map_or_else(|| "()".to_string(), rust_type);
    let _ = writeln!(out, "    /// `{}`", operation.formal_signature);
    match operation.returns {
        ReturnShape::Async {
            ..
        } => {
            let _ = writeln!(
                out,
                "    fn {method}(&self{params}) -> impl Future<Output = Result<{value}, InvocationError>> + Send;"
            );
        }
        ReturnShape::FireAndForget | ReturnShape::Sync { .. } => {
            let _ = writeln!(out, "    fn {method}(&self{params}) -> Result<{value}, InvocationError>;");
        }
    }
    Ok(())
}

/// Renders the table registration of one operation.
fn render_binding(out: &mut String, operation: &OperationDefinition, method: &str) {
    let names = parameter_names(operation);
    let is_async = matches!(operation.returns, ReturnShape::Async { .. });
    let args_ref = if is_async { "&args" } else { "args" };
    let mut decode = String::new();
    for (index, (param, name)) in operation.parameters.iter().zip(&names).enumerate() {
        let _ = writeln!(
            decode,
            "{{indent}}let {name}: {} = argument({args_ref}, {index})?;",
            rust_type(&param.ty)
        );
    }
    let call_args = names.join(", ");
    let id = operation.id.as_str();
    let args_pattern = if operation.parameters.is_empty() { "_args" } else { "args" };
    let _ = writeln!(out, "    {{\n        let service = Arc::clone(&service);");
    if is_async {
        let _ = writeln!(
            out,
            "        table.register(\n            \"{id}\",\n            OperationBinding::asynchronous(move \
             |{args_pattern}| {{\n                let service = Arc::clone(&service);\n                async move \
             {{"
        );
        out.push_str(&decode.replace("{indent}", "                    "));
        let _ = writeln!(
            out,
            "                    to_value(&service.{method}({call_args}).await?)\n                \
             }}\n            }}),\n        )?;\n    }}"
        );
    } else {
        let _ = writeln!(
            out,
            "        table.register(\n            \"{id}\",\n            OperationBinding::sync(move \
             |{args_pattern}| {{"
        );
        out.push_str(&decode.replace("{indent}", "                "));
        let _ = writeln!(
            out,
            "                to_value(&service.{method}({call_args})?)\n            }}),\n        )?;\n    }}"
        );
    }
}

// ============================================================================
// SECTION: Data Types
// ============================================================================

/// Renders `native/data.rs`.
///
/// # Errors
///
/// Returns [`SynthesisError::Generation`] when two fields or members render
/// to the same Rust identifier.
pub fn render_data(model: &ContractModel, header: &str) -> Result<String, SynthesisError> {
    let needs_map = model.data_types.iter().any(|data| match &data.kind {
        DataKind::Composite {
            ..
        } => model.all_fields(&data.name).iter().any(|field| uses_map(&field.ty)),
        DataKind::Enumeration {
            ..
        } => false,
    });
    let mut out = String::from(header);
    out.push_str("\n//! Wire data types.\n\n");
    if needs_map {
        out.push_str("use std::collections::BTreeMap;\n\n");
    }
    out.push_str("use serde::Deserialize;\nuse serde::Serialize;\n");
    for data in &model.data_types {
        let ident = type_ident(&data.name);
        match &data.kind {
            DataKind::Enumeration {
                members,
            } => {
                let idents: Vec<String> = members.iter().map(|member| rust_identifier(&pascal_case(member))).collect();
                ensure_unique(data.name.as_str(), idents.iter().map(String::as_str))?;
                let _ = write!(
                    out,
                    "\n/// Wire enumeration `{}`.\n#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, \
                     Serialize, Deserialize)]\npub enum {ident} {{\n",
                    data.name
                );
                for (member, member_ident) in members.iter().zip(&idents) {
                    let _ = writeln!(out, "    #[serde(rename = \"{member}\")]\n    {member_ident},");
                }
                out.push_str("}\n");
            }
            DataKind::Composite {
                ..
            } => {
                let fields = model.all_fields(&data.name);
                let idents: Vec<String> = fields.iter().map(|field| rust_identifier(&snake_case(&field.name))).collect();
                ensure_unique(data.name.as_str(), idents.iter().map(String::as_str))?;
                let _ = write!(
                    out,
                    "\n/// Wire data type `{}`.\n#[derive(Debug, Clone, PartialEq, Serialize, \
                     Deserialize)]\n#[serde(deny_unknown_fields)]\npub struct {ident} {{\n",
                    data.name
                );
                for (field, field_ident) in fields.iter().zip(&idents) {
                    let default = if field.ty.is_nullable() { ", default" } else { "" };
                    let _ = writeln!(
                        out,
                        "    #[serde(rename = \"{}\"{default})]\n    pub {field_ident}: {},",
                        field.name,
                        rust_type(&field.ty)
                    );
                }
                out.push_str("}\n");
            }
        }
    }
    Ok(out)
}

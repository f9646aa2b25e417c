// crates/flutnet-bridge-gen/src/dart.rs
// ============================================================================
// Module: Dart Rendering
// Description: Dart package sources for a validated contract.
// Purpose: Render proxies, data codecs, the bridge runtime, and the pubspec.
// Dependencies: flutnet-core
// ============================================================================

//! ## Overview
//! Every Dart file is rendered in one pass into a `String`. Services become
//! proxy classes that build call envelopes and unwrap replies; data types
//! become immutable classes with `toJson`/`fromJson`, or enhanced enums
//! carrying their wire names. Synchronous and asynchronous operations both
//! surface as `Future`s because the platform channel is asynchronous;
//! fire-and-forget operations return `void` and never wait.
//!
//! Composite classes are flattened: inherited fields come first and there is
//! no Dart `extends`, matching the untagged wire form.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt::Write;

use flutnet_core::ContractModel;
use flutnet_core::DataKind;
use flutnet_core::DataTypeDefinition;
use flutnet_core::OperationDefinition;
use flutnet_core::PackageMetadata;
use flutnet_core::PrimitiveKind;
use flutnet_core::ReturnShape;
use flutnet_core::SemanticType;
use flutnet_core::ServiceDefinition;
use flutnet_core::TypeName;
use flutnet_core::naming::lower_camel_case;
use flutnet_core::naming::pascal_case;
use flutnet_core::naming::snake_case;
use flutnet_core::package::DART_RESERVED;

use crate::error::SynthesisError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Runtime error kinds as they appear on the wire.
const WIRE_ERROR_KINDS: &[&str] = &[
    "OperationNotImplemented",
    "OperationArgumentCountMismatch",
    "InvalidOperationArguments",
    "OperationArgumentParsingError",
    "OperationFailed",
    "OperationCanceled",
    "EnvironmentNotInitialized",
];

/// Names a proxy method body references besides its parameters.
const PROXY_LOCALS: &[&str] = &[
    "result",
    "callEnvelope",
    "unwrapReply",
    "encodeNullable",
    "decodeNullable",
    "decodeList",
    "decodeMap",
];

/// Members every Dart object already declares.
const OBJECT_MEMBERS: &[&str] = &["hashCode", "noSuchMethod", "runtimeType", "toString"];

/// Members generated on data classes.
const DATA_CLASS_MEMBERS: &[&str] = &["toJson", "fromJson"];

/// Members generated on enhanced enums.
const ENUM_MEMBERS: &[&str] = &["fromWire", "wireName", "values", "index", "name"];

/// Path of the shared bridge library.
pub const BRIDGE_PATH: &str = "lib/src/bridge.dart";

// ============================================================================
// SECTION: Paths and Names
// ============================================================================

/// Returns the Dart class name of a service or data type.
pub fn class_name(name: &TypeName) -> String {
    pascal_case(name.simple_name())
}

/// Returns the path of a service proxy.
pub fn service_path(name: &TypeName) -> String {
    format!("lib/src/services/{}.dart", snake_case(name.simple_name()))
}

/// Returns the path of a data type file.
pub fn data_path(name: &TypeName) -> String {
    format!("lib/src/data/{}.dart", snake_case(name.simple_name()))
}

/// Escapes identifiers that collide with Dart reserved words.
fn dart_identifier(raw: &str) -> String {
    let mut ident = raw.to_string();
    if ident.is_empty() || ident.starts_with(|ch: char| ch.is_ascii_digit()) {
        ident.insert(0, 'v');
    }
    if DART_RESERVED.contains(&ident.as_str()) {
        ident.push('_');
    }
    ident
}

/// Escapes identifiers that also collide with names generated in their scope.
fn scoped_identifier(raw: &str, taken: &[&[&str]]) -> String {
    let mut ident = dart_identifier(raw);
    if taken.iter().any(|names| names.contains(&ident.as_str())) {
        ident.push('_');
    }
    ident
}

/// Quotes a Dart single-quoted string literal.
fn dart_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for ch in value.chars() {
        match ch {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '$' => out.push_str("\\$"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// Fails when two generated identifiers in one scope collide.
fn ensure_unique_identifiers<'a>(
    scope: &str,
    idents: impl IntoIterator<Item = &'a str>,
) -> Result<(), SynthesisError> {
    let mut seen = BTreeSet::new();
    for ident in idents {
        if !seen.insert(ident) {
            return Err(SynthesisError::Generation(format!(
                "{scope} renders two members as `{ident}` in Dart"
            )));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Type Mapping
// ============================================================================

/// Returns the Dart type for a semantic type.
pub fn dart_type(ty: &SemanticType) -> String {
    match ty {
        SemanticType::Primitive {
            primitive,
        } => match primitive {
            PrimitiveKind::Bool => "bool".to_string(),
            PrimitiveKind::U8
            | PrimitiveKind::I8
            | PrimitiveKind::I16
            | PrimitiveKind::I32
            | PrimitiveKind::I64 => "int".to_string(),
            PrimitiveKind::F32 | PrimitiveKind::F64 => "double".to_string(),
            PrimitiveKind::Char | PrimitiveKind::String => "String".to_string(),
        },
        SemanticType::Nullable {
            inner,
        } => format!("{}?", dart_type(inner)),
        SemanticType::List {
            element,
        } => format!("List<{}>", dart_type(element)),
        SemanticType::Map {
            value,
        } => format!("Map<String, {}>", dart_type(value)),
        SemanticType::Data {
            name,
        }
        | SemanticType::Enum {
            name,
        } => class_name(name),
    }
}

/// Returns an expression decoding the wire value `expr` into `ty`.
fn decode_expr(ty: &SemanticType, expr: &str, depth: usize) -> String {
    let var = format!("v{depth}");
    match ty {
        SemanticType::Primitive {
            primitive,
        } => match primitive {
            PrimitiveKind::Bool => format!("({expr} as bool)"),
            PrimitiveKind::U8
            | PrimitiveKind::I8
            | PrimitiveKind::I16
            | PrimitiveKind::I32
            | PrimitiveKind::I64 => format!("({expr} as num).toInt()"),
            PrimitiveKind::F32 | PrimitiveKind::F64 => format!("({expr} as num).toDouble()"),
            PrimitiveKind::Char | PrimitiveKind::String => format!("({expr} as String)"),
        },
        SemanticType::Nullable {
            inner,
        } => format!("decodeNullable({expr}, ({var}) => {})", decode_expr(inner, &var, depth + 1)),
        SemanticType::List {
            element,
        } => format!("decodeList({expr}, ({var}) => {})", decode_expr(element, &var, depth + 1)),
        SemanticType::Map {
            value,
        } => format!("decodeMap({expr}, ({var}) => {})", decode_expr(value, &var, depth + 1)),
        SemanticType::Data {
            name,
        } => format!("{}.fromJson({expr})", class_name(name)),
        SemanticType::Enum {
            name,
        } => format!("{}.fromWire({expr})", class_name(name)),
    }
}

/// Returns an expression encoding the Dart value `expr` of type `ty`.
fn encode_expr(ty: &SemanticType, expr: &str, depth: usize) -> String {
    let var = format!("v{depth}");
    match ty {
        SemanticType::Primitive {
            ..
        } => expr.to_string(),
        SemanticType::Nullable {
            inner,
        } => {
            let inner_expr = encode_expr(inner, &var, depth + 1);
            if inner_expr == var {
                expr.to_string()
            } else {
                format!("encodeNullable({expr}, ({var}) => {inner_expr})")
            }
        }
        SemanticType::List {
            element,
        } => {
            let inner_expr = encode_expr(element, &var, depth + 1);
            if inner_expr == var {
                expr.to_string()
            } else {
                format!("{expr}.map(({var}) => {inner_expr}).toList()")
            }
        }
        SemanticType::Map {
            value,
        } => {
            let inner_expr = encode_expr(value, &var, depth + 1);
            if inner_expr == var {
                expr.to_string()
            } else {
                format!("{expr}.map((k{depth}, {var}) => MapEntry(k{depth}, {inner_expr}))")
            }
        }
        SemanticType::Data {
            ..
        } => format!("{expr}.toJson()"),
        SemanticType::Enum {
            ..
        } => format!("{expr}.wireName"),
    }
}

/// Collects `import` lines for the data types a file references.
fn data_imports(names: &BTreeSet<TypeName>, exclude: Option<&TypeName>) -> String {
    let mut out = String::new();
    for name in names.iter().filter(|name| Some(*name) != exclude) {
        let _ = writeln!(out, "import '../data/{}.dart';", snake_case(name.simple_name()));
    }
    out
}

/// Renders the generated-file header.
pub fn header(prefix: &str, fingerprint: &str) -> String {
    format!(
        "{prefix} This file is @generated by flutnet-bridge-gen. DO NOT EDIT.\n{prefix} Contract: \
         {fingerprint}\n"
    )
}

// ============================================================================
// SECTION: Package Files
// ============================================================================

/// Renders `pubspec.yaml`.
pub fn render_pubspec(package: &PackageMetadata, header: &str) -> String {
    let mut out = String::from(header);
    let description = package.description.replace('\\', "\\\\").replace('"', "\\\"");
    let _ = write!(
        out,
        "\nname: {}\ndescription: \"{description}\"\nversion: {}\npublish_to: none\n\nenvironment:\n  \
         sdk: \"{}\"\n",
        package.name, package.version, package.dart_sdk
    );
    out
}

/// Renders the library barrel `lib/<package>.dart`.
pub fn render_barrel(package: &PackageMetadata, model: &ContractModel, header: &str) -> String {
    let mut exports = BTreeSet::new();
    exports.insert("src/bridge.dart".to_string());
    for service in &model.services {
        exports.insert(service_path(&service.name).trim_start_matches("lib/").to_string());
    }
    for data in &model.data_types {
        exports.insert(data_path(&data.name).trim_start_matches("lib/").to_string());
    }
    let mut out = String::from(header);
    let _ = writeln!(out, "\n/// Platform bridge for the `{}` assembly.", model.assembly);
    let _ = writeln!(out, "library {};\n", package.name);
    for export in exports {
        let _ = writeln!(out, "export '{export}';");
    }
    out
}

/// Renders the shared bridge library.
pub fn render_bridge(header: &str) -> String {
    let mut out = String::from(header);
    out.push_str(
        "\nimport 'dart:async';\n\n/// Delivers call envelopes to the native runtime.\n///\n/// \
         Implementations own correlation ids and the platform channel.\nabstract class \
         FlutnetTransport {\n  /// Sends a call and completes with its reply envelope.\n  \
         Future<Map<Object?, Object?>> invoke(Map<String, Object?> call);\n\n  /// Sends a call \
         that never replies.\n  void post(Map<String, Object?> call);\n\n  /// Returns the \
         payload stream of one platform event.\n  Stream<Object?> events(String eventId);\n}\n\n",
    );
    out.push_str("/// Failure kinds reported by the native runtime.\nenum PlatformErrorKind {\n");
    for kind in WIRE_ERROR_KINDS {
        let _ = writeln!(out, "  {}({}),", lower_camel_case(kind), dart_string(kind));
    }
    out.push_str(
        "  unknown('Unknown');\n\n  const PlatformErrorKind(this.wireName);\n\n  final String \
         wireName;\n\n  static PlatformErrorKind fromWire(Object? value) =>\n      \
         PlatformErrorKind.values.firstWhere(\n        (kind) => kind.wireName == value,\n        \
         orElse: () => PlatformErrorKind.unknown,\n      );\n}\n\n",
    );
    out.push_str(
        "/// Structured failure of a platform operation.\nclass PlatformOperationException \
         implements Exception {\n  PlatformOperationException(this.kind, this.message);\n\n  \
         final PlatformErrorKind kind;\n  final String message;\n\n  @override\n  String \
         toString() => 'PlatformOperationException(${kind.wireName}): $message';\n}\n\n",
    );
    out.push_str(
        "/// Builds a call envelope.\nMap<String, Object?> callEnvelope(String operationId, \
         List<Object?> arguments) =>\n    <String, Object?>{'operation_id': operationId, \
         'arguments': arguments};\n\n/// Returns the result of a reply envelope or throws its \
         error.\nObject? unwrapReply(Map<Object?, Object?> reply) {\n  final payload = \
         reply['payload']! as Map<Object?, Object?>;\n  final error = payload['error'];\n  if \
         (error != null) {\n    final fields = error as Map<Object?, Object?>;\n    throw \
         PlatformOperationException(\n      PlatformErrorKind.fromWire(fields['kind']),\n      \
         fields['message']! as String,\n    );\n  }\n  return payload['result'];\n}\n\n",
    );
    out.push_str(
        "/// Decodes a nullable wire value.\nT? decodeNullable<T>(Object? value, T Function(Object? \
         value) decode) =>\n    value == null ? null : decode(value);\n\n/// Decodes a wire \
         list.\nList<T> decodeList<T>(Object? value, T Function(Object? item) decode) =>\n    \
         (value! as List<Object?>).map(decode).toList();\n\n/// Decodes a string-keyed wire \
         map.\nMap<String, T> decodeMap<T>(Object? value, T Function(Object? item) decode) =>\n    \
         (value! as Map<Object?, Object?>)\n        .map((key, item) => MapEntry(key! as String, \
         decode(item)));\n\n/// Encodes a nullable value.\nObject? encodeNullable<T extends \
         Object>(T? value, Object? Function(T value) encode) =>\n    value == null ? null : \
         encode(value);\n",
    );
    out
}

// ============================================================================
// SECTION: Services
// ============================================================================

/// Renders one service proxy.
///
/// # Errors
///
/// Returns [`SynthesisError::Generation`] when two members render to the
/// same Dart identifier.
pub fn render_service(service: &ServiceDefinition, header: &str) -> Result<String, SynthesisError> {
    let class = class_name(&service.name);
    let methods: Vec<String> =
        service.operations.iter().map(|op| scoped_identifier(&lower_camel_case(&op.name), &[OBJECT_MEMBERS])).collect();
    let getters: Vec<String> =
        service.events.iter().map(|event| format!("on{}", pascal_case(&event.name))).collect();
    ensure_unique_identifiers(
        service.name.as_str(),
        methods.iter().chain(&getters).map(String::as_str),
    )?;

    let mut out = String::from(header);
    out.push_str("\nimport '../bridge.dart';\n");
    out.push_str(&data_imports(&service.data_types, None));
    let _ = write!(
        out,
        "\n/// Proxy for the `{}` platform service.\nclass {class} {{\n  {class}(this._transport);\n\n  \
         final FlutnetTransport _transport;\n",
        service.name
    );
    for (operation, method) in service.operations.iter().zip(&methods) {
        out.push('\n');
        render_operation(&mut out, operation, method)?;
    }
    for (event, getter) in service.events.iter().zip(&getters) {
        let id = dart_string(event.id.as_str());
        let _ = write!(out, "\n  /// Occurrences of the `{}` event.\n", event.name);
        match &event.payload {
            Some(ty) => {
                let _ = writeln!(
                    out,
                    "  Stream<{}> get {getter} =>\n      _transport.events({id}).map((payload) => {});",
                    dart_type(ty),
                    decode_expr(ty, "payload", 0)
                );
            }
            None => {
                let _ = writeln!(out, "  Stream<void> get {getter} => _transport.events({id}).map((_) {{}});");
            }
        }
    }
    out.push_str("}\n");
    Ok(out)
}

/// Renders one proxy method.
fn render_operation(
    out: &mut String,
    operation: &OperationDefinition,
    method: &str,
) -> Result<(), SynthesisError> {
    let names: Vec<String> = operation
        .parameters
        .iter()
        .map(|param| scoped_identifier(&lower_camel_case(&param.name), &[PROXY_LOCALS]))
        .collect();
    ensure_unique_identifiers(operation.id.as_str(), names.iter().map(String::as_str))?;
    let params = operation
        .parameters
        .iter()
        .zip(&names)
        .map(|(param, name)| format!("{} {name}", dart_type(&param.ty)))
        .collect::<Vec<_>>()
        .join(", ");
    let arguments = operation
        .parameters
        .iter()
        .zip(&names)
        .map(|(param, name)| encode_expr(&param.ty, name, 0))
        .collect::<Vec<_>>()
        .join(", ");
    let call = format!("callEnvelope({}, <Object?>[{arguments}])", dart_string(operation.id.as_str()));
    let (shape, signature, body) = match &operation.returns {
        ReturnShape::FireAndForget => {
            ("fire-and-forget", format!("void {method}({params})"), format!("    _transport.post({call});\n"))
        }
        ReturnShape::Async {
            value: None,
        } => (
            "asynchronous",
            format!("Future<void> {method}({params}) async"),
            format!("    unwrapReply(await _transport.invoke({call}));\n"),
        ),
        ReturnShape::Sync {
            value,
        }
        | ReturnShape::Async {
            value: Some(value),
        } => (
            if matches!(operation.returns, ReturnShape::Sync { .. }) { "synchronous" } else { "asynchronous" },
            format!("Future<{}> {method}({params}) async", dart_type(value)),
            format!(
                "    final result = unwrapReply(await _transport.invoke({call}));\n    return {};\n",
                decode_expr(value, "result", 0)
            ),
        ),
    };
    let _ = write!(
        out,
        "  /// Calls `{}` ({shape} on the native side).\n  {signature} {{\n{body}  }}\n",
        operation.formal_signature
    );
    Ok(())
}

// ============================================================================
// SECTION: Data Types
// ============================================================================

/// Renders one data type file.
///
/// # Errors
///
/// Returns [`SynthesisError::Generation`] when two fields or members render
/// to the same Dart identifier.
pub fn render_data_type(
    model: &ContractModel,
    data: &DataTypeDefinition,
    header: &str,
) -> Result<String, SynthesisError> {
    let class = class_name(&data.name);
    let mut out = String::from(header);
    match &data.kind {
        DataKind::Enumeration {
            members,
        } => {
            let idents: Vec<String> = members
                .iter()
                .map(|member| scoped_identifier(&lower_camel_case(member), &[ENUM_MEMBERS, OBJECT_MEMBERS]))
                .collect();
            ensure_unique_identifiers(data.name.as_str(), idents.iter().map(String::as_str))?;
            let _ = write!(out, "\n/// Wire enumeration `{}`.\nenum {class} {{\n", data.name);
            for (index, (member, ident)) in members.iter().zip(&idents).enumerate() {
                let terminator = if index + 1 == members.len() { ';' } else { ',' };
                let _ = writeln!(out, "  {ident}({}){terminator}", dart_string(member));
            }
            let _ = write!(
                out,
                "\n  const {class}(this.wireName);\n\n  final String wireName;\n\n  static {class} \
                 fromWire(Object? value) => {class}.values.firstWhere(\n        (member) => \
                 member.wireName == value,\n        orElse: () => throw FormatException('unknown \
                 {class} member: $value'),\n      );\n}}\n"
            );
        }
        DataKind::Composite {
            ..
        } => {
            let fields = model.all_fields(&data.name);
            let idents: Vec<String> = fields
                .iter()
                .map(|field| scoped_identifier(&lower_camel_case(&field.name), &[DATA_CLASS_MEMBERS, OBJECT_MEMBERS]))
                .collect();
            ensure_unique_identifiers(data.name.as_str(), idents.iter().map(String::as_str))?;
            let mut referenced = BTreeSet::new();
            for field in &fields {
                field.ty.collect_named(&mut referenced);
            }
            out.push_str("\nimport '../bridge.dart';\n");
            out.push_str(&data_imports(&referenced, Some(&data.name)));
            let _ = write!(out, "\n/// Wire data type `{}`.\nclass {class} {{\n", data.name);
            let ctor = fields
                .iter()
                .zip(&idents)
                .map(|(field, ident)| {
                    if field.ty.is_nullable() { format!("this.{ident}") } else { format!("required this.{ident}") }
                })
                .collect::<Vec<_>>();
            if ctor.is_empty() {
                let _ = writeln!(out, "  const {class}();");
            } else {
                let _ = writeln!(out, "  const {class}({{{}}});", ctor.join(", "));
            }
            out.push('\n');
            for (field, ident) in fields.iter().zip(&idents) {
                let _ = writeln!(out, "  final {} {ident};", dart_type(&field.ty));
            }
            out.push_str("\n  /// Encodes this value into its wire form.\n  Map<String, Object?> toJson() => <String, Object?>{\n");
            for (field, ident) in fields.iter().zip(&idents) {
                let _ = writeln!(out, "        {}: {},", dart_string(&field.name), encode_expr(&field.ty, ident, 0));
            }
            out.push_str("      };\n");
            let _ = write!(
                out,
                "\n  /// Decodes a wire value.\n  factory {class}.fromJson(Object? json) {{\n    final \
                 map = json! as Map<Object?, Object?>;\n    return {class}(\n"
            );
            for (field, ident) in fields.iter().zip(&idents) {
                let access = format!("map[{}]", dart_string(&field.name));
                let _ = writeln!(out, "      {ident}: {},", decode_expr(&field.ty, &access, 0));
            }
            out.push_str("    );\n  }\n}\n");
        }
    }
    Ok(out)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

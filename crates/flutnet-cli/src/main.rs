// crates/flutnet-cli/src/main.rs
// ============================================================================
// Module: Flutnet CLI Entry Point
// Description: Command dispatcher for contract validation and package synthesis.
// Purpose: Provide the `flutnet` binary used by build scripts and tooling.
// Dependencies: clap, flutnet-bridge-gen, flutnet-config, flutnet-core, thiserror.
// ============================================================================

//! ## Overview
//! The Flutnet CLI validates assembly metadata, synthesizes Dart bridge
//! packages, checks existing packages for drift, and runs auxiliary JSON
//! actions. All user-facing strings are routed through the message catalog.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use flutnet_bridge_gen::BridgeSynthesizer;
use flutnet_cli::exec::ExecRequest;
use flutnet_cli::exec::execute;
use flutnet_cli::logging;
use flutnet_cli::logging::LOG_ENV_VAR;
use flutnet_cli::logging::LevelSource;
use flutnet_cli::t;
use flutnet_config::FlutnetConfig;
use flutnet_core::AssemblyMetadata;
use flutnet_core::ContractValidator;
use flutnet_core::MetadataError;
use flutnet_core::PackageMetadata;
use flutnet_core::ValidationOutcome;
use thiserror::Error;
use tracing::info;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of an `exec` request document.
const MAX_EXEC_INPUT_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "flutnet", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Config file path (overrides `FLUTNET_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Log level (overrides `FLUTNET_LOG` and the config file).
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a Dart bridge package from assembly metadata.
    Pack(PackCommand),
    /// Verify a generated package matches its assembly metadata.
    Check(CheckCommand),
    /// Validate assembly metadata and print every diagnostic.
    Validate(ValidateCommand),
    /// Run an auxiliary JSON action.
    Exec(ExecCommand),
}

/// Package identity and placement shared by `pack` and `check`.
#[derive(Args, Debug)]
struct PackageArgs {
    /// Assembly metadata document (JSON).
    assembly: PathBuf,
    /// Dart package name (overrides `package.name`).
    package: Option<String>,
    /// Output directory (defaults to `output.dir`, then the package name).
    #[arg(long, short = 'o', value_name = "DIR")]
    output: Option<PathBuf>,
}

/// Configuration for the `pack` command.
#[derive(Args, Debug)]
struct PackCommand {
    /// Package selection.
    #[command(flatten)]
    package: PackageArgs,
    /// Replace an existing non-empty output directory.
    #[arg(long, action = ArgAction::SetTrue)]
    overwrite: bool,
}

/// Configuration for the `check` command.
#[derive(Args, Debug)]
struct CheckCommand {
    /// Package selection.
    #[command(flatten)]
    package: PackageArgs,
}

/// Configuration for the `validate` command.
#[derive(Args, Debug)]
struct ValidateCommand {
    /// Assembly metadata document (JSON).
    assembly: PathBuf,
    /// Output format.
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,
}

/// Configuration for the `exec` command.
#[derive(Args, Debug)]
struct ExecCommand {
    /// Request document.
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Response document.
    #[arg(long, value_name = "PATH")]
    output: PathBuf,
}

/// Validation report formats.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum ReportFormat {
    /// One line per diagnostic.
    Text,
    /// The report as a JSON array.
    Json,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for catalog messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a catalog message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Errors raised while reading bounded inputs.
#[derive(Debug)]
enum ReadLimitError {
    /// I/O failure.
    Io(std::io::Error),
    /// Input exceeded the limit.
    TooLarge {
        /// Observed size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let config = FlutnetConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    init_logging(cli.log_level.as_deref(), &config)?;

    match command {
        Commands::Pack(command) => command_pack(&command, &config),
        Commands::Check(command) => command_check(&command, &config),
        Commands::Validate(command) => command_validate(&command),
        Commands::Exec(command) => command_exec(&command),
    }
}

/// Resolves the log level and installs the subscriber.
fn init_logging(flag: Option<&str>, config: &FlutnetConfig) -> CliResult<()> {
    let env_value = std::env::var(LOG_ENV_VAR).ok();
    let (level, _) = logging::resolve_level(flag, env_value.as_deref(), config.logging.level)
        .map_err(|(source, err)| {
            let source = match source {
                LevelSource::Flag => "--log-level".to_string(),
                LevelSource::Environment => LOG_ENV_VAR.to_string(),
                LevelSource::Config => "config".to_string(),
            };
            CliError::new(t!("logging.level_invalid", source = source, error = err))
        })?;
    logging::try_init(level)
        .map_err(|err| CliError::new(t!("logging.init_failed", error = err)))
}

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    let help = command.render_help().to_string();
    write_stdout_line(&help).map_err(|err| CliError::new(output_error("stdout", &err)))
}

// ============================================================================
// SECTION: Pack and Check Commands
// ============================================================================

/// Executes the `pack` command.
fn command_pack(command: &PackCommand, config: &FlutnetConfig) -> CliResult<ExitCode> {
    let (package, output_dir) = resolve_package(&command.package, config)?;
    let outcome = load_outcome(&command.package.assembly)?;
    let synthesizer = BridgeSynthesizer::new(package)
        .map_err(|err| CliError::new(t!("package.invalid", error = err)))?;
    let overwrite = command.overwrite || config.output.overwrite;
    let manifest = synthesizer
        .write_to(&outcome, &output_dir, overwrite)
        .map_err(|err| CliError::new(t!("pack.failed", error = err)))?;
    info!(fingerprint = manifest.contract_fingerprint.as_str(), "pack complete");
    write_stdout_line(&t!(
        "pack.ok",
        count = manifest.artifacts.len(),
        package = manifest.package.name,
        path = output_dir.display()
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes the `check` command.
fn command_check(command: &CheckCommand, config: &FlutnetConfig) -> CliResult<ExitCode> {
    let (package, output_dir) = resolve_package(&command.package, config)?;
    let outcome = load_outcome(&command.package.assembly)?;
    let synthesizer = BridgeSynthesizer::new(package)
        .map_err(|err| CliError::new(t!("package.invalid", error = err)))?;
    synthesizer
        .verify(&outcome, &output_dir)
        .map_err(|err| CliError::new(t!("check.failed", error = err)))?;
    write_stdout_line(&t!("check.ok", path = output_dir.display()))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Resolves package metadata and the output directory.
fn resolve_package(
    args: &PackageArgs,
    config: &FlutnetConfig,
) -> CliResult<(PackageMetadata, PathBuf)> {
    let package = config
        .package
        .metadata(args.package.as_deref())
        .map_err(|err| CliError::new(t!("package.invalid", error = err)))?;
    let output_dir =
        args.output.clone().unwrap_or_else(|| config.output.resolve_dir(&package.name));
    Ok((package, output_dir))
}

/// Loads metadata and runs the validator.
fn load_outcome(assembly: &Path) -> CliResult<ValidationOutcome> {
    let metadata = AssemblyMetadata::load(assembly).map_err(|err| metadata_error(assembly, &err))?;
    let validator =
        ContractValidator::new(&metadata).map_err(|err| metadata_error(assembly, &err))?;
    Ok(validator.validate())
}

/// Formats a metadata failure.
fn metadata_error(path: &Path, err: &MetadataError) -> CliError {
    match err {
        MetadataError::Io(_) | MetadataError::Parse(_) => {
            CliError::new(t!("metadata.load_failed", path = path.display(), error = err))
        }
        MetadataError::Invalid(_) => {
            CliError::new(t!("metadata.invalid", path = path.display(), error = err))
        }
    }
}

// ============================================================================
// SECTION: Validate Command
// ============================================================================

/// Executes the `validate` command.
fn command_validate(command: &ValidateCommand) -> CliResult<ExitCode> {
    let outcome = load_outcome(&command.assembly)?;
    let output = render_report(&outcome, command.format)?;
    write_stdout_bytes(output.as_bytes())
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    let errors = outcome.report.errors().count();
    if errors > 0 {
        write_stderr_line(&t!("validate.failed", count = errors))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Renders a validation report.
fn render_report(outcome: &ValidationOutcome, format: ReportFormat) -> CliResult<String> {
    match format {
        ReportFormat::Json => {
            let mut output = serde_json::to_string_pretty(&outcome.report)
                .map_err(|err| CliError::new(t!("validate.serialize_failed", error = err)))?;
            output.push('\n');
            Ok(output)
        }
        ReportFormat::Text => {
            let model = &outcome.model;
            let operations: usize =
                model.services.iter().map(|service| service.operations.len()).sum();
            let mut lines = vec![t!(
                "validate.summary",
                assembly = model.assembly,
                services = model.services.len(),
                operations = operations,
                data_types = model.data_types.len()
            )];
            if outcome.report.is_empty() {
                lines.push(t!("validate.no_diagnostics"));
            }
            for diagnostic in outcome.report.diagnostics() {
                lines.push(t!("validate.diagnostic", diagnostic = diagnostic));
            }
            let mut output = lines.join("\n");
            output.push('\n');
            Ok(output)
        }
    }
}

// ============================================================================
// SECTION: Exec Command
// ============================================================================

/// Executes the `exec` command.
fn command_exec(command: &ExecCommand) -> CliResult<ExitCode> {
    let bytes = read_bytes_with_limit(&command.input, MAX_EXEC_INPUT_BYTES).map_err(|err| {
        let error = match err {
            ReadLimitError::Io(err) => err.to_string(),
            ReadLimitError::TooLarge {
                size,
                limit,
            } => format!("{size} bytes exceeds the {limit} byte limit"),
        };
        CliError::new(t!("exec.read_failed", path = command.input.display(), error = error))
    })?;
    let request: ExecRequest = serde_json::from_slice(&bytes).map_err(|err| {
        CliError::new(t!("exec.parse_failed", path = command.input.display(), error = err))
    })?;
    let response = execute(&request);
    let mut output = serde_json::to_vec_pretty(&response)
        .map_err(|err| CliError::new(t!("exec.serialize_failed", error = err)))?;
    output.push(b'\n');
    std::fs::write(&command.output, output).map_err(|err| {
        CliError::new(t!("exec.write_failed", path = command.output.display(), error = err))
    })?;
    if let Some(error) = response.error {
        write_stderr_line(&t!("exec.action_failed", action = request.action(), error = error))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let metadata = file.metadata().map_err(ReadLimitError::Io)?;
    let size = metadata.len();
    let limit = u64::try_from(max_bytes).map_err(|_| ReadLimitError::TooLarge {
        size,
        limit: max_bytes,
    })?;
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut limited = file.take(limit.saturating_add(1));
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        let actual = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        return Err(ReadLimitError::TooLarge {
            size: actual,
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

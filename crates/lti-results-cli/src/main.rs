// crates/lti-results-cli/src/main.rs
// ============================================================================
// Module: LTI Results CLI Entry Point
// Description: Command dispatcher for the Results server and its stores.
// Purpose: Start the server, validate configuration, and seed SQLite stores.
// Dependencies: clap, lti-results-config, lti-results-service, thiserror, tokio
// ============================================================================

//! ## Overview
//! `lti-results` starts the Results collection server, validates a
//! configuration file, and imports JSON gradebook snapshots into the `SQLite`
//! store. Inputs are untrusted: files are read with hard size limits and the
//! server refuses non-loopback binds without explicit opt-in.

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
use lti_results_cli::serve_policy::BindOutcome;
use lti_results_cli::serve_policy::enforce_local_only;
use lti_results_cli::serve_policy::resolve_allow_non_loopback;
use lti_results_config::LtiResultsConfig;
use lti_results_config::StoreType;
use lti_results_core::GradebookSnapshot;
use lti_results_service::ResultsServer;
use lti_results_store_sqlite::SqliteGradebook;
use lti_results_store_sqlite::SqliteGradebookConfig;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum gradebook snapshot size accepted by `store import`.
const MAX_SNAPSHOT_BYTES: usize = 64 * 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "lti-results", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Results collection server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Grade store administration utilities.
    Store {
        /// Selected store subcommand.
        #[command(subcommand)]
        command: StoreCommand,
    },
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to lti-results.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Allow binding to non-loopback addresses.
    #[arg(long, action = ArgAction::SetTrue)]
    allow_non_loopback: bool,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate an LTI Results configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to lti-results.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Store subcommands.
#[derive(Subcommand, Debug)]
enum StoreCommand {
    /// Import a JSON gradebook snapshot into the configured `SQLite` store.
    Import(StoreImportCommand),
}

/// Arguments for `store import`.
#[derive(Args, Debug)]
struct StoreImportCommand {
    /// Optional config file path (defaults to lti-results.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// JSON gradebook snapshot to import.
    #[arg(long, value_name = "PATH")]
    snapshot: PathBuf,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("lti-results {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Store {
            command,
        } => command_store(command),
    }
}

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let help = Cli::command().render_help().to_string();
    write_stdout_line(help.trim_end()).map_err(|err| CliError::new(output_error("stdout", &err)))
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = LtiResultsConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let allow_non_loopback = resolve_allow_non_loopback(command.allow_non_loopback)
        .map_err(|err| CliError::new(err.to_string()))?;
    let bind_outcome = enforce_local_only(&config, allow_non_loopback)
        .map_err(|err| CliError::new(err.to_string()))?;
    if bind_outcome.network_exposed {
        warn_network_exposure(&bind_outcome)?;
    }
    let prefix = config.server.path_prefix.clone();

    let server = tokio::task::spawn_blocking(move || ResultsServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("server init failed: init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    write_stderr_line(&format!(
        "lti-results: serving results on http://{}{prefix}",
        bind_outcome.bind_addr
    ))
    .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;

    Ok(ExitCode::SUCCESS)
}

/// Warns that the server is reachable from the network.
fn warn_network_exposure(outcome: &BindOutcome) -> CliResult<()> {
    let mut lines = vec![format!(
        "warning: lti-results is bound to non-loopback address {}; grade data is network exposed",
        outcome.bind_addr
    )];
    if !outcome.audit_enabled {
        lines.push("warning: audit logging is disabled for a network-exposed server".to_string());
    }
    for line in lines {
        write_stderr_line(&line).map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = LtiResultsConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line(&config_summary(&config))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Summarizes a validated configuration in one line.
fn config_summary(config: &LtiResultsConfig) -> String {
    let store = match config.store.store_type {
        StoreType::Memory => "memory",
        StoreType::Sqlite => "sqlite",
    };
    format!(
        "config ok: {} tool proxies, {} tool types, {store} store",
        config.tool_proxies.len(),
        config.tool_types.len()
    )
}

// ============================================================================
// SECTION: Store Commands
// ============================================================================

/// Dispatches store subcommands.
fn command_store(command: StoreCommand) -> CliResult<ExitCode> {
    match command {
        StoreCommand::Import(command) => command_store_import(&command),
    }
}

/// Imports a JSON gradebook snapshot into the configured `SQLite` store.
fn command_store_import(command: &StoreImportCommand) -> CliResult<ExitCode> {
    let config = LtiResultsConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let snapshot = read_snapshot(&command.snapshot)?;
    let summary = import_snapshot(&config, &snapshot)?;
    write_stdout_line(&summary).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Reads and parses a gradebook snapshot file.
fn read_snapshot(path: &Path) -> CliResult<GradebookSnapshot> {
    let bytes = read_bytes_with_limit(path, MAX_SNAPSHOT_BYTES).map_err(|err| match err {
        ReadLimitError::Io(err) => {
            CliError::new(format!("failed to read snapshot {}: {err}", path.display()))
        }
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(format!(
            "snapshot {} is {size} bytes, exceeding the {limit} byte limit",
            path.display()
        )),
    })?;
    GradebookSnapshot::from_json_slice(&bytes)
        .map_err(|err| CliError::new(format!("invalid snapshot {}: {err}", path.display())))
}

/// Writes a snapshot into the `SQLite` store named by the configuration.
fn import_snapshot(config: &LtiResultsConfig, snapshot: &GradebookSnapshot) -> CliResult<String> {
    if config.store.store_type != StoreType::Sqlite {
        return Err(CliError::new("store import requires store.type = \"sqlite\"".to_string()));
    }
    let path = config
        .store
        .path
        .clone()
        .ok_or_else(|| CliError::new("sqlite store requires path".to_string()))?;
    let store = SqliteGradebook::open(&SqliteGradebookConfig {
        path: path.clone(),
        busy_timeout_ms: config.store.busy_timeout_ms,
    })
    .map_err(|err| CliError::new(format!("failed to open store: {err}")))?;
    store
        .import_snapshot(snapshot)
        .map_err(|err| CliError::new(format!("snapshot import failed: {err}")))?;
    Ok(format!(
        "imported {} courses, {} line items, {} grades into {}",
        snapshot.courses.len(),
        snapshot.line_items.len(),
        snapshot.grades.len(),
        path.display()
    ))
}

// ============================================================================
// SECTION: Bounded Reads
// ============================================================================

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
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

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

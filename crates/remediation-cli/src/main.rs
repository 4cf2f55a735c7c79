// crates/remediation-cli/src/main.rs
// ============================================================================
// Module: Remediation Engine CLI Entry Point
// Description: Command dispatcher for serving and fixture seeding.
// Purpose: Run the reference application and prepare networked test targets.
// Dependencies: clap, remediation-api, remediation-harness, tokio, tracing-subscriber
// ============================================================================

//! ## Overview
//! `serve` runs the HTTP application from `remediation-engine.toml`.
//! `seed-fixtures` inserts the harness principals into the configured
//! database so networked test runs find them. `config validate` loads and
//! validates a configuration file without side effects. Diagnostics go to
//! stderr through `tracing`; `RUST_LOG` overrides `[logging] level`.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use remediation_api::ApiServer;
use remediation_config::RemediationConfig;
use remediation_harness::HarnessConfig;
use remediation_harness::fixture_principals;
use remediation_harness::seed_principals;
use remediation_store_sqlite::Database;
use remediation_store_sqlite::SessionSource;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "remediation-engine", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP application.
    Serve(ConfigArgs),
    /// Insert the test principals into the configured database.
    SeedFixtures(SeedCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Shared `--config` argument.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Path to `remediation-engine.toml`.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `seed-fixtures`.
#[derive(Args, Debug)]
struct SeedCommand {
    /// Configuration source.
    #[command(flatten)]
    config: ConfigArgs,
    /// Admin username (overrides `REMEDIATION_TEST_ADMIN_USERNAME`).
    #[arg(long, value_name = "NAME")]
    admin_username: Option<String>,
    /// Admin password (overrides `REMEDIATION_TEST_ADMIN_PASSWORD`).
    #[arg(long, value_name = "PASSWORD")]
    admin_password: Option<String>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a configuration file.
    Validate(ConfigArgs),
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
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
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the parsed command.
async fn run(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Commands::Serve(args) => command_serve(args).await,
        Commands::SeedFixtures(command) => command_seed(&command),
        Commands::Config {
            command: ConfigCommand::Validate(args),
        } => command_config_validate(&args),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Executes `serve`.
async fn command_serve(args: ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(&args)?;
    init_tracing(&config.logging.level)?;
    let server = tokio::task::spawn_blocking(move || ApiServer::from_config(&config))
        .await
        .map_err(|err| CliError::new(format!("server init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    tracing::info!(bind = %server.bind_addr(), "starting remediation engine");
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `seed-fixtures`.
fn command_seed(command: &SeedCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    init_tracing(&config.logging.level)?;
    let mut harness =
        HarnessConfig::load().map_err(|err| CliError::new(format!("harness env: {err}")))?;
    if let Some(username) = &command.admin_username {
        harness.admin_username.clone_from(username);
    }
    if let Some(password) = &command.admin_password {
        harness.admin_password.clone_from(password);
    }
    let principals =
        fixture_principals(&harness).map_err(|err| CliError::new(err.to_string()))?;
    let database = Database::open(config.database.clone())
        .map_err(|err| CliError::new(format!("database open failed: {err}")))?;
    let session = database.session().map_err(|err| CliError::new(err.to_string()))?;
    let seeded = seed_principals(&session, &principals)
        .map_err(|err| CliError::new(format!("seeding failed: {err}")))?;
    for user in &seeded {
        write_stdout_line(&format!("{} ({})", user.username, user.role))
            .map_err(|err| output_error("stdout", &err))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `config validate`.
fn command_config_validate(args: &ConfigArgs) -> CliResult<ExitCode> {
    load_config(args)?;
    write_stdout_line("config ok").map_err(|err| output_error("stdout", &err))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads configuration from `--config` or the default resolution rules.
fn load_config(args: &ConfigArgs) -> CliResult<RemediationConfig> {
    RemediationConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Builds the log filter; `RUST_LOG` wins over the configured level.
fn build_env_filter(level: &str) -> CliResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|err| CliError::new(format!("log filter: {err}")))
}

/// Installs the stderr subscriber.
fn init_tracing(level: &str) -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(build_env_filter(level)?)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| CliError::new(format!("tracing init failed: {err}")))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Wraps an output stream failure.
fn output_error(stream: &str, error: &std::io::Error) -> CliError {
    CliError::new(format!("failed to write {stream}: {error}"))
}

/// Reports `message` on stderr and returns the failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(&format!("error: {message}"));
    ExitCode::FAILURE
}

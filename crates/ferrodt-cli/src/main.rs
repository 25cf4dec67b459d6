//! ferrodt - configuration-driven data transfer tool
//!
//! Reads records from a source extension and writes them to a sink extension,
//! once per configured operation. Extensions are selected by display name in
//! the settings file.

mod display;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use display::{
    create_spinner, display_extensions, display_fault, display_missing_configuration,
    display_run_summary,
};
use ferrodt_config::builder::DEFAULT_ENV_PREFIX;
use ferrodt_config::{ConfigBuilder, ConfigLoader};
use ferrodt_engine::{RunOutcome, TransferEngine};
use ferrodt_extensions::builtin_registry;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default file written by `ferrodt init`
const DEFAULT_SETTINGS_FILE: &str = "migrationsettings.json";

/// Exit code for a run that failed, as opposed to one that was never configured
const FAULT_EXIT_CODE: u8 = 2;

/// ferrodt - configuration-driven data transfer tool
#[derive(Parser, Debug)]
#[command(
    name = "ferrodt",
    version = env!("CARGO_PKG_VERSION"),
    about = "Configuration-driven data transfer between pluggable sources and sinks",
    long_about = "ferrodt reads records from a source extension and writes them to a sink\n\
                  extension. A settings file names both extensions and may list several\n\
                  operations, each with its own source and sink settings."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Verbose mode - detailed output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the transfer described by the settings
    Run {
        /// Settings file (defaults to migrationsettings.json or ferrodt.{json,yaml,toml})
        #[arg(short, long)]
        settings: Option<PathBuf>,
        /// Source extension name, overriding the settings file
        #[arg(long)]
        source: Option<String>,
        /// Sink extension name, overriding the settings file
        #[arg(long)]
        sink: Option<String>,
    },
    /// List available source and sink extensions
    List,
    /// Write a starter settings file
    Init {
        /// Where to write the file
        #[arg(default_value = DEFAULT_SETTINGS_FILE)]
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(cli.debug, cli.quiet, cli.verbose)?;

    info!("ferrodt v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run {
            settings,
            source,
            sink,
        } => {
            let result = run_command(settings, source, sink, cli.quiet).await;
            if let Err(error) = &result {
                display_fault(error);
            }
            Ok(ExitCode::from(run_exit_code(&result)))
        }
        Commands::List => {
            list_command()?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Init { path, force } => {
            init_command(&path, force, cli.quiet)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging(debug: bool, quiet: bool, verbose: bool) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else if quiet {
        "error"
    } else {
        "warn"
    };

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)?,
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

async fn run_command(
    settings: Option<PathBuf>,
    source: Option<String>,
    sink: Option<String>,
    quiet: bool,
) -> Result<RunOutcome> {
    let mut builder = ConfigBuilder::new();
    match settings.or_else(ConfigLoader::settings_file_exists) {
        Some(path) => {
            info!("Using settings file: {}", path.display());
            builder = builder.add_source_file(path);
        }
        None => warn!("No settings file found, using environment only"),
    }
    builder = builder.add_env_prefix(DEFAULT_ENV_PREFIX);
    if let Some(source) = source {
        builder = builder.with_source(source);
    }
    if let Some(sink) = sink {
        builder = builder.with_sink(sink);
    }
    let config = builder.build().context("Failed to load configuration")?;

    let registry = builtin_registry().context("Failed to register extensions")?;
    let engine = TransferEngine::new(Arc::new(registry));

    let cancellation = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancellation = cancellation.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling transfer");
                cancellation.cancel();
            }
        }
    });

    let spinner = create_spinner(quiet, "Transferring data...");
    let result = engine.run(&config, cancellation).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    interrupt.abort();

    let outcome = result.context("Data transfer failed")?;
    match &outcome {
        RunOutcome::Completed(summary) => {
            if !quiet {
                display_run_summary(summary);
            }
        }
        RunOutcome::ConfigurationMissing { keys } => display_missing_configuration(keys),
    }

    Ok(outcome)
}

/// Map the result of `run` onto the process exit code
fn run_exit_code(result: &Result<RunOutcome>) -> u8 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(_) => FAULT_EXIT_CODE,
    }
}

fn list_command() -> Result<()> {
    let registry = builtin_registry().context("Failed to register extensions")?;
    display_extensions(&registry);
    Ok(())
}

fn init_command(path: &Path, force: bool, quiet: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "'{}' already exists; pass --force to overwrite it",
            path.display()
        );
    }

    ConfigLoader::generate_template(path)
        .with_context(|| format!("Failed to write '{}'", path.display()))?;

    if !quiet {
        println!(
            "{} Wrote starter settings to {}",
            style("✓").green().bold(),
            style(path.display()).cyan()
        );
    }
    Ok(())
}

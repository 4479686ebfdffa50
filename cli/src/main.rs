// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Cortex CLI
//!
//! The `cortex` binary hosts the module memory manager.
//!
//! ## Commands
//!
//! - `cortex serve [--watch MODULE]` - JSON-lines session over stdin/stdout plus the background optimizer
//! - `cortex call <tool> [--args JSON]` - One-shot tool call
//! - `cortex resource <uri>` - Read a resource
//! - `cortex config show|validate|generate` - Configuration management
//!
//! Logs go to stderr; stdout carries only command output.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use cortex_cli::commands::{self, ConfigCommand};

/// Cortex - budget-constrained cognitive module manager
#[derive(Parser)]
#[command(name = "cortex")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CORTEX_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve JSON-lines requests on stdin/stdout
    #[command(name = "serve")]
    Serve {
        /// Log every event concerning this module at info level (repeatable)
        #[arg(long, value_name = "MODULE")]
        watch: Vec<String>,
    },

    /// Invoke a single tool and print its response
    #[command(name = "call")]
    Call {
        /// Tool name, e.g. load_module
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(long, value_name = "JSON")]
        args: Option<String>,
    },

    /// Print a resource, e.g. cortex://state/current
    #[command(name = "resource")]
    Resource { uri: String },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Serve { watch } => commands::serve::run(cli.config, watch).await,
        Commands::Call { tool, args } => commands::call::call_tool(cli.config, &tool, args.as_deref()),
        Commands::Resource { uri } => commands::call::read_resource(cli.config, &uri),
        Commands::Config { command } => commands::config::handle_command(command, cli.config),
    }
}

/// Initialize tracing subscriber for logging. `RUST_LOG` wins over `--log-level`.
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}

//! # Proxigraph CLI Module
//!
//! This module implements the CLI interface for Proxigraph.
//!
//! ## Available Commands
//!
//! - `serve` - Start the HTTP server
//! - `replay` - Feed a JSON-lines event file through a session
//! - `status` - Show metrics, anomalies and clusters of the saved graph
//! - `export` - Write the saved graph as JSON

mod commands;

use crate::config::{AppConfig, SnapshotBackend};
use clap::{Parser, Subcommand};
use proxigraph_core::GraphError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Proxigraph - bounded proximity graph server
///
/// Streams node and transition events into a capacity-bounded graph whose
/// edges come from how close nodes are.
#[derive(Parser, Debug)]
#[command(name = "proxigraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a TOML config file (default: ./proxigraph.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Snapshot location (overrides config)
    #[arg(short = 'S', long, global = true)]
    pub snapshot: Option<PathBuf>,

    /// Snapshot backend (overrides config)
    #[arg(short = 'B', long, global = true, value_enum)]
    pub backend: Option<SnapshotBackend>,

    /// Node capacity (overrides config)
    #[arg(long, global = true)]
    pub capacity: Option<usize>,

    /// Records per batch (overrides config)
    #[arg(long, global = true)]
    pub batch_size: Option<usize>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Replay a JSON-lines event file
    Replay {
        /// Path to the event file, one JSON record per line
        #[arg(short, long)]
        file: PathBuf,

        /// Save the resulting graph to the configured snapshot store
        #[arg(short, long)]
        save: bool,
    },

    /// Show graph status
    Status {
        /// Anomaly threshold (overrides config)
        #[arg(short, long)]
        threshold: Option<usize>,
    },

    /// Export the saved graph as JSON
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
}

impl Cli {
    /// Resolve the configuration: file and environment, then these flags.
    pub fn resolve_config(&self) -> Result<AppConfig, GraphError> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        self.apply_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Overwrite `config` with every flag that was given.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(path) = &self.snapshot {
            config.snapshot_path = Some(path.clone());
        }
        if let Some(backend) = self.backend {
            config.snapshot_backend = backend;
        }
        if let Some(capacity) = self.capacity {
            config.capacity = capacity;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(Commands::Serve { host, port }) = &self.command {
            if let Some(host) = host {
                config.host = host.clone();
            }
            if let Some(port) = port {
                config.port = *port;
            }
        }
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), GraphError> {
    let config = cli.resolve_config()?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Serve { .. }) => cmd_serve(&config).await,
        Some(Commands::Replay { file, save }) => cmd_replay(&config, json_mode, &file, save),
        Some(Commands::Status { threshold }) => cmd_status(&config, json_mode, threshold),
        Some(Commands::Export { output }) => cmd_export(&config, &output),
        None => {
            // No subcommand - show status by default
            cmd_status(&config, json_mode, None)
        }
    }
}

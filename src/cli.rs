//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Declarative SSH access generator - inventory in, ssh_config and
/// authorized_keys out
#[derive(Parser, Debug)]
#[command(name = "fleetkey")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the inventory file (YAML)
    #[arg(
        short,
        long,
        default_value = "config.yml",
        env = "FLEETKEY_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "FLEETKEY_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "FLEETKEY_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to generate)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate the SSH config and authorized_keys files (default)
    Generate {
        /// Output directory (overrides `output.directory` from the inventory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Strict-validate the inventory without writing anything
    ///
    /// Reports access entries and group members that name neither a known
    /// group nor a known server, and resolves every key reference.
    Check,
}

//! Command-line interface definitions using clap
//!
//! This module defines the CLI structure for shortpool using clap's derive macros.

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// shortpool - key pool and resolution engine for URL shortening
#[derive(Parser)]
#[command(name = "shortpool")]
#[command(version)]
#[command(about = "Pre-generated key pool and cache-first resolution engine", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(long, short = 'c', global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Run population, cleanup and hit-count workers until Ctrl+C (default)
    Run,

    /// Top up the key pool once
    Populate {
        /// Number of keys to generate (default: keys.batch_size)
        #[arg(long)]
        count: Option<usize>,

        /// Populate even when the pool is above the low-water mark
        #[arg(long)]
        force: bool,
    },

    /// Delete expired mappings once
    Cleanup,

    /// Create a mapping for a long URL
    Create {
        /// Target URL
        url: String,

        /// Expiration time (RFC3339 or relative like "1d", "2h30m")
        #[arg(long)]
        expires: Option<String>,
    },

    /// Resolve a short key to its long URL
    Resolve {
        /// Short key
        key: String,
    },

    /// Show key pool and mapping statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

/// Configuration management commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: shortpool.example.toml)
        output_path: Option<String>,
    },

    /// Validate the loaded configuration
    Validate,
}

//! CLI module for ClawGate
//!
//! Command-line interface definitions and handlers.
//!
//! # Commands
//!
//! - `serve` - Start the gateway
//! - `backends` - List the backends a configuration resolves to
//! - `config` - Configuration utilities (init, validate)
//!
//! # Example
//!
//! ```bash
//! # Write a starter config, check it, then run
//! clawgate config init
//! clawgate config validate
//! clawgate serve -p 8090
//!
//! # Inspect resolved backends as JSON
//! clawgate backends --json
//! ```

pub mod backends;
pub mod config;
pub mod output;
pub mod serve;

pub use config::{handle_config_init, handle_config_validate};

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const DEFAULT_CONFIG_PATH: &str = "clawgate.toml";

/// ClawGate - Local LLM API gateway
#[derive(Parser, Debug)]
#[command(
    name = "clawgate",
    version,
    about = "Local LLM API gateway with rule-based routing and fallback"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the gateway server
    Serve(ServeArgs),
    /// List configured backends and their fallback chains
    Backends(BackendsArgs),
    /// Configuration utilities
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Override server port
    #[arg(short, long, env = "CLAWGATE_PORT")]
    pub port: Option<u16>,

    /// Override server host
    #[arg(short = 'H', long, env = "CLAWGATE_HOST")]
    pub host: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "CLAWGATE_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Args, Debug)]
pub struct BackendsArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write the example configuration file
    Init(ConfigInitArgs),
    /// Check a configuration file without starting the server
    Validate(ConfigValidateArgs),
}

#[derive(Args, Debug)]
pub struct ConfigInitArgs {
    /// Output file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub output: PathBuf,

    /// Overwrite existing file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct ConfigValidateArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

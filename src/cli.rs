use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "metrics-service", version, about = "CPU load / concurrency metrics service")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the HTTP query service (default)
    Start,

    /// Generate and store synthetic samples for the recent past
    Ingest {
        /// How far back to generate samples, in seconds
        #[arg(short, long)]
        window_seconds: Option<u64>,

        /// Spacing between samples, in seconds
        #[arg(short, long)]
        step_seconds: Option<u64>,
    },

    /// Append a message to the event log
    Log {
        /// Message words, optionally led by a level tag (ERROR, WARN, INFO, DEBUG)
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        message: Vec<String>,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display the effective configuration
    Show,

    /// Validate configuration file
    Validate,
}

impl Cli {
    /// Get the command to execute, defaulting to Start if none provided
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Start)
    }
}

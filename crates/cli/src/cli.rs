//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// sigroute - outbound signal router
#[derive(Parser, Debug)]
#[command(
    name = "sigroute",
    author,
    version,
    about = "Route local signal values to remote devices",
    long_about = "Maps local signals to signals on remote devices.\n\n\
                  Each value change is transformed, clipped and sent as a UDP \n\
                  message to every destination the signal is mapped to."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SIGROUTE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "SIGROUTE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Route values read from stdin
    Run(RunArgs),

    /// Send a single value change, or a query
    Send(SendArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "sigroute.toml",
        env = "SIGROUTE_CONFIG"
    )]
    pub config: PathBuf,

    /// Override the local bind port from configuration
    #[arg(long, env = "SIGROUTE_PORT")]
    pub port: Option<u16>,

    /// Override the routing queue capacity from configuration
    #[arg(long, env = "SIGROUTE_QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,

    /// Stop after this many seconds (0 = run until EOF or Ctrl+C)
    #[arg(long, default_value = "0", env = "SIGROUTE_TIMEOUT")]
    pub timeout: u64,

    /// Build the routing table and exit without reading input
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "SIGROUTE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `send` command
#[derive(Parser, Debug, Clone)]
pub struct SendArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "sigroute.toml",
        env = "SIGROUTE_CONFIG"
    )]
    pub config: PathBuf,

    /// Local signal name, e.g. /freq
    #[arg(short, long)]
    pub signal: String,

    /// Send a query for the current remote values instead of a value
    #[arg(long, conflicts_with = "values")]
    pub query: bool,

    /// Alias string carried by the query
    #[arg(long, requires = "query")]
    pub alias: Option<String>,

    /// Values, one per vector element
    #[arg(allow_negative_numbers = true)]
    pub values: Vec<String>,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "sigroute.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "sigroute.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show each mapping's expression and clip settings
    #[arg(long)]
    pub mappings: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_send_values() {
        let cli = Cli::parse_from(["sigroute", "send", "-c", "a.toml", "--signal", "/freq", "1.0", "-2.5"]);
        match cli.command {
            Commands::Send(args) => {
                assert_eq!(args.signal, "/freq");
                assert_eq!(args.values, vec!["1.0", "-2.5"]);
                assert!(!args.query);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_send_query_with_alias() {
        let cli = Cli::parse_from(["sigroute", "send", "--signal", "/freq", "--query", "--alias", "tag42"]);
        match cli.command {
            Commands::Send(args) => {
                assert!(args.query);
                assert_eq!(args.alias.as_deref(), Some("tag42"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_alias_requires_query() {
        let result = Cli::try_parse_from(["sigroute", "send", "--signal", "/freq", "--alias", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["sigroute", "-q", "-v", "info"]);
        assert!(result.is_err());
    }
}

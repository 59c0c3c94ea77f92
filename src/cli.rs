//! Command-line argument parsing for Prismatic.
//!
//! Top-level flags apply to every subcommand; the workbook layout flags are
//! negative and mutually exclusive (both unset selects the merged layout).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Run one SQL statement against a fleet of databases in parallel.
#[derive(Parser, Debug)]
#[command(name = "prismatic")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(long, value_name = "PATH", default_value = "./config/config.toml")]
    pub config: PathBuf,

    /// Environment whose per-connection overrides are used
    #[arg(short, long, value_name = "NAME", default_value = "staging")]
    pub environment: String,

    /// Comma-separated subset of connection names to dispatch to
    #[arg(short, long, value_name = "NAME[,NAME...]", value_delimiter = ',')]
    pub connections: Vec<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the query on every connection and export the results
    Export {
        /// SQL statement to execute
        #[arg(value_name = "QUERY")]
        query: String,

        /// Output file path
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Output format (xlsx, json, csv); inferred from OUTPUT when omitted
        #[arg(long, value_name = "FORMAT")]
        output_format: Option<String>,

        /// Disable the DQL result cache
        #[arg(long)]
        no_cache: bool,

        /// One sheet per connection instead of a single merged sheet
        #[arg(long, conflicts_with = "no_single_file")]
        no_single_sheet: bool,

        /// One workbook per connection instead of a single file
        #[arg(long)]
        no_single_file: bool,
    },

    /// Run the query on every connection for its side effects
    Run {
        /// SQL statement to execute
        #[arg(value_name = "QUERY")]
        query: String,

        /// Commit each per-connection transaction instead of rolling it back
        #[arg(long)]
        commit: bool,
    },

    /// Manage the configuration files
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Materialize the embedded default configuration, never overwriting
    Install,

    /// Print one configuration key
    Show {
        /// One of: connections, locale, max_workers, max_retries,
        /// max_connections, timeout, paths, logger, connection_column_name
        key: String,
    },

    /// Open the configuration file in $EDITOR
    Edit,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

//! CLI argument parsing using clap derive macros.
//!
//! This module defines the command-line interface for the nq CLI.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// nq - Query note collections with filters and formulas
#[derive(Parser, Debug)]
#[command(name = "nq")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Force JSON output
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a query over a JSON file or a directory of notes
    #[command(alias = "q")]
    Query {
        /// JSON file holding an array of records, or a directory of notes
        source: PathBuf,

        /// Filter expression (e.g., "taggedWith(file, 'work') AND NOT isEmpty(file)")
        #[arg(short, long)]
        filter: Option<String>,

        /// Sort key as PROPERTY[:asc|desc[:number|date|string]] (repeatable)
        #[arg(short, long, value_name = "KEY")]
        sort: Vec<String>,

        /// Group results by a property
        #[arg(short, long, value_name = "PROPERTY")]
        group_by: Option<String>,

        /// Maximum number of records to return
        #[arg(short, long)]
        limit: Option<i64>,

        /// Number of records to skip
        #[arg(long)]
        offset: Option<i64>,

        /// Variable visible to the filter as KEY=VALUE (repeatable)
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,

        /// Print the optimizer's plan instead of running the query
        #[arg(long)]
        explain: bool,
    },

    /// Evaluate a formula
    #[command(alias = "f")]
    Formula {
        /// Formula expression (e.g., "round(price * 1.2, 2)")
        expr: String,

        /// Variable visible to the formula as KEY=VALUE (repeatable)
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,

        /// Evaluate once per record loaded from this source
        #[arg(short, long, value_name = "SOURCE")]
        record: Option<PathBuf>,

        /// Only evaluate against records with this title
        #[arg(short, long, requires = "record")]
        title: Option<String>,
    },

    /// Parse an expression and print its canonical form
    Check {
        #[command(subcommand)]
        command: CheckCommands,
    },

    /// List operators, functions and features
    Functions,

    /// View and edit configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Shell types for completions
#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

/// Check subcommands
#[derive(Subcommand, Debug)]
pub enum CheckCommands {
    /// Parse a filter expression
    Filter {
        /// Filter expression
        expr: String,
    },

    /// Parse a formula expression
    Formula {
        /// Formula expression
        expr: String,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., engine.max_cache_size)
        key: String,

        /// Configuration value
        value: String,
    },

    /// Print config file path
    Path,
}

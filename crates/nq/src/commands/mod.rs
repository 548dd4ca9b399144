//! Command implementations for the nq CLI.
//!
//! This module contains the actual command handlers that are invoked by the CLI.

pub mod check;
pub mod completions;
pub mod config;
pub mod formula;
pub mod functions;
pub mod query;

use std::collections::BTreeMap;

use notes_model_rs::Value;
use notes_query_rs::{FormulaError, ParseError, QueryError};

use crate::cli::Cli;
use crate::store::StoreError;
use config::OutputConfig;

/// Error type for command execution.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Query parsing or validation error.
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// Formula parsing or evaluation error.
    #[error("formula error: {0}")]
    Formula(#[from] FormulaError),

    /// Expression parsing error.
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// A command-line value could not be interpreted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Record loading error.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Context for command execution, containing common dependencies.
pub struct CommandContext {
    /// Whether to output JSON.
    pub json_output: bool,
    /// Whether to use colors.
    pub use_colors: bool,
    /// Whether to be quiet (errors only).
    pub quiet: bool,
    /// Whether to be verbose.
    pub verbose: bool,
    /// Timestamp style for table output.
    pub date_format: DateFormat,
}

impl CommandContext {
    /// Creates a new command context from CLI arguments and output settings.
    ///
    /// Colors are off when `--no-color` is given, when `output.color` is
    /// false, or when `NO_COLOR` is set.
    pub fn from_cli(cli: &Cli, output: &OutputConfig) -> Self {
        let no_color_env = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        Self {
            json_output: cli.json,
            use_colors: !cli.no_color && output.color.unwrap_or(true) && !no_color_env,
            quiet: cli.quiet,
            verbose: cli.verbose,
            date_format: output
                .date_format
                .as_deref()
                .and_then(DateFormat::parse)
                .unwrap_or_default(),
        }
    }
}

/// How timestamps are rendered in tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateFormat {
    /// "Today", "3 days ago", "May 02".
    #[default]
    Relative,
    /// RFC 3339.
    Iso,
    /// `YYYY-MM-DD`.
    Short,
}

impl DateFormat {
    /// Accepted spellings for `output.date_format`.
    pub const NAMES: [&'static str; 3] = ["relative", "iso", "short"];

    /// Parses a configured format name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "relative" => Some(Self::Relative),
            "iso" => Some(Self::Iso),
            "short" => Some(Self::Short),
            _ => None,
        }
    }
}

/// Parses repeated `KEY=VALUE` arguments.
///
/// Values that read as JSON (`3`, `true`, `[1,2]`, `"quoted"`) keep their
/// type; anything else is a string.
pub fn parse_vars(raw: &[String]) -> Result<BTreeMap<String, serde_json::Value>> {
    let mut vars = BTreeMap::new();
    for entry in raw {
        let Some((key, value)) = entry.split_once('=') else {
            return Err(CommandError::InvalidArgument(format!(
                "expected KEY=VALUE, got '{}'",
                entry
            )));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(CommandError::InvalidArgument(format!(
                "missing variable name in '{}'",
                entry
            )));
        }
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
        vars.insert(key.to_string(), value);
    }
    Ok(vars)
}

/// Converts parsed variables into formula values.
pub fn to_values(vars: BTreeMap<String, serde_json::Value>) -> BTreeMap<String, Value> {
    vars.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
}

use clap::Parser;
use std::process::ExitCode;

mod cli;
mod commands;
mod dispatch;
mod output;
mod store;

use cli::Cli;
use commands::CommandError;
use notes_query_rs::{FormulaError, ParseError, QueryError};
use store::StoreError;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "NQ_LOG";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match dispatch::run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                let mut error = serde_json::json!({
                    "code": error_code(&e),
                    "message": e.to_string(),
                });
                if let Some(position) = parse_error(&e).and_then(ParseError::position) {
                    error["position"] = position.into();
                }
                let error_json = serde_json::json!({ "error": error });
                eprintln!(
                    "{}",
                    serde_json::to_string_pretty(&error_json).unwrap_or_default()
                );
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::from(error_exit_code(&e))
        }
    }
}

/// Installs a stderr subscriber. `--verbose` forces debug output; otherwise
/// `NQ_LOG` is honored and the default is `warn`.
fn init_tracing(cli: &Cli) {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Returns the parse error inside `e`, if any.
fn parse_error(e: &CommandError) -> Option<&ParseError> {
    match e {
        CommandError::Parse(err)
        | CommandError::Query(QueryError::Parse(err))
        | CommandError::Formula(FormulaError::Parse(err)) => Some(err),
        _ => None,
    }
}

/// Returns the error code string for JSON output.
fn error_code(e: &CommandError) -> &'static str {
    match e {
        CommandError::Parse(_)
        | CommandError::Query(QueryError::Parse(_))
        | CommandError::Formula(FormulaError::Parse(_)) => "PARSE_ERROR",
        CommandError::Query(QueryError::Validation(_)) => "VALIDATION_ERROR",
        CommandError::Formula(FormulaError::Eval(_)) => "EVAL_ERROR",
        CommandError::InvalidArgument(_) => "INVALID_ARGUMENT",
        CommandError::Store(StoreError::Decode { .. }) => "SOURCE_ERROR",
        CommandError::Store(_) => "IO_ERROR",
        CommandError::Config(_) => "CONFIG_ERROR",
        CommandError::Io(_) => "IO_ERROR",
        CommandError::Json(_) => "JSON_ERROR",
    }
}

/// Returns the exit code for an error.
fn error_exit_code(e: &CommandError) -> u8 {
    match e {
        CommandError::Config(_) => 5,
        CommandError::Io(_) => 3,
        CommandError::Store(StoreError::NotFound(_) | StoreError::Io { .. }) => 3,
        CommandError::Store(StoreError::Decode { .. }) => 1,
        CommandError::Query(_)
        | CommandError::Formula(_)
        | CommandError::Parse(_)
        | CommandError::InvalidArgument(_)
        | CommandError::Json(_) => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notes_query_rs::{EvalError, Language, ValidationError};
    use std::path::PathBuf;

    fn parse_failure() -> ParseError {
        ParseError::unexpected_token(Language::Filter, ")", 4)
    }

    #[test]
    fn test_parse_errors_share_a_code() {
        let errors = [
            CommandError::Parse(parse_failure()),
            CommandError::Query(QueryError::Parse(parse_failure())),
            CommandError::Formula(FormulaError::Parse(parse_failure())),
        ];
        for e in &errors {
            assert_eq!(error_code(e), "PARSE_ERROR");
            assert_eq!(error_exit_code(e), 1);
            assert_eq!(parse_error(e).and_then(ParseError::position), Some(4));
        }
    }

    #[test]
    fn test_validation_and_eval_codes() {
        let validation = CommandError::Query(QueryError::Validation(
            ValidationError::invalid_field("limit", "must be at least 1"),
        ));
        assert_eq!(error_code(&validation), "VALIDATION_ERROR");
        assert_eq!(error_exit_code(&validation), 1);
        assert!(parse_error(&validation).is_none());

        let eval = CommandError::Formula(FormulaError::Eval(EvalError::DivisionByZero));
        assert_eq!(error_code(&eval), "EVAL_ERROR");
        assert_eq!(error_exit_code(&eval), 1);
    }

    #[test]
    fn test_io_and_config_exit_codes() {
        let missing = CommandError::Store(StoreError::NotFound(PathBuf::from("nope")));
        assert_eq!(error_code(&missing), "IO_ERROR");
        assert_eq!(error_exit_code(&missing), 3);

        let io = CommandError::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert_eq!(error_exit_code(&io), 3);

        let config = CommandError::Config("bad".to_string());
        assert_eq!(error_code(&config), "CONFIG_ERROR");
        assert_eq!(error_exit_code(&config), 5);
    }

    #[test]
    fn test_invalid_argument_exit_code() {
        let e = CommandError::InvalidArgument("expected KEY=VALUE".to_string());
        assert_eq!(error_code(&e), "INVALID_ARGUMENT");
        assert_eq!(error_exit_code(&e), 1);
    }
}

//! Command dispatch module for routing CLI commands to their handlers.
//!
//! Commands that only touch the config file or the CLI definition run before
//! the engine exists, so a broken config file can still be inspected and
//! repaired.

use notes_query_rs::{Language, QueryEngine};
use tracing::debug;

use crate::cli::{CheckCommands, Cli, Commands, ConfigCommands};
use crate::commands::config::{load_config, ConfigSetOptions, OutputConfig};
use crate::commands::formula::FormulaOptions;
use crate::commands::query::QueryOptions;
use crate::commands::{self, CommandContext, CommandError, Result};

/// Runs the command selected on the command line.
pub async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            return commands::completions::execute(shell).map_err(CommandError::Io);
        }
        Some(Commands::Config { command }) => {
            let output = load_config().map(|c| c.output).unwrap_or_default();
            let ctx = CommandContext::from_cli(cli, &output);
            return dispatch_config(&ctx, command);
        }
        None => {
            let ctx = CommandContext::from_cli(cli, &OutputConfig::default());
            if !ctx.quiet {
                println!("nq - query note collections");
                println!("Use --help for usage information");
            }
            return Ok(());
        }
        Some(_) => {}
    }

    let config = load_config()?;
    let ctx = CommandContext::from_cli(cli, &config.output);
    debug!(config = ?config.engine, "Creating query engine");
    let engine = QueryEngine::with_config(config.engine);

    dispatch_engine(cli, &ctx, &engine).await
}

/// Dispatch commands that need a query engine.
async fn dispatch_engine(cli: &Cli, ctx: &CommandContext, engine: &QueryEngine) -> Result<()> {
    match &cli.command {
        Some(Commands::Query {
            source,
            filter,
            sort,
            group_by,
            limit,
            offset,
            vars,
            explain,
        }) => {
            let opts = QueryOptions {
                source: source.clone(),
                filter: filter.clone(),
                sort: sort.clone(),
                group_by: group_by.clone(),
                limit: *limit,
                offset: *offset,
                vars: vars.clone(),
                explain: *explain,
            };
            commands::query::execute(ctx, engine, &opts).await
        }
        Some(Commands::Formula {
            expr,
            vars,
            record,
            title,
        }) => {
            let opts = FormulaOptions {
                expr: expr.clone(),
                vars: vars.clone(),
                record: record.clone(),
                title: title.clone(),
            };
            commands::formula::execute(ctx, engine, &opts).await
        }
        Some(Commands::Check { command }) => match command {
            CheckCommands::Filter { expr } => {
                commands::check::execute(ctx, engine, Language::Filter, expr)
            }
            CheckCommands::Formula { expr } => {
                commands::check::execute(ctx, engine, Language::Formula, expr)
            }
        },
        Some(Commands::Functions) => commands::functions::execute(ctx, engine),
        Some(Commands::Config { .. } | Commands::Completions { .. }) | None => Ok(()),
    }
}

/// Dispatch config subcommands.
fn dispatch_config(ctx: &CommandContext, command: &Option<ConfigCommands>) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::execute_show(ctx),
        Some(ConfigCommands::Set { key, value }) => {
            let opts = ConfigSetOptions {
                key: key.clone(),
                value: value.clone(),
            };
            commands::config::execute_set(ctx, &opts)
        }
        Some(ConfigCommands::Path) => commands::config::execute_path(ctx),
    }
}

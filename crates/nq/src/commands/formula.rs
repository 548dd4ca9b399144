//! Formula command implementation.
//!
//! Evaluates a formula once against `--var` variables, or once per record
//! when a source is given.

use std::collections::BTreeMap;
use std::path::PathBuf;

use notes_model_rs::{Record, Value};
use notes_query_rs::QueryEngine;
use tracing::warn;

use super::{parse_vars, to_values, CommandContext, CommandError, Result};
use crate::output::helpers::format_value;
use crate::output::{format_evaluations_table, RecordEvaluation};
use crate::store::load_records;

/// Options for the formula command.
#[derive(Debug)]
pub struct FormulaOptions {
    /// Formula expression.
    pub expr: String,
    /// Raw `KEY=VALUE` variables.
    pub vars: Vec<String>,
    /// Record source to evaluate against.
    pub record: Option<PathBuf>,
    /// Restrict evaluation to records with this title.
    pub title: Option<String>,
}

/// Executes the formula command.
///
/// # Errors
///
/// Returns an error if the formula does not parse, a variable is malformed,
/// or the source cannot be loaded. Without a source, evaluation errors are
/// returned too; with one, they are reported per record.
pub async fn execute(
    ctx: &CommandContext,
    engine: &QueryEngine,
    opts: &FormulaOptions,
) -> Result<()> {
    engine.validate_formula(&opts.expr)?;
    let variables = to_values(parse_vars(&opts.vars)?);

    let Some(source) = &opts.record else {
        let value = engine.evaluate_formula(&opts.expr, &variables)?;
        if ctx.json_output {
            let output = serde_json::json!({ "value": value });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else if !ctx.quiet {
            println!("{}", format_value(&value, ctx.use_colors));
        }
        return Ok(());
    };

    let records = select_records(load_records(source).await?, opts.title.as_deref())?;
    let results = evaluate_all(engine, &opts.expr, &records, &variables);

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else if !ctx.quiet {
        print!("{}", format_evaluations_table(&results, ctx.use_colors));
    }

    Ok(())
}

/// Keeps the records titled `title` (case-insensitively), or all of them.
fn select_records(records: Vec<Record>, title: Option<&str>) -> Result<Vec<Record>> {
    let Some(title) = title else {
        return Ok(records);
    };

    let wanted = title.to_lowercase();
    let selected: Vec<Record> = records
        .into_iter()
        .filter(|r| r.title.to_lowercase() == wanted)
        .collect();

    if selected.is_empty() {
        return Err(CommandError::InvalidArgument(format!(
            "no record titled '{}'",
            title
        )));
    }
    Ok(selected)
}

fn evaluate_all(
    engine: &QueryEngine,
    expr: &str,
    records: &[Record],
    variables: &BTreeMap<String, Value>,
) -> Vec<RecordEvaluation> {
    records
        .iter()
        .map(|record| {
            let (value, error) = match engine.evaluate_formula_for(expr, record, variables) {
                Ok(value) => (Some(value), None),
                Err(e) => {
                    warn!(path = %record.path, error = %e, "Formula failed for record");
                    (None, Some(e.to_string()))
                }
            };
            RecordEvaluation {
                title: record.title.clone(),
                path: record.path.clone(),
                value,
                error,
            }
        })
        .collect()
}

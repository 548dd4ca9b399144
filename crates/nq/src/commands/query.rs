//! Query command implementation.
//!
//! Loads records from a source, runs a query built from the command-line
//! flags and prints the page of results.

use std::path::PathBuf;

use notes_model_rs::query::{Query, SortDirection, SortSpec, SortType};
use notes_query_rs::QueryEngine;
use tracing::debug;

use super::{parse_vars, CommandContext, CommandError, Result};
use crate::output::{format_plan_table, format_result_json, format_result_table};
use crate::store::load_records;

/// Options for the query command.
#[derive(Debug)]
pub struct QueryOptions {
    /// Record source.
    pub source: PathBuf,
    /// Filter expression.
    pub filter: Option<String>,
    /// Raw `PROPERTY[:DIR[:TYPE]]` sort keys.
    pub sort: Vec<String>,
    /// Grouping property.
    pub group_by: Option<String>,
    /// Page size.
    pub limit: Option<i64>,
    /// Page offset.
    pub offset: Option<i64>,
    /// Raw `KEY=VALUE` variables.
    pub vars: Vec<String>,
    /// Print the plan instead of running.
    pub explain: bool,
}

/// Executes the query command.
///
/// # Errors
///
/// Returns an error if the source cannot be loaded, a flag is malformed, or
/// the query fails to parse or validate.
pub async fn execute(ctx: &CommandContext, engine: &QueryEngine, opts: &QueryOptions) -> Result<()> {
    let query = build_query(opts)?;
    let records = load_records(&opts.source).await?;
    if ctx.verbose {
        eprintln!(
            "Loaded {} records from {}",
            records.len(),
            opts.source.display()
        );
    }

    if opts.explain {
        let filter = query
            .filter
            .as_deref()
            .filter(|f| !f.trim().is_empty())
            .ok_or_else(|| CommandError::InvalidArgument("--explain needs --filter".to_string()))?;
        let plan = engine.explain(filter, records.len())?;
        if ctx.json_output {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else if !ctx.quiet {
            print!("{}", format_plan_table(&plan, ctx.use_colors));
        }
        return Ok(());
    }

    debug!(signature = %query.signature(), "Running query");
    let result = engine.execute(&records, &query)?;

    if ctx.json_output {
        println!("{}", format_result_json(&result)?);
    } else if !ctx.quiet {
        print!("{}", format_result_table(&result, ctx));
    }

    Ok(())
}

/// Builds a [`Query`] from command-line options.
pub fn build_query(opts: &QueryOptions) -> Result<Query> {
    let mut query = Query::new();
    query.filter = opts.filter.clone();
    for raw in &opts.sort {
        query.sort.push(parse_sort(raw)?);
    }
    if let Some(property) = &opts.group_by {
        query = query.with_group_by(property.clone());
    }
    query.limit = opts.limit;
    query.offset = opts.offset;
    query.context = parse_vars(&opts.vars)?;
    Ok(query)
}

/// Parses `PROPERTY[:asc|desc[:number|date|string]]`.
///
/// The property may itself contain dots (`properties.status`) but not colons.
pub fn parse_sort(raw: &str) -> Result<SortSpec> {
    let mut parts = raw.split(':');
    let property = parts.next().unwrap_or_default().trim();
    if property.is_empty() {
        return Err(invalid_sort(raw, "missing property"));
    }

    let direction = match parts.next().map(|d| d.trim().to_lowercase()) {
        None => SortDirection::Asc,
        Some(d) if d == "asc" || d == "ascending" => SortDirection::Asc,
        Some(d) if d == "desc" || d == "descending" => SortDirection::Desc,
        Some(d) => return Err(invalid_sort(raw, &format!("unknown direction '{}'", d))),
    };

    let sort_type = match parts.next().map(|t| t.trim().to_lowercase()) {
        None => None,
        Some(t) if t == "number" => Some(SortType::Number),
        Some(t) if t == "date" => Some(SortType::Date),
        Some(t) if t == "string" || t == "text" => Some(SortType::String),
        Some(t) => return Err(invalid_sort(raw, &format!("unknown type '{}'", t))),
    };

    if parts.next().is_some() {
        return Err(invalid_sort(raw, "too many ':' separators"));
    }

    Ok(SortSpec {
        sort_type,
        ..SortSpec::new(property, direction)
    })
}

fn invalid_sort(raw: &str, reason: &str) -> CommandError {
    CommandError::InvalidArgument(format!("invalid sort key '{}': {}", raw, reason))
}

//! Query result output formatting.

use notes_model_rs::query::{QueryItems, QueryResult};
use notes_model_rs::Record;
use notes_query_rs::optimizer::QueryPlan;
use owo_colors::OwoColorize;

use super::helpers::{format_tags, format_timestamp, pad, truncate_str};
use crate::commands::CommandContext;

const TITLE_WIDTH: usize = 28;
const FOLDER_WIDTH: usize = 20;
const TAGS_WIDTH: usize = 24;
const MODIFIED_WIDTH: usize = 12;

/// Serializes a query result as pretty JSON.
pub fn format_result_json(result: &QueryResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}

/// Formats a query result as a table, one section per group when grouped.
pub fn format_result_table(result: &QueryResult, ctx: &CommandContext) -> String {
    let mut output = String::new();

    if result.items.is_empty() {
        output.push_str("No records found.\n");
    } else {
        push_header(&mut output, ctx.use_colors);
        match &result.items {
            QueryItems::Flat(records) => {
                for record in records {
                    push_row(&mut output, record, ctx);
                }
            }
            QueryItems::Grouped(groups) => {
                for group in groups {
                    let heading = format!("{} ({})", group.key, group.items.len());
                    if ctx.use_colors {
                        output.push_str(&format!("\n{}\n", heading.cyan().bold()));
                    } else {
                        output.push_str(&format!("\n{heading}\n"));
                    }
                    for record in &group.items {
                        push_row(&mut output, record, ctx);
                    }
                }
            }
        }
    }

    for warning in &result.warnings {
        let line = format!("warning: {warning}");
        if ctx.use_colors {
            output.push_str(&format!("{}\n", line.yellow()));
        } else {
            output.push_str(&line);
            output.push('\n');
        }
    }

    let footer = footer(result);
    if ctx.use_colors {
        output.push_str(&format!("{}\n", footer.dimmed()));
    } else {
        output.push_str(&footer);
        output.push('\n');
    }

    output
}

fn footer(result: &QueryResult) -> String {
    let mut footer = format!(
        "{} of {} records in {:.2}ms",
        result.items.len(),
        result.total_count,
        result.execution_time_ms
    );
    if result.from_cache {
        footer.push_str(" (cached)");
    }
    footer
}

fn push_header(output: &mut String, use_colors: bool) {
    let header = format!(
        "{}{}{}{}{}",
        pad("Title", TITLE_WIDTH + 1),
        pad("Folder", FOLDER_WIDTH + 1),
        pad("Tags", TAGS_WIDTH + 1),
        pad("Modified", MODIFIED_WIDTH + 1),
        "Words"
    );
    if use_colors {
        output.push_str(&format!("{}\n", header.dimmed()));
    } else {
        output.push_str(&header);
        output.push('\n');
    }
}

fn push_row(output: &mut String, record: &Record, ctx: &CommandContext) {
    let title = pad(&truncate_str(&record.title, TITLE_WIDTH), TITLE_WIDTH + 1);
    let folder = pad(&truncate_str(&record.folder(), FOLDER_WIDTH), FOLDER_WIDTH + 1);
    let tags = pad(&format_tags(&record.tags, TAGS_WIDTH), TAGS_WIDTH + 1);
    let modified = pad(
        &format_timestamp(record.modified.as_ref(), ctx.date_format, false),
        MODIFIED_WIDTH + 1,
    );

    if ctx.use_colors {
        output.push_str(&format!(
            "{}{}{}{}{}\n",
            title.bold(),
            folder.blue(),
            tags.magenta(),
            modified,
            record.word_count()
        ));
    } else {
        output.push_str(&format!(
            "{title}{folder}{tags}{modified}{}\n",
            record.word_count()
        ));
    }
}

/// Formats an optimizer plan as `key: value` lines.
pub fn format_plan_table(plan: &QueryPlan, use_colors: bool) -> String {
    let mut output = String::new();

    let header = "Query plan";
    if use_colors {
        output.push_str(&format!("{}\n", header.green().bold()));
    } else {
        output.push_str(header);
        output.push('\n');
    }

    output.push_str(&format!("  collection size: {}\n", plan.collection_size));
    output.push_str(&format!(
        "  estimated complexity: {:.2}\n",
        plan.estimated_complexity
    ));
    output.push_str(&format!("  function calls: {}\n", plan.function_calls));
    output.push_str(&format!("  comparisons: {}\n", plan.comparisons));
    output.push_str(&format!("  logical operators: {}\n", plan.logical_operators));
    match &plan.index_hint {
        Some(hint) => output.push_str(&format!(
            "  index hint: {} {}\n",
            hint.property, hint.operator
        )),
        None => output.push_str("  index hint: none\n"),
    }

    output
}

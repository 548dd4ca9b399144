//! Functions command implementation.
//!
//! Lists the operators, functions and features the configured engine accepts.

use notes_query_rs::QueryEngine;

use super::{CommandContext, Result};
use crate::output::format_capabilities_table;

/// Executes the functions command.
pub fn execute(ctx: &CommandContext, engine: &QueryEngine) -> Result<()> {
    let caps = engine.capabilities();

    if ctx.json_output {
        let output = serde_json::json!({
            "capabilities": caps,
            "stats": engine.stats(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        print!("{}", format_capabilities_table(&caps, ctx.use_colors));
    }

    Ok(())
}

//! Capabilities output formatting.

use notes_query_rs::Capabilities;
use owo_colors::OwoColorize;

/// Names per line when listing functions.
const NAMES_PER_LINE: usize = 6;

/// Formats capabilities as titled sections.
pub fn format_capabilities_table(caps: &Capabilities, use_colors: bool) -> String {
    let mut output = String::new();

    push_section(&mut output, "Operators", &caps.operators, use_colors);
    push_section(&mut output, "Filter functions", &caps.filter_functions, use_colors);
    push_section(&mut output, "Formula functions", &caps.formula_functions, use_colors);
    push_section(&mut output, "Features", &caps.features, use_colors);

    output
}

fn push_section(output: &mut String, title: &str, names: &[String], use_colors: bool) {
    if !output.is_empty() {
        output.push('\n');
    }

    let heading = format!("{title} ({})", names.len());
    if use_colors {
        output.push_str(&format!("{}\n", heading.green().bold()));
    } else {
        output.push_str(&heading);
        output.push('\n');
    }

    for chunk in names.chunks(NAMES_PER_LINE) {
        output.push_str("  ");
        output.push_str(&chunk.join("  "));
        output.push('\n');
    }
}

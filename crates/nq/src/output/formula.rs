//! Formula result output formatting.

use notes_model_rs::Value;
use owo_colors::OwoColorize;
use serde::Serialize;

use super::helpers::{format_value, pad, truncate_str};

const TITLE_WIDTH: usize = 28;

/// The outcome of evaluating a formula against one record.
#[derive(Debug, Serialize)]
pub struct RecordEvaluation {
    pub title: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Formats per-record formula results, one line per record.
pub fn format_evaluations_table(results: &[RecordEvaluation], use_colors: bool) -> String {
    if results.is_empty() {
        return "No records found.\n".to_string();
    }

    let mut output = String::new();
    for result in results {
        let title = pad(&truncate_str(&result.title, TITLE_WIDTH), TITLE_WIDTH + 1);
        let outcome = match (&result.value, &result.error) {
            (_, Some(error)) if use_colors => format!("error: {error}").red().to_string(),
            (_, Some(error)) => format!("error: {error}"),
            (Some(value), None) => format_value(value, use_colors),
            (None, None) => String::new(),
        };
        output.push_str(&format!("{title}{outcome}\n"));
    }
    output
}

//! Common helper functions for output formatting.

use chrono::{DateTime, Local, Utc};
use notes_model_rs::Value;
use owo_colors::OwoColorize;

use crate::commands::DateFormat;

/// Truncates a string to at most `max_len` characters, marking the cut with `...`.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        s.to_string()
    }
}

/// Pads `s` with spaces to `width` characters.
///
/// `format!("{:<w$}")` pads by `char` count too, but colored strings carry
/// escape codes, so callers pad the plain text before coloring it.
pub fn pad(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        s.to_string()
    } else {
        format!("{s}{}", " ".repeat(width - len))
    }
}

/// Formats a timestamp for table display.
pub fn format_timestamp(
    timestamp: Option<&DateTime<Utc>>,
    format: DateFormat,
    use_colors: bool,
) -> String {
    let Some(timestamp) = timestamp else {
        return String::new();
    };

    match format {
        DateFormat::Iso => timestamp.to_rfc3339(),
        DateFormat::Short => timestamp.format("%Y-%m-%d").to_string(),
        DateFormat::Relative => {
            let display = format_relative(timestamp, Local::now());
            if use_colors && display == "Today" {
                display.green().to_string()
            } else {
                display
            }
        }
    }
}

/// Renders `timestamp` relative to `now` in the local time zone.
pub fn format_relative(timestamp: &DateTime<Utc>, now: DateTime<Local>) -> String {
    let date = timestamp.with_timezone(&Local).date_naive();
    let today = now.date_naive();

    let days = (today - date).num_days();
    match days {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        -1 => "Tomorrow".to_string(),
        2..=13 => format!("{days} days ago"),
        _ => date.format("%b %d %Y").to_string(),
    }
}

/// Formats tags for display.
pub fn format_tags(tags: &[String], max_len: usize) -> String {
    if tags.is_empty() {
        return String::new();
    }

    let formatted: Vec<String> = tags
        .iter()
        .map(|t| format!("#{}", t.trim_start_matches('#')))
        .collect();
    truncate_str(&formatted.join(" "), max_len)
}

/// Formats a formula value for display.
///
/// Text is printed bare and null as `null`.
pub fn format_value(value: &Value, use_colors: bool) -> String {
    let display = if value.is_null() {
        "null".to_string()
    } else {
        value.to_string()
    };
    if !use_colors {
        return display;
    }
    match value {
        Value::Null => display.dimmed().to_string(),
        Value::Number(_) => display.cyan().to_string(),
        Value::Bool(_) => display.yellow().to_string(),
        _ => display,
    }
}

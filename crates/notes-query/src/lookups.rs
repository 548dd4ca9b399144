//! Fuzzy name lookup for "did you mean" suggestions.

use strsim::levenshtein;

/// Suggestions further than this many edits away are not offered.
const SUGGESTION_CUTOFF: usize = 3;

/// Formats the "unknown function" message, optionally including a suggestion.
pub(crate) fn format_unknown_function(name: &str, suggestion: Option<&str>) -> String {
    let mut message = format!("unknown function '{name}'.");
    if let Some(candidate) = suggestion {
        message.push_str(&format!(" Did you mean '{candidate}'?"));
    }
    message
}

/// Picks the registered name closest to `query`, ignoring case.
///
/// Ties keep the earliest candidate. Exact matches are skipped since the
/// caller only asks after a lookup missed.
pub(crate) fn find_similar_name<'a>(
    query: &str,
    candidates: impl Iterator<Item = &'a str>,
) -> Option<String> {
    let folded = query.to_lowercase();
    let mut best: Option<(usize, &str)> = None;

    for name in candidates.filter(|n| !n.is_empty() && *n != query) {
        let distance = levenshtein(&folded, &name.to_lowercase());
        if distance > SUGGESTION_CUTOFF {
            continue;
        }
        if best.map_or(true, |(current, _)| distance < current) {
            best = Some((distance, name));
        }
    }

    best.map(|(_, name)| name.to_string())
}

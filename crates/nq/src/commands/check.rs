//! Check command implementation.
//!
//! Parses a filter or formula without running it and prints the canonical
//! form, which parses back to the same tree.

use notes_query_rs::{Language, QueryEngine};

use super::{CommandContext, Result};

/// Parses `expr` as `language` and returns its canonical rendering.
///
/// # Errors
///
/// Returns the parse error, with its position, when `expr` is malformed.
pub fn canonicalize(engine: &QueryEngine, language: Language, expr: &str) -> Result<String> {
    let canonical = match language {
        Language::Filter => engine.validate_filter(expr)?.to_string(),
        Language::Formula => engine.validate_formula(expr)?.to_string(),
    };
    Ok(canonical)
}

/// Executes the check command.
pub fn execute(
    ctx: &CommandContext,
    engine: &QueryEngine,
    language: Language,
    expr: &str,
) -> Result<()> {
    let canonical = canonicalize(engine, language, expr)?;

    if ctx.json_output {
        let output = serde_json::json!({
            "language": language.to_string(),
            "valid": true,
            "canonical": canonical,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        println!("{canonical}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandError;

    #[test]
    fn test_canonical_filter_reparses() {
        let engine = QueryEngine::new();
        let canonical =
            canonicalize(&engine, Language::Filter, "a == 1 OR b != 2 AND NOT c").unwrap();
        assert_eq!(
            canonicalize(&engine, Language::Filter, &canonical).unwrap(),
            canonical
        );
    }

    #[test]
    fn test_canonical_formula_makes_precedence_explicit() {
        let engine = QueryEngine::new();
        let canonical = canonicalize(&engine, Language::Formula, "1 + 2 * 3").unwrap();
        assert_eq!(canonical, "(1 + (2 * 3))");
    }

    #[test]
    fn test_parse_error_is_reported() {
        let engine = QueryEngine::new();
        let err = canonicalize(&engine, Language::Filter, "a == (1").unwrap_err();
        assert!(matches!(err, CommandError::Parse(_)));
    }
}

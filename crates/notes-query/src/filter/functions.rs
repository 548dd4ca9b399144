//! Built-in filter functions.
//!
//! Every filter function receives the record (as the [`Value::Object`]
//! produced by [`Record::to_value`](notes_model_rs::Record::to_value)) as its
//! first argument and the remaining call arguments as a slice. Most return a
//! boolean; `wordCount` returns a number.
//!
//! Functions are lenient about the record argument: when it is not a record
//! object the predicate simply does not match. Missing or unusable extra
//! arguments are [`EvalError::InvalidArgument`].

use chrono::{DateTime, Datelike, Local, Utc};
use notes_model_rs::record::normalize_tag;
use notes_model_rs::value::Value;

use crate::error::{EvalError, EvalResult};
use crate::registry::FunctionRegistry;

/// Signature of a filter function: `(record, rest) -> value`.
pub type FilterFn = dyn Fn(&Value, &[Value]) -> EvalResult<Value> + Send + Sync;

/// Registry of filter functions.
pub type FilterRegistry = FunctionRegistry<FilterFn>;

impl FunctionRegistry<FilterFn> {
    /// Creates a registry seeded with every built-in filter function.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.insert_builtin("taggedWith", Box::new(tagged_with));
        registry.insert_builtin("hasAnyTag", Box::new(has_any_tag));
        registry.insert_builtin("hasAllTags", Box::new(has_all_tags));
        registry.insert_builtin("inFolder", Box::new(in_folder));
        registry.insert_builtin("hasLink", Box::new(has_link));
        registry.insert_builtin("linksTo", Box::new(links_to));
        registry.insert_builtin("hasProperty", Box::new(has_property));
        registry.insert_builtin("isEmpty", Box::new(is_empty));
        registry.insert_builtin("hasContent", Box::new(has_content));
        registry.insert_builtin("wordCount", Box::new(word_count));
        registry.insert_builtin("createdAfter", Box::new(|file: &Value, args: &[Value]| {
            compare_date("createdAfter", file, "created", args, |d, t| d > t)
        }));
        registry.insert_builtin("createdBefore", Box::new(|file: &Value, args: &[Value]| {
            compare_date("createdBefore", file, "created", args, |d, t| d < t)
        }));
        registry.insert_builtin("modifiedAfter", Box::new(|file: &Value, args: &[Value]| {
            compare_date("modifiedAfter", file, "modified", args, |d, t| d > t)
        }));
        registry.insert_builtin("modifiedBefore", Box::new(|file: &Value, args: &[Value]| {
            compare_date("modifiedBefore", file, "modified", args, |d, t| d < t)
        }));
        registry.insert_builtin("isToday", Box::new(is_today));
        registry.insert_builtin("isThisWeek", Box::new(is_this_week));
        registry.insert_builtin("isMarkdown", Box::new(is_markdown));
        registry.insert_builtin("hasExtension", Box::new(has_extension));
        registry.insert_builtin("largerThan", Box::new(|file: &Value, args: &[Value]| {
            compare_size("largerThan", file, args, |size, limit| size > limit)
        }));
        registry.insert_builtin("smallerThan", Box::new(|file: &Value, args: &[Value]| {
            compare_size("smallerThan", file, args, |size, limit| size < limit)
        }));
        registry
    }
}

// ==================== Argument helpers ====================

/// Returns the argument at `index` or an `InvalidArgument` error naming it.
fn required<'v>(function: &str, args: &'v [Value], index: usize) -> EvalResult<&'v Value> {
    args.get(index).ok_or_else(|| {
        EvalError::invalid_argument(function, format!("missing argument {}", index + 2))
    })
}

/// Expands list arguments and renders every item as text.
fn flatten_text(args: &[Value]) -> Vec<String> {
    let mut out = Vec::new();
    for arg in args {
        match arg {
            Value::List(items) => out.extend(flatten_text(items)),
            Value::Null => {}
            other => out.push(other.to_text()),
        }
    }
    out
}

fn field_text(file: &Value, key: &str) -> String {
    file.get(key).map(Value::to_text).unwrap_or_default()
}

fn bool_value(b: bool) -> EvalResult<Value> {
    Ok(Value::Bool(b))
}

// ==================== Tags ====================

fn record_tags(file: &Value) -> Vec<String> {
    file.get("tags")
        .and_then(Value::as_list)
        .map(|tags| tags.iter().map(|t| normalize_tag(&t.to_text())).collect())
        .unwrap_or_default()
}

/// A tag matches itself and its nested children (`project` matches `project/alpha`).
fn tag_matches(tags: &[String], wanted: &str) -> bool {
    let wanted = normalize_tag(wanted);
    if wanted.is_empty() {
        return false;
    }
    let prefix = format!("{}/", wanted);
    tags.iter().any(|t| *t == wanted || t.starts_with(&prefix))
}

fn tagged_with(file: &Value, args: &[Value]) -> EvalResult<Value> {
    let tag = required("taggedWith", args, 0)?.to_text();
    bool_value(tag_matches(&record_tags(file), &tag))
}

fn has_any_tag(file: &Value, args: &[Value]) -> EvalResult<Value> {
    let wanted = flatten_text(args);
    if wanted.is_empty() {
        return Err(EvalError::invalid_argument("hasAnyTag", "expected at least one tag"));
    }
    let tags = record_tags(file);
    bool_value(wanted.iter().any(|w| tag_matches(&tags, w)))
}

fn has_all_tags(file: &Value, args: &[Value]) -> EvalResult<Value> {
    let wanted = flatten_text(args);
    if wanted.is_empty() {
        return Err(EvalError::invalid_argument("hasAllTags", "expected at least one tag"));
    }
    let tags = record_tags(file);
    bool_value(wanted.iter().all(|w| tag_matches(&tags, w)))
}

// ==================== Paths and links ====================

fn normalize_folder(folder: &str) -> String {
    folder
        .trim()
        .trim_start_matches("./")
        .trim_matches('/')
        .to_lowercase()
}

/// Matches the folder itself and any folder below it. An empty folder is the
/// vault root, which contains every record.
fn in_folder(file: &Value, args: &[Value]) -> EvalResult<Value> {
    let wanted = normalize_folder(&required("inFolder", args, 0)?.to_text());
    if file.as_object().is_none() {
        return bool_value(false);
    }
    if wanted.is_empty() {
        return bool_value(true);
    }
    let folder = normalize_folder(&field_text(file, "folder"));
    bool_value(folder == wanted || folder.starts_with(&format!("{}/", wanted)))
}

/// Reduces a link target to its lower-cased file stem.
fn normalize_link(target: &str) -> String {
    let lower = target.trim().to_lowercase();
    let last = lower.rsplit('/').next().unwrap_or_default();
    last.strip_suffix(".md")
        .or_else(|| last.strip_suffix(".markdown"))
        .unwrap_or(last)
        .to_string()
}

fn record_links(file: &Value) -> Vec<String> {
    file.get("links")
        .and_then(Value::as_list)
        .map(|links| links.iter().map(Value::to_text).collect())
        .unwrap_or_default()
}

fn links_to_target(file: &Value, target: &str) -> bool {
    let wanted = normalize_link(target);
    !wanted.is_empty() && record_links(file).iter().any(|l| normalize_link(l) == wanted)
}

fn has_link(file: &Value, args: &[Value]) -> EvalResult<Value> {
    match args.first() {
        Some(target) if !target.is_null() => bool_value(links_to_target(file, &target.to_text())),
        _ => bool_value(!record_links(file).is_empty()),
    }
}

fn links_to(file: &Value, args: &[Value]) -> EvalResult<Value> {
    let target = required("linksTo", args, 0)?.to_text();
    bool_value(links_to_target(file, &target))
}

fn has_extension(file: &Value, args: &[Value]) -> EvalResult<Value> {
    let wanted = required("hasExtension", args, 0)?
        .to_text()
        .trim()
        .trim_start_matches('.')
        .to_lowercase();
    bool_value(field_text(file, "extension").to_lowercase() == wanted)
}

fn is_markdown(file: &Value, _args: &[Value]) -> EvalResult<Value> {
    let ext = field_text(file, "extension").to_lowercase();
    bool_value(ext == "md" || ext == "markdown")
}

// ==================== Content and properties ====================

fn has_property(file: &Value, args: &[Value]) -> EvalResult<Value> {
    let name = required("hasProperty", args, 0)?.to_text();
    let present = file
        .get("properties")
        .and_then(|props| props.get(&name))
        .is_some_and(|value| !value.is_null());
    bool_value(present)
}

fn is_empty(file: &Value, _args: &[Value]) -> EvalResult<Value> {
    bool_value(field_text(file, "content").trim().is_empty())
}

/// With no argument, true when the content is not blank; with one, a
/// case-insensitive substring search.
fn has_content(file: &Value, args: &[Value]) -> EvalResult<Value> {
    let content = field_text(file, "content");
    match args.first() {
        Some(needle) if !needle.is_null() => bool_value(
            content
                .to_lowercase()
                .contains(&needle.to_text().to_lowercase()),
        ),
        _ => bool_value(!content.trim().is_empty()),
    }
}

fn word_count(file: &Value, _args: &[Value]) -> EvalResult<Value> {
    let count = file
        .get("wordCount")
        .and_then(Value::to_number)
        .unwrap_or_else(|| field_text(file, "content").split_whitespace().count() as f64);
    Ok(Value::Number(count))
}

// ==================== Dates ====================

fn record_date(file: &Value, key: &str) -> Option<DateTime<Utc>> {
    file.get(key).and_then(Value::to_date)
}

fn compare_date(
    function: &str,
    file: &Value,
    key: &str,
    args: &[Value],
    predicate: impl Fn(DateTime<Utc>, DateTime<Utc>) -> bool,
) -> EvalResult<Value> {
    let arg = required(function, args, 0)?;
    let threshold = arg.to_date().ok_or_else(|| {
        EvalError::invalid_argument(function, format!("invalid date '{}'", arg.to_text()))
    })?;
    bool_value(record_date(file, key).is_some_and(|date| predicate(date, threshold)))
}

/// Which timestamp the calendar predicates look at: `modified` unless the
/// second argument names another property.
fn calendar_key(args: &[Value]) -> String {
    args.first()
        .filter(|v| !v.is_null())
        .map(Value::to_text)
        .unwrap_or_else(|| "modified".to_string())
}

fn is_today(file: &Value, args: &[Value]) -> EvalResult<Value> {
    let today = Local::now().date_naive();
    let key = calendar_key(args);
    bool_value(
        record_date(file, &key)
            .is_some_and(|date| date.with_timezone(&Local).date_naive() == today),
    )
}

fn is_this_week(file: &Value, args: &[Value]) -> EvalResult<Value> {
    let this_week = Local::now().date_naive().iso_week();
    let key = calendar_key(args);
    bool_value(
        record_date(file, &key)
            .is_some_and(|date| date.with_timezone(&Local).date_naive().iso_week() == this_week),
    )
}

// ==================== Size ====================

const SIZE_UNITS: [(&str, f64); 4] = [
    ("GB", 1024.0 * 1024.0 * 1024.0),
    ("MB", 1024.0 * 1024.0),
    ("KB", 1024.0),
    ("B", 1.0),
];

/// Parses a byte count: a number, or text with an optional `B`, `KB`, `MB`
/// or `GB` suffix (powers of 1024).
pub(crate) fn parse_size(value: &Value) -> Option<f64> {
    if let Some(n) = value.to_number() {
        return Some(n);
    }
    let text = value.as_str()?.trim().to_uppercase();
    let (number, multiplier) = SIZE_UNITS.iter().find_map(|&(suffix, multiplier)| {
        text.strip_suffix(suffix)
            .map(|rest| (rest.trim().to_string(), multiplier))
    })?;
    number
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .map(|n| n * multiplier)
}

fn compare_size(
    function: &str,
    file: &Value,
    args: &[Value],
    predicate: impl Fn(f64, f64) -> bool,
) -> EvalResult<Value> {
    let arg = required(function, args, 0)?;
    let limit = parse_size(arg).ok_or_else(|| {
        EvalError::invalid_argument(function, format!("invalid size '{}'", arg.to_text()))
    })?;
    let size = file.get("size").and_then(Value::to_number).unwrap_or(0.0);
    bool_value(predicate(size, limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use notes_model_rs::Record;

    fn call(name: &str, record: &Record, args: &[Value]) -> EvalResult<Value> {
        let registry = FilterRegistry::with_builtins();
        let function = registry.get(name).unwrap();
        function(&record.to_value(), args)
    }

    fn text(s: &str) -> Value {
        Value::from(s)
    }

    #[test]
    fn test_all_builtins_registered() {
        let registry = FilterRegistry::with_builtins();
        assert_eq!(registry.len(), 20);
        for name in ["taggedWith", "largerThan", "isThisWeek", "linksTo"] {
            assert!(registry.is_builtin(name), "{} should be a built-in", name);
        }
    }

    #[test]
    fn test_tagged_with_nested() {
        let record = Record::new("a", "a.md").with_tags(["#Project/Alpha"]);
        assert_eq!(call("taggedWith", &record, &[text("project")]).unwrap(), Value::Bool(true));
        assert_eq!(
            call("taggedWith", &record, &[text("project/alpha")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(call("taggedWith", &record, &[text("proj")]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_tagged_with_missing_argument() {
        let record = Record::new("a", "a.md");
        let err = call("taggedWith", &record, &[]).unwrap_err();
        assert!(matches!(err, EvalError::InvalidArgument { ref function, .. } if function == "taggedWith"));
    }

    #[test]
    fn test_has_any_and_all_tags_flatten_lists() {
        let record = Record::new("a", "a.md").with_tags(["work", "urgent"]);
        let list = Value::List(vec![text("home"), text("urgent")]);
        assert_eq!(call("hasAnyTag", &record, &[list.clone()]).unwrap(), Value::Bool(true));
        assert_eq!(call("hasAllTags", &record, &[list]).unwrap(), Value::Bool(false));
        assert_eq!(
            call("hasAllTags", &record, &[text("WORK"), text("#urgent")]).unwrap(),
            Value::Bool(true)
        );
        assert!(call("hasAnyTag", &record, &[]).is_err());
    }

    #[test]
    fn test_in_folder_includes_subfolders() {
        let record = Record::new("a", "Projects/Alpha/a.md");
        assert_eq!(call("inFolder", &record, &[text("projects")]).unwrap(), Value::Bool(true));
        assert_eq!(call("inFolder", &record, &[text("/Projects/Alpha/")]).unwrap(), Value::Bool(true));
        assert_eq!(call("inFolder", &record, &[text("Proj")]).unwrap(), Value::Bool(false));
        assert_eq!(call("inFolder", &record, &[text("")]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_links() {
        let record = Record::new("a", "a.md")
            .with_content("See [[Roadmap]] and [plan](docs/Plan.md).");
        assert_eq!(call("hasLink", &record, &[]).unwrap(), Value::Bool(true));
        assert_eq!(call("hasLink", &record, &[text("roadmap")]).unwrap(), Value::Bool(true));
        assert_eq!(call("linksTo", &record, &[text("plan.md")]).unwrap(), Value::Bool(true));
        assert_eq!(call("linksTo", &record, &[text("budget")]).unwrap(), Value::Bool(false));

        let empty = Record::new("b", "b.md");
        assert_eq!(call("hasLink", &empty, &[]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_has_property_ignores_null() {
        let record = Record::new("a", "a.md")
            .with_property("status", "draft")
            .with_property("owner", serde_json::Value::Null);
        assert_eq!(call("hasProperty", &record, &[text("status")]).unwrap(), Value::Bool(true));
        assert_eq!(call("hasProperty", &record, &[text("owner")]).unwrap(), Value::Bool(false));
        assert_eq!(call("hasProperty", &record, &[text("missing")]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_content_functions() {
        let record = Record::new("a", "a.md").with_content("Hello big World");
        assert_eq!(call("isEmpty", &record, &[]).unwrap(), Value::Bool(false));
        assert_eq!(call("hasContent", &record, &[]).unwrap(), Value::Bool(true));
        assert_eq!(call("hasContent", &record, &[text("world")]).unwrap(), Value::Bool(true));
        assert_eq!(call("wordCount", &record, &[]).unwrap(), Value::Number(3.0));

        let blank = Record::new("b", "b.md").with_content("   \n");
        assert_eq!(call("isEmpty", &blank, &[]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_date_comparisons() {
        let record = Record::new("a", "a.md")
            .with_created(Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap());
        assert_eq!(
            call("createdAfter", &record, &[text("2024-03-01")]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call("createdBefore", &record, &[text("2024-03-01")]).unwrap(),
            Value::Bool(false)
        );
        // No modified date means no match rather than an error
        assert_eq!(
            call("modifiedAfter", &record, &[text("2000-01-01")]).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_date_comparison_invalid_argument() {
        let record = Record::new("a", "a.md");
        let err = call("createdAfter", &record, &[text("not a date")]).unwrap_err();
        assert_eq!(
            err,
            EvalError::invalid_argument("createdAfter", "invalid date 'not a date'")
        );
    }

    #[test]
    fn test_is_today_and_this_week() {
        let now = Utc::now();
        let record = Record::new("a", "a.md")
            .with_modified(now)
            .with_created(now - chrono::Duration::days(400));
        assert_eq!(call("isToday", &record, &[]).unwrap(), Value::Bool(true));
        assert_eq!(call("isThisWeek", &record, &[]).unwrap(), Value::Bool(true));
        assert_eq!(call("isToday", &record, &[text("created")]).unwrap(), Value::Bool(false));
        assert_eq!(call("isThisWeek", &record, &[text("created")]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_extensions() {
        let record = Record::new("a", "notes/a.Markdown");
        assert_eq!(call("isMarkdown", &record, &[]).unwrap(), Value::Bool(true));
        assert_eq!(call("hasExtension", &record, &[text(".markdown")]).unwrap(), Value::Bool(true));

        let text_file = Record::new("b", "b.txt");
        assert_eq!(call("isMarkdown", &text_file, &[]).unwrap(), Value::Bool(false));
        assert_eq!(call("hasExtension", &text_file, &[text("TXT")]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_size_comparisons() {
        let record = Record::new("a", "a.md").with_size(2048);
        assert_eq!(call("largerThan", &record, &[text("1KB")]).unwrap(), Value::Bool(true));
        assert_eq!(call("largerThan", &record, &[text("2 kb")]).unwrap(), Value::Bool(false));
        assert_eq!(call("smallerThan", &record, &[Value::Number(4096.0)]).unwrap(), Value::Bool(true));
        assert!(call("smallerThan", &record, &[text("huge")]).is_err());
    }

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size(&text("1.5MB")), Some(1.5 * 1024.0 * 1024.0));
        assert_eq!(parse_size(&text("10 B")), Some(10.0));
        assert_eq!(parse_size(&text("512")), Some(512.0));
        assert_eq!(parse_size(&text("KB")), None);
    }

    #[test]
    fn test_non_record_does_not_match() {
        let registry = FilterRegistry::with_builtins();
        let tagged = registry.get("taggedWith").unwrap();
        assert_eq!(tagged(&text("oops"), &[text("work")]).unwrap(), Value::Bool(false));
        let in_folder = registry.get("inFolder").unwrap();
        assert_eq!(in_folder(&Value::Null, &[text("")]).unwrap(), Value::Bool(false));
    }
}

//! Built-in formula functions.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Datelike, Duration, Local, NaiveTime, TimeZone, Utc};
use notes_model_rs::value::Value;

use crate::error::{EvalError, EvalResult};
use crate::registry::FunctionRegistry;

/// Signature of a formula function: evaluated arguments in, value out.
pub type FormulaFn = dyn Fn(&[Value]) -> EvalResult<Value> + Send + Sync;

/// Registry of formula functions.
pub type FormulaRegistry = FunctionRegistry<FormulaFn>;

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
const MS_PER_DAY: i64 = 86_400_000;

static NULL: Value = Value::Null;

impl FunctionRegistry<FormulaFn> {
    /// Creates a registry seeded with every built-in formula function.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        // Text
        registry.insert_builtin("concat", Box::new(concat));
        registry.insert_builtin("substring", Box::new(substring));
        registry.insert_builtin("upper", Box::new(|args: &[Value]| text_map(args, |s| s.to_uppercase())));
        registry.insert_builtin("lower", Box::new(|args: &[Value]| text_map(args, |s| s.to_lowercase())));
        registry.insert_builtin("trim", Box::new(|args: &[Value]| text_map(args, |s| s.trim().to_string())));
        registry.insert_builtin("length", Box::new(length));
        registry.insert_builtin("replace", Box::new(replace));
        registry.insert_builtin("contains", Box::new(contains));
        registry.insert_builtin("startsWith", Box::new(|args: &[Value]| {
            text_test(args, |s, p| s.starts_with(p))
        }));
        registry.insert_builtin("endsWith", Box::new(|args: &[Value]| {
            text_test(args, |s, p| s.ends_with(p))
        }));
        registry.insert_builtin("split", Box::new(split));
        registry.insert_builtin("join", Box::new(join));
        registry.insert_builtin("toString", Box::new(to_string));
        registry.insert_builtin("toNumber", Box::new(to_number));

        // Math
        registry.insert_builtin("sum", Box::new(sum));
        registry.insert_builtin("avg", Box::new(avg));
        registry.insert_builtin("min", Box::new(|args: &[Value]| fold_numbers(args, f64::min)));
        registry.insert_builtin("max", Box::new(|args: &[Value]| fold_numbers(args, f64::max)));
        registry.insert_builtin("round", Box::new(round));
        registry.insert_builtin("floor", Box::new(|args: &[Value]| number_map(args, f64::floor)));
        registry.insert_builtin("ceil", Box::new(|args: &[Value]| number_map(args, f64::ceil)));
        registry.insert_builtin("abs", Box::new(|args: &[Value]| number_map(args, f64::abs)));
        registry.insert_builtin("sqrt", Box::new(sqrt));
        registry.insert_builtin("pow", Box::new(pow));

        // Dates
        registry.insert_builtin("now", Box::new(now));
        registry.insert_builtin("today", Box::new(today));
        registry.insert_builtin("date", Box::new(date));
        registry.insert_builtin("year", Box::new(|args: &[Value]| {
            date_part("year", args, |d| d.year() as f64)
        }));
        registry.insert_builtin("month", Box::new(|args: &[Value]| {
            date_part("month", args, |d| d.month() as f64)
        }));
        registry.insert_builtin("day", Box::new(|args: &[Value]| {
            date_part("day", args, |d| d.day() as f64)
        }));
        registry.insert_builtin("daysBetween", Box::new(days_between));
        registry.insert_builtin("addDays", Box::new(add_days));
        registry.insert_builtin("formatDate", Box::new(format_date));

        // Control
        registry.insert_builtin("if", Box::new(if_else));
        registry.insert_builtin("coalesce", Box::new(coalesce));

        registry
    }
}

// ==================== Argument helpers ====================

/// Returns the argument at `index`, or `Null` when it was not supplied.
fn arg(args: &[Value], index: usize) -> &Value {
    args.get(index).unwrap_or(&NULL)
}

/// Every numeric reading among the arguments, with lists expanded.
fn numbers(args: &[Value]) -> Vec<f64> {
    let mut out = Vec::new();
    for value in args {
        match value {
            Value::List(items) => out.extend(numbers(items)),
            other => out.extend(other.to_number()),
        }
    }
    out
}

fn text_map(args: &[Value], f: impl Fn(&str) -> String) -> EvalResult<Value> {
    Ok(Value::Text(f(&arg(args, 0).to_text())))
}

fn text_test(args: &[Value], f: impl Fn(&str, &str) -> bool) -> EvalResult<Value> {
    Ok(Value::Bool(f(&arg(args, 0).to_text(), &arg(args, 1).to_text())))
}

fn fold_numbers(args: &[Value], f: fn(f64, f64) -> f64) -> EvalResult<Value> {
    Ok(numbers(args).into_iter().reduce(f).map_or(Value::Null, Value::Number))
}

fn number_map(args: &[Value], f: impl Fn(f64) -> f64) -> EvalResult<Value> {
    Ok(Value::Number(f(arg(args, 0).to_number_or_zero())))
}

fn date_part(function: &str, args: &[Value], f: impl Fn(DateTime<Utc>) -> f64) -> EvalResult<Value> {
    Ok(Value::Number(f(date_arg(function, args, 0)?)))
}

fn date_arg(function: &str, args: &[Value], index: usize) -> EvalResult<DateTime<Utc>> {
    let value = arg(args, index);
    value.to_date().ok_or_else(|| {
        EvalError::invalid_argument(
            function,
            format!("expected a date, got {} '{}'", value.type_name(), value.to_text()),
        )
    })
}

// ==================== Text ====================

fn concat(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Text(args.iter().map(Value::to_text).collect()))
}

/// Character-based `substring(s, start, end?)`. Bounds are clamped to the
/// string and swapped when given in reverse order.
fn substring(args: &[Value]) -> EvalResult<Value> {
    let chars: Vec<char> = arg(args, 0).to_text().chars().collect();
    let len = chars.len();
    let clamp = |v: &Value, default: usize| -> usize {
        match v.to_number() {
            Some(n) if n.is_nan() => 0,
            Some(n) => n.max(0.0).min(len as f64) as usize,
            None => default,
        }
    };
    let start = clamp(arg(args, 1), 0);
    let end = clamp(arg(args, 2), len);
    let (start, end) = if start > end { (end, start) } else { (start, end) };
    Ok(Value::Text(chars[start..end].iter().collect()))
}

fn length(args: &[Value]) -> EvalResult<Value> {
    let n = match arg(args, 0) {
        Value::Null => 0,
        Value::List(items) => items.len(),
        Value::Object(map) => map.len(),
        other => other.to_text().chars().count(),
    };
    Ok(Value::from(n))
}

fn replace(args: &[Value]) -> EvalResult<Value> {
    let text = arg(args, 0).to_text();
    let from = arg(args, 1).to_text();
    if from.is_empty() {
        return Ok(Value::Text(text));
    }
    Ok(Value::Text(text.replace(&from, &arg(args, 2).to_text())))
}

/// Substring test for text, element test for lists. Case-sensitive.
fn contains(args: &[Value]) -> EvalResult<Value> {
    let needle = arg(args, 1);
    let found = match arg(args, 0) {
        Value::List(items) => items.iter().any(|item| item.strict_eq(needle)),
        other => other.to_text().contains(&needle.to_text()),
    };
    Ok(Value::Bool(found))
}

fn to_string(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Text(arg(args, 0).to_text()))
}

/// Numeric reading of the argument, or `Null` when it has none.
fn to_number(args: &[Value]) -> EvalResult<Value> {
    Ok(arg(args, 0).to_number().map_or(Value::Null, Value::Number))
}

fn split(args: &[Value]) -> EvalResult<Value> {
    let text = arg(args, 0).to_text();
    let separator = arg(args, 1).to_text();
    let parts: Vec<Value> = if separator.is_empty() {
        text.chars().map(|c| Value::Text(c.to_string())).collect()
    } else {
        text.split(separator.as_str()).map(Value::from).collect()
    };
    Ok(Value::List(parts))
}

fn join(args: &[Value]) -> EvalResult<Value> {
    let separator = match arg(args, 1) {
        Value::Null => ", ".to_string(),
        other => other.to_text(),
    };
    let joined = match arg(args, 0) {
        Value::List(items) => items
            .iter()
            .map(Value::to_text)
            .collect::<Vec<_>>()
            .join(&separator),
        other => other.to_text(),
    };
    Ok(Value::Text(joined))
}

// ==================== Math ====================

fn sum(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Number(numbers(args).iter().sum()))
}

fn avg(args: &[Value]) -> EvalResult<Value> {
    let values = numbers(args);
    if values.is_empty() {
        return Ok(Value::Null);
    }
    Ok(Value::Number(values.iter().sum::<f64>() / values.len() as f64))
}

/// `round(x, digits?)`, half away from zero.
fn round(args: &[Value]) -> EvalResult<Value> {
    let x = arg(args, 0).to_number_or_zero();
    let digits = arg(args, 1).to_number_or_zero().trunc().clamp(0.0, 15.0) as i32;
    let factor = 10f64.powi(digits);
    Ok(Value::Number((x * factor).round() / factor))
}

fn pow(args: &[Value]) -> EvalResult<Value> {
    let base = arg(args, 0).to_number_or_zero();
    Ok(Value::Number(base.powf(arg(args, 1).to_number_or_zero())))
}

fn sqrt(args: &[Value]) -> EvalResult<Value> {
    let x = arg(args, 0).to_number_or_zero();
    if x < 0.0 {
        return Err(EvalError::invalid_argument(
            "sqrt",
            format!("cannot take the square root of {}", x),
        ));
    }
    Ok(Value::Number(x.sqrt()))
}

// ==================== Dates ====================

fn now(_: &[Value]) -> EvalResult<Value> {
    Ok(Value::Date(Utc::now()))
}

/// Local midnight of the current day.
fn today(_: &[Value]) -> EvalResult<Value> {
    let midnight = Local::now().date_naive().and_time(NaiveTime::MIN);
    let instant = match Local.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => midnight.and_utc(),
    };
    Ok(Value::Date(instant))
}

fn date(args: &[Value]) -> EvalResult<Value> {
    Ok(Value::Date(date_arg("date", args, 0)?))
}

/// Whole days between two dates, regardless of order.
fn days_between(args: &[Value]) -> EvalResult<Value> {
    let a = date_arg("daysBetween", args, 0)?;
    let b = date_arg("daysBetween", args, 1)?;
    Ok(Value::from((b - a).num_days().abs()))
}

fn add_days(args: &[Value]) -> EvalResult<Value> {
    let date = date_arg("addDays", args, 0)?;
    let days = arg(args, 1).to_number_or_zero();
    let out_of_range = || EvalError::invalid_argument("addDays", "date out of range");

    let millis = (days * MS_PER_DAY as f64).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return Err(out_of_range());
    }
    let delta = Duration::try_milliseconds(millis as i64).ok_or_else(out_of_range)?;
    date.checked_add_signed(delta)
        .map(Value::Date)
        .ok_or_else(out_of_range)
}

/// `formatDate(d, format?)` using strftime specifiers; `%Y-%m-%d` by default.
fn format_date(args: &[Value]) -> EvalResult<Value> {
    let date = date_arg("formatDate", args, 0)?;
    let format = match arg(args, 1) {
        Value::Null => DEFAULT_DATE_FORMAT.to_string(),
        other => other.to_text(),
    };
    if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
        return Err(EvalError::invalid_argument(
            "formatDate",
            format!("invalid format '{}'", format),
        ));
    }
    Ok(Value::Text(date.format(&format).to_string()))
}

// ==================== Control ====================

/// `if(cond, then, else?)`. Only the chosen branch is returned; both were
/// already evaluated by the caller.
fn if_else(args: &[Value]) -> EvalResult<Value> {
    let branch = if arg(args, 0).is_truthy() { 1 } else { 2 };
    Ok(arg(args, branch).clone())
}

/// First argument that is not `Null`.
fn coalesce(args: &[Value]) -> EvalResult<Value> {
    Ok(args.iter().find(|v| !v.is_null()).cloned().unwrap_or(Value::Null))
}

//! Filter evaluation against records.
//!
//! This module provides the [`FilterEvaluator`] for evaluating parsed filter
//! expressions against [`Record`]s.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use notes_model_rs::Record;
//! use notes_query_rs::filter::{FilterContext, FilterEvaluator, FilterParser, FilterRegistry};
//!
//! // Parse a filter
//! let expr = FilterParser::parse(r#"taggedWith(file, "work") AND size > 3"#).unwrap();
//!
//! // Create evaluation context
//! let functions = FilterRegistry::with_builtins();
//! let variables = BTreeMap::new();
//! let context = FilterContext::new(&functions, &variables);
//!
//! let record = Record::new("Plan", "work/plan.md")
//!     .with_tags(["work"])
//!     .with_content("ship it");
//!
//! // Evaluate the filter
//! let evaluator = FilterEvaluator::new(&expr, &context);
//! assert!(evaluator.matches(&record).unwrap());
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;

use notes_model_rs::value::{compare_values, Value};
use notes_model_rs::Record;
use tracing::warn;

use super::ast::{BinaryOperator, FilterExpr, UnaryOperator};
use super::functions::FilterRegistry;
use crate::error::{EvalError, EvalResult};

/// Context for filter evaluation.
///
/// Holds the function table and the query's context variables. Both are
/// borrowed, so one context serves every record of a query.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    functions: &'a FilterRegistry,
    variables: &'a BTreeMap<String, Value>,
}

impl<'a> FilterContext<'a> {
    /// Creates a new filter context.
    ///
    /// # Arguments
    ///
    /// * `functions` - Registry used to resolve function calls
    /// * `variables` - Extra variables visible to the expression
    pub fn new(functions: &'a FilterRegistry, variables: &'a BTreeMap<String, Value>) -> Self {
        Self {
            functions,
            variables,
        }
    }

    /// Looks up a context variable.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }
}

/// Records that passed a filter, plus warnings for records that failed to evaluate.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome<'b> {
    /// Matching records, in input order.
    pub matched: Vec<&'b Record>,
    /// One message per record whose evaluation raised an error.
    pub warnings: Vec<String>,
}

/// Evaluates a parsed filter against records.
#[derive(Debug)]
pub struct FilterEvaluator<'a> {
    expr: &'a FilterExpr,
    context: &'a FilterContext<'a>,
}

impl<'a> FilterEvaluator<'a> {
    /// Creates a new filter evaluator.
    pub fn new(expr: &'a FilterExpr, context: &'a FilterContext<'a>) -> Self {
        Self { expr, context }
    }

    /// Returns true if the record matches the filter.
    ///
    /// # Errors
    ///
    /// Returns an [`EvalError`] if a function is unknown or rejects its arguments.
    pub fn matches(&self, record: &Record) -> EvalResult<bool> {
        self.matches_value(&record.to_value())
    }

    /// Returns true if an already rendered record value matches the filter.
    pub fn matches_value(&self, record: &Value) -> EvalResult<bool> {
        Ok(self.evaluate(self.expr, record)?.is_truthy())
    }

    /// Filters a slice of records sequentially, in input order.
    ///
    /// A record whose evaluation fails is excluded and produces a warning;
    /// the remaining records are still evaluated.
    pub fn filter_records<'b>(&self, records: &'b [Record]) -> FilterOutcome<'b> {
        let mut outcome = FilterOutcome::default();
        for record in records {
            match self.matches(record) {
                Ok(true) => outcome.matched.push(record),
                Ok(false) => {}
                Err(err) => {
                    warn!(path = %record.path, error = %err, "Filter evaluation failed; record excluded");
                    outcome.warnings.push(format!("{}: {}", record_label(record), err));
                }
            }
        }
        outcome
    }

    /// Evaluates an expression against a record value.
    pub fn evaluate(&self, expr: &FilterExpr, record: &Value) -> EvalResult<Value> {
        match expr {
            FilterExpr::Literal(literal) => Ok(literal.to_value()),
            FilterExpr::Identifier(name) => Ok(self.resolve(name, record)),
            FilterExpr::PropertyAccess { object, property } => {
                Ok(self.evaluate(object, record)?.get_property(property))
            }
            FilterExpr::FunctionCall { name, arguments } => {
                self.call_function(name, arguments, record)
            }
            FilterExpr::UnaryOp { operator, operand } => {
                let value = self.evaluate(operand, record)?;
                match operator {
                    UnaryOperator::Not => Ok(Value::Bool(!value.is_truthy())),
                }
            }
            FilterExpr::BinaryOp {
                operator,
                left,
                right,
            } => {
                // Both sides are always evaluated, so errors on the right
                // surface even when the left already decides the result.
                let left = self.evaluate(left, record)?;
                let right = self.evaluate(right, record)?;
                Ok(Value::Bool(apply_binary(*operator, &left, &right)))
            }
        }
    }

    /// Resolves a bare name: `this`/`file`, then record keys, then context variables.
    fn resolve(&self, name: &str, record: &Value) -> Value {
        if name == "this" || name == "file" {
            return record.clone();
        }
        if let Some(value) = record.get(name) {
            return value.clone();
        }
        self.context.variable(name).cloned().unwrap_or(Value::Null)
    }

    fn call_function(
        &self,
        name: &str,
        arguments: &[FilterExpr],
        record: &Value,
    ) -> EvalResult<Value> {
        let Some(function) = self.context.functions.get(name) else {
            return Err(EvalError::UnknownFunction {
                name: name.to_string(),
                suggestion: self.context.functions.suggest(name),
            });
        };

        let values = arguments
            .iter()
            .map(|arg| self.evaluate(arg, record))
            .collect::<EvalResult<Vec<_>>>()?;

        let Some((file, rest)) = values.split_first() else {
            return Err(EvalError::invalid_argument(
                name,
                "expected the record as the first argument",
            ));
        };

        function(file, rest)
    }
}

/// Applies a binary operator to two evaluated operands.
fn apply_binary(operator: BinaryOperator, left: &Value, right: &Value) -> bool {
    match operator {
        BinaryOperator::Eq => left.loose_eq(right),
        BinaryOperator::NotEq => !left.loose_eq(right),
        BinaryOperator::StrictEq => left.strict_eq(right),
        BinaryOperator::StrictNotEq => !left.strict_eq(right),
        BinaryOperator::Gt => compare_values(left, right) == Ordering::Greater,
        BinaryOperator::Lt => compare_values(left, right) == Ordering::Less,
        BinaryOperator::Gte => compare_values(left, right) != Ordering::Less,
        BinaryOperator::Lte => compare_values(left, right) != Ordering::Greater,
        BinaryOperator::Contains => contains(left, right),
        BinaryOperator::StartsWith => left
            .to_text()
            .to_lowercase()
            .starts_with(&right.to_text().to_lowercase()),
        BinaryOperator::And => left.is_truthy() && right.is_truthy(),
        BinaryOperator::Or => left.is_truthy() || right.is_truthy(),
    }
}

/// Case-insensitive containment: list membership for lists, substring otherwise.
fn contains(haystack: &Value, needle: &Value) -> bool {
    let needle = needle.to_text().to_lowercase();
    match haystack {
        Value::List(items) => items.iter().any(|item| item.to_text().to_lowercase() == needle),
        other => other.to_text().to_lowercase().contains(&needle),
    }
}

fn record_label(record: &Record) -> &str {
    if record.path.is_empty() {
        &record.title
    } else {
        &record.path
    }
}

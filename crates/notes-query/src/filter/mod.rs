//! Filter expression parser and evaluator.
//!
//! A filter is a boolean expression selecting records from a collection.
//!
//! # Supported Syntax
//!
//! ## Operands
//! - `"text"` / `'text'` - String literals with backslash escapes
//! - `42`, `3.5` - Number literals
//! - `true`, `false`, `null`
//! - `title`, `size`, `status` - Record keys, flattened properties or context variables
//! - `file`, `this` - The record itself
//! - `file.properties.status` - Dotted property access
//! - `taggedWith(file, "work")` - Function calls (see [`FilterRegistry::with_builtins`])
//!
//! ## Comparison
//! - `==` `!=` - Loose (in)equality
//! - `===` `!==` - Strict (in)equality
//! - `>` `<` `>=` `<=` - Ordering; absent values sort first
//! - `contains` - Case-insensitive substring, or list membership
//! - `startsWith` - Case-insensitive prefix
//!
//! ## Boolean Operators
//! - `AND` / `&&`
//! - `OR` / `||`
//! - `NOT` / `!`
//! - `()` - Grouping
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use notes_model_rs::Record;
//! use notes_query_rs::filter::{FilterContext, FilterEvaluator, FilterParser, FilterRegistry};
//!
//! // Parse a filter expression
//! let expr = FilterParser::parse("title contains 'plan' OR isEmpty(file)").unwrap();
//!
//! // Create evaluation context
//! let functions = FilterRegistry::with_builtins();
//! let variables = BTreeMap::new();
//! let context = FilterContext::new(&functions, &variables);
//!
//! // Filter records
//! let records = vec![Record::new("Roadmap plan", "plan.md").with_content("...")];
//! let outcome = FilterEvaluator::new(&expr, &context).filter_records(&records);
//! assert_eq!(outcome.matched.len(), 1);
//! ```

mod ast;
mod evaluator;
mod functions;
mod lexer;
mod parser;

pub use ast::{BinaryOperator, FilterExpr, Literal, UnaryOperator};
pub use evaluator::{FilterContext, FilterEvaluator, FilterOutcome};
pub use functions::{FilterFn, FilterRegistry};
pub use lexer::{FilterToken, Lexer, LexerError, LexerResult, PositionedToken};
pub use parser::FilterParser;

//! Formula expression parser and evaluator.
//!
//! Formulas compute a value: arithmetic, string building and calls to the
//! built-in functions listed in [`FormulaRegistry::with_builtins`].
//!
//! # Supported Syntax
//!
//! - `1 + 2 * 3`, `(a - b) / 2`, `-x` - Arithmetic; `*` and `/` bind tighter
//! - `"a" + 1` - `+` concatenates when either side is text
//! - `this.size`, `user.name.length` - Property access
//! - `round(avg(scores), 1)` - Function calls
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use notes_model_rs::value::Value;
//! use notes_query_rs::formula::FormulaEngine;
//!
//! let engine = FormulaEngine::new();
//! let mut variables = BTreeMap::new();
//! variables.insert("price".to_string(), Value::Number(4.0));
//!
//! let total = engine.evaluate("price * 3 + 1", &variables).unwrap();
//! assert_eq!(total, Value::Number(13.0));
//! ```

mod ast;
mod builtins;
mod evaluator;
mod lexer;
mod parser;

pub use ast::{ArithmeticOperator, FormulaExpr, Literal, UnaryArithmetic};
pub use builtins::{FormulaFn, FormulaRegistry};
pub use evaluator::{FormulaEngine, Scope};
pub use lexer::{tokenize, FormulaToken, Spanned};
pub use parser::FormulaParser;

//! Filter, formula and query engine for note collections.
//!
//! The engine selects, orders, groups and paginates [`Record`]s with two
//! small expression languages:
//!
//! - [`filter`]: boolean expressions such as
//!   `taggedWith(file, "work") AND NOT isEmpty(file)`
//! - [`formula`]: computed values such as `round(size / 1024, 1)`
//!
//! [`QueryEngine`] ties both together with a result cache and an advisory
//! optimizer. The crate performs no I/O; records are supplied by the caller.
//!
//! # Example
//!
//! ```
//! use notes_model_rs::prelude::*;
//! use notes_query_rs::QueryEngine;
//!
//! let records = vec![
//!     Record::new("Plan", "work/plan.md").with_tags(["work"]).with_content("ship"),
//!     Record::new("Draft", "work/draft.md").with_tags(["work"]),
//! ];
//! let query = Query::new().with_filter(r#"taggedWith(file, "work") AND NOT isEmpty(file)"#);
//!
//! let result = QueryEngine::new().execute(&records, &query).unwrap();
//! assert_eq!(result.total_count, 1);
//! ```
//!
//! [`Record`]: notes_model_rs::Record

pub mod cache;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod executor;
pub mod filter;
pub mod formula;
pub mod optimizer;
pub mod registry;

mod literal;
mod lookups;

pub use capabilities::Capabilities;
pub use config::EngineConfig;
pub use error::{
    EvalError, FormulaError, Language, ParseError, QueryError, RegistrationError, ValidationError,
};
pub use executor::{EngineStats, QueryEngine};
pub use registry::RegisterOptions;

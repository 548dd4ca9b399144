//! Data model for the notes query engine.
//!
//! # Quick Start
//!
//! For convenient imports, use the prelude:
//!
//! ```
//! use notes_model_rs::prelude::*;
//! ```
//!
//! This re-exports [`Record`], [`Value`], the [`Query`](query::Query)
//! configuration and the [`QueryResult`](query::QueryResult) types.
//!
//! [`Record`] and [`Value`] are also available at the crate root:
//!
//! ```
//! use notes_model_rs::{Record, Value};
//!
//! let record = Record::new("Plan", "work/plan.md");
//! assert_eq!(record.to_value().get("folder"), Some(&Value::from("work")));
//! ```

pub mod prelude;
pub mod query;
pub mod record;
pub mod value;

pub use record::Record;
pub use value::Value;

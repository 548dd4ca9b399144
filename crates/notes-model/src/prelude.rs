//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the notes-model crate,
//! making it easy for library consumers to import everything they need with a single
//! use statement.
//!
//! # Example
//!
//! ```
//! use notes_model_rs::prelude::*;
//!
//! // Now you have access to:
//! // - Record (the queryable unit)
//! // - Value (the dynamic value shared by both expression languages)
//! // - Query, SortSpec, GroupBy (query configuration)
//! // - QueryResult, QueryItems, Group (execution results)
//! ```

pub use crate::query::{
    Group, GroupBy, Query, QueryItems, QueryResult, SortDirection, SortSpec, SortType,
};
pub use crate::record::Record;
pub use crate::value::{compare_values, Value};

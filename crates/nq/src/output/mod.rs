//! Output formatting utilities for the nq CLI.
//!
//! This module provides functions for formatting data as tables or JSON.
//! It is organized into submodules by what is printed:
//!
//! - [`results`] - Query results and optimizer plans
//! - [`formula`] - Per-record formula evaluations
//! - [`capabilities`] - Operators, functions and features
//! - [`helpers`] - Common formatting utilities (truncation, padding, timestamps)

mod capabilities;
mod formula;
pub mod helpers;
mod results;

pub use capabilities::format_capabilities_table;
pub use formula::{format_evaluations_table, RecordEvaluation};
pub use results::{format_plan_table, format_result_json, format_result_table};

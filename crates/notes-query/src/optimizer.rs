//! Advisory query planning.
//!
//! The optimizer inspects a parsed filter and reports what an index-backed
//! store could exploit. It never changes evaluation and never fails.

use serde::Serialize;

use crate::filter::{BinaryOperator, FilterExpr};

/// Properties a store is expected to index.
pub const INDEXED_PROPERTIES: &[&str] = &["title", "tags", "created", "modified", "path"];

/// Default collection size above which index hints are produced.
pub const DEFAULT_INDEX_THRESHOLD: usize = 100;

/// A comparison that an index on `property` could answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexHint {
    /// The indexed property.
    pub property: String,
    /// The comparison applied to it.
    pub operator: BinaryOperator,
}

/// The optimizer's view of one filter over one collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryPlan {
    /// First indexable comparison found, when the collection is large enough.
    pub index_hint: Option<IndexHint>,
    /// Relative cost estimate; grows with expression size and collection size.
    pub estimated_complexity: f64,
    /// Number of records the plan was computed for.
    pub collection_size: usize,
    /// Function calls in the expression.
    pub function_calls: usize,
    /// Comparison operators in the expression.
    pub comparisons: usize,
    /// `AND`/`OR`/`NOT` operators in the expression.
    pub logical_operators: usize,
}

#[derive(Debug, Default)]
struct Counts {
    function_calls: usize,
    comparisons: usize,
    logical_operators: usize,
    hint: Option<IndexHint>,
}

/// Computes [`QueryPlan`]s.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptimizer {
    index_threshold: usize,
}

impl Default for QueryOptimizer {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_THRESHOLD)
    }
}

impl QueryOptimizer {
    /// Creates an optimizer that emits index hints above `index_threshold` records.
    pub fn new(index_threshold: usize) -> Self {
        Self { index_threshold }
    }

    /// Plans `expr` over a collection of `collection_size` records.
    pub fn optimize(&self, expr: &FilterExpr, collection_size: usize) -> QueryPlan {
        let mut counts = Counts::default();
        walk(expr, &mut counts);

        let weight = counts.function_calls * 10 + counts.comparisons * 2 + counts.logical_operators + 1;
        let estimated_complexity = weight as f64 * ((collection_size + 1) as f64).ln();

        QueryPlan {
            index_hint: counts.hint.filter(|_| collection_size > self.index_threshold),
            estimated_complexity,
            collection_size,
            function_calls: counts.function_calls,
            comparisons: counts.comparisons,
            logical_operators: counts.logical_operators,
        }
    }
}

fn walk(expr: &FilterExpr, counts: &mut Counts) {
    match expr {
        FilterExpr::BinaryOp {
            operator,
            left,
            right,
        } => {
            if operator.is_logical() {
                counts.logical_operators += 1;
            } else {
                counts.comparisons += 1;
                if counts.hint.is_none() {
                    counts.hint = indexed_property(left).map(|property| IndexHint {
                        property: property.to_string(),
                        operator: *operator,
                    });
                }
            }
            walk(left, counts);
            walk(right, counts);
        }
        FilterExpr::UnaryOp { operand, .. } => {
            counts.logical_operators += 1;
            walk(operand, counts);
        }
        FilterExpr::FunctionCall { arguments, .. } => {
            counts.function_calls += 1;
            for argument in arguments {
                walk(argument, counts);
            }
        }
        FilterExpr::PropertyAccess { object, .. } => walk(object, counts),
        FilterExpr::Identifier(_) | FilterExpr::Literal(_) => {}
    }
}

/// Returns the indexed property named by `expr`: bare, `file.x` or `this.x`.
fn indexed_property(expr: &FilterExpr) -> Option<&str> {
    let name = match expr {
        FilterExpr::Identifier(name) => name.as_str(),
        FilterExpr::PropertyAccess { object, property } => match object.as_ref() {
            FilterExpr::Identifier(root) if root == "file" || root == "this" => property.as_str(),
            _ => return None,
        },
        _ => return None,
    };
    INDEXED_PROPERTIES.contains(&name).then_some(name)
}

//! Query execution.
//!
//! [`QueryEngine`] runs a [`Query`] over a slice of [`Record`]s:
//!
//! 1. validate the query
//! 2. return a cached result if one is still fresh
//! 3. parse and (optionally) plan the filter
//! 4. filter records in input order, turning evaluation errors into warnings
//! 5. sort, group, paginate
//! 6. cache and return the result
//!
//! # Example
//!
//! ```
//! use notes_model_rs::prelude::*;
//! use notes_query_rs::QueryEngine;
//!
//! let records = vec![
//!     Record::new("b", "b.md").with_tags(["work"]).with_content("beta"),
//!     Record::new("a", "a.md").with_tags(["work"]).with_content("alpha"),
//!     Record::new("c", "c.md").with_tags(["home"]),
//! ];
//! let query = Query::new()
//!     .with_filter(r#"taggedWith(file, "work")"#)
//!     .with_sort("title", SortDirection::Asc);
//!
//! let engine = QueryEngine::new();
//! let result = engine.execute(&records, &query).unwrap();
//!
//! let titles: Vec<&str> = result.items.records().map(|r| r.title.as_str()).collect();
//! assert_eq!(titles, vec!["a", "b"]);
//! assert_eq!(result.total_count, 2);
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::Instant;

use notes_model_rs::query::{
    Group, Query, QueryItems, QueryResult, SortDirection, SortSpec, SortType, UNGROUPED,
};
use notes_model_rs::value::{compare_values, Value};
use notes_model_rs::Record;
use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::ResultCache;
use crate::capabilities::Capabilities;
use crate::config::EngineConfig;
use crate::error::{
    ExecuteResult, FormulaError, ParseResult, QueryError, RegistrationError, ValidationError,
};
use crate::filter::{FilterContext, FilterEvaluator, FilterExpr, FilterFn, FilterParser, FilterRegistry};
use crate::formula::{FormulaEngine, FormulaExpr, FormulaFn};
use crate::optimizer::{QueryOptimizer, QueryPlan};
use crate::registry::RegisterOptions;

/// Runtime settings and counters reported by [`QueryEngine::stats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    /// Entries currently cached.
    pub cache_size: usize,
    /// Whether results are cached.
    pub cache_enabled: bool,
    /// Whether query plans are computed.
    pub optimization_enabled: bool,
    /// Cache capacity.
    pub max_cache_size: usize,
    /// Cache entry lifetime in milliseconds.
    pub cache_ttl_ms: u64,
    /// Slow-query threshold in milliseconds.
    pub max_execution_time_ms: u64,
}

/// Filters, sorts, groups and paginates record collections.
///
/// The engine owns its function tables and cache; it holds no global state,
/// and `execute` takes `&self`, so one engine can serve many threads.
#[derive(Debug)]
pub struct QueryEngine {
    config: EngineConfig,
    filters: FilterRegistry,
    formulas: FormulaEngine,
    optimizer: QueryOptimizer,
    cache: ResultCache,
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryEngine {
    /// Creates an engine with default settings and all built-in functions.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an engine with the given settings.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            filters: FilterRegistry::with_builtins(),
            formulas: FormulaEngine::new(),
            optimizer: QueryOptimizer::new(config.index_threshold),
            cache: ResultCache::new(config.cache_ttl(), config.max_cache_size),
            config,
        }
    }

    /// The engine's settings.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Executes `query` over `records`.
    ///
    /// Records whose filter evaluation fails are excluded and reported in
    /// [`QueryResult::warnings`].
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Validation`] for a malformed query and
    /// [`QueryError::Parse`] for a malformed filter.
    pub fn execute(&self, records: &[Record], query: &Query) -> ExecuteResult<QueryResult> {
        validate_query(query)?;

        let signature = query.signature();
        if self.config.enable_cache {
            if let Some(hit) = self.cache.get(&signature) {
                debug!(total = hit.total_count, "Query served from cache");
                return Ok(hit);
            }
            debug!("Query cache miss");
        }

        let started = Instant::now();
        let variables: BTreeMap<String, Value> = query
            .context
            .iter()
            .map(|(key, value)| (key.clone(), Value::from(value)))
            .collect();

        let (matched, warnings) = match parse_filter(query.filter.as_deref())? {
            Some(expr) => {
                if self.config.enable_optimization {
                    let plan = self.optimizer.optimize(&expr, records.len());
                    debug!(
                        complexity = plan.estimated_complexity,
                        index_hint = ?plan.index_hint,
                        "Query plan"
                    );
                }
                let context = FilterContext::new(&self.filters, &variables);
                let outcome = FilterEvaluator::new(&expr, &context).filter_records(records);
                (outcome.matched, outcome.warnings)
            }
            None => (records.iter().collect(), Vec::new()),
        };

        let total_count = matched.len();
        let sorted = sort_records(matched, &query.sort);
        let offset = query.offset.unwrap_or(0).max(0) as usize;
        let limit = query.limit.map_or(usize::MAX, |l| l.max(0) as usize);

        let items = match &query.group_by {
            Some(group_by) => QueryItems::Grouped(group_and_paginate(
                sorted,
                &group_by.property,
                offset,
                limit,
            )),
            None => QueryItems::Flat(
                sorted
                    .into_iter()
                    .skip(offset)
                    .take(limit)
                    .cloned()
                    .collect(),
            ),
        };

        let elapsed = started.elapsed();
        if elapsed > self.config.max_execution_time() {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                limit_ms = self.config.max_execution_time_ms,
                "Query exceeded max execution time"
            );
        }

        let result = QueryResult {
            items,
            total_count,
            execution_time_ms: elapsed.as_secs_f64() * 1000.0,
            from_cache: false,
            warnings,
        };
        debug!(
            total = result.total_count,
            returned = result.items.len(),
            elapsed_ms = result.execution_time_ms,
            "Query executed"
        );

        if self.config.enable_cache {
            self.cache.insert(signature, result.clone());
        }
        Ok(result)
    }

    /// Executes a query given as JSON.
    ///
    /// # Errors
    ///
    /// Besides the errors of [`execute`](Self::execute), returns
    /// [`ValidationError::NotAnObject`] when `query` is not an object and
    /// [`ValidationError::InvalidField`] when a field has the wrong type.
    pub fn execute_json(
        &self,
        records: &[Record],
        query: &serde_json::Value,
    ) -> ExecuteResult<QueryResult> {
        let query = query_from_json(query)?;
        self.execute(records, &query)
    }

    /// Returns the plan the optimizer computes for `filter` over `collection_size` records.
    pub fn explain(&self, filter: &str, collection_size: usize) -> ParseResult<QueryPlan> {
        let expr = FilterParser::parse(filter)?;
        Ok(self.optimizer.optimize(&expr, collection_size))
    }

    /// Parses a filter without running it.
    pub fn validate_filter(&self, filter: &str) -> ParseResult<FilterExpr> {
        FilterParser::parse(filter)
    }

    /// Parses a formula without running it.
    pub fn validate_formula(&self, formula: &str) -> ParseResult<FormulaExpr> {
        self.formulas.parse(formula)
    }

    /// Evaluates a formula against `variables`.
    pub fn evaluate_formula(
        &self,
        formula: &str,
        variables: &BTreeMap<String, Value>,
    ) -> Result<Value, FormulaError> {
        self.formulas.evaluate(formula, variables)
    }

    /// Evaluates a formula with `this` bound to `record`.
    ///
    /// The record's keys are visible as bare names after `variables`.
    pub fn evaluate_formula_for(
        &self,
        formula: &str,
        record: &Record,
        variables: &BTreeMap<String, Value>,
    ) -> Result<Value, FormulaError> {
        self.formulas
            .evaluate_with_this(formula, &record.to_value(), variables)
    }

    /// Registers a filter function. Cached results are discarded.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`] for an invalid name or a protected built-in.
    pub fn register_filter_function(
        &mut self,
        name: &str,
        function: Box<FilterFn>,
        options: RegisterOptions,
    ) -> Result<(), RegistrationError> {
        self.filters.register(name, function, options)?;
        debug!(name, "Registered filter function");
        self.cache.clear();
        Ok(())
    }

    /// Registers a formula function. Cached results are discarded.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`] for an invalid name or a protected built-in.
    pub fn register_formula_function(
        &mut self,
        name: &str,
        function: Box<FormulaFn>,
        options: RegisterOptions,
    ) -> Result<(), RegistrationError> {
        self.formulas.register_function(name, function, options)?;
        self.cache.clear();
        Ok(())
    }

    /// Lists operators, functions and enabled features.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::describe(&self.filters, self.formulas.functions(), &self.config)
    }

    /// Discards every cached result.
    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("Query cache cleared");
    }

    /// Current settings and cache occupancy.
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            cache_size: self.cache.len(),
            cache_enabled: self.config.enable_cache,
            optimization_enabled: self.config.enable_optimization,
            max_cache_size: self.config.max_cache_size,
            cache_ttl_ms: self.config.cache_ttl_ms,
            max_execution_time_ms: self.config.max_execution_time_ms,
        }
    }
}

// ==================== Validation ====================

fn validate_query(query: &Query) -> Result<(), ValidationError> {
    if let Some(limit) = query.limit {
        if limit < 1 {
            return Err(ValidationError::invalid_field("limit", "must be at least 1"));
        }
    }
    if let Some(offset) = query.offset {
        if offset < 0 {
            return Err(ValidationError::invalid_field("offset", "must not be negative"));
        }
    }
    for (i, spec) in query.sort.iter().enumerate() {
        if spec.property.trim().is_empty() {
            return Err(ValidationError::invalid_field(
                format!("sort[{}].property", i),
                "must not be empty",
            ));
        }
    }
    if let Some(group_by) = &query.group_by {
        if group_by.property.trim().is_empty() {
            return Err(ValidationError::invalid_field(
                "groupBy.property",
                "must not be empty",
            ));
        }
    }
    Ok(())
}

fn query_from_json(json: &serde_json::Value) -> Result<Query, ValidationError> {
    let Some(object) = json.as_object() else {
        return Err(ValidationError::NotAnObject {
            found: json_type_name(json).to_string(),
        });
    };

    if let Some(sort) = object.get("sort") {
        if !sort.is_array() && !sort.is_null() {
            return Err(ValidationError::invalid_field(
                "sort",
                format!("must be an array, got {}", json_type_name(sort)),
            ));
        }
    }

    // Explicit nulls mean "absent" for every field.
    let cleaned: serde_json::Map<String, serde_json::Value> = object
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    serde_json::from_value(serde_json::Value::Object(cleaned))
        .map_err(|err| ValidationError::invalid_field("query", err.to_string()))
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// A missing or blank filter selects every record.
fn parse_filter(filter: Option<&str>) -> ParseResult<Option<FilterExpr>> {
    match filter {
        Some(text) if !text.trim().is_empty() => FilterParser::parse(text).map(Some),
        _ => Ok(None),
    }
}

// ==================== Sorting ====================

/// Stable multi-key sort. Keys are resolved once per record.
fn sort_records<'a>(records: Vec<&'a Record>, specs: &[SortSpec]) -> Vec<&'a Record> {
    if specs.is_empty() {
        return records;
    }

    let mut keyed: Vec<(Vec<Value>, &Record)> = records
        .into_iter()
        .map(|record| {
            let value = record.to_value();
            let keys = specs
                .iter()
                .map(|spec| coerce(value.resolve_path(&spec.property), spec.sort_type))
                .collect();
            (keys, record)
        })
        .collect();

    keyed.sort_by(|(a, _), (b, _)| {
        specs
            .iter()
            .zip(a.iter().zip(b))
            .map(|(spec, (x, y))| {
                let ordering = compare_sort_keys(x, y, spec.sort_type);
                match spec.direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            })
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });

    keyed.into_iter().map(|(_, record)| record).collect()
}

/// Applies an explicit sort type. Values without a reading of that type become `Null`.
fn coerce(value: Value, sort_type: Option<SortType>) -> Value {
    match sort_type {
        None => value,
        Some(SortType::Number) => value.to_number().map_or(Value::Null, Value::Number),
        Some(SortType::Date) => value.to_date().map_or(Value::Null, Value::Date),
        Some(SortType::String) if value.is_null() => Value::Null,
        Some(SortType::String) => Value::Text(value.to_text().to_lowercase()),
    }
}

fn compare_sort_keys(a: &Value, b: &Value, sort_type: Option<SortType>) -> Ordering {
    match (sort_type, a, b) {
        // Text keys compare lexically even when both look numeric.
        (Some(SortType::String), Value::Text(x), Value::Text(y)) => x.cmp(y),
        _ => compare_values(a, b),
    }
}

// ==================== Grouping ====================

fn group_key(record: &Record, property: &str) -> String {
    let text = record.to_value().resolve_path(property).to_text();
    if text.trim().is_empty() {
        UNGROUPED.to_string()
    } else {
        text
    }
}

/// Buckets records in first-seen order, then takes the page `[offset, offset + limit)`
/// of the bucket-ordered sequence. Buckets left empty by the page are dropped.
fn group_and_paginate(records: Vec<&Record>, property: &str, offset: usize, limit: usize) -> Vec<Group> {
    let mut buckets: Vec<(String, Vec<&Record>)> = Vec::new();
    for record in records {
        let key = group_key(record, property);
        match buckets.iter_mut().find(|(k, _)| *k == key) {
            Some((_, items)) => items.push(record),
            None => buckets.push((key, vec![record])),
        }
    }

    let mut skip = offset;
    let mut remaining = limit;
    let mut groups = Vec::new();
    for (key, items) in buckets {
        if remaining == 0 {
            break;
        }
        if skip >= items.len() {
            skip -= items.len();
            continue;
        }
        let page: Vec<Record> = items
            .into_iter()
            .skip(skip)
            .take(remaining)
            .cloned()
            .collect();
        skip = 0;
        remaining -= page.len();
        groups.push(Group { key, items: page });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EvalError, EvalResult};
    use serde_json::json;

    fn make_record(title: &str, priority: i64) -> Record {
        Record::new(title, format!("{}.md", title)).with_property("priority", priority)
    }

    fn titles(result: &QueryResult) -> Vec<String> {
        result.items.records().map(|r| r.title.clone()).collect()
    }

    fn sample() -> Vec<Record> {
        vec![
            make_record("c", 2).with_property("team", "red"),
            make_record("a", 1).with_property("team", "blue"),
            make_record("d", 2).with_property("team", "red"),
            make_record("b", 3),
        ]
    }

    #[test]
    fn test_no_filter_returns_everything_in_input_order() {
        let engine = QueryEngine::new();
        let result = engine.execute(&sample(), &Query::new()).unwrap();
        assert_eq!(titles(&result), vec!["c", "a", "d", "b"]);
        assert_eq!(result.total_count, 4);
        assert!(!result.from_cache);
    }

    #[test]
    fn test_blank_filter_matches_all() {
        let engine = QueryEngine::new();
        let result = engine.execute(&sample(), &Query::new().with_filter("  ")).unwrap();
        assert_eq!(result.total_count, 4);
    }

    #[test]
    fn test_sort_is_stable_across_keys() {
        let engine = QueryEngine::new();
        let query = Query::new().with_sort("priority", SortDirection::Desc);
        let result = engine.execute(&sample(), &query).unwrap();
        // c and d tie on priority and keep their input order.
        assert_eq!(titles(&result), vec!["b", "c", "d", "a"]);

        let query = Query::new()
            .with_sort("priority", SortDirection::Desc)
            .with_sort("title", SortDirection::Desc);
        let result = engine.execute(&sample(), &query).unwrap();
        assert_eq!(titles(&result), vec!["b", "d", "c", "a"]);
    }

    #[test]
    fn test_typed_sort() {
        let records = vec![
            Record::new("x", "x.md").with_property("code", "10"),
            Record::new("y", "y.md").with_property("code", "9"),
            Record::new("z", "z.md"),
        ];
        let engine = QueryEngine::with_config(EngineConfig {
            enable_cache: false,
            ..EngineConfig::default()
        });

        let numeric = Query::new().with_typed_sort("code", SortDirection::Asc, SortType::Number);
        assert_eq!(titles(&engine.execute(&records, &numeric).unwrap()), vec!["z", "y", "x"]);

        let text = Query::new().with_typed_sort("code", SortDirection::Asc, SortType::String);
        assert_eq!(titles(&engine.execute(&records, &text).unwrap()), vec!["z", "x", "y"]);
    }

    #[test]
    fn test_sort_by_dotted_path() {
        let engine = QueryEngine::new();
        let query = Query::new().with_sort("properties.priority", SortDirection::Asc);
        let result = engine.execute(&sample(), &query).unwrap();
        assert_eq!(titles(&result), vec!["a", "c", "d", "b"]);
    }

    #[test]
    fn test_pagination() {
        let engine = QueryEngine::new();
        let query = Query::new()
            .with_sort("title", SortDirection::Asc)
            .with_offset(1)
            .with_limit(2);
        let result = engine.execute(&sample(), &query).unwrap();
        assert_eq!(titles(&result), vec!["b", "c"]);
        assert_eq!(result.total_count, 4);

        let beyond = Query::new().with_offset(10);
        let result = engine.execute(&sample(), &beyond).unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.total_count, 4);
    }

    #[test]
    fn test_grouping_in_first_seen_order() {
        let engine = QueryEngine::new();
        let query = Query::new().with_group_by("team");
        let result = engine.execute(&sample(), &query).unwrap();
        let groups = result.items.groups().unwrap();

        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["red", "blue", UNGROUPED]);
        assert_eq!(groups[0].items.len(), 2);
    }

    #[test]
    fn test_grouped_pagination_drops_empty_buckets() {
        let engine = QueryEngine::new();
        let query = Query::new().with_group_by("team").with_offset(2).with_limit(1);
        let result = engine.execute(&sample(), &query).unwrap();
        let groups = result.items.groups().unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].key, "blue");
        assert_eq!(result.items.len(), 1);
    }

    #[test]
    fn test_filter_uses_context_variables() {
        let engine = QueryEngine::new();
        let query = Query::new()
            .with_filter("priority >= minPriority")
            .with_context("minPriority", 2);
        let result = engine.execute(&sample(), &query).unwrap();
        assert_eq!(titles(&result), vec!["c", "d", "b"]);
    }

    #[test]
    fn test_parse_error_surfaces() {
        let engine = QueryEngine::new();
        let err = engine
            .execute(&sample(), &Query::new().with_filter("priority >"))
            .unwrap_err();
        assert!(matches!(err, QueryError::Parse(_)));
    }

    #[test]
    fn test_validation_errors() {
        let engine = QueryEngine::new();
        let cases = [
            (Query::new().with_limit(0), "limit"),
            (Query::new().with_offset(-1), "offset"),
            (Query::new().with_sort(" ", SortDirection::Asc), "sort[0].property"),
            (Query::new().with_group_by(""), "groupBy.property"),
        ];
        for (query, expected) in cases {
            match engine.execute(&sample(), &query) {
                Err(QueryError::Validation(ValidationError::InvalidField { field, .. })) => {
                    assert_eq!(field, expected)
                }
                other => panic!("expected validation error for {}, got {:?}", expected, other),
            }
        }
    }

    #[test]
    fn test_execute_json() {
        let engine = QueryEngine::new();
        let result = engine
            .execute_json(
                &sample(),
                &json!({"filter": "priority == 2", "sort": [{"property": "title", "direction": "desc"}], "limit": null}),
            )
            .unwrap();
        assert_eq!(titles(&result), vec!["d", "c"]);
    }

    #[test]
    fn test_execute_json_rejects_bad_shapes() {
        let engine = QueryEngine::new();
        assert_eq!(
            engine.execute_json(&sample(), &json!([1, 2])).unwrap_err(),
            QueryError::Validation(ValidationError::NotAnObject {
                found: "array".to_string()
            })
        );
        assert!(matches!(
            engine.execute_json(&sample(), &json!({"sort": "title"})),
            Err(QueryError::Validation(ValidationError::InvalidField { ref field, .. })) if field == "sort"
        ));
        assert!(matches!(
            engine.execute_json(&sample(), &json!({"limit": "ten"})),
            Err(QueryError::Validation(ValidationError::InvalidField { .. }))
        ));
    }

    #[test]
    fn test_cache_round_trip() {
        let engine = QueryEngine::new();
        let query = Query::new().with_sort("title", SortDirection::Asc);

        let first = engine.execute(&sample(), &query).unwrap();
        let second = engine.execute(&sample(), &query).unwrap();
        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.items, second.items);
        assert_eq!(engine.stats().cache_size, 1);

        engine.clear_cache();
        assert_eq!(engine.stats().cache_size, 0);
        assert!(!engine.execute(&sample(), &query).unwrap().from_cache);
    }

    #[test]
    fn test_cache_disabled() {
        let engine = QueryEngine::with_config(EngineConfig {
            enable_cache: false,
            ..EngineConfig::default()
        });
        engine.execute(&sample(), &Query::new()).unwrap();
        assert!(!engine.execute(&sample(), &Query::new()).unwrap().from_cache);
        assert_eq!(engine.stats().cache_size, 0);
    }

    #[test]
    fn test_registering_function_clears_cache() {
        let mut engine = QueryEngine::new();
        engine.execute(&sample(), &Query::new()).unwrap();
        assert_eq!(engine.stats().cache_size, 1);

        engine
            .register_filter_function(
                "isHigh",
                Box::new(|file: &Value, _: &[Value]| -> EvalResult<Value> {
                    Ok(Value::Bool(file.get_property("priority").to_number_or_zero() >= 3.0))
                }),
                RegisterOptions::default(),
            )
            .unwrap();
        assert_eq!(engine.stats().cache_size, 0);

        let result = engine
            .execute(&sample(), &Query::new().with_filter("isHigh(file)"))
            .unwrap();
        assert_eq!(titles(&result), vec!["b"]);
        assert!(engine.capabilities().filter_functions.contains(&"isHigh".to_string()));
    }

    #[test]
    fn test_failing_records_become_warnings() {
        let mut engine = QueryEngine::new();
        engine
            .register_filter_function(
                "strict",
                Box::new(|file: &Value, _: &[Value]| -> EvalResult<Value> {
                    match file.get_property("team") {
                        Value::Null => Err(EvalError::invalid_argument("strict", "no team")),
                        team => Ok(Value::Bool(team.to_text() == "red")),
                    }
                }),
                RegisterOptions::default(),
            )
            .unwrap();
        let result = engine
            .execute(&sample(), &Query::new().with_filter("strict(file)"))
            .unwrap();
        assert_eq!(titles(&result), vec!["c", "d"]);
        assert_eq!(result.warnings, vec!["b.md: strict: no team"]);
    }

    #[test]
    fn test_formula_for_record() {
        let engine = QueryEngine::new();
        let record = make_record("note", 4).with_content("one two three");
        let value = engine
            .evaluate_formula_for("wordCount * priority", &record, &BTreeMap::new())
            .unwrap();
        assert_eq!(value, Value::Number(12.0));
    }

    #[test]
    fn test_explain() {
        let engine = QueryEngine::new();
        let plan = engine.explain("title == 'a'", 1000).unwrap();
        assert_eq!(plan.index_hint.unwrap().property, "title");
        assert!(engine.explain("title ==", 10).is_err());
    }

    #[test]
    fn test_stats_reflect_config() {
        let stats = QueryEngine::new().stats();
        assert!(stats.cache_enabled);
        assert!(stats.optimization_enabled);
        assert_eq!(stats.max_cache_size, 100);
        assert_eq!(stats.cache_ttl_ms, 300_000);
        assert_eq!(stats.max_execution_time_ms, 5000);
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QueryEngine>();
    }
}

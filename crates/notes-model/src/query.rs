//! Query configuration and result types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Label used for records whose group-by property is absent or empty.
pub const UNGROUPED: &str = "Ungrouped";

/// A query over a collection of records.
///
/// The wire format is camelCase JSON. The `context` map is ordered, so the
/// serialized form of two equal queries is byte-identical; the executor uses
/// it as the cache signature.
///
/// # Examples
///
/// ```
/// use notes_model_rs::query::{Query, SortDirection};
///
/// let query = Query::new()
///     .with_filter(r#"taggedWith(file, "work")"#)
///     .with_sort("modified", SortDirection::Desc)
///     .with_limit(10);
///
/// assert_eq!(query.limit, Some(10));
/// assert_eq!(query.sort.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// Filter expression selecting records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Sort keys, most significant first.
    #[serde(default)]
    pub sort: Vec<SortSpec>,

    /// Optional grouping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<GroupBy>,

    /// Maximum number of records to return (at least 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,

    /// Number of records to skip (not negative).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,

    /// Extra variables visible to the filter expression.
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl Query {
    /// Creates an empty query matching every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter expression.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Appends a sort key.
    pub fn with_sort(mut self, property: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(SortSpec::new(property, direction));
        self
    }

    /// Appends a sort key with an explicit coercion type.
    pub fn with_typed_sort(
        mut self,
        property: impl Into<String>,
        direction: SortDirection,
        sort_type: SortType,
    ) -> Self {
        self.sort.push(SortSpec {
            sort_type: Some(sort_type),
            ..SortSpec::new(property, direction)
        });
        self
    }

    /// Groups results by a property.
    pub fn with_group_by(mut self, property: impl Into<String>) -> Self {
        self.group_by = Some(GroupBy {
            property: property.into(),
        });
        self
    }

    /// Sets the page size.
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the page offset.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Adds a context variable.
    pub fn with_context(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Returns the canonical serialization used as the cache key.
    pub fn signature(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Property name or dotted path.
    pub property: String,

    /// Sort direction.
    #[serde(default)]
    pub direction: SortDirection,

    /// Optional explicit coercion applied before comparing.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub sort_type: Option<SortType>,
}

impl SortSpec {
    /// Creates a sort key without explicit coercion.
    pub fn new(property: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            property: property.into(),
            direction,
            sort_type: None,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    #[serde(alias = "ascending")]
    Asc,
    /// Largest first.
    #[serde(alias = "descending")]
    Desc,
}

/// Explicit coercion for a sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortType {
    /// Compare as numbers (non-numeric values sort as absent).
    Number,
    /// Compare as instants (unparseable values sort as absent).
    Date,
    /// Compare as case-insensitive text.
    #[serde(alias = "text")]
    String,
}

/// Grouping configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBy {
    /// Property name or dotted path to bucket by.
    pub property: String,
}

/// The outcome of executing a query.
///
/// Built fresh per execution; a snapshot retrieved from the cache is
/// returned with `from_cache` set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// The page of records, flat or grouped.
    pub items: QueryItems,

    /// Number of records that passed the filter, before pagination.
    pub total_count: usize,

    /// Wall-clock execution time in milliseconds.
    pub execution_time_ms: f64,

    /// Whether the result was served from the cache.
    pub from_cache: bool,

    /// Per-record evaluation problems; the affected records were excluded.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Records in a result, either as a flat list or as ordered buckets.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QueryItems {
    /// Ungrouped records in sort order.
    Flat(Vec<Record>),
    /// Buckets in first-seen order.
    Grouped(Vec<Group>),
}

impl QueryItems {
    /// Returns the number of records across all buckets.
    pub fn len(&self) -> usize {
        match self {
            QueryItems::Flat(records) => records.len(),
            QueryItems::Grouped(groups) => groups.iter().map(|g| g.items.len()).sum(),
        }
    }

    /// Returns true if there are no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over all records, bucket by bucket when grouped.
    pub fn records(&self) -> Box<dyn Iterator<Item = &Record> + '_> {
        match self {
            QueryItems::Flat(records) => Box::new(records.iter()),
            QueryItems::Grouped(groups) => Box::new(groups.iter().flat_map(|g| g.items.iter())),
        }
    }

    /// Returns the records if the result is not grouped.
    pub fn as_flat(&self) -> Option<&[Record]> {
        match self {
            QueryItems::Flat(records) => Some(records),
            QueryItems::Grouped(_) => None,
        }
    }

    /// Returns the buckets if the result is grouped.
    pub fn groups(&self) -> Option<&[Group]> {
        match self {
            QueryItems::Flat(_) => None,
            QueryItems::Grouped(groups) => Some(groups),
        }
    }
}

/// A bucket of records sharing one group-by value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    /// The stringified property value, or [`UNGROUPED`].
    pub key: String,
    /// Records in sort order.
    pub items: Vec<Record>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_deserialize_camel_case() {
        let json = r#"{
            "filter": "isMarkdown(file)",
            "sort": [{"property": "title", "direction": "desc", "type": "string"}],
            "groupBy": {"property": "folder"},
            "limit": 5,
            "offset": 2,
            "context": {"min": 3}
        }"#;
        let query: Query = serde_json::from_str(json).unwrap();

        assert_eq!(query.filter.as_deref(), Some("isMarkdown(file)"));
        assert_eq!(query.sort[0].direction, SortDirection::Desc);
        assert_eq!(query.sort[0].sort_type, Some(SortType::String));
        assert_eq!(query.group_by.unwrap().property, "folder");
        assert_eq!(query.limit, Some(5));
        assert_eq!(query.offset, Some(2));
        assert_eq!(query.context["min"], serde_json::json!(3));
    }

    #[test]
    fn test_sort_direction_defaults_to_asc() {
        let spec: SortSpec = serde_json::from_str(r#"{"property": "title"}"#).unwrap();
        assert_eq!(spec.direction, SortDirection::Asc);
        assert!(spec.sort_type.is_none());

        let spec: SortSpec =
            serde_json::from_str(r#"{"property": "title", "direction": "descending"}"#).unwrap();
        assert_eq!(spec.direction, SortDirection::Desc);
    }

    #[test]
    fn test_signature_is_canonical() {
        let a = Query::new()
            .with_context("b", 2)
            .with_context("a", 1)
            .with_limit(3);
        let b = Query::new()
            .with_context("a", 1)
            .with_context("b", 2)
            .with_limit(3);
        assert_eq!(a.signature(), b.signature());
        assert_ne!(a.signature(), b.with_limit(4).signature());
    }

    #[test]
    fn test_query_items_len() {
        let flat = QueryItems::Flat(vec![Record::default(), Record::default()]);
        assert_eq!(flat.len(), 2);
        assert!(flat.groups().is_none());

        let grouped = QueryItems::Grouped(vec![
            Group {
                key: "a".to_string(),
                items: vec![Record::default()],
            },
            Group {
                key: UNGROUPED.to_string(),
                items: vec![Record::default(), Record::default()],
            },
        ]);
        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped.records().count(), 3);
        assert!(grouped.as_flat().is_none());
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = QueryResult {
            items: QueryItems::Flat(vec![]),
            total_count: 0,
            execution_time_ms: 1.5,
            from_cache: true,
            warnings: vec![],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totalCount"], 0);
        assert_eq!(json["fromCache"], true);
        assert!(json.get("warnings").is_none());
    }
}

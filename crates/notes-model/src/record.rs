//! The queryable note/file record.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Keys produced by [`Record::to_value`]. Frontmatter properties with one of
/// these names are only reachable through `properties.<name>`.
pub const RECORD_KEYS: &[&str] = &[
    "title",
    "name",
    "tags",
    "content",
    "path",
    "folder",
    "extension",
    "created",
    "modified",
    "size",
    "links",
    "wordCount",
    "properties",
];

/// One note or file, as supplied by the storage layer.
///
/// Records are read-only to the query engine. Tags are stored as given and
/// normalized to lower case (without a leading `#`) when matched.
///
/// # Examples
///
/// ```
/// use notes_model_rs::Record;
///
/// let record = Record::new("Meeting", "work/meeting.md")
///     .with_tags(["Work", "#meetings"])
///     .with_content("Discussed [[Roadmap]] and [[Budget|the budget]].");
///
/// assert!(record.has_tag("work"));
/// assert!(record.has_tag("MEETINGS"));
/// assert_eq!(record.links(), vec!["Roadmap", "Budget"]);
/// assert_eq!(record.folder(), "work");
/// assert_eq!(record.extension(), "md");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Display title of the note.
    #[serde(default)]
    pub title: String,

    /// Tags attached to the note.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Text body.
    #[serde(default)]
    pub content: String,

    /// Path of the note, using `/` separators.
    #[serde(default)]
    pub path: String,

    /// Creation time.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "timestamp::deserialize"
    )]
    pub created: Option<DateTime<Utc>>,

    /// Last modification time.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "timestamp::deserialize"
    )]
    pub modified: Option<DateTime<Utc>>,

    /// Size in bytes. Derived from the content length when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Extra frontmatter-style properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl Record {
    /// Creates a record with a title and path and everything else empty.
    pub fn new(title: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Replaces the tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Sets the creation time.
    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    /// Sets the modification time.
    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Sets an explicit size in bytes.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Adds a frontmatter property.
    pub fn with_property(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Returns the tags lower-cased, without a leading `#`, deduplicated in order.
    pub fn normalized_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in &self.tags {
            let normalized = normalize_tag(tag);
            if !normalized.is_empty() && !tags.contains(&normalized) {
                tags.push(normalized);
            }
        }
        tags
    }

    /// Returns true if the record carries the tag (case-insensitive, `#` optional).
    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = normalize_tag(tag);
        self.tags.iter().any(|t| normalize_tag(t) == wanted)
    }

    /// Returns the size in bytes, falling back to the content length.
    pub fn effective_size(&self) -> u64 {
        self.size.unwrap_or(self.content.len() as u64)
    }

    /// Returns the number of whitespace-separated words in the content.
    pub fn word_count(&self) -> usize {
        self.content.split_whitespace().count()
    }

    /// Returns the lower-cased file extension, or an empty string.
    pub fn extension(&self) -> String {
        Path::new(&self.path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default()
    }

    /// Returns the directory part of the path, or an empty string at the root.
    pub fn folder(&self) -> String {
        match self.path.trim_start_matches("./").rfind('/') {
            Some(idx) => self.path.trim_start_matches("./")[..idx].to_string(),
            None => String::new(),
        }
    }

    /// Returns the file stem, falling back to the title.
    pub fn name(&self) -> String {
        Path::new(&self.path)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| self.title.clone())
    }

    /// Returns the link targets found in the content, in order of first appearance.
    ///
    /// Recognizes wiki links (`[[target]]`, `[[target|alias]]`, `[[target#heading]]`)
    /// and local markdown links (`[text](target.md)`). External URLs are skipped.
    pub fn links(&self) -> Vec<String> {
        let mut links: Vec<String> = Vec::new();
        let mut push = |target: &str| {
            let target = target.trim();
            if !target.is_empty() && !links.iter().any(|l| l == target) {
                links.push(target.to_string());
            }
        };

        let mut rest = self.content.as_str();
        while let Some(start) = rest.find("[[") {
            let after = &rest[start + 2..];
            let Some(end) = after.find("]]") else {
                break;
            };
            let inner = &after[..end];
            let target = inner.split('|').next().unwrap_or_default();
            let target = target.split('#').next().unwrap_or_default();
            push(target);
            rest = &after[end + 2..];
        }

        let mut rest = self.content.as_str();
        while let Some(start) = rest.find("](") {
            let after = &rest[start + 2..];
            let Some(end) = after.find(')') else {
                break;
            };
            let target = &after[..end];
            let is_external = ["http://", "https://", "mailto:"]
                .iter()
                .any(|scheme| target.starts_with(scheme));
            if !is_external {
                push(target.split('#').next().unwrap_or_default());
            }
            rest = &after[end + 1..];
        }

        links
    }

    /// Renders the record as a [`Value::Object`] for expression evaluation.
    ///
    /// Properties are available under `properties` and, when their name does
    /// not clash with one of [`RECORD_KEYS`], flattened at the top level.
    pub fn to_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert("title".to_string(), Value::from(self.title.as_str()));
        map.insert("name".to_string(), Value::from(self.name()));
        map.insert(
            "tags".to_string(),
            Value::List(self.normalized_tags().into_iter().map(Value::from).collect()),
        );
        map.insert("content".to_string(), Value::from(self.content.as_str()));
        map.insert("path".to_string(), Value::from(self.path.as_str()));
        map.insert("folder".to_string(), Value::from(self.folder()));
        map.insert("extension".to_string(), Value::from(self.extension()));
        map.insert("created".to_string(), Value::from(self.created));
        map.insert("modified".to_string(), Value::from(self.modified));
        map.insert(
            "size".to_string(),
            Value::Number(self.effective_size() as f64),
        );
        map.insert(
            "links".to_string(),
            Value::List(self.links().into_iter().map(Value::from).collect()),
        );
        map.insert("wordCount".to_string(), Value::from(self.word_count()));

        let properties: BTreeMap<String, Value> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v)))
            .collect();
        for (key, value) in &properties {
            if !RECORD_KEYS.contains(&key.as_str()) {
                map.insert(key.clone(), value.clone());
            }
        }
        map.insert("properties".to_string(), Value::Object(properties));

        Value::Object(map)
    }
}

/// Lower-cases a tag and strips a leading `#`.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('#').to_lowercase()
}

mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};

    use crate::value::{parse_date, Value};

    /// Accepts RFC 3339 strings, `YYYY-MM-DD` dates and epoch milliseconds.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        match raw {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::String(s)) => parse_date(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {s}"))),
            Some(other) => Value::from(other)
                .to_date()
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom("invalid timestamp")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_deserialize_minimal() {
        let record: Record = serde_json::from_str(r#"{"title": "Inbox"}"#).unwrap();
        assert_eq!(record.title, "Inbox");
        assert!(record.tags.is_empty());
        assert!(record.created.is_none());
        assert_eq!(record.effective_size(), 0);
    }

    #[test]
    fn test_record_deserialize_timestamps() {
        let json = r#"{
            "title": "Log",
            "created": "2024-02-01",
            "modified": 1706745600000
        }"#;
        let record: Record = serde_json::from_str(json).unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(record.created, Some(expected));
        assert_eq!(record.modified, Some(expected));
    }

    #[test]
    fn test_record_deserialize_rejects_bad_timestamp() {
        let result: Result<Record, _> = serde_json::from_str(r#"{"created": "yesterday"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_normalized_tags_dedup() {
        let record = Record::new("t", "t.md").with_tags(["Work", "#work", "Ideas", " "]);
        assert_eq!(record.normalized_tags(), vec!["work", "ideas"]);
    }

    #[test]
    fn test_size_derived_from_content() {
        let record = Record::new("t", "t.md").with_content("hello");
        assert_eq!(record.effective_size(), 5);
        assert_eq!(record.with_size(1024).effective_size(), 1024);
    }

    #[test]
    fn test_word_count() {
        let record = Record::new("t", "t.md").with_content("one  two\nthree\t four");
        assert_eq!(record.word_count(), 4);
    }

    #[test]
    fn test_folder_and_extension() {
        let record = Record::new("Plan", "projects/2024/Plan.MD");
        assert_eq!(record.folder(), "projects/2024");
        assert_eq!(record.extension(), "md");
        assert_eq!(record.name(), "Plan");

        let root = Record::new("Root", "root.txt");
        assert_eq!(root.folder(), "");
        assert_eq!(root.extension(), "txt");
    }

    #[test]
    fn test_links_skip_external_urls() {
        let record = Record::new("t", "t.md").with_content(
            "See [[Alpha#Intro]], [beta](notes/beta.md) and [site](https://example.com). [[Alpha]] again.",
        );
        assert_eq!(record.links(), vec!["Alpha", "notes/beta.md"]);
    }

    #[test]
    fn test_links_unterminated() {
        let record = Record::new("t", "t.md").with_content("broken [[link");
        assert!(record.links().is_empty());
    }

    #[test]
    fn test_to_value_flattens_properties() {
        let record = Record::new("Spec", "docs/spec.md")
            .with_tags(["Draft"])
            .with_property("status", "review")
            .with_property("title", "shadowed");
        let value = record.to_value();

        assert_eq!(value.get("title"), Some(&Value::from("Spec")));
        assert_eq!(value.get("status"), Some(&Value::from("review")));
        assert_eq!(
            value.resolve_path("properties.title"),
            Value::from("shadowed")
        );
        assert_eq!(
            value.get("tags"),
            Some(&Value::List(vec![Value::from("draft")]))
        );
        assert_eq!(value.get("created"), Some(&Value::Null));
    }
}

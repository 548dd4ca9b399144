//! Record loading for the nq CLI.
//!
//! A source is either a JSON file holding an array of records or a directory
//! of notes. Directories are scanned recursively for `.md`, `.markdown` and
//! `.txt` files; hidden entries are skipped.
//!
//! A note's title comes from its file stem and its timestamps and size from
//! file metadata. A leading `---` block is read as YAML frontmatter: its
//! `tags` entry (a list or a comma separated string) joins the `#hashtags`
//! found in the body, and every other entry becomes a property.

use std::collections::BTreeMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use notes_model_rs::record::normalize_tag;
use notes_model_rs::Record;
use serde_yaml::{Mapping, Value as YamlValue};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// File extensions recognized as notes.
pub const NOTE_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// Errors raised while loading records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The source path does not exist.
    #[error("source not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A file or directory could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A JSON source is not an array of records.
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for record loading.
pub type Result<T> = std::result::Result<T, StoreError>;

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Loads every record from `source`.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] when `source` does not exist,
/// [`StoreError::Io`] when it cannot be read and [`StoreError::Decode`] when
/// a JSON source is malformed.
pub async fn load_records(source: &Path) -> Result<Vec<Record>> {
    let metadata = match fs::metadata(source).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound(source.to_path_buf()))
        }
        Err(e) => return Err(io_error(source)(e)),
    };

    let records = if metadata.is_dir() {
        load_directory(source).await?
    } else {
        load_json(source).await?
    };

    debug!(source = %source.display(), count = records.len(), "Loaded records");
    Ok(records)
}

async fn load_json(path: &Path) -> Result<Vec<Record>> {
    let content = fs::read_to_string(path).await.map_err(io_error(path))?;
    serde_json::from_str(&content).map_err(|source| StoreError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

async fn load_directory(root: &Path) -> Result<Vec<Record>> {
    let walk_root = root.to_path_buf();
    let mut files = tokio::task::spawn_blocking(move || collect_note_paths(&walk_root))
        .await
        .map_err(|e| StoreError::Io {
            path: root.to_path_buf(),
            source: io::Error::new(io::ErrorKind::Other, e),
        })??;

    // Directory iteration order is platform dependent.
    files.sort();

    let mut records = Vec::with_capacity(files.len());
    for path in files {
        records.push(read_note(root, &path).await?);
    }
    Ok(records)
}

/// Walks `root` for note files, pruning hidden files and directories.
fn collect_note_paths(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.path()));

    for entry in walker {
        let entry = entry.map_err(|e| StoreError::Io {
            path: e.path().unwrap_or(root).to_path_buf(),
            source: e.into(),
        })?;
        if is_note_file(&entry) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_note_file(entry: &DirEntry) -> bool {
    entry.file_type().is_file() && is_note(entry.path())
}

async fn read_note(root: &Path, path: &Path) -> Result<Record> {
    let text = fs::read_to_string(path).await.map_err(io_error(path))?;
    let metadata = fs::metadata(path).await.map_err(io_error(path))?;

    let title = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let (frontmatter, body) = split_frontmatter(&text);
    let frontmatter = match frontmatter.map(parse_frontmatter).transpose() {
        Ok(parsed) => parsed.unwrap_or_default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring malformed frontmatter");
            Frontmatter::default()
        }
    };

    let mut tags = frontmatter.tags;
    tags.extend(extract_hashtags(body));
    let tags = dedup_tags(tags);

    Ok(Record {
        title,
        tags,
        content: body.to_string(),
        path: relative_path(root, path),
        created: metadata.created().ok().map(DateTime::<Utc>::from),
        modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        size: Some(metadata.len()),
        properties: frontmatter.properties,
    })
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.'))
}

fn is_note(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            NOTE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

/// Renders `path` relative to `root` with `/` separators.
fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Splits a leading `---` block from the body.
///
/// Returns the frontmatter text (without delimiters) and the remaining body.
/// Text without a closed block is returned whole as the body.
pub(crate) fn split_frontmatter(text: &str) -> (Option<&str>, &str) {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return (None, text);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }
    (None, text)
}

#[derive(Debug, Default)]
pub(crate) struct Frontmatter {
    pub(crate) tags: Vec<String>,
    pub(crate) properties: BTreeMap<String, serde_json::Value>,
}

/// Parses a YAML frontmatter block.
///
/// `tags` (in any case) feeds the tag list. Other entries become properties
/// converted to JSON; null entries and keys that are not scalars are dropped.
pub(crate) fn parse_frontmatter(
    text: &str,
) -> std::result::Result<Frontmatter, serde_yaml::Error> {
    let mut frontmatter = Frontmatter::default();
    if text.trim().is_empty() {
        return Ok(frontmatter);
    }

    let mapping: Mapping = serde_yaml::from_str(text)?;
    for (key, value) in mapping {
        let Some(key) = scalar_key(&key) else {
            debug!(?key, "Skipping frontmatter entry with a non-scalar key");
            continue;
        };

        if key.eq_ignore_ascii_case("tags") {
            frontmatter.tags.extend(yaml_tags(&value));
            continue;
        }

        match serde_json::to_value(&value) {
            Ok(serde_json::Value::Null) => {}
            Ok(json) => {
                frontmatter.properties.insert(key, json);
            }
            Err(e) => debug!(key = %key, error = %e, "Skipping frontmatter entry"),
        }
    }

    Ok(frontmatter)
}

fn scalar_key(key: &YamlValue) -> Option<String> {
    match key {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Reads tags from a YAML sequence or a comma/space separated string.
fn yaml_tags(value: &YamlValue) -> Vec<String> {
    match value {
        YamlValue::Sequence(items) => items
            .iter()
            .filter_map(|item| match item {
                YamlValue::String(s) => Some(s.clone()),
                YamlValue::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .flat_map(|item| parse_tag_list(&item))
            .collect(),
        YamlValue::String(s) => parse_tag_list(s),
        YamlValue::Number(n) => vec![n.to_string()],
        _ => Vec::new(),
    }
}

fn parse_tag_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(|tag| tag.trim().trim_start_matches('#'))
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collects `#tag` words from a note body.
///
/// A tag starts at a `#` that begins the text or follows whitespace, and runs
/// over letters, digits, `_`, `-` and `/`. Markdown headings (`# Title`) and
/// purely numeric words (`#1`) are not tags.
pub(crate) fn extract_hashtags(body: &str) -> Vec<String> {
    let mut tags = Vec::new();
    let mut previous: Option<char> = None;
    let mut chars = body.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let at_boundary = previous.map_or(true, char::is_whitespace);
        previous = Some(c);
        if c != '#' || !at_boundary {
            continue;
        }

        let mut end = start + c.len_utf8();
        while let Some(&(i, next)) = chars.peek() {
            if next.is_alphanumeric() || matches!(next, '_' | '-' | '/') {
                end = i + next.len_utf8();
                previous = Some(next);
                chars.next();
            } else {
                break;
            }
        }

        let tag = &body[start + 1..end];
        if tag.chars().any(|ch| !ch.is_ascii_digit()) {
            tags.push(tag.to_string());
        }
    }

    tags
}

/// Drops tags that normalize to one already seen, keeping first spellings.
fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = Vec::new();
    let mut unique = Vec::new();
    for tag in tags {
        let normalized = normalize_tag(&tag);
        if normalized.is_empty() || seen.contains(&normalized) {
            continue;
        }
        seen.push(normalized);
        unique.push(tag);
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use tempfile::TempDir;

    #[test]
    fn test_split_frontmatter() {
        let text = "---\ntags: [a, b]\nstatus: draft\n---\nBody text\n";
        let (front, body) = split_frontmatter(text);
        assert_eq!(front, Some("tags: [a, b]\nstatus: draft\n"));
        assert_eq!(body, "Body text\n");
    }

    #[test]
    fn test_split_frontmatter_unclosed_is_body() {
        let text = "---\ntags: a\nno closing line";
        assert_eq!(split_frontmatter(text), (None, text));
        assert_eq!(split_frontmatter("plain"), (None, "plain"));
    }

    #[test]
    fn test_parse_frontmatter() {
        let front = parse_frontmatter(
            "tags: [work, \"planning\"]\npriority: 2\nratio: 0.5\ndone: false\ntitle: 'Q3'\nempty:\n",
        )
        .unwrap();
        assert_eq!(front.tags, vec!["work", "planning"]);
        assert_eq!(front.properties["priority"], serde_json::json!(2));
        assert_eq!(front.properties["ratio"], serde_json::json!(0.5));
        assert_eq!(front.properties["done"], serde_json::json!(false));
        assert_eq!(front.properties["title"], serde_json::json!("Q3"));
        assert!(!front.properties.contains_key("empty"));
    }

    #[test]
    fn test_parse_frontmatter_block_list_tags() {
        let front = parse_frontmatter("tags:\n  - work\n  - home\nstatus: draft\n").unwrap();
        assert_eq!(front.tags, vec!["work", "home"]);
        assert_eq!(front.properties["status"], serde_json::json!("draft"));
        assert!(!front.properties.contains_key("tags"));
    }

    #[test]
    fn test_parse_frontmatter_nested_and_quoted_values() {
        let front = parse_frontmatter(
            "project:\n  name: Atlas\n  stage: 2\naliases:\n  - one\n  - \"two: three\"\nnote: \"a # not a comment\"\n",
        )
        .unwrap();
        assert_eq!(
            front.properties["project"],
            serde_json::json!({"name": "Atlas", "stage": 2})
        );
        assert_eq!(
            front.properties["aliases"],
            serde_json::json!(["one", "two: three"])
        );
        assert_eq!(front.properties["note"], serde_json::json!("a # not a comment"));
    }

    #[test]
    fn test_parse_frontmatter_string_tags_and_empty_block() {
        let front = parse_frontmatter("Tags: work, planning\n").unwrap();
        assert_eq!(front.tags, vec!["work", "planning"]);

        let front = parse_frontmatter("\n").unwrap();
        assert!(front.tags.is_empty());
        assert!(front.properties.is_empty());
    }

    #[test]
    fn test_parse_frontmatter_rejects_invalid_yaml() {
        assert!(parse_frontmatter("tags: [unclosed\n").is_err());
        assert!(parse_frontmatter("- just\n- a list\n").is_err());
    }

    #[test]
    fn test_parse_tag_list_forms() {
        assert_eq!(parse_tag_list(" a, b "), vec!["a", "b"]);
        assert_eq!(parse_tag_list("#a #b"), vec!["a", "b"]);
        assert_eq!(parse_tag_list(""), Vec::<String>::new());
    }

    #[test]
    fn test_extract_hashtags() {
        let body = "# Heading\nSome #work and #project/alpha.\nnot#tag #1 ##double #_x";
        assert_eq!(
            extract_hashtags(body),
            vec!["work", "project/alpha", "_x"]
        );
    }

    #[test]
    fn test_extract_hashtags_unicode() {
        assert_eq!(extract_hashtags("#café time"), vec!["café"]);
    }

    #[test]
    fn test_dedup_tags_is_case_insensitive() {
        let tags = dedup_tags(vec!["Work".into(), "work".into(), "#work".into(), "home".into()]);
        assert_eq!(tags, vec!["Work", "home"]);
    }

    #[test]
    fn test_is_note() {
        assert!(is_note(Path::new("a/b.md")));
        assert!(is_note(Path::new("a/b.MARKDOWN")));
        assert!(is_note(Path::new("b.txt")));
        assert!(!is_note(Path::new("b.json")));
        assert!(!is_note(Path::new("README")));
    }

    #[test]
    fn test_relative_path_uses_forward_slashes() {
        let root = Path::new("/notes");
        let path = Path::new("/notes").join("work").join("plan.md");
        assert_eq!(relative_path(root, &path), "work/plan.md");
    }

    #[tokio::test]
    async fn test_load_directory() {
        let dir = TempDir::new().unwrap();
        std_fs::create_dir_all(dir.path().join("work")).unwrap();
        std_fs::create_dir_all(dir.path().join(".obsidian")).unwrap();
        std_fs::write(
            dir.path().join("work/roadmap.md"),
            "---\ntags: planning\npriority: 2\n---\nQ3 goals #work and [[Budget]]\n",
        )
        .unwrap();
        std_fs::write(dir.path().join("journal.txt"), "dear diary").unwrap();
        std_fs::write(dir.path().join("data.json"), "{}").unwrap();
        std_fs::write(dir.path().join(".obsidian/hidden.md"), "#secret").unwrap();
        std_fs::create_dir_all(dir.path().join("work/.trash")).unwrap();
        std_fs::write(dir.path().join("work/.trash/old.md"), "gone").unwrap();
        std_fs::write(dir.path().join("work/.draft.md"), "hidden file").unwrap();

        let records = load_records(dir.path()).await.unwrap();
        assert_eq!(records.len(), 2);

        let journal = &records[0];
        assert_eq!(journal.title, "journal");
        assert_eq!(journal.path, "journal.txt");
        assert_eq!(journal.size, Some(10));
        assert!(journal.modified.is_some());

        let roadmap = &records[1];
        assert_eq!(roadmap.title, "roadmap");
        assert_eq!(roadmap.path, "work/roadmap.md");
        assert_eq!(roadmap.tags, vec!["planning", "work"]);
        assert_eq!(roadmap.content, "Q3 goals #work and [[Budget]]\n");
        assert_eq!(roadmap.properties["priority"], serde_json::json!(2));
        assert_eq!(roadmap.folder(), "work");
    }

    #[tokio::test]
    async fn test_load_directory_yaml_frontmatter() {
        let dir = TempDir::new().unwrap();
        std_fs::write(
            dir.path().join("trip.md"),
            "---\ntags:\n  - travel\n  - Home\nstatus: draft\n---\nPacking list #home\n",
        )
        .unwrap();
        std_fs::write(
            dir.path().join("broken.md"),
            "---\ntags: [unclosed\n---\nStill loads #kept\n",
        )
        .unwrap();

        let records = load_records(dir.path()).await.unwrap();
        assert_eq!(records.len(), 2);

        let broken = &records[0];
        assert_eq!(broken.title, "broken");
        assert_eq!(broken.tags, vec!["kept"]);
        assert!(broken.properties.is_empty());

        let trip = &records[1];
        assert_eq!(trip.tags, vec!["travel", "Home"]);
        assert_eq!(trip.properties["status"], serde_json::json!("draft"));
        assert_eq!(trip.content, "Packing list #home\n");
    }

    #[tokio::test]
    async fn test_load_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.json");
        std_fs::write(
            &path,
            r#"[{"title": "One", "path": "a/one.md", "tags": ["x"], "modified": "2024-05-01"}]"#,
        )
        .unwrap();

        let records = load_records(&path).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "One");
        assert_eq!(records[0].tags, vec!["x"]);
    }

    #[tokio::test]
    async fn test_load_missing_source() {
        let dir = TempDir::new().unwrap();
        let err = load_records(&dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_load_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.json");
        std_fs::write(&path, r#"{"title": "not an array"}"#).unwrap();

        let err = load_records(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Decode { .. }));
    }
}

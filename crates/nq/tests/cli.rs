//! End-to-end tests for the `nq` binary.
//!
//! Each test builds a small notes directory in a temp dir and points
//! `NQ_CONFIG` at a file inside it, so the user's own config is never read.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let notes = dir.path().join("notes");
        fs::create_dir_all(notes.join("work")).unwrap();
        fs::create_dir_all(notes.join("home")).unwrap();

        fs::write(
            notes.join("work/roadmap.md"),
            "---\ntags: [planning]\npriority: 2\n---\nQ3 goals #work and [[Budget]]\n",
        )
        .unwrap();
        fs::write(
            notes.join("work/budget.md"),
            "---\npriority: 1\n---\n#work\n",
        )
        .unwrap();
        fs::write(notes.join("home/groceries.txt"), "eggs milk #home").unwrap();
        fs::write(notes.join("home/journal.md"), "").unwrap();

        Self { dir }
    }

    fn notes(&self) -> PathBuf {
        self.dir.path().join("notes")
    }

    fn config_path(&self) -> PathBuf {
        self.dir.path().join("config").join("config.toml")
    }

    fn nq(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_nq"))
            .args(args)
            .env("NQ_CONFIG", self.config_path())
            .env_remove("NQ_LOG")
            .env("NO_COLOR", "1")
            .output()
            .unwrap()
    }
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn stderr_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stderr).unwrap()
}

fn titles(items: &Value) -> Vec<String> {
    items
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_query_directory_as_json() {
    let ws = Workspace::new();
    let notes = path_arg(&ws.notes());
    let output = ws.nq(&[
        "--json",
        "query",
        &notes,
        "--filter",
        "taggedWith(file, 'work') AND NOT isEmpty(file)",
        "--sort",
        "title",
    ]);

    let json = stdout_json(&output);
    assert_eq!(json["totalCount"], 2);
    assert_eq!(json["fromCache"], false);
    assert_eq!(titles(&json["items"]), vec!["budget", "roadmap"]);
}

#[test]
fn test_query_sort_paginate_and_vars() {
    let ws = Workspace::new();
    let notes = path_arg(&ws.notes());
    let output = ws.nq(&[
        "--json",
        "query",
        &notes,
        "--filter",
        "priority >= min",
        "--var",
        "min=1",
        "--sort",
        "priority:desc:number",
        "--limit",
        "1",
    ]);

    let json = stdout_json(&output);
    assert_eq!(json["totalCount"], 2);
    assert_eq!(titles(&json["items"]), vec!["roadmap"]);
}

#[test]
fn test_query_group_by_folder() {
    let ws = Workspace::new();
    let notes = path_arg(&ws.notes());
    let output = ws.nq(&["--json", "query", &notes, "--sort", "path", "--group-by", "folder"]);

    let json = stdout_json(&output);
    let keys: Vec<&str> = json["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["home", "work"]);
}

#[test]
fn test_query_table_output() {
    let ws = Workspace::new();
    let notes = path_arg(&ws.notes());
    let output = ws.nq(&["query", &notes, "--filter", "inFolder(file, 'home')"]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("Title"));
    assert!(stdout.contains("groceries"));
    assert!(stdout.contains("journal"));
    assert!(stdout.contains("2 of 2 records"));
}

#[test]
fn test_query_yaml_block_list_tags() {
    let ws = Workspace::new();
    fs::write(
        ws.notes().join("home/trip.md"),
        "---\ntags:\n  - travel\n  - summer\nstatus: draft\n---\nPacking list\n",
    )
    .unwrap();
    let notes = path_arg(&ws.notes());
    let output = ws.nq(&[
        "--json",
        "query",
        &notes,
        "--filter",
        "taggedWith(file, 'summer') AND status == 'draft'",
    ]);

    assert_eq!(titles(&stdout_json(&output)["items"]), vec!["trip"]);
}

#[test]
fn test_query_from_json_file() {
    let ws = Workspace::new();
    let file = ws.dir.path().join("records.json");
    fs::write(
        &file,
        r#"[
            {"title": "A", "path": "a.md", "tags": ["x"]},
            {"title": "B", "path": "b.md"}
        ]"#,
    )
    .unwrap();

    let output = ws.nq(&["--json", "query", &path_arg(&file), "--filter", "taggedWith(file, 'x')"]);
    assert_eq!(titles(&stdout_json(&output)["items"]), vec!["A"]);
}

#[test]
fn test_query_explain() {
    let ws = Workspace::new();
    let notes = path_arg(&ws.notes());
    let output = ws.nq(&["--json", "query", &notes, "--filter", "title == 'x'", "--explain"]);

    let json = stdout_json(&output);
    assert_eq!(json["collectionSize"], 4);
    assert_eq!(json["comparisons"], 1);
}

#[test]
fn test_bad_filter_reports_position() {
    let ws = Workspace::new();
    let notes = path_arg(&ws.notes());
    let output = ws.nq(&["--json", "query", &notes, "--filter", "a == (1"]);

    assert_eq!(output.status.code(), Some(1));
    let json = stderr_json(&output);
    assert_eq!(json["error"]["code"], "PARSE_ERROR");
    assert!(json["error"]["position"].is_u64());
}

#[test]
fn test_invalid_limit_is_validation_error() {
    let ws = Workspace::new();
    let notes = path_arg(&ws.notes());
    let output = ws.nq(&["--json", "query", &notes, "--limit", "0"]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stderr_json(&output)["error"]["code"], "VALIDATION_ERROR");
}

#[test]
fn test_missing_source_exits_with_io_code() {
    let ws = Workspace::new();
    let missing = path_arg(&ws.dir.path().join("nope"));
    let output = ws.nq(&["query", &missing]);

    assert_eq!(output.status.code(), Some(3));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.starts_with("Error: source not found"));
}

#[test]
fn test_formula_evaluation() {
    let ws = Workspace::new();

    let output = ws.nq(&["formula", "1 + 2 * 3"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout).unwrap().trim(), "7");

    let output = ws.nq(&["--json", "formula", "x + y", "--var", "x=a", "--var", "y=1"]);
    assert_eq!(stdout_json(&output)["value"], "a1");
}

#[test]
fn test_formula_division_by_zero() {
    let ws = Workspace::new();
    let output = ws.nq(&["--json", "formula", "10/0"]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stderr_json(&output)["error"]["code"], "EVAL_ERROR");
}

#[test]
fn test_formula_per_record() {
    let ws = Workspace::new();
    let notes = path_arg(&ws.notes());
    let output = ws.nq(&[
        "--json",
        "formula",
        "upper(title) + ':' + wordCount",
        "--record",
        &notes,
        "--title",
        "Roadmap",
    ]);

    let json = stdout_json(&output);
    let results = json.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["value"], "ROADMAP:5");
}

#[test]
fn test_check_prints_canonical_form() {
    let ws = Workspace::new();

    let output = ws.nq(&["check", "formula", "1 + 2 * 3"]);
    assert_eq!(
        String::from_utf8(output.stdout).unwrap().trim(),
        "(1 + (2 * 3))"
    );

    let output = ws.nq(&["--json", "check", "filter", "a == 1 && b"]);
    let json = stdout_json(&output);
    assert_eq!(json["language"], "filter");
    assert_eq!(json["valid"], true);
}

#[test]
fn test_functions_lists_capabilities() {
    let ws = Workspace::new();
    let output = ws.nq(&["--json", "functions"]);

    let json = stdout_json(&output);
    let filter_functions = json["capabilities"]["filterFunctions"].as_array().unwrap();
    assert!(filter_functions.contains(&Value::from("taggedWith")));
    assert_eq!(json["stats"]["cacheEnabled"], true);
}

#[test]
fn test_config_set_path_and_engine_settings() {
    let ws = Workspace::new();

    let output = ws.nq(&["config", "path"]);
    assert_eq!(
        String::from_utf8(output.stdout).unwrap().trim(),
        path_arg(&ws.config_path())
    );

    let output = ws.nq(&["config", "set", "engine.enable_cache", "false"]);
    assert!(output.status.success());
    assert!(ws.config_path().exists());

    let output = ws.nq(&["--json", "functions"]);
    let json = stdout_json(&output);
    assert_eq!(json["stats"]["cacheEnabled"], false);
    let features = json["capabilities"]["features"].as_array().unwrap();
    assert!(!features.contains(&Value::from("cache")));
}

#[test]
fn test_config_errors_exit_with_config_code() {
    let ws = Workspace::new();

    let output = ws.nq(&["config", "set", "engine.nope", "1"]);
    assert_eq!(output.status.code(), Some(5));

    fs::create_dir_all(ws.config_path().parent().unwrap()).unwrap();
    fs::write(ws.config_path(), "[engine\n").unwrap();
    let output = ws.nq(&["functions"]);
    assert_eq!(output.status.code(), Some(5));
}

#[test]
fn test_completions() {
    let ws = Workspace::new();
    let output = ws.nq(&["completions", "bash"]);

    assert!(output.status.success());
    assert!(String::from_utf8(output.stdout).unwrap().contains("nq"));
}

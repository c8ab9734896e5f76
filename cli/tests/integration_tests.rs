//! End-to-end tests for the `rowmap` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_rowmap");

/// Writes a two-table configuration pointing at `state.db` in `dir`.
fn write_config(dir: &Path, version: u32, alters: &[&str]) -> PathBuf {
    let alters: Vec<String> = alters.iter().map(|a| format!("      - \"{a}\"")).collect();
    let alters = if alters.is_empty() {
        "    alters: []".to_string()
    } else {
        format!("    alters:\n{}", alters.join("\n"))
    };
    let yaml = format!(
        r#"location: {db}
version: {version}
tables:
  - name: tasks
    version: {version}
    create: "CREATE TABLE tasks (id INTEGER PRIMARY KEY, title TEXT NOT NULL, done INTEGER NOT NULL DEFAULT 0)"
{alters}
    columns:
      - {{ column: id, attribute: id, converter: integer }}
      - {{ column: title, attribute: title, converter: text }}
      - {{ column: done, attribute: done, converter: boolean }}
  - name: settings
    id_column: key
    create: "CREATE TABLE settings (key TEXT PRIMARY KEY, value TEXT)"
    columns:
      - {{ column: key, attribute: key, converter: text }}
      - {{ column: value, attribute: value, converter: text }}
"#,
        db = dir.join("state.db").display(),
    );
    let path = dir.join("store.yml");
    std::fs::write(&path, yaml).expect("failed to write config");
    path
}

fn rowmap(config: &Path, args: &[&str]) -> Output {
    let (command, rest) = args.split_first().expect("command required");
    Command::new(BIN)
        .arg(command)
        .arg("--config")
        .arg(config)
        .args(rest)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run rowmap")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "rowmap failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

// ---------------------------------------------------------------------------
// migrate / status
// ---------------------------------------------------------------------------

#[test]
fn migrate_creates_tables_and_sets_version() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), 1, &[]);

    let out = stdout(&rowmap(&config, &["migrate"]));
    assert!(out.contains("version 1"), "{out}");
    assert!(out.contains("settings, tasks"), "{out}");

    let out = stdout(&rowmap(&config, &["status"]));
    assert!(out.contains("Version: 1"), "{out}");
    assert!(out.contains("tasks: 0 rows"), "{out}");
}

#[test]
fn migrate_applies_alters_on_version_bump() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), 1, &[]);
    stdout(&rowmap(&config, &["migrate"]));

    let config = write_config(
        dir.path(),
        2,
        &["ALTER TABLE tasks ADD COLUMN note TEXT"],
    );
    let out = stdout(&rowmap(&config, &["migrate"]));
    assert!(out.contains("version 2"), "{out}");

    let out = stdout(&rowmap(
        &config,
        &["exec", "UPDATE tasks SET note = ? WHERE id = ?", "--param", "x", "--param", "1"],
    ));
    assert_eq!(out, "OK");
}

#[test]
fn migrate_refuses_downgrade() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), 2, &[]);
    stdout(&rowmap(&config, &["migrate"]));

    let config = write_config(dir.path(), 1, &[]);
    let output = rowmap(&config, &["migrate"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("downgrade"), "{stderr}");
}

// ---------------------------------------------------------------------------
// CRUD commands
// ---------------------------------------------------------------------------

#[test]
fn insert_get_query_count_delete() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), 1, &[]);

    assert_eq!(stdout(&rowmap(&config, &["insert", "tasks", r#"{"title": "a"}"#])), "1");
    assert_eq!(
        stdout(&rowmap(&config, &["insert", "tasks", r#"{"title": "b", "done": true}"#])),
        "2"
    );

    let out = stdout(&rowmap(&config, &["get", "tasks", "2"]));
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json, serde_json::json!({"id": 2, "title": "b", "done": 1}));

    let out = stdout(&rowmap(
        &config,
        &["query", "tasks", "--where", "WHERE done = ?", "--param", "0"],
    ));
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(json, serde_json::json!([{"id": 1, "title": "a", "done": 0}]));

    assert_eq!(stdout(&rowmap(&config, &["count", "tasks"])), "2");
    assert_eq!(stdout(&rowmap(&config, &["delete", "tasks", "1"])), "1");
    assert_eq!(stdout(&rowmap(&config, &["count", "tasks"])), "1");
}

#[test]
fn text_ids_and_yaml_output() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), 1, &[]);
    stdout(&rowmap(
        &config,
        &["insert", "settings", r#"{"key": "theme", "value": "dark"}"#],
    ));

    let out = stdout(&rowmap(&config, &["get", "settings", "theme", "--format", "yaml"]));
    assert!(out.contains("value: dark"), "{out}");
}

#[test]
fn get_missing_row_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), 1, &[]);
    let output = rowmap(&config, &["get", "tasks", "99"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No row in 'tasks'"));
}

#[test]
fn unknown_table_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), 1, &[]);
    let output = rowmap(&config, &["query", "ghosts"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ghosts"));
}

#[test]
fn insert_rejects_non_object() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), 1, &[]);
    let output = rowmap(&config, &["insert", "tasks", "[1, 2]"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("JSON object"));
}

#[test]
fn missing_config_fails() {
    let dir = TempDir::new().unwrap();
    let output = rowmap(&dir.path().join("nope.yml"), &["migrate"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load configuration"));
}

//! Integration tests for the rowmap-sqlite crate.

use std::sync::Arc;

use rowmap_core::{
    ColumnSpec, EngineError, LifecycleHook, NoopLifecycle, Record, ShutdownHooks, Store, StoreConfig,
    StoreError, TableSchema, Value, converters,
};
use rowmap_sqlite::{MEMORY_LOCATION, SqliteEngine, SqliteOptions};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Task {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    title: String,
    done: i64,
}

fn tasks_v1() -> TableSchema {
    TableSchema::new("tasks")
        .create_sql("CREATE TABLE tasks (id INTEGER PRIMARY KEY, title TEXT NOT NULL, done INTEGER NOT NULL DEFAULT 0)")
        .column(ColumnSpec::mapped("id", "id", converters::integer()))
        .column(ColumnSpec::mapped("title", "title", converters::text()))
        .column(ColumnSpec::mapped("done", "done", converters::boolean()))
}

fn tasks_v2() -> TableSchema {
    tasks_v1()
        .migration("ALTER TABLE tasks ADD COLUMN created_at TEXT")
        .version(2)
        .column(ColumnSpec::mapped("created_at", "createdAt", converters::timestamp()))
}

fn memory_store(schemas: &[TableSchema]) -> Store<SqliteEngine> {
    let store = Store::new(SqliteEngine::default(), Arc::new(NoopLifecycle));
    store.initialize(MEMORY_LOCATION, schemas, 1).unwrap();
    store
}

fn db_path(dir: &TempDir) -> String {
    dir.path().join("state.db").to_string_lossy().into_owned()
}

// ---------------------------------------------------------------------------
// CRUD round trips
// ---------------------------------------------------------------------------

#[test]
fn test_insert_select_update_delete() {
    let store = memory_store(&[tasks_v1()]);

    let id = store
        .insert("tasks", Some(&Record::new().with("title", "water plants")))
        .into_result()
        .unwrap();
    assert_eq!(id, 1);

    let task = store.select_by_id("tasks", id).into_value().unwrap();
    assert_eq!(
        task,
        Record::new()
            .with("id", 1)
            .with("title", "water plants")
            .with("done", 0)
    );

    assert_eq!(
        store
            .update_by_id("tasks", id, Some(&Record::new().with("done", true)))
            .into_value(),
        1
    );
    let task = store.select_by_id("tasks", id).into_value().unwrap();
    assert_eq!(task.get("done"), Some(&Value::Integer(1)));
    assert_eq!(task.get("title"), Some(&Value::from("water plants")));

    assert_eq!(store.delete_by_id("tasks", id).into_value(), Some(1));
    assert_eq!(store.select_by_id("tasks", id).into_value(), None);
    assert_eq!(store.delete_by_id("tasks", id).into_value(), Some(0));
}

#[test]
fn test_update_missing_row_affects_nothing() {
    let store = memory_store(&[tasks_v1()]);
    let outcome = store.update_by_id("tasks", 42, Some(&Record::new().with("title", "x")));
    assert!(outcome.is_ok());
    assert_eq!(outcome.into_value(), 0);
}

#[test]
fn test_query_and_count() {
    let store = memory_store(&[tasks_v1()]);
    for (title, done) in [("a", 0), ("b", 1), ("c", 1)] {
        store
            .insert("tasks", Some(&Record::new().with("title", title).with("done", done)))
            .into_result()
            .unwrap();
    }

    let all = store.query("tasks", None, &[]).into_value();
    assert_eq!(all.len(), 3);

    let done = store
        .query("tasks", Some("WHERE done = ? ORDER BY title DESC"), &[Value::Integer(1)])
        .into_value();
    let titles: Vec<&str> = done.iter().filter_map(|t| t.get("title")?.as_str()).collect();
    assert_eq!(titles, vec!["c", "b"]);

    assert_eq!(store.count("tasks", None, &[]).into_value(), 3);
    assert_eq!(
        store
            .count("tasks", Some("WHERE done = ?"), &[Value::Integer(1)])
            .into_value(),
        2
    );
    assert_eq!(
        store
            .count("tasks", Some("WHERE title = ?"), &[Value::from("zzz")])
            .into_value(),
        0
    );
}

#[test]
fn test_bad_where_clause_returns_neutral_values() {
    let store = memory_store(&[tasks_v1()]);
    let outcome = store.query("tasks", Some("WHERE nope = 1"), &[]);
    assert!(outcome.value().is_empty());
    assert!(matches!(outcome.error(), Some(StoreError::Engine(EngineError::Database(_)))));
    assert_eq!(store.count("tasks", Some("WHERE nope = 1"), &[]).into_value(), 0);
}

#[test]
fn test_raw_query_raw_count_exec_sql() {
    let store = memory_store(&[tasks_v1()]);
    store
        .exec_sql(
            "INSERT INTO tasks (title, done) VALUES (?, ?)",
            &[Value::from("a"), Value::Integer(1)],
        )
        .unwrap();
    store
        .exec_sql("INSERT INTO tasks (title) VALUES ('b'); INSERT INTO tasks (title) VALUES ('c');", &[])
        .unwrap();

    let by_state = store
        .raw_query(
            "SELECT done, COUNT(*) FROM tasks GROUP BY done ORDER BY done",
            &[],
            |row| Ok((converters::boolean()(row, 0)?, converters::integer()(row, 1)?)),
        )
        .into_value();
    assert_eq!(
        by_state,
        vec![
            (Value::Integer(0), Value::Integer(2)),
            (Value::Integer(1), Value::Integer(1)),
        ]
    );

    assert_eq!(
        store
            .raw_count("SELECT COUNT(*) FROM tasks WHERE title != ?", &[Value::from("a")])
            .into_value(),
        2
    );
    assert_eq!(store.raw_count("SELECT 1 WHERE 0", &[]).into_value(), 0);

    let err = store.exec_sql("INSERT INTO nowhere VALUES (1)", &[]).unwrap_err();
    assert!(matches!(err, StoreError::Engine(EngineError::Database(_))));
}

#[test]
fn test_typed_models() {
    let store = memory_store(&[tasks_v1()]);
    let id = store
        .insert_model("tasks", &Task { id: None, title: "read".into(), done: 0 })
        .into_value();
    let task: Task = store.select_model_by_id("tasks", id).into_value().unwrap();
    assert_eq!(task, Task { id: Some(id), title: "read".into(), done: 0 });

    store
        .update_model_by_id("tasks", id, &Task { id: None, title: "read again".into(), done: 1 })
        .into_result()
        .unwrap();
    let tasks: Vec<Task> = store.query_models("tasks", None, &[]).into_value();
    assert_eq!(tasks, vec![Task { id: Some(id), title: "read again".into(), done: 1 }]);
}

#[test]
fn test_non_default_id_column() {
    let schema = TableSchema::new("settings")
        .create_sql("CREATE TABLE settings (key TEXT PRIMARY KEY, value TEXT)")
        .id_column("key")
        .column(ColumnSpec::mapped("key", "key", converters::text()))
        .column(ColumnSpec::mapped("value", "value", converters::text()));
    let store = memory_store(&[schema]);

    store
        .insert("settings", Some(&Record::new().with("key", "theme").with("value", "dark")))
        .into_result()
        .unwrap();
    store
        .update_by_id("settings", "theme", Some(&Record::new().with("value", "light")))
        .into_result()
        .unwrap();
    let setting = store.select_by_id("settings", "theme").into_value().unwrap();
    assert_eq!(setting.get("value"), Some(&Value::from("light")));
    assert_eq!(store.delete_by_id("settings", "theme").into_value(), Some(1));
}

// ---------------------------------------------------------------------------
// Versioning
// ---------------------------------------------------------------------------

#[test]
fn test_reopen_applies_migrations() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);

    let store = Store::new(SqliteEngine::default(), Arc::new(NoopLifecycle));
    store.initialize(&path, &[tasks_v1()], 1).unwrap();
    store
        .insert("tasks", Some(&Record::new().with("title", "old")))
        .into_result()
        .unwrap();
    store.teardown();

    store.initialize(&path, &[tasks_v2()], 2).unwrap();
    assert_eq!(store.registry().version(), Some(2));
    let old = store.select_by_id("tasks", 1).into_value().unwrap();
    assert_eq!(old.get("title"), Some(&Value::from("old")));
    assert_eq!(old.get("createdAt"), Some(&Value::Null));

    let id = store
        .insert(
            "tasks",
            Some(&Record::new().with("title", "new").with("createdAt", "1970-01-01 00:00:01")),
        )
        .into_value();
    let new = store.select_by_id("tasks", id).into_value().unwrap();
    assert_eq!(new.get("createdAt"), Some(&Value::Integer(1000)));
}

#[test]
fn test_reopen_same_version_keeps_data() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let store = Store::new(SqliteEngine::default(), Arc::new(NoopLifecycle));

    store.initialize(&path, &[tasks_v1()], 1).unwrap();
    store
        .insert("tasks", Some(&Record::new().with("title", "keep")))
        .into_result()
        .unwrap();
    store.initialize(&path, &[tasks_v1()], 1).unwrap();
    assert_eq!(store.count("tasks", None, &[]).into_value(), 1);
}

#[test]
fn test_version_zero_creates_tables() {
    let store = Store::new(SqliteEngine::default(), Arc::new(NoopLifecycle));
    store.initialize(MEMORY_LOCATION, &[tasks_v1()], 0).unwrap();
    assert_eq!(store.registry().version(), Some(1));

    let id = store.insert("tasks", Some(&Record::new().with("title", "write docs")));
    assert!(id.is_ok(), "{:?}", id.error());
    assert_eq!(store.count("tasks", None, &[]).into_value(), 1);
}

#[test]
fn test_downgrade_fails_initialize() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let store = Store::new(SqliteEngine::default(), Arc::new(NoopLifecycle));

    store.initialize(&path, &[tasks_v2()], 2).unwrap();
    store.teardown();
    let err = store.initialize(&path, &[tasks_v1()], 1).unwrap_err();
    assert!(matches!(
        err,
        StoreError::Engine(EngineError::Downgrade { stored: 2, requested: 1 })
    ));
    assert!(!store.registry().is_initialized());
}

#[test]
fn test_failed_migration_keeps_previous_version() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let store = Store::new(SqliteEngine::default(), Arc::new(NoopLifecycle));
    store.initialize(&path, &[tasks_v1()], 1).unwrap();
    store.teardown();

    let broken = tasks_v1().migration("ALTER TABLE missing ADD COLUMN x TEXT").version(2);
    assert!(store.initialize(&path, &[broken], 2).is_err());

    store.initialize(&path, &[tasks_v1()], 1).unwrap();
    assert_eq!(store.registry().version(), Some(1));
}

// ---------------------------------------------------------------------------
// Lifecycle and configuration
// ---------------------------------------------------------------------------

#[test]
fn test_shutdown_hooks_close_connection() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let hooks = Arc::new(ShutdownHooks::new());
    let store = Store::new(
        SqliteEngine::default(),
        Arc::clone(&hooks) as Arc<dyn LifecycleHook>,
    );
    store.initialize(&path, &[tasks_v1()], 1).unwrap();

    hooks.run();
    assert!(!store.registry().is_initialized());
    assert_eq!(store.count("tasks", None, &[]).into_value(), 0);
    assert!(matches!(
        store.count("tasks", None, &[]).error(),
        Some(StoreError::NotInitialized)
    ));
}

#[test]
fn test_store_from_yaml_config() {
    let dir = TempDir::new().unwrap();
    let yaml = format!(
        r#"
location: {}
version: 2
sqlite:
  journal_mode: wal
tables:
  - name: users
    version: 2
    create: "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)"
    alters:
      - "ALTER TABLE users ADD COLUMN email TEXT"
    columns:
      - {{ column: id, attribute: id, converter: integer }}
      - {{ column: name, attribute: name, converter: text }}
      - {{ column: email, attribute: email, converter: text }}
"#,
        db_path(&dir)
    );
    let config = StoreConfig::from_yaml_str(&yaml).unwrap();
    let store = Store::new(SqliteEngine::new(config.sqlite.clone()), Arc::new(NoopLifecycle));
    store
        .initialize(&config.location, &config.to_schemas(), config.version)
        .unwrap();

    let id = store
        .insert(
            "users",
            Some(&Record::new().with("name", "Alice").with("email", "alice@example.com")),
        )
        .into_value();
    let user = store.select_by_id("users", id).into_value().unwrap();
    assert_eq!(user.get("email"), Some(&Value::from("alice@example.com")));
}

#[test]
fn test_foreign_keys_option() {
    let parent = TableSchema::new("lists")
        .create_sql("CREATE TABLE lists (id INTEGER PRIMARY KEY)")
        .column(ColumnSpec::mapped("id", "id", converters::integer()));
    let child = TableSchema::new("items")
        .create_sql("CREATE TABLE items (id INTEGER PRIMARY KEY, list_id INTEGER NOT NULL REFERENCES lists(id))")
        .column(ColumnSpec::mapped("id", "id", converters::integer()))
        .column(ColumnSpec::mapped("list_id", "listId", converters::integer()));

    let enforced = memory_store(&[parent.clone(), child.clone()]);
    assert_eq!(
        enforced
            .insert("items", Some(&Record::new().with("listId", 9)))
            .into_value(),
        -1
    );

    let relaxed = Store::new(
        SqliteEngine::new(SqliteOptions {
            foreign_keys: false,
            journal_mode: None,
        }),
        Arc::new(NoopLifecycle),
    );
    relaxed.initialize(MEMORY_LOCATION, &[parent, child], 1).unwrap();
    assert_eq!(
        relaxed
            .insert("items", Some(&Record::new().with("listId", 9)))
            .into_value(),
        1
    );
}

//! Typed CRUD workflow against an in-memory SQLite store.
//!
//! Declares a `tasks` table, then inserts, updates, queries, counts and
//! deletes tasks through the [`Store`] facade using a serde model.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=rowmap=debug cargo run -p rowmap-demos --example task_store
//! ```

use std::sync::Arc;

use rowmap_core::{ColumnSpec, Record, ShutdownHooks, Store, TableSchema, Value, converters};
use rowmap_sqlite::{MEMORY_LOCATION, SqliteEngine};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Task {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    title: String,
    done: i64,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    created_at: Option<i64>,
}

fn tasks_schema() -> TableSchema {
    TableSchema::new("tasks")
        .create_sql(
            "CREATE TABLE tasks (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                done INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .column(ColumnSpec::mapped("id", "id", converters::integer()))
        .column(ColumnSpec::mapped("title", "title", converters::text()))
        .column(ColumnSpec::mapped("done", "done", converters::boolean()))
        .column(ColumnSpec::mapped("created_at", "createdAt", converters::timestamp()))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let hooks = Arc::new(ShutdownHooks::new());
    let store = Store::new(SqliteEngine::default(), hooks.clone());
    store.initialize(MEMORY_LOCATION, &[tasks_schema()], 1).unwrap();

    // === Insert ===
    println!("=== Insert ===");
    for title in ["water plants", "file taxes", "call mom"] {
        let task = Task {
            id: None,
            title: title.into(),
            done: 0,
            created_at: None,
        };
        let id = store.insert_model("tasks", &task).into_value();
        println!("  inserted '{title}' as #{id}");
    }

    // === Update (sparse record: only `done` is written) ===
    println!("\n=== Update ===");
    let affected = store
        .update_by_id("tasks", 2, Some(&Record::new().with("done", true)))
        .into_value();
    println!("  marked #2 done ({affected} row)");

    // === Query ===
    println!("\n=== Query ===");
    let open: Vec<Task> = store
        .query_models("tasks", Some("WHERE done = ? ORDER BY title"), &[Value::Integer(0)])
        .into_value();
    for task in &open {
        println!(
            "  open: #{} {} (created {} ms)",
            task.id.unwrap_or_default(),
            task.title,
            task.created_at.unwrap_or_default()
        );
    }
    println!("  {} of {} tasks open", open.len(), store.count("tasks", None, &[]).into_value());

    // === Raw query ===
    println!("\n=== Raw query ===");
    let longest = store
        .raw_query(
            "SELECT title, length(title) AS n FROM tasks ORDER BY n DESC LIMIT 1",
            &[],
            |row| Ok(converters::text()(row, 0)?.to_string()),
        )
        .into_value();
    println!("  longest title: {longest:?}");

    // === Neutral values on failure ===
    println!("\n=== Failures ===");
    let outcome = store.insert("tasks", None);
    println!("  insert(None) -> {} ({:?})", outcome.value(), outcome.error());
    let outcome = store.select_by_id("nope", 1);
    println!("  select_by_id(nope) -> {:?} ({:?})", outcome.value(), outcome.error());

    // === Delete ===
    println!("\n=== Delete ===");
    let deleted = store.delete_by_id("tasks", 1).into_value();
    println!("  deleted #1: {deleted:?}");
    println!("  remaining: {}", store.count("tasks", None, &[]).into_value());

    hooks.run();
    println!("\nStore closed: initialized={}", store.registry().is_initialized());
}

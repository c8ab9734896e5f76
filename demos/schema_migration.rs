//! Versioned schema evolution on a file database.
//!
//! Opens the same file twice: first at version 1, then at version 2 with a
//! migration statement that adds a column. The second open runs only the
//! migration, and existing rows keep their data.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p rowmap-demos --example schema_migration
//! ```

use std::sync::Arc;

use rowmap_core::{ColumnSpec, NoopLifecycle, Record, Store, TableSchema, converters};
use rowmap_sqlite::SqliteEngine;

fn notes_v1() -> TableSchema {
    TableSchema::new("notes")
        .create_sql("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL)")
        .column(ColumnSpec::mapped("id", "id", converters::integer()))
        .column(ColumnSpec::mapped("body", "body", converters::text()))
}

fn notes_v2() -> TableSchema {
    notes_v1()
        .migration("ALTER TABLE notes ADD COLUMN pinned INTEGER NOT NULL DEFAULT 0")
        .version(2)
        .column(ColumnSpec::mapped("pinned", "pinned", converters::boolean()))
}

fn main() {
    let dir = std::env::temp_dir().join("rowmap_schema_migration_demo");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("notes.db").to_string_lossy().into_owned();

    let store = Store::new(SqliteEngine::default(), Arc::new(NoopLifecycle));

    // === Version 1 ===
    store.initialize(&path, &[notes_v1()], 1).unwrap();
    println!("Opened at version {:?}", store.registry().version());
    store
        .insert("notes", Some(&Record::new().with("body", "remember the milk")))
        .into_result()
        .unwrap();
    store.teardown();

    // === Version 2: migration only ===
    store.initialize(&path, &[notes_v2()], 2).unwrap();
    println!("Reopened at version {:?}", store.registry().version());
    for note in store.query("notes", None, &[]).into_value() {
        println!("  {}", note.to_json());
    }

    // === Downgrade is refused ===
    store.teardown();
    match store.initialize(&path, &[notes_v1()], 1) {
        Ok(()) => println!("Unexpectedly reopened at version 1"),
        Err(e) => println!("Reopen at version 1 refused: {e}"),
    }

    let _ = std::fs::remove_dir_all(&dir);
}

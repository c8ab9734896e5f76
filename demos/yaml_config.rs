//! Store setup from a YAML configuration.
//!
//! Parses a [`StoreConfig`], builds the table schemas from its column
//! mappings and opens the store with the configured SQLite options. A
//! column with an unknown converter is dropped with a logged error.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p rowmap-demos --example yaml_config
//! ```

use std::sync::Arc;

use rowmap_core::{Record, ShutdownHooks, Store, StoreConfig};
use rowmap_sqlite::SqliteEngine;

const CONFIG: &str = r#"
location: ":memory:"
version: 1
sqlite:
  foreign_keys: true
tables:
  - name: contacts
    create: "CREATE TABLE contacts (id INTEGER PRIMARY KEY, name TEXT, email TEXT, avatar BLOB)"
    columns:
      - { column: id, attribute: id, converter: integer }
      - { column: name, attribute: name, converter: text }
      - { column: email, attribute: email, converter: text }
      - { column: avatar, attribute: avatar, converter: image }
"#;

fn main() {
    tracing_subscriber::fmt().with_env_filter("rowmap=warn").init();

    let config = StoreConfig::from_yaml_str(CONFIG).unwrap();
    let schemas = config.to_schemas();
    for schema in &schemas {
        let columns: Vec<&str> = schema.columns().iter().map(|c| c.column()).collect();
        println!("{}: columns {:?}", schema.name(), columns);
    }

    let hooks = Arc::new(ShutdownHooks::new());
    let store = Store::new(SqliteEngine::new(config.sqlite.clone()), hooks.clone());
    store.initialize(&config.location, &schemas, config.version).unwrap();

    let contact = Record::new().with("name", "Ada").with("email", "ada@example.com");
    let id = store.insert("contacts", Some(&contact)).into_value();
    let loaded = store.select_by_id("contacts", id).into_value();
    println!("Loaded: {}", loaded.map(|r| r.to_json().to_string()).unwrap_or_default());

    println!("\nEffective configuration:");
    println!("{}", serde_json::to_string_pretty(&config).unwrap());
    hooks.run();
}

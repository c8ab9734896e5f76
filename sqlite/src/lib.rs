//! SQLite engine for the rowmap data-mapping layer.
//!
//! [`SqliteEngine`] implements [`rowmap_core::Engine`] on top of `rusqlite`
//! (bundled SQLite). It owns everything engine-specific:
//!
//! - **`migration`**: the `PRAGMA user_version` contract that decides which
//!   creation and migration statements run on open
//! - **`schema`**: `INSERT`/`UPDATE`/`DELETE` generation from a
//!   [`TableIdentity`](rowmap_core::TableIdentity), with identifier checks
//! - **`convert`**: [`Value`](rowmap_core::Value) to and from SQLite cells
//! - **`engine`**: [`SqliteEngine`] and [`SqliteHandle`]
//!
//! # Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use rowmap_core::{ShutdownHooks, Store, StoreConfig};
//! use rowmap_sqlite::SqliteEngine;
//!
//! let config = StoreConfig::load("store.yml").unwrap();
//! let hooks = Arc::new(ShutdownHooks::new());
//! let store = Store::new(SqliteEngine::new(config.sqlite.clone()), hooks.clone());
//! store.initialize(&config.location, &config.to_schemas(), config.version).unwrap();
//!
//! for user in store.query("users", Some("ORDER BY name"), &[]).into_value() {
//!     println!("{}", user.to_json());
//! }
//!
//! hooks.run();
//! ```
//!
//! # Location
//!
//! `":memory:"` opens a private in-memory database; anything else is a
//! file path, created if missing.

mod convert;
mod engine;
mod error;
mod migration;
mod schema;

pub use engine::{MEMORY_LOCATION, SqliteEngine, SqliteHandle};
pub use error::{Result, SqliteError};
pub use migration::{DatabaseStatus, MigrationReport, apply, status, user_version};
pub use rowmap_core::SqliteOptions;
pub use schema::{delete_sql, insert_sql, update_sql};

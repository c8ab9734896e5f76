//! Data mapping between domain records and an embedded relational store.
//!
//! This crate is engine-agnostic. It provides:
//!
//! - [`Value`] and [`Record`]: the cell and object shapes that cross the
//!   boundary. Typed structs convert through serde.
//! - [`ColumnSpec`] and [`TableSchema`]: declarative column mappings with
//!   read converters (see [`converters`]), plus creation and migration
//!   statements per table.
//! - [`TableIdentity`] and the [`convert`] pipeline: the write descriptor and
//!   the row/record conversion driven by the same column list.
//! - [`SchemaRegistry`]: versioned registration and ownership of the engine
//!   handle, released exactly once through a [`LifecycleHook`].
//! - [`Store`]: the CRUD facade returning [`Outcome`]s with neutral values
//!   on failure.
//! - [`StoreConfig`]: YAML configuration of location, version and tables.
//!
//! Engines implement [`Engine`] and [`EngineHandle`]; the `rowmap-sqlite`
//! crate provides the SQLite one.
//!
//! # Example
//!
//! ```
//! use rowmap_core::*;
//!
//! let users = TableSchema::new("users")
//!     .create_sql("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")
//!     .column(ColumnSpec::mapped("id", "id", converters::integer()))
//!     .column(ColumnSpec::mapped("name", "name", converters::text()));
//!
//! let identity = TableIdentity::from_schema(&users).unwrap();
//! assert_eq!(identity.base_column_list(), "id, name");
//!
//! let to_record = convert::build_row_converter(&identity);
//! let record = to_record(&[Value::Integer(1), Value::from("Alice")]).unwrap();
//! assert_eq!(record.get("name"), Some(&Value::from("Alice")));
//! ```

mod column;
mod config;
pub mod convert;
pub mod converters;
mod engine;
mod error;
mod identity;
mod lifecycle;
mod registry;
mod schema;
mod store;
mod value;

pub use column::{BoundColumn, ColumnSpec, Field, FieldAccessor, ReadConverter};
pub use config::{ColumnConfig, SqliteOptions, StoreConfig, TableConfig};
pub use convert::RowConverter;
pub use engine::{Engine, EngineHandle, Rows};
pub use error::{ConvertError, EngineError, Result, StoreError};
pub use identity::TableIdentity;
pub use lifecycle::{LifecycleHook, LivenessCheck, NoopLifecycle, ShutdownHooks};
pub use registry::{RegisteredTable, SchemaRegistry, TEARDOWN_DESCRIPTION, aggregate_migrations};
pub use schema::{DEFAULT_ID_COLUMN, DEFAULT_VERSION, TableSchema, validate_identifier};
pub use store::{Outcome, Store};
pub use value::{Record, Value};

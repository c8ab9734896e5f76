//! YAML store configuration.
//!
//! Declares the database location, the requested version, engine options,
//! and the table schemas with their column mappings, so a store can be set
//! up without writing Rust for each table.
//!
//! # Example YAML
//!
//! ```yaml
//! location: state.db
//! version: 2
//! sqlite:
//!   foreign_keys: true
//!   journal_mode: WAL
//! tables:
//!   - name: users
//!     version: 2
//!     create: "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)"
//!     alters:
//!       - "ALTER TABLE users ADD COLUMN created_at INTEGER"
//!     columns:
//!       - { column: id, attribute: id, converter: integer }
//!       - { column: name, attribute: name, converter: text }
//!       - { column: created_at, attribute: createdAt, converter: timestamp }
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::error;

use crate::column::ColumnSpec;
use crate::converters;
use crate::error::Result;
use crate::schema::{DEFAULT_ID_COLUMN, DEFAULT_VERSION, TableSchema};

fn default_version() -> u32 {
    DEFAULT_VERSION
}

/// Reads a version, treating 0 as [`DEFAULT_VERSION`].
fn nonzero_version<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    let version = u32::deserialize(deserializer)?;
    Ok(if version == 0 { DEFAULT_VERSION } else { version })
}

fn default_id_column() -> String {
    DEFAULT_ID_COLUMN.to_string()
}

fn default_location() -> String {
    ":memory:".to_string()
}

/// Connection settings for the SQLite engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqliteOptions {
    /// Enables `PRAGMA foreign_keys`.
    pub foreign_keys: bool,
    /// Value for `PRAGMA journal_mode` (e.g. `WAL`); left alone when `None`.
    pub journal_mode: Option<String>,
}

impl Default for SqliteOptions {
    fn default() -> Self {
        Self {
            foreign_keys: true,
            journal_mode: None,
        }
    }
}

/// Mapping of one column in a table configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Storage column name.
    pub column: String,
    /// Object attribute name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    /// Read converter name, see [`converters::by_name`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converter: Option<String>,
}

/// One table declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Table name.
    pub name: String,
    /// Id column used by the id-based operations.
    #[serde(default = "default_id_column")]
    pub id_column: String,
    /// Version the declaration corresponds to.
    #[serde(default = "default_version", deserialize_with = "nonzero_version")]
    pub version: u32,
    /// Creation statement.
    pub create: String,
    /// Migration statements, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alters: Vec<String>,
    /// Column mappings, in `SELECT` order.
    #[serde(default)]
    pub columns: Vec<ColumnConfig>,
}

impl TableConfig {
    /// Builds the table schema.
    ///
    /// A column without an attribute or with an unknown converter name is
    /// logged and left out.
    pub fn to_schema(&self) -> TableSchema {
        let mut schema = TableSchema::new(&self.name)
            .create_sql(&self.create)
            .migrations_from(self.alters.iter().cloned())
            .version(self.version)
            .id_column(&self.id_column);
        for column in &self.columns {
            let Some(attribute) = column.attribute.as_deref().filter(|a| !a.is_empty()) else {
                error!(table = %self.name, column = %column.column, "Column mapping has no attribute");
                continue;
            };
            let name = column.converter.as_deref().unwrap_or("raw");
            let Some(reader) = converters::by_name(name) else {
                error!(table = %self.name, column = %column.column, converter = name, "Unknown converter");
                continue;
            };
            schema = schema.column(ColumnSpec::mapped(&column.column, attribute, reader));
        }
        schema
    }
}

/// Top-level store configuration.
///
/// # Examples
///
/// ```
/// use rowmap_core::StoreConfig;
///
/// let config = StoreConfig::from_yaml_str(
///     "tables:\n  - name: notes\n    create: CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)\n    columns:\n      - { column: id, attribute: id, converter: integer }\n      - { column: body, attribute: body, converter: text }\n",
/// )
/// .unwrap();
/// assert_eq!(config.version, 1);
/// assert_eq!(config.location, ":memory:");
/// assert_eq!(config.to_schemas()[0].columns().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database location; `:memory:` for an in-memory database.
    #[serde(default = "default_location")]
    pub location: String,
    /// Requested database version.
    #[serde(default = "default_version", deserialize_with = "nonzero_version")]
    pub version: u32,
    /// SQLite connection settings.
    #[serde(default)]
    pub sqlite: SqliteOptions,
    /// Table declarations.
    #[serde(default)]
    pub tables: Vec<TableConfig>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            version: DEFAULT_VERSION,
            sqlite: SqliteOptions::default(),
            tables: Vec::new(),
        }
    }
}

impl StoreConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::StoreError::Io) if the file cannot be read, or
    /// [`Yaml`](crate::StoreError::Yaml) if parsing fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`Io`](crate::StoreError::Io) if the file cannot be written,
    /// or [`Yaml`](crate::StoreError::Yaml) if serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Builds one [`TableSchema`] per table declaration.
    pub fn to_schemas(&self) -> Vec<TableSchema> {
        self.tables.iter().map(TableConfig::to_schema).collect()
    }

    /// Returns the declaration for `name`.
    pub fn table(&self, name: &str) -> Option<&TableConfig> {
        self.tables.iter().find(|t| t.name == name)
    }
}

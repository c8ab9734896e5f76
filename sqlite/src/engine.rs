//! [`SqliteEngine`] and its connection handle.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rowmap_core::convert::{object_to_present_row, object_to_row};
use rowmap_core::{
    Engine, EngineError, EngineHandle, Record, Rows, SqliteOptions, TableIdentity, Value,
};
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::convert::{bind, collect_rows};
use crate::error::Result;
use crate::migration::{self, DatabaseStatus, MigrationReport};
use crate::schema::{delete_sql, insert_sql, update_sql};

/// Location that opens a private in-memory database.
pub const MEMORY_LOCATION: &str = ":memory:";

/// Opens SQLite databases for the schema registry.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use rowmap_core::{ColumnSpec, NoopLifecycle, Record, Store, TableSchema, converters};
/// use rowmap_sqlite::SqliteEngine;
///
/// let notes = TableSchema::new("notes")
///     .create_sql("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)")
///     .column(ColumnSpec::mapped("id", "id", converters::integer()))
///     .column(ColumnSpec::mapped("body", "body", converters::text()));
///
/// let store = Store::new(SqliteEngine::default(), Arc::new(NoopLifecycle));
/// store.initialize(":memory:", &[notes], 1).unwrap();
///
/// let id = store.insert("notes", Some(&Record::new().with("body", "hello"))).into_value();
/// assert_eq!(id, 1);
/// assert_eq!(store.count("notes", None, &[]).into_value(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SqliteEngine {
    options: SqliteOptions,
}

impl SqliteEngine {
    /// Creates an engine that applies `options` to every connection it opens.
    pub fn new(options: SqliteOptions) -> Self {
        Self { options }
    }

    /// Connection settings.
    pub fn options(&self) -> &SqliteOptions {
        &self.options
    }

    /// Opens and configures a connection without touching the schema.
    pub fn connect(&self, location: &str) -> Result<Connection> {
        let conn = if location == MEMORY_LOCATION {
            Connection::open_in_memory()?
        } else {
            Connection::open(Path::new(location))?
        };
        if self.options.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }
        if let Some(mode) = &self.options.journal_mode {
            let applied: String =
                conn.pragma_update_and_check(None, "journal_mode", mode, |row| row.get(0))?;
            if !applied.eq_ignore_ascii_case(mode) {
                warn!(requested = %mode, applied = %applied, "Journal mode not applied");
            }
        }
        Ok(conn)
    }

    /// Opens `location` and applies the version contract.
    pub fn open_with_report(
        &self,
        location: &str,
        create_statements: &[String],
        migration_statements: &[String],
        version: u32,
    ) -> Result<(SqliteHandle, MigrationReport)> {
        let mut conn = self.connect(location)?;
        let report = migration::apply(&mut conn, create_statements, migration_statements, version)?;
        debug!(location, ?report, "Opened SQLite database");
        Ok((SqliteHandle::new(conn), report))
    }
}

impl Engine for SqliteEngine {
    type Handle = SqliteHandle;

    fn open(
        &self,
        location: &str,
        create_statements: &[String],
        migration_statements: &[String],
        version: u32,
    ) -> std::result::Result<SqliteHandle, EngineError> {
        let (handle, _) =
            self.open_with_report(location, create_statements, migration_statements, version)?;
        Ok(handle)
    }
}

/// An open SQLite connection.
///
/// The connection sits behind a `Mutex`, so statements from concurrent
/// facade calls are serialized.
#[derive(Debug)]
pub struct SqliteHandle {
    conn: Mutex<Connection>,
}

impl SqliteHandle {
    /// Wraps an already configured connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reads the version and per-table row counts.
    pub fn status(&self) -> Result<DatabaseStatus> {
        migration::status(&self.conn())
    }

    fn query(&self, sql: &str, params: &[Value]) -> Result<Rows> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        collect_rows(&mut stmt, bind(params))
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        let conn = self.conn();
        if params.is_empty() {
            conn.execute_batch(sql)?;
            return Ok(conn.changes() as usize);
        }
        Ok(conn.execute(sql, bind(params))?)
    }

    fn insert(&self, identity: &TableIdentity, record: &Record) -> Result<i64> {
        let row = object_to_row(identity, record);
        let sql = insert_sql(identity.table(), row.iter().map(|(c, _)| c.as_str()))?;
        let conn = self.conn();
        conn.execute(&sql, bind(row.iter().map(|(_, v)| v)))?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, identity: &TableIdentity, id: &Value, record: &Record) -> Result<usize> {
        let row: Vec<(String, Value)> = object_to_present_row(identity, record)
            .into_iter()
            .filter(|(column, _)| column != identity.id_column())
            .collect();
        let Some(sql) = update_sql(
            identity.table(),
            row.iter().map(|(c, _)| c.as_str()),
            identity.id_column(),
        )?
        else {
            debug!(table = identity.table(), "Update has no fields to write");
            return Ok(0);
        };
        let values = row.iter().map(|(_, v)| v).chain(std::iter::once(id));
        Ok(self.conn().execute(&sql, bind(values))?)
    }

    fn delete(&self, table: &str, id_column: &str, id: &Value) -> Result<usize> {
        let sql = delete_sql(table, id_column)?;
        Ok(self.conn().execute(&sql, bind([id]))?)
    }
}

impl EngineHandle for SqliteHandle {
    fn close(self) -> std::result::Result<(), EngineError> {
        let conn = self.conn.into_inner().unwrap_or_else(PoisonError::into_inner);
        conn.close()
            .map_err(|(_, e)| EngineError::Database(e.to_string()))
    }

    fn version(&self) -> std::result::Result<u32, EngineError> {
        Ok(migration::user_version(&self.conn())?)
    }

    fn raw_query(&self, sql: &str, params: &[Value]) -> std::result::Result<Option<Rows>, EngineError> {
        Ok(Some(self.query(sql, params)?))
    }

    fn raw_execute(&self, sql: &str, params: &[Value]) -> std::result::Result<(), EngineError> {
        self.execute(sql, params)?;
        Ok(())
    }

    fn insert_with_identity(
        &self,
        identity: &TableIdentity,
        record: &Record,
    ) -> std::result::Result<i64, EngineError> {
        Ok(self.insert(identity, record)?)
    }

    fn update_by_id_with_identity(
        &self,
        identity: &TableIdentity,
        id: &Value,
        record: &Record,
    ) -> std::result::Result<usize, EngineError> {
        Ok(self.update(identity, id, record)?)
    }

    fn delete_by_id(
        &self,
        table: &str,
        id_column: &str,
        id: &Value,
    ) -> std::result::Result<usize, EngineError> {
        Ok(self.delete(table, id_column, id)?)
    }
}

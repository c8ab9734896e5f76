//! The CRUD facade.
//!
//! [`Store`] is the public operation surface. Every operation validates its
//! arguments, resolves the table through the registry, and delegates to the
//! engine handle. Failures never escape as errors (except from
//! [`Store::exec_sql`]): they are logged and answered with the operation's
//! neutral value inside an [`Outcome`], which also carries the reason so a
//! caller can tell "nothing there" from "did not happen".
//!
//! | Operation | Neutral value |
//! |---|---|
//! | `insert`, `update_by_id` | `-1` |
//! | `select_by_id`, `delete_by_id` | `None` |
//! | `query`, `raw_query` | empty `Vec` |
//! | `count`, `raw_count` | `0` |

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::engine::{Engine, EngineHandle};
use crate::error::{ConvertError, Result, StoreError};
use crate::lifecycle::LifecycleHook;
use crate::registry::SchemaRegistry;
use crate::schema::{DEFAULT_ID_COLUMN, TableSchema, validate_identifier};
use crate::value::{Record, Value};

/// Value returned by a facade operation plus the failure reason, if any.
///
/// On failure the value is the operation's neutral value.
#[must_use]
#[derive(Debug)]
pub struct Outcome<T> {
    value: T,
    error: Option<StoreError>,
}

impl<T> Outcome<T> {
    /// Successful outcome.
    pub fn ok(value: T) -> Self {
        Self { value, error: None }
    }

    /// Failed outcome carrying the neutral value.
    pub fn failed(neutral: T, error: StoreError) -> Self {
        Self {
            value: neutral,
            error: Some(error),
        }
    }

    /// Returns `true` if the operation happened.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The value (neutral on failure).
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Consumes the outcome, returning the value (neutral on failure).
    pub fn into_value(self) -> T {
        self.value
    }

    /// Failure reason, if any.
    pub fn error(&self) -> Option<&StoreError> {
        self.error.as_ref()
    }

    /// Splits into value and failure reason.
    pub fn into_parts(self) -> (T, Option<StoreError>) {
        (self.value, self.error)
    }

    /// Converts into a `Result`, dropping the neutral value on failure.
    pub fn into_result(self) -> Result<T> {
        match self.error {
            None => Ok(self.value),
            Some(e) => Err(e),
        }
    }
}

fn fail<T>(operation: &'static str, table: &str, neutral: T, error: StoreError) -> Outcome<T> {
    error!(operation, table, error = %error, "Store operation failed");
    Outcome::failed(neutral, error)
}

fn finish<T>(operation: &'static str, table: &str, neutral: T, result: Result<T>) -> Outcome<T> {
    match result {
        Ok(value) => Outcome::ok(value),
        Err(e) => fail(operation, table, neutral, e),
    }
}

/// Data-mapping facade over a [`SchemaRegistry`].
///
/// Cloning is cheap; clones share the registry.
///
/// # Examples
///
/// ```ignore
/// let store = Store::new(SqliteEngine::default(), Arc::new(ShutdownHooks::new()));
/// store.initialize(":memory:", &[users_schema()], 1)?;
///
/// let id = store.insert("users", Some(&Record::new().with("name", "Alice"))).into_value();
/// let alice = store.select_by_id("users", id).into_value();
/// ```
pub struct Store<E: Engine> {
    registry: Arc<SchemaRegistry<E>>,
}

impl<E: Engine> Clone for Store<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<E: Engine> Store<E> {
    /// Creates a store with a fresh, uninitialized registry.
    pub fn new(engine: E, lifecycle: Arc<dyn LifecycleHook>) -> Self {
        Self::from_registry(Arc::new(SchemaRegistry::new(engine, lifecycle)))
    }

    /// Wraps an existing registry.
    pub fn from_registry(registry: Arc<SchemaRegistry<E>>) -> Self {
        Self { registry }
    }

    /// The underlying registry.
    pub fn registry(&self) -> &SchemaRegistry<E> {
        &self.registry
    }

    /// See [`SchemaRegistry::initialize`].
    pub fn initialize(&self, location: &str, schemas: &[TableSchema], version: u32) -> Result<()> {
        self.registry.initialize(location, schemas, version)
    }

    /// See [`SchemaRegistry::teardown`].
    pub fn teardown(&self) {
        self.registry.teardown();
    }

    /// Inserts `record` and returns the engine-assigned row id, or `-1`.
    pub fn insert(&self, table: &str, record: Option<&Record>) -> Outcome<i64> {
        let Some(record) = record else {
            return fail("insert", table, -1, StoreError::InvalidArgument("no object to insert".into()));
        };
        let result = self.registry.with_table(table, |handle, entry| {
            Ok(handle.insert_with_identity(entry.identity(), record)?)
        });
        if let Ok(id) = &result {
            debug!(table, id, "Inserted row");
        }
        finish("insert", table, -1, result)
    }

    /// Updates the row with id `id`; returns the affected-row count, or `-1`.
    ///
    /// Only attributes present on `record` are written.
    pub fn update_by_id(&self, table: &str, id: impl Into<Value>, record: Option<&Record>) -> Outcome<i64> {
        let id = id.into();
        if id.is_blank() {
            return fail("update_by_id", table, -1, StoreError::InvalidArgument("id is empty".into()));
        }
        let Some(record) = record else {
            return fail("update_by_id", table, -1, StoreError::InvalidArgument("no object to update".into()));
        };
        let result = self.registry.with_table(table, |handle, entry| {
            let affected = handle.update_by_id_with_identity(entry.identity(), &id, record)?;
            Ok(i64::try_from(affected).unwrap_or(i64::MAX))
        });
        finish("update_by_id", table, -1, result)
    }

    /// Loads the row with id `id`, or `None`.
    pub fn select_by_id(&self, table: &str, id: impl Into<Value>) -> Outcome<Option<Record>> {
        let id = id.into();
        if id.is_blank() {
            return fail("select_by_id", table, None, StoreError::InvalidArgument("id is empty".into()));
        }
        let result = self.registry.with_table(table, |handle, entry| {
            let identity = entry.identity();
            let sql = format!(
                "SELECT {} FROM {} WHERE {} = ?",
                identity.base_column_list(),
                identity.table(),
                identity.id_column()
            );
            let Some(rows) = handle.raw_query(&sql, std::slice::from_ref(&id))? else {
                return Ok(None);
            };
            match rows.first() {
                Some(row) => Ok(Some((entry.row_converter())(row.as_slice())?)),
                None => Ok(None),
            }
        });
        finish("select_by_id", table, None, result)
    }

    /// Deletes the row with id `id`; returns the engine's affected-row count.
    ///
    /// The table does not need to be registered; unregistered tables use the
    /// `id` column.
    pub fn delete_by_id(&self, table: &str, id: impl Into<Value>) -> Outcome<Option<usize>> {
        let id = id.into();
        if id.is_blank() {
            return fail("delete_by_id", table, None, StoreError::InvalidArgument("id is empty".into()));
        }
        if table.is_empty() {
            return fail("delete_by_id", table, None, StoreError::InvalidArgument("table name is empty".into()));
        }
        if let Err(e) = validate_identifier(table) {
            return fail("delete_by_id", table, None, e);
        }
        let result = self.registry.with_handle(|handle, tables| {
            let id_column = tables
                .get(table)
                .map(|entry| entry.identity().id_column())
                .unwrap_or(DEFAULT_ID_COLUMN);
            Ok(Some(handle.delete_by_id(table, id_column, &id)?))
        });
        finish("delete_by_id", table, None, result)
    }

    /// Selects every mapped column of `table`, filtered by `where_clause`.
    ///
    /// Builds `SELECT <columns> FROM <table> <where_clause>`; `params` are
    /// bound, never interpolated.
    pub fn query(&self, table: &str, where_clause: Option<&str>, params: &[Value]) -> Outcome<Vec<Record>> {
        let result = self.registry.with_table(table, |handle, entry| {
            let identity = entry.identity();
            let sql = format!(
                "SELECT {} FROM {} {}",
                identity.base_column_list(),
                identity.table(),
                where_clause.unwrap_or_default()
            );
            let rows = handle.raw_query(&sql, params)?.ok_or(StoreError::NoResultSet)?;
            let converter = entry.row_converter();
            Ok(rows
                .iter()
                .map(|row| converter(row.as_slice()))
                .collect::<std::result::Result<Vec<_>, ConvertError>>()?)
        });
        finish("query", table, Vec::new(), result)
    }

    /// Counts rows of `table` matching `where_clause`.
    pub fn count(&self, table: &str, where_clause: Option<&str>, params: &[Value]) -> Outcome<i64> {
        if let Err(e) = validate_identifier(table) {
            return fail("count", table, 0, e);
        }
        let result = self.registry.with_handle(|handle, _| {
            let sql = format!("SELECT COUNT(*) FROM {} {}", table, where_clause.unwrap_or_default());
            let rows = handle.raw_query(&sql, params)?.unwrap_or_default();
            Ok(first_count(&rows))
        });
        finish("count", table, 0, result)
    }

    /// Runs arbitrary SQL and converts each row with `converter`.
    pub fn raw_query<T, F>(&self, sql: &str, params: &[Value], converter: F) -> Outcome<Vec<T>>
    where
        F: Fn(&[Value]) -> std::result::Result<T, ConvertError>,
    {
        let result = self.registry.with_handle(|handle, _| {
            let rows = handle.raw_query(sql, params)?.ok_or(StoreError::NoResultSet)?;
            Ok(rows
                .iter()
                .map(|row| converter(row.as_slice()))
                .collect::<std::result::Result<Vec<_>, ConvertError>>()?)
        });
        finish("raw_query", "-", Vec::new(), result)
    }

    /// Runs arbitrary SQL and returns the first cell of the first row as a count.
    pub fn raw_count(&self, sql: &str, params: &[Value]) -> Outcome<i64> {
        let result = self.registry.with_handle(|handle, _| {
            let rows = handle.raw_query(sql, params)?.unwrap_or_default();
            Ok(first_count(&rows))
        });
        finish("raw_count", "-", 0, result)
    }

    /// Executes arbitrary SQL.
    ///
    /// # Errors
    ///
    /// Unlike the other operations, engine failures are returned, since a
    /// failed statement has no neutral value.
    pub fn exec_sql(&self, sql: &str, params: &[Value]) -> Result<()> {
        self.registry
            .with_handle(|handle, _| Ok(handle.raw_execute(sql, params)?))
            .inspect_err(|e| error!(operation = "exec_sql", error = %e, "Statement execution failed"))
    }

    /// Inserts a serializable model. A model that does not serialize to an
    /// object counts as "no object".
    pub fn insert_model<T: Serialize + ?Sized>(&self, table: &str, model: &T) -> Outcome<i64> {
        match Record::from_serialize(model) {
            Ok(record) => self.insert(table, record.as_ref()),
            Err(e) => fail("insert", table, -1, e),
        }
    }

    /// Updates the row with id `id` from a serializable model.
    pub fn update_model_by_id<T: Serialize + ?Sized>(
        &self,
        table: &str,
        id: impl Into<Value>,
        model: &T,
    ) -> Outcome<i64> {
        match Record::from_serialize(model) {
            Ok(record) => self.update_by_id(table, id, record.as_ref()),
            Err(e) => fail("update_by_id", table, -1, e),
        }
    }

    /// Loads the row with id `id` into a model.
    pub fn select_model_by_id<T: DeserializeOwned>(&self, table: &str, id: impl Into<Value>) -> Outcome<Option<T>> {
        let (record, error) = self.select_by_id(table, id).into_parts();
        if let Some(e) = error {
            return Outcome::failed(None, e);
        }
        match record.map(|r| r.deserialize::<T>()).transpose() {
            Ok(model) => Outcome::ok(model),
            Err(e) => fail("select_by_id", table, None, e),
        }
    }

    /// Runs [`query`](Self::query) and deserializes each record.
    pub fn query_models<T: DeserializeOwned>(
        &self,
        table: &str,
        where_clause: Option<&str>,
        params: &[Value],
    ) -> Outcome<Vec<T>> {
        let (records, error) = self.query(table, where_clause, params).into_parts();
        if let Some(e) = error {
            return Outcome::failed(Vec::new(), e);
        }
        match records.iter().map(Record::deserialize::<T>).collect::<Result<Vec<_>>>() {
            Ok(models) => Outcome::ok(models),
            Err(e) => fail("query", table, Vec::new(), e),
        }
    }
}

/// First cell of the first row as a count; `0` when absent.
fn first_count(rows: &[Vec<Value>]) -> i64 {
    rows.first()
        .and_then(|row| row.first())
        .and_then(Value::to_count)
        .unwrap_or(0)
}

//! Spy engine shared by the core integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use rowmap_core::convert::{object_to_present_row, object_to_row};
use rowmap_core::{
    ColumnSpec, Engine, EngineError, EngineHandle, Record, Rows, TableIdentity, TableSchema, Value,
    converters,
};

/// One `Engine::open` call.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenCall {
    pub location: String,
    pub create_statements: Vec<String>,
    pub migration_statements: Vec<String>,
    pub version: u32,
}

/// Everything the spy saw.
#[derive(Debug, Default)]
pub struct MockState {
    pub opens: Vec<OpenCall>,
    pub closes: usize,
    /// Calls made through a handle, excluding `close` and `version`.
    pub calls: usize,
    pub sql: Vec<String>,
    pub params: Vec<Vec<Value>>,
    pub inserted: Vec<(String, Vec<(String, Value)>)>,
    pub updated: Vec<(String, Value, Vec<(String, Value)>)>,
    pub deleted: Vec<(String, String, Value)>,
    /// Answer for `raw_query`; `None` means "no result set".
    pub query_result: Option<Rows>,
    pub fail_open: bool,
    pub fail_execute: bool,
    pub next_id: i64,
}

/// Engine that records calls instead of touching a database.
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
}

impl MockEngine {
    pub fn new() -> Self {
        let engine = Self::default();
        engine.state().next_id = 1;
        engine
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn answer(&self, rows: Option<Rows>) {
        self.state().query_result = rows;
    }
}

impl Engine for MockEngine {
    type Handle = MockHandle;

    fn open(
        &self,
        location: &str,
        create_statements: &[String],
        migration_statements: &[String],
        version: u32,
    ) -> Result<MockHandle, EngineError> {
        let mut state = self.state();
        if state.fail_open {
            return Err(EngineError::Database("unable to open database file".into()));
        }
        state.opens.push(OpenCall {
            location: location.to_string(),
            create_statements: create_statements.to_vec(),
            migration_statements: migration_statements.to_vec(),
            version,
        });
        Ok(MockHandle {
            state: Arc::clone(&self.state),
            version,
        })
    }
}

#[derive(Debug)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
    version: u32,
}

impl MockHandle {
    fn record(&self, sql: &str, params: &[Value]) -> MutexGuard<'_, MockState> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state.sql.push(sql.to_string());
        state.params.push(params.to_vec());
        state
    }

    fn touch(&self) -> MutexGuard<'_, MockState> {
        let mut state = self.state.lock().unwrap();
        state.calls += 1;
        state
    }
}

impl EngineHandle for MockHandle {
    fn close(self) -> Result<(), EngineError> {
        self.state.lock().unwrap().closes += 1;
        Ok(())
    }

    fn version(&self) -> Result<u32, EngineError> {
        Ok(self.version)
    }

    fn raw_query(&self, sql: &str, params: &[Value]) -> Result<Option<Rows>, EngineError> {
        Ok(self.record(sql, params).query_result.clone())
    }

    fn raw_execute(&self, sql: &str, params: &[Value]) -> Result<(), EngineError> {
        let state = self.record(sql, params);
        if state.fail_execute {
            return Err(EngineError::Database("near \"SELEKT\": syntax error".into()));
        }
        Ok(())
    }

    fn insert_with_identity(&self, identity: &TableIdentity, record: &Record) -> Result<i64, EngineError> {
        let mut state = self.touch();
        state
            .inserted
            .push((identity.table().to_string(), object_to_row(identity, record)));
        let id = state.next_id;
        state.next_id += 1;
        Ok(id)
    }

    fn update_by_id_with_identity(
        &self,
        identity: &TableIdentity,
        id: &Value,
        record: &Record,
    ) -> Result<usize, EngineError> {
        let mut state = self.touch();
        let row = object_to_present_row(identity, record);
        state.updated.push((identity.table().to_string(), id.clone(), row));
        Ok(1)
    }

    fn delete_by_id(&self, table: &str, id_column: &str, id: &Value) -> Result<usize, EngineError> {
        let mut state = self.touch();
        state
            .deleted
            .push((table.to_string(), id_column.to_string(), id.clone()));
        Ok(1)
    }
}

/// `users (id, name)` with integer and text converters.
pub fn users_schema() -> TableSchema {
    TableSchema::new("users")
        .create_sql("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")
        .column(ColumnSpec::mapped("id", "id", converters::integer()))
        .column(ColumnSpec::mapped("name", "name", converters::text()))
}

/// `tasks` keyed by `task_id`, with one migration.
pub fn tasks_schema() -> TableSchema {
    TableSchema::new("tasks")
        .create_sql("CREATE TABLE tasks (task_id INTEGER PRIMARY KEY, title TEXT)")
        .migration("ALTER TABLE tasks ADD COLUMN done INTEGER")
        .version(2)
        .id_column("task_id")
        .column(ColumnSpec::mapped("task_id", "id", converters::integer()))
        .column(ColumnSpec::mapped("title", "title", converters::text()))
        .column(ColumnSpec::mapped("done", "done", converters::boolean()))
}

//! Boundary to the embedded database engine.
//!
//! The mapping layer never talks to a connection directly. It opens a
//! handle through an [`Engine`] and issues every statement through the
//! [`EngineHandle`] it gets back.
//!
//! # Version contract
//!
//! `open` receives the creation statements, the aggregated migration
//! statements, and the requested version. Implementations compare the
//! requested version with the stored one: a fresh database gets creation
//! statements followed by migrations; an older one gets migrations only; an
//! equal one gets nothing; a newer one is rejected with
//! [`EngineError::Downgrade`].

use crate::error::EngineError;
use crate::identity::TableIdentity;
use crate::value::{Record, Value};

/// Rows as returned by a raw query, one `Vec<Value>` per row.
pub type Rows = Vec<Vec<Value>>;

/// Opens engine handles.
pub trait Engine: Send + Sync {
    /// The open connection type.
    type Handle: EngineHandle;

    /// Opens `location`, applying statements according to the version contract.
    fn open(
        &self,
        location: &str,
        create_statements: &[String],
        migration_statements: &[String],
        version: u32,
    ) -> Result<Self::Handle, EngineError>;
}

/// An open connection owned by the registry.
pub trait EngineHandle: Send + Sync + 'static {
    /// Closes the connection. Consumes the handle so it is released once.
    fn close(self) -> Result<(), EngineError>;

    /// Stored schema version.
    fn version(&self) -> Result<u32, EngineError>;

    /// Runs a query with bound parameters.
    ///
    /// `Ok(None)` means the engine produced no result set at all, which is
    /// different from an empty one.
    fn raw_query(&self, sql: &str, params: &[Value]) -> Result<Option<Rows>, EngineError>;

    /// Executes a statement with bound parameters.
    fn raw_execute(&self, sql: &str, params: &[Value]) -> Result<(), EngineError>;

    /// Inserts `record` into the identity's table and returns the new row id.
    fn insert_with_identity(
        &self,
        identity: &TableIdentity,
        record: &Record,
    ) -> Result<i64, EngineError>;

    /// Updates the row whose id column equals `id`; returns affected rows.
    fn update_by_id_with_identity(
        &self,
        identity: &TableIdentity,
        id: &Value,
        record: &Record,
    ) -> Result<usize, EngineError>;

    /// Deletes the row whose `id_column` equals `id`; returns affected rows.
    fn delete_by_id(&self, table: &str, id_column: &str, id: &Value) -> Result<usize, EngineError>;
}

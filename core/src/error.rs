//! Error types for the mapping layer.
//!
//! [`StoreError`] is the unified error for registry, facade and configuration
//! failures. [`EngineError`] is what an [`EngineHandle`](crate::EngineHandle)
//! reports; it is kept separate so engine implementations do not depend on
//! facade concerns. [`ConvertError`] is produced by column read converters.

use thiserror::Error;

/// Errors reported by an embedded engine implementation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Statement preparation or execution failed inside the engine.
    #[error("database error: {0}")]
    Database(String),

    /// The stored schema version is newer than the requested one.
    #[error("cannot downgrade schema from version {stored} to {requested}")]
    Downgrade {
        /// Version recorded in the database.
        stored: u32,
        /// Version passed to `open`.
        requested: u32,
    },

    /// A table or column name contains characters that cannot be quoted safely.
    #[error("invalid identifier '{0}': must contain only alphanumeric characters and underscores")]
    InvalidIdentifier(String),

    /// The handle was already closed.
    #[error("engine handle is closed")]
    Closed,

    /// A cell value could not be bound or read.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Failure of a column read converter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    /// The converter addressed a position past the end of the row.
    #[error("column index {index} out of range for row of {len} cells")]
    OutOfRange {
        /// Requested position.
        index: usize,
        /// Number of cells in the row.
        len: usize,
    },

    /// The cell holds a value the converter cannot interpret.
    #[error("cannot convert {found} to {expected}")]
    Mismatch {
        /// Target kind, e.g. `"integer"`.
        expected: &'static str,
        /// Short description of the cell found.
        found: String,
    },

    /// Free-form converter failure.
    #[error("{0}")]
    Custom(String),
}

/// Errors that can occur in the mapping layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required argument was missing or empty.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An operation other than `initialize` ran before a successful initialize.
    #[error("store is not initialized")]
    NotInitialized,

    /// No schema is registered under the requested table name.
    #[error("no table registered under '{0}'")]
    UnknownTable(String),

    /// A column spec is missing its attribute name or read converter.
    #[error("invalid column '{column}': {reason}")]
    InvalidColumn {
        /// Storage-side column name.
        column: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A table or column name is not a plain identifier.
    #[error("invalid identifier '{0}': must contain only alphanumeric characters and underscores")]
    InvalidIdentifier(String),

    /// A row could not be converted into a record, or a record into a model.
    #[error("conversion error: {0}")]
    Conversion(#[from] ConvertError),

    /// The engine answered a query without a result set.
    #[error("engine returned no result set")]
    NoResultSet,

    /// The embedded engine reported a failure.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Configuration could not be interpreted.
    #[error("configuration error: {0}")]
    Config(String),

    /// File I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results with [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;

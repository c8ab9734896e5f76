//! Error types for the SQLite engine.
//!
//! [`SqliteError`] is used inside the crate; it converts into
//! [`EngineError`] at the [`Engine`](rowmap_core::Engine) trait boundary.

use rowmap_core::EngineError;
use thiserror::Error;

/// Errors that can occur while talking to SQLite.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// A cell could not be bound or read.
    #[error("conversion error: {0}")]
    ConversionError(String),

    /// A creation or migration statement failed.
    #[error("migration error: {0}")]
    MigrationError(String),

    /// The stored `user_version` is newer than the requested version.
    #[error("cannot downgrade schema from version {stored} to {requested}")]
    Downgrade {
        /// `PRAGMA user_version` of the database.
        stored: u32,
        /// Requested version.
        requested: u32,
    },

    /// Table or column name contains invalid characters.
    #[error("invalid identifier '{0}': must contain only alphanumeric characters and underscores")]
    InvalidIdentifier(String),
}

impl From<SqliteError> for EngineError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::DatabaseError(e) => EngineError::Database(e.to_string()),
            SqliteError::ConversionError(msg) => EngineError::Conversion(msg),
            SqliteError::MigrationError(msg) => EngineError::Database(msg),
            SqliteError::Downgrade { stored, requested } => EngineError::Downgrade { stored, requested },
            SqliteError::InvalidIdentifier(name) => EngineError::InvalidIdentifier(name),
        }
    }
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maps_into_engine_error() {
        let err: EngineError = SqliteError::Downgrade { stored: 3, requested: 2 }.into();
        assert_eq!(err, EngineError::Downgrade { stored: 3, requested: 2 });

        let err: EngineError = SqliteError::InvalidIdentifier("a b".into()).into();
        assert_eq!(err, EngineError::InvalidIdentifier("a b".into()));

        let err: EngineError = SqliteError::from(rusqlite::Error::InvalidQuery).into();
        assert!(matches!(err, EngineError::Database(_)));
    }
}

//! Versioned schema setup driven by `PRAGMA user_version`.
//!
//! [`apply`] compares the stored version with the requested one:
//!
//! | Stored | Action |
//! |---|---|
//! | `0` (fresh database) | creation statements, then migration statements |
//! | older than requested | migration statements |
//! | equal | nothing |
//! | newer than requested | [`SqliteError::Downgrade`] |
//!
//! Statements and the version bump run in one transaction, so a failing
//! statement leaves the database at its previous version.
//!
//! Migration statements are not tagged with the version that introduced
//! them. Every upgrade runs the whole list, so statements must be safe to
//! repeat: a database at version 2 upgraded to 3 runs the 1 to 2 statements
//! again, and a repeated `ALTER TABLE .. ADD COLUMN` fails the upgrade. Keep
//! the list idempotent (or trim it to the statements newer than the oldest
//! database still in use).

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Result, SqliteError};

/// What [`apply`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Version found before applying.
    pub from_version: u32,
    /// Version after applying.
    pub to_version: u32,
    /// Number of creation statements executed.
    pub created: usize,
    /// Number of migration statements executed.
    pub migrated: usize,
}

impl MigrationReport {
    /// Returns `true` if nothing was executed.
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.migrated == 0 && self.from_version == self.to_version
    }
}

/// Reads `PRAGMA user_version`.
pub fn user_version(conn: &Connection) -> Result<u32> {
    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    u32::try_from(version)
        .map_err(|_| SqliteError::ConversionError(format!("user_version {version} out of range")))
}

/// Brings the database to `version` using the given statements.
///
/// # Errors
///
/// Returns [`SqliteError::Downgrade`] if the database is newer than
/// `version`, or [`SqliteError::MigrationError`] naming the statement that
/// failed.
pub fn apply(
    conn: &mut Connection,
    create_statements: &[String],
    migration_statements: &[String],
    version: u32,
) -> Result<MigrationReport> {
    let stored = user_version(conn)?;
    if stored > version {
        return Err(SqliteError::Downgrade {
            stored,
            requested: version,
        });
    }
    if stored == version {
        debug!(version, "Database schema is current");
        return Ok(MigrationReport {
            from_version: stored,
            to_version: stored,
            created: 0,
            migrated: 0,
        });
    }

    let creates: &[String] = if stored == 0 { create_statements } else { &[] };
    let tx = conn.transaction()?;
    for sql in creates {
        tx.execute_batch(sql)
            .map_err(|e| SqliteError::MigrationError(format!("create statement failed ({sql}): {e}")))?;
    }
    for sql in migration_statements {
        tx.execute_batch(sql)
            .map_err(|e| SqliteError::MigrationError(format!("migration statement failed ({sql}): {e}")))?;
    }
    tx.pragma_update(None, "user_version", version)?;
    tx.commit()?;

    info!(
        from = stored,
        to = version,
        created = creates.len(),
        migrated = migration_statements.len(),
        "Applied schema statements"
    );
    Ok(MigrationReport {
        from_version: stored,
        to_version: version,
        created: creates.len(),
        migrated: migration_statements.len(),
    })
}

/// Snapshot of a database: its version and row counts per user table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseStatus {
    /// `PRAGMA user_version`.
    pub version: u32,
    /// `(table, row count)` for every user table, sorted by name.
    pub tables: Vec<(String, usize)>,
}

/// Reads the version and counts the rows of every user table.
pub fn status(conn: &Connection) -> Result<DatabaseStatus> {
    let version = user_version(conn)?;
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names: Vec<String> = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        // Names come from sqlite_master, so quote rather than validate.
        let quoted = format!("\"{}\"", name.replace('"', "\"\""));
        let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {quoted}"), [], |row| row.get(0))?;
        tables.push((name, count as usize));
    }
    Ok(DatabaseStatus { version, tables })
}

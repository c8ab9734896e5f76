//! SQL generation for the identity-driven write statements.
//!
//! Table and column names are interpolated, so each one is checked with
//! [`validate_identifier`] first. Values are always bound as `?` parameters.

use crate::error::{Result, SqliteError};

/// Validates that a name contains only alphanumeric characters and underscores.
pub(crate) fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SqliteError::InvalidIdentifier(name.to_string()));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SqliteError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// `INSERT INTO {table} (c1, c2) VALUES (?, ?)`.
///
/// With no columns, inserts a row of defaults.
pub fn insert_sql<'a>(table: &str, columns: impl IntoIterator<Item = &'a str>) -> Result<String> {
    validate_identifier(table)?;
    let columns = checked(columns)?;
    if columns.is_empty() {
        return Ok(format!("INSERT INTO {table} DEFAULT VALUES"));
    }
    let placeholders = vec!["?"; columns.len()].join(", ");
    Ok(format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders})",
        columns.join(", ")
    ))
}

/// `UPDATE {table} SET c1 = ?, c2 = ? WHERE {id_column} = ?`.
///
/// Returns `None` when there is nothing to set.
pub fn update_sql<'a>(
    table: &str,
    columns: impl IntoIterator<Item = &'a str>,
    id_column: &str,
) -> Result<Option<String>> {
    validate_identifier(table)?;
    validate_identifier(id_column)?;
    let columns = checked(columns)?;
    if columns.is_empty() {
        return Ok(None);
    }
    let assignments = columns
        .iter()
        .map(|c| format!("{c} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    Ok(Some(format!(
        "UPDATE {table} SET {assignments} WHERE {id_column} = ?"
    )))
}

/// `DELETE FROM {table} WHERE {id_column} = ?`.
pub fn delete_sql(table: &str, id_column: &str) -> Result<String> {
    validate_identifier(table)?;
    validate_identifier(id_column)?;
    Ok(format!("DELETE FROM {table} WHERE {id_column} = ?"))
}

fn checked<'a>(columns: impl IntoIterator<Item = &'a str>) -> Result<Vec<&'a str>> {
    columns
        .into_iter()
        .map(|c| validate_identifier(c).map(|()| c))
        .collect()
}

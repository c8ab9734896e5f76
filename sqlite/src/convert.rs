//! Conversion between [`rowmap_core::Value`] and SQLite values.

use rowmap_core::Value;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Params, Statement, params_from_iter};

use crate::error::{Result, SqliteError};

/// Converts a cell value into an owned SQLite value for binding.
pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(*i),
        Value::Real(f) => SqlValue::Real(*f),
        Value::Text(s) => SqlValue::Text(s.clone()),
        Value::Blob(b) => SqlValue::Blob(b.clone()),
    }
}

/// Converts a borrowed SQLite cell into a cell value.
///
/// Text that is not valid UTF-8 is a conversion error.
pub(crate) fn from_sql(value: ValueRef<'_>) -> Result<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(bytes) => Value::Text(
            std::str::from_utf8(bytes)
                .map_err(|e| SqliteError::ConversionError(format!("invalid UTF-8 text: {e}")))?
                .to_string(),
        ),
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    })
}

/// Bindable parameter list.
pub(crate) fn bind<'a>(values: impl IntoIterator<Item = &'a Value>) -> impl Params {
    params_from_iter(values.into_iter().map(to_sql).collect::<Vec<_>>())
}

/// Runs a prepared statement and materializes every row.
pub(crate) fn collect_rows(stmt: &mut Statement<'_>, params: impl Params) -> Result<Vec<Vec<Value>>> {
    let width = stmt.column_count();
    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let cells = (0..width)
            .map(|i| from_sql(row.get_ref(i)?))
            .collect::<Result<Vec<_>>>()?;
        out.push(cells);
    }
    Ok(out)
}

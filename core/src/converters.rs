//! Reusable read converters.
//!
//! Each function returns a [`ReadConverter`] for use in a
//! [`ColumnSpec`](crate::ColumnSpec). Every converter maps a `NULL` cell to
//! [`Value::Null`]; coercion beyond that is per converter.
//!
//! ```
//! use rowmap_core::{Value, converters};
//!
//! let row = vec![Value::from("42"), Value::Null];
//! assert_eq!(converters::integer()(&row, 0).unwrap(), Value::Integer(42));
//! assert_eq!(converters::integer()(&row, 1).unwrap(), Value::Null);
//! ```

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime};

use crate::column::ReadConverter;
use crate::error::ConvertError;
use crate::value::Value;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"];

/// Returns the cell at `index`, or an out-of-range error.
pub fn cell(row: &[Value], index: usize) -> Result<&Value, ConvertError> {
    row.get(index).ok_or(ConvertError::OutOfRange {
        index,
        len: row.len(),
    })
}

fn mismatch(expected: &'static str, found: &Value) -> ConvertError {
    ConvertError::Mismatch {
        expected,
        found: format!("{} '{}'", found.kind(), found),
    }
}

/// Integer cells; reals are truncated and numeric text is parsed.
pub fn integer() -> ReadConverter {
    Arc::new(|row: &[Value], index: usize| {
        let value = cell(row, index)?;
        match value {
            Value::Null | Value::Integer(_) => Ok(value.clone()),
            Value::Real(f) => Ok(Value::Integer(*f as i64)),
            Value::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| mismatch("integer", value)),
            Value::Blob(_) => Err(mismatch("integer", value)),
        }
    })
}

/// Floating point cells; integers are widened and numeric text is parsed.
pub fn real() -> ReadConverter {
    Arc::new(|row: &[Value], index: usize| {
        let value = cell(row, index)?;
        match value {
            Value::Null | Value::Real(_) => Ok(value.clone()),
            Value::Integer(i) => Ok(Value::Real(*i as f64)),
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(Value::Real)
                .map_err(|_| mismatch("real", value)),
            Value::Blob(_) => Err(mismatch("real", value)),
        }
    })
}

/// Text cells; numbers are formatted and UTF-8 blobs decoded.
pub fn text() -> ReadConverter {
    Arc::new(|row: &[Value], index: usize| {
        let value = cell(row, index)?;
        match value {
            Value::Null | Value::Text(_) => Ok(value.clone()),
            Value::Integer(_) | Value::Real(_) => Ok(Value::Text(value.to_string())),
            Value::Blob(b) => String::from_utf8(b.clone())
                .map(Value::Text)
                .map_err(|_| mismatch("text", value)),
        }
    })
}

/// Boolean stored as integer; normalized to `0` or `1`.
pub fn boolean() -> ReadConverter {
    Arc::new(|row: &[Value], index: usize| {
        let value = cell(row, index)?;
        match value {
            Value::Null => Ok(Value::Null),
            Value::Integer(i) => Ok(Value::Integer(i64::from(*i != 0))),
            Value::Real(f) => Ok(Value::Integer(i64::from(*f != 0.0))),
            Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => Ok(Value::Integer(1)),
                "0" | "false" | "no" => Ok(Value::Integer(0)),
                _ => Err(mismatch("boolean", value)),
            },
            Value::Blob(_) => Err(mismatch("boolean", value)),
        }
    })
}

/// Timestamp as epoch milliseconds.
///
/// Integer cells are taken as milliseconds already. Text cells are parsed as
/// RFC 3339 or as `YYYY-MM-DD HH:MM:SS[.fff]` in UTC (SQLite's
/// `datetime('now')` shape).
pub fn timestamp() -> ReadConverter {
    Arc::new(|row: &[Value], index: usize| {
        let value = cell(row, index)?;
        match value {
            Value::Null | Value::Integer(_) => Ok(value.clone()),
            Value::Real(f) => Ok(Value::Integer(*f as i64)),
            Value::Text(s) => parse_timestamp_millis(s)
                .map(Value::Integer)
                .ok_or_else(|| mismatch("timestamp", value)),
            Value::Blob(_) => Err(mismatch("timestamp", value)),
        }
    })
}

fn parse_timestamp_millis(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc().timestamp_millis())
}

/// Byte cells; text is taken as its UTF-8 bytes.
pub fn blob() -> ReadConverter {
    Arc::new(|row: &[Value], index: usize| {
        let value = cell(row, index)?;
        match value {
            Value::Null | Value::Blob(_) => Ok(value.clone()),
            Value::Text(s) => Ok(Value::Blob(s.as_bytes().to_vec())),
            other => Err(mismatch("blob", other)),
        }
    })
}

/// Passes the cell through unchanged.
pub fn raw() -> ReadConverter {
    Arc::new(|row: &[Value], index: usize| cell(row, index).cloned())
}

/// Looks up a converter by its configuration name.
///
/// Accepted names: `integer`/`int`, `real`/`float`, `text`/`string`,
/// `boolean`/`bool`, `timestamp`, `blob`, `raw`.
pub fn by_name(name: &str) -> Option<ReadConverter> {
    match name.trim().to_ascii_lowercase().as_str() {
        "integer" | "int" => Some(integer()),
        "real" | "float" => Some(real()),
        "text" | "string" => Some(text()),
        "boolean" | "bool" => Some(boolean()),
        "timestamp" => Some(timestamp()),
        "blob" => Some(blob()),
        "raw" => Some(raw()),
        _ => None,
    }
}

//! Cell values and records.
//!
//! [`Value`] is the scalar exchanged with the engine; [`Record`] is the
//! domain object shape, an attribute-keyed map that may be sparse. Typed
//! domain structs cross into records through serde.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ConvertError, Result, StoreError};

/// A single storage cell or attribute value.
///
/// # Examples
///
/// ```
/// use rowmap_core::Value;
///
/// assert_eq!(Value::from(7), Value::Integer(7));
/// assert_eq!(Value::from(None::<String>), Value::Null);
/// assert!(Value::from("").is_blank());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// SQL `NULL`.
    #[default]
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Blob(Vec<u8>),
}

impl Value {
    /// Returns `true` for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` for `Null` and for empty text.
    ///
    /// This is the "no id given" test used by the id-based operations.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Short name of the variant, used in conversion diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Text(_) => "text",
            Value::Blob(_) => "blob",
        }
    }

    /// Returns the integer payload, if any.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the text payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Coerces the value to an integer count.
    ///
    /// Integers pass through, reals are truncated and numeric text is parsed.
    pub fn to_count(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Real(f) => Some(*f as i64),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Converts a JSON value into a cell value.
    ///
    /// Booleans become `0`/`1`; arrays and objects are stored as JSON text.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Integer(i64::from(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => n.as_f64().map(Value::Real).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Text(s.clone()),
            other => Value::Text(other.to_string()),
        }
    }

    /// Converts the cell value into JSON.
    ///
    /// Blobs are rendered as arrays of byte values.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Real(f) => serde_json::Value::from(*f),
            Value::Text(s) => serde_json::Value::from(s.as_str()),
            Value::Blob(b) => serde_json::Value::from(b.clone()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::Text(s) => f.write_str(s),
            Value::Blob(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A domain object: attribute name to value.
///
/// Records are sparse. An attribute that was never set is absent, which is
/// different from an attribute explicitly set to [`Value::Null`].
///
/// # Examples
///
/// ```
/// use rowmap_core::{Record, Value};
///
/// let user = Record::new().with("id", 1).with("name", "Alice");
/// assert_eq!(user.get("name"), Some(&Value::from("Alice")));
/// assert!(user.get("email").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(attribute, value);
        self
    }

    /// Sets an attribute, returning the previous value.
    pub fn set(&mut self, attribute: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(attribute.into(), value.into())
    }

    /// Returns the attribute value if present.
    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.fields.get(attribute)
    }

    /// Removes an attribute.
    pub fn remove(&mut self, attribute: &str) -> Option<Value> {
        self.fields.remove(attribute)
    }

    /// Returns `true` if the attribute is present (even if `Null`).
    pub fn contains(&self, attribute: &str) -> bool {
        self.fields.contains_key(attribute)
    }

    /// Number of present attributes.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when no attribute is present.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates attributes in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Builds a record from a serializable value.
    ///
    /// Returns `None` when `model` does not serialize to a JSON object (for
    /// example `()` or `None`), which callers treat as "no object".
    pub fn from_serialize<T: Serialize + ?Sized>(model: &T) -> Result<Option<Self>> {
        match serde_json::to_value(model)? {
            serde_json::Value::Object(map) => Ok(Some(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            )),
            _ => Ok(None),
        }
    }

    /// Deserializes the record into a typed model.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.to_json()).map_err(|e| {
            StoreError::Conversion(ConvertError::Custom(format!(
                "record does not match model: {e}"
            )))
        })
    }

    /// Renders the record as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

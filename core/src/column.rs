//! Column specifications.
//!
//! A [`ColumnSpec`] is the caller's declaration of one column. Registration
//! turns each valid spec into a [`BoundColumn`], which carries the field
//! accessor used on the write path next to the read converter used on the
//! read path, so both directions share the same column knowledge.

use std::fmt;
use std::sync::Arc;

use crate::error::{ConvertError, Result, StoreError};
use crate::schema::validate_identifier;
use crate::value::{Record, Value};

/// Read converter: turns the cell at `index` of a raw row into a domain value.
pub type ReadConverter =
    Arc<dyn Fn(&[Value], usize) -> std::result::Result<Value, ConvertError> + Send + Sync>;

/// Field accessor: reads one attribute off a record.
pub type FieldAccessor = Arc<dyn Fn(&Record) -> Field + Send + Sync>;

/// Result of looking up one attribute on a record.
///
/// `Missing` is distinct from a present `Null` or empty value: a sparse
/// record simply does not mention the attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    /// The attribute is not set on the record.
    Missing,
    /// The attribute is set, possibly to `Null`.
    Present(Value),
}

impl Field {
    /// Storage value for this field; `Missing` becomes `Null`.
    pub fn into_value(self) -> Value {
        match self {
            Field::Missing => Value::Null,
            Field::Present(v) => v,
        }
    }

    /// Returns `true` for `Missing`.
    pub fn is_missing(&self) -> bool {
        matches!(self, Field::Missing)
    }
}

/// Declarative description of one column.
///
/// # Examples
///
/// ```
/// use rowmap_core::{ColumnSpec, converters};
///
/// let spec = ColumnSpec::mapped("user_name", "name", converters::text());
/// assert!(spec.validate().is_ok());
///
/// // Without a read converter the column is rejected at registration.
/// let incomplete = ColumnSpec::new("user_name").attribute("name");
/// assert!(incomplete.validate().is_err());
/// ```
#[derive(Clone)]
pub struct ColumnSpec {
    column: String,
    attribute: Option<String>,
    reader: Option<ReadConverter>,
    accessor: Option<FieldAccessor>,
}

impl ColumnSpec {
    /// Starts a spec for the given storage column.
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            attribute: None,
            reader: None,
            accessor: None,
        }
    }

    /// Complete spec in one call.
    pub fn mapped(
        column: impl Into<String>,
        attribute: impl Into<String>,
        reader: ReadConverter,
    ) -> Self {
        Self::new(column).attribute(attribute).reader(reader)
    }

    /// Sets the object-side attribute name.
    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Sets the read converter.
    pub fn reader(mut self, reader: ReadConverter) -> Self {
        self.reader = Some(reader);
        self
    }

    /// Overrides how the attribute is read off a record on writes.
    ///
    /// The default accessor looks the attribute up by name.
    pub fn accessor<F>(mut self, accessor: F) -> Self
    where
        F: Fn(&Record) -> Field + Send + Sync + 'static,
    {
        self.accessor = Some(Arc::new(accessor));
        self
    }

    /// Storage-side column name.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Object-side attribute name, if set.
    pub fn attribute_name(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Checks that the spec is complete and its names are plain identifiers.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| StoreError::InvalidColumn {
            column: self.column.clone(),
            reason: reason.to_string(),
        };
        validate_identifier(&self.column).map_err(|_| invalid("column name must be a plain identifier"))?;
        match self.attribute.as_deref() {
            None | Some("") => return Err(invalid("missing attribute name")),
            Some(_) => {}
        }
        if self.reader.is_none() {
            return Err(invalid("missing read converter"));
        }
        Ok(())
    }

    /// Validates the spec and binds its field accessor.
    pub fn bind(&self) -> Result<BoundColumn> {
        self.validate()?;
        let attribute = self.attribute.clone().unwrap_or_default();
        let reader = self
            .reader
            .clone()
            .ok_or_else(|| StoreError::InvalidColumn {
                column: self.column.clone(),
                reason: "missing read converter".to_string(),
            })?;
        let accessor = match &self.accessor {
            Some(accessor) => Arc::clone(accessor),
            None => {
                let key = attribute.clone();
                Arc::new(move |record: &Record| match record.get(&key) {
                    Some(value) => Field::Present(value.clone()),
                    None => Field::Missing,
                }) as FieldAccessor
            }
        };
        Ok(BoundColumn {
            column: self.column.clone(),
            attribute,
            reader,
            accessor,
        })
    }
}

impl fmt::Debug for ColumnSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnSpec")
            .field("column", &self.column)
            .field("attribute", &self.attribute)
            .field("reader", &self.reader.is_some())
            .field("accessor", &self.accessor.is_some())
            .finish()
    }
}

/// A validated column with its accessor and read converter bound.
#[derive(Clone)]
pub struct BoundColumn {
    column: String,
    attribute: String,
    reader: ReadConverter,
    accessor: FieldAccessor,
}

impl BoundColumn {
    /// Storage-side column name.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Object-side attribute name.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Reads this column's attribute off a record.
    pub fn lookup(&self, record: &Record) -> Field {
        (self.accessor)(record)
    }

    /// Converts the cell at `index` of `row`.
    pub fn read(&self, row: &[Value], index: usize) -> std::result::Result<Value, ConvertError> {
        (self.reader)(row, index)
    }
}

impl fmt::Debug for BoundColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundColumn")
            .field("column", &self.column)
            .field("attribute", &self.attribute)
            .finish_non_exhaustive()
    }
}

//! Table identity descriptors.
//!
//! A [`TableIdentity`] is what the write path hands to the engine: the table
//! name, the id column, and the bound columns in declaration order. It is
//! rebuilt every time its schema is registered.

use std::sync::Arc;

use tracing::error;

use crate::column::{BoundColumn, Field};
use crate::error::Result;
use crate::schema::TableSchema;
use crate::value::Record;

/// Per-table write descriptor.
#[derive(Debug, Clone)]
pub struct TableIdentity {
    table: String,
    id_column: String,
    columns: Arc<[BoundColumn]>,
}

impl TableIdentity {
    /// Builds the identity for `schema`.
    ///
    /// Invalid column specs are logged and left out; the identity keeps the
    /// remaining columns in declaration order.
    pub fn from_schema(schema: &TableSchema) -> Result<Self> {
        schema.validate()?;
        let columns: Vec<BoundColumn> = schema
            .columns()
            .iter()
            .filter_map(|spec| match spec.bind() {
                Ok(bound) => Some(bound),
                Err(e) => {
                    error!(table = schema.name(), column = spec.column(), error = %e, "Rejected column mapping");
                    None
                }
            })
            .collect();
        Ok(Self {
            table: schema.name().to_string(),
            id_column: schema.id_column_name().to_string(),
            columns: columns.into(),
        })
    }

    /// Table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Id column name.
    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Bound columns in declaration order.
    pub fn columns(&self) -> &[BoundColumn] {
        &self.columns
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(BoundColumn::column)
    }

    /// Comma-separated column list for `SELECT` statements.
    ///
    /// ```
    /// use rowmap_core::{ColumnSpec, TableIdentity, TableSchema, converters};
    ///
    /// let schema = TableSchema::new("users")
    ///     .create_sql("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")
    ///     .column(ColumnSpec::mapped("id", "id", converters::integer()))
    ///     .column(ColumnSpec::mapped("name", "name", converters::text()));
    /// let identity = TableIdentity::from_schema(&schema).unwrap();
    /// assert_eq!(identity.base_column_list(), "id, name");
    /// ```
    pub fn base_column_list(&self) -> String {
        self.column_names().collect::<Vec<_>>().join(", ")
    }

    /// Looks up the field mapped to `attribute` on `record`.
    ///
    /// Returns [`Field::Missing`] when the record does not carry it or when
    /// no column maps that attribute.
    pub fn lookup(&self, attribute: &str, record: &Record) -> Field {
        self.columns
            .iter()
            .find(|c| c.attribute() == attribute)
            .map(|c| c.lookup(record))
            .unwrap_or(Field::Missing)
    }

    /// Returns `true` if one of the columns is the id column.
    pub fn has_id_column(&self) -> bool {
        self.columns.iter().any(|c| c.column() == self.id_column)
    }
}

//! Conversion between records and rows.
//!
//! Both directions are driven by the same bound columns: the write path asks
//! each column's accessor for its field, the read path asks each column's
//! read converter for the cell at the column's position. Nothing here knows
//! about concrete types; coercion lives in the converters.

use std::sync::Arc;

use crate::column::{BoundColumn, Field};
use crate::error::ConvertError;
use crate::identity::TableIdentity;
use crate::value::{Record, Value};

/// Converts one raw row into a record.
pub type RowConverter = Arc<dyn Fn(&[Value]) -> Result<Record, ConvertError> + Send + Sync>;

/// Column/value pairs for every column of the identity.
///
/// Attributes missing from the record become [`Value::Null`].
pub fn object_to_row(identity: &TableIdentity, record: &Record) -> Vec<(String, Value)> {
    identity
        .columns()
        .iter()
        .map(|c| (c.column().to_string(), c.lookup(record).into_value()))
        .collect()
}

/// Column/value pairs for the columns whose attribute is present.
///
/// Used by partial updates so a sparse record does not overwrite columns it
/// does not mention.
pub fn object_to_present_row(identity: &TableIdentity, record: &Record) -> Vec<(String, Value)> {
    identity
        .columns()
        .iter()
        .filter_map(|c| match c.lookup(record) {
            Field::Missing => None,
            Field::Present(v) => Some((c.column().to_string(), v)),
        })
        .collect()
}

/// Assembles a fresh record from `row`, one converter call per column.
///
/// Column `i` reads the cell at position `i`, so the row must come from a
/// `SELECT` over the identity's base column list.
pub fn row_to_object(columns: &[BoundColumn], row: &[Value]) -> Result<Record, ConvertError> {
    let mut record = Record::new();
    for (index, column) in columns.iter().enumerate() {
        record.set(column.attribute(), column.read(row, index)?);
    }
    Ok(record)
}

/// Builds the row converter for an identity's columns.
pub fn build_row_converter(identity: &TableIdentity) -> RowConverter {
    let columns: Vec<BoundColumn> = identity.columns().to_vec();
    Arc::new(move |row: &[Value]| row_to_object(&columns, row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnSpec;
    use crate::converters;
    use crate::schema::TableSchema;

    fn identity() -> TableIdentity {
        let schema = TableSchema::new("users")
            .create_sql("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")
            .column(ColumnSpec::mapped("id", "id", converters::integer()))
            .column(ColumnSpec::mapped("name", "name", converters::text()));
        TableIdentity::from_schema(&schema).unwrap()
    }

    #[test]
    fn test_row_to_object_and_back() {
        let identity = identity();
        let convert = build_row_converter(&identity);
        let row = vec![Value::Integer(1), Value::from("Alice")];

        let record = convert(&row).unwrap();
        assert_eq!(record, Record::new().with("id", 1).with("name", "Alice"));

        let pairs = object_to_row(&identity, &record);
        assert_eq!(
            pairs,
            vec![
                ("id".to_string(), Value::Integer(1)),
                ("name".to_string(), Value::from("Alice")),
            ]
        );
        let values: Vec<Value> = pairs.into_iter().map(|(_, v)| v).collect();
        assert_eq!(values, row);
    }

    #[test]
    fn test_sparse_record_maps_missing_to_null() {
        let identity = identity();
        let record = Record::new().with("name", "Bob");
        assert_eq!(
            object_to_row(&identity, &record),
            vec![
                ("id".to_string(), Value::Null),
                ("name".to_string(), Value::from("Bob")),
            ]
        );
        assert_eq!(
            object_to_present_row(&identity, &record),
            vec![("name".to_string(), Value::from("Bob"))]
        );
    }

    #[test]
    fn test_short_row_fails_conversion() {
        let convert = build_row_converter(&identity());
        let err = convert(&[Value::Integer(1)][..]).unwrap_err();
        assert_eq!(err, ConvertError::OutOfRange { index: 1, len: 1 });
    }
}

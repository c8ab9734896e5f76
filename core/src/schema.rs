//! Table schema declarations.
//!
//! A [`TableSchema`] bundles everything the registry needs for one table:
//! the creation statement, migration statements, the version the schema
//! was written for, the id column, and the column specs.
//!
//! Table and column names are interpolated into generated SQL, so they must
//! be plain identifiers (alphanumerics and underscores). Values are always
//! bound as parameters.

use std::fmt;

use crate::column::ColumnSpec;
use crate::convert::RowConverter;
use crate::error::{Result, StoreError};

/// Default id column name.
pub const DEFAULT_ID_COLUMN: &str = "id";

/// Default schema version.
pub const DEFAULT_VERSION: u32 = 1;

/// Validates that a name contains only alphanumeric characters and underscores.
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StoreError::InvalidIdentifier(name.to_string()));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StoreError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// Declaration of one table.
///
/// # Examples
///
/// ```
/// use rowmap_core::{ColumnSpec, TableSchema, converters};
///
/// let users = TableSchema::new("users")
///     .create_sql("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")
///     .migration("ALTER TABLE users ADD COLUMN email TEXT")
///     .version(2)
///     .column(ColumnSpec::mapped("id", "id", converters::integer()))
///     .column(ColumnSpec::mapped("name", "name", converters::text()))
///     .column(ColumnSpec::mapped("email", "email", converters::text()));
///
/// assert_eq!(users.name(), "users");
/// assert_eq!(users.migrations().len(), 1);
/// assert_eq!(users.id_column_name(), "id");
/// ```
#[derive(Clone)]
pub struct TableSchema {
    name: String,
    create_sql: String,
    migrations: Vec<String>,
    version: u32,
    id_column: String,
    columns: Vec<ColumnSpec>,
    row_converter: Option<RowConverter>,
}

impl TableSchema {
    /// Starts a schema for the named table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            create_sql: String::new(),
            migrations: Vec::new(),
            version: DEFAULT_VERSION,
            id_column: DEFAULT_ID_COLUMN.to_string(),
            columns: Vec::new(),
            row_converter: None,
        }
    }

    /// Sets the creation statement.
    pub fn create_sql(mut self, sql: impl Into<String>) -> Self {
        self.create_sql = sql.into();
        self
    }

    /// Appends one migration statement.
    pub fn migration(mut self, sql: impl Into<String>) -> Self {
        self.migrations.push(sql.into());
        self
    }

    /// Replaces the migration statements.
    pub fn migrations_from<I, S>(mut self, statements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.migrations = statements.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the version this declaration corresponds to.
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Sets the id column used by the id-based operations.
    pub fn id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    /// Appends a column spec.
    pub fn column(mut self, spec: ColumnSpec) -> Self {
        self.columns.push(spec);
        self
    }

    /// Supplies a row converter instead of the one built from the columns.
    pub fn row_converter(mut self, converter: RowConverter) -> Self {
        self.row_converter = Some(converter);
        self
    }

    /// Table name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creation statement.
    pub fn create_statement(&self) -> &str {
        &self.create_sql
    }

    /// Migration statements, in order.
    pub fn migrations(&self) -> &[String] {
        &self.migrations
    }

    /// Schema version.
    pub fn schema_version(&self) -> u32 {
        self.version
    }

    /// Id column name.
    pub fn id_column_name(&self) -> &str {
        &self.id_column
    }

    /// Declared column specs, including any that will fail validation.
    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    /// Caller-supplied row converter, if any.
    pub fn custom_row_converter(&self) -> Option<&RowConverter> {
        self.row_converter.as_ref()
    }

    /// Checks the table-level invariants (name and id column).
    ///
    /// Column problems are not reported here; they are handled column by
    /// column during registration.
    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.name)?;
        validate_identifier(&self.id_column)?;
        if self.create_sql.trim().is_empty() {
            return Err(StoreError::InvalidArgument(format!(
                "table '{}' has no creation statement",
                self.name
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for TableSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableSchema")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("id_column", &self.id_column)
            .field("migrations", &self.migrations)
            .field("columns", &self.columns)
            .field("row_converter", &self.row_converter.is_some())
            .finish()
    }
}

//! Graph construction logic for the schema graph.
//!
//! Tables and foreign keys reference each other, so construction happens in
//! phases: every table shell is registered before any foreign key is
//! resolved against it.

use regex::Regex;

use crate::metadata::{ColumnInfo, MetadataSource, SourceError, TableInfo};

use super::foreign_keys;
use super::{Column, DataType, QualifiedName, Schema, TableId};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during schema construction.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Duplicate table: {0}")]
    DuplicateTable(String),

    #[error("Primary key of {table} names unknown column '{column}'")]
    UnknownPrimaryKeyColumn { table: String, column: String },

    #[error("Foreign key {constraint} on {table} names unknown column '{column}'")]
    UnknownForeignKeyColumn {
        constraint: String,
        table: String,
        column: String,
    },
}

pub type SchemaResult<T> = Result<T, SchemaError>;

// ============================================================================
// Builder
// ============================================================================

/// Builds a [`Schema`] from a metadata source.
///
/// # Example
///
/// ```ignore
/// let schema = SchemaBuilder::new(&source).build("main")?;
/// for table in schema.tables() {
///     println!("{} ({} columns)", table.name, table.columns.len());
/// }
/// ```
pub struct SchemaBuilder<'a, S: MetadataSource + ?Sized> {
    source: &'a S,
    exclude: Vec<Regex>,
}

impl<'a, S: MetadataSource + ?Sized> SchemaBuilder<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            exclude: Vec::new(),
        }
    }

    /// Skip tables whose name matches any of the patterns. Foreign keys into
    /// skipped tables are dropped.
    pub fn exclude(mut self, patterns: Vec<Regex>) -> Self {
        self.exclude = patterns;
        self
    }

    fn is_excluded(&self, table: &TableInfo) -> bool {
        self.exclude.iter().any(|re| re.is_match(&table.name))
    }

    /// Construct the schema graph.
    ///
    /// - Phase 1: create table shells
    /// - Phase 2: load columns and primary keys
    /// - Phase 3: aggregate and attach foreign keys
    pub fn build(&self, schema_name: &str) -> SchemaResult<Schema> {
        let mut schema = Schema::new(schema_name);

        // Phase 1: shells
        let mut shells: Vec<(TableId, TableInfo)> = Vec::new();
        for info in self.source.list_tables(schema_name)? {
            if self.is_excluded(&info) {
                log::debug!("excluding table {}", info.name);
                continue;
            }
            let id = schema.add_table_shell(QualifiedName::new(&info.schema, &info.name))?;
            shells.push((id, info));
        }

        // Phase 2: columns and primary keys
        for (id, info) in &shells {
            let columns = self.load_columns(info)?;
            let primary_key = self.load_primary_key(info, &columns)?;

            let table = schema.table_mut(*id);
            table.columns = columns;
            table.primary_key = primary_key;
        }

        // Phase 3: foreign keys
        for (_, info) in &shells {
            let rows = self.source.get_imported_keys(info)?;
            let specs = foreign_keys::aggregate(info, rows);
            foreign_keys::attach(&mut schema, specs)?;
        }

        schema.vendor = self.source.get_vendor_metadata(schema_name)?;

        log::info!(
            "built schema {} with {} tables and {} foreign keys",
            schema_name,
            schema.tables().len(),
            schema.foreign_keys().len()
        );
        Ok(schema)
    }

    fn load_columns(&self, info: &TableInfo) -> SchemaResult<Vec<Column>> {
        let mut columns = Vec::new();
        for column in self.source.get_columns(info)? {
            match build_column(column) {
                Some(column) => columns.push(column),
                None => log::warn!("skipping unnamed column in table {}", info.name),
            }
        }
        Ok(columns)
    }

    /// Resolve the primary key column names against the loaded columns.
    fn load_primary_key(&self, info: &TableInfo, columns: &[Column]) -> SchemaResult<Vec<usize>> {
        let mut key = self.source.get_primary_key(info)?;
        key.sort_by_key(|c| c.key_sequence);

        key.into_iter()
            .map(|pk| {
                columns
                    .iter()
                    .position(|c| c.name == pk.column)
                    .ok_or_else(|| SchemaError::UnknownPrimaryKeyColumn {
                        table: QualifiedName::new(&info.schema, &info.name).to_string(),
                        column: pk.column,
                    })
            })
            .collect()
    }
}

/// Build a column from its metadata row. Rows without a name yield `None`.
fn build_column(info: ColumnInfo) -> Option<Column> {
    let name = info.name?;
    let numeric = crate::metadata::type_codes::is_numeric(info.type_code);

    Some(Column {
        name,
        data_type: DataType {
            name: info.type_name,
            type_code: info.type_code,
            nullable: info.is_nullable,
            precision: if numeric { info.numeric_precision } else { None },
            scale: if numeric { info.numeric_scale } else { None },
        },
        nullable: info.is_nullable,
        unique: info.is_unique,
    })
}

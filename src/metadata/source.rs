//! Driver connectivity traits.
//!
//! `MetadataSource` describes a schema; `RowSource` streams table contents.
//! Both are blocking calls and may run for a long time on large databases.
//! Timeouts and cancellation belong to the implementation, the core only
//! propagates the resulting [`SourceError`](super::SourceError).

use super::error::SourceResult;
use super::types::*;

/// Trait for describing a database schema.
///
/// # Example
///
/// ```ignore
/// use fixgraph::metadata::MetadataSource;
///
/// fn example(source: &impl MetadataSource) -> SourceResult<()> {
///     for table in source.list_tables("main")? {
///         let columns = source.get_columns(&table)?;
///         let keys = source.get_imported_keys(&table)?;
///     }
///     Ok(())
/// }
/// ```
pub trait MetadataSource {
    /// List all tables in a schema.
    fn list_tables(&self, schema: &str) -> SourceResult<Vec<TableInfo>>;

    /// Columns of a table, in ordinal order.
    fn get_columns(&self, table: &TableInfo) -> SourceResult<Vec<ColumnInfo>>;

    /// Primary key columns of a table. Empty when the table has no key.
    fn get_primary_key(&self, table: &TableInfo) -> SourceResult<Vec<PrimaryKeyColumn>>;

    /// Imported keys of a table, one row per (constraint, column pair).
    fn get_imported_keys(&self, table: &TableInfo) -> SourceResult<Vec<ImportedKeyRow>>;

    /// Vendor-specific metadata (constraints, UDTs) attached to the schema as-is.
    fn get_vendor_metadata(&self, _schema: &str) -> SourceResult<VendorMetadata> {
        Ok(VendorMetadata::new())
    }
}

/// A batched cursor over the rows of one table.
pub trait RowCursor {
    /// Fetch the next batch of rows, or `None` when the scan is exhausted.
    fn next_batch(&mut self) -> SourceResult<Option<Vec<Row>>>;
}

/// Trait for scanning table contents.
pub trait RowSource {
    /// Open a full-table scan that fetches at most `fetch_size` rows per batch.
    fn scan<'a>(
        &'a self,
        schema: &str,
        table: &str,
        fetch_size: usize,
    ) -> SourceResult<Box<dyn RowCursor + 'a>>;
}

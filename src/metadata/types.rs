//! Raw metadata and row types reported by a driver.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Vendor type codes, numbered like `java.sql.Types`.
pub mod type_codes {
    pub const BIT: i32 = -7;
    pub const TINYINT: i32 = -6;
    pub const SMALLINT: i32 = 5;
    pub const INTEGER: i32 = 4;
    pub const BIGINT: i32 = -5;
    pub const FLOAT: i32 = 6;
    pub const REAL: i32 = 7;
    pub const DOUBLE: i32 = 8;
    pub const NUMERIC: i32 = 2;
    pub const DECIMAL: i32 = 3;
    pub const CHAR: i32 = 1;
    pub const VARCHAR: i32 = 12;
    pub const CLOB: i32 = 2005;
    pub const BLOB: i32 = 2004;
    pub const BOOLEAN: i32 = 16;
    pub const DATE: i32 = 91;
    pub const TIME: i32 = 92;
    pub const TIMESTAMP: i32 = 93;
    pub const OTHER: i32 = 1111;

    /// Whether values of this type carry a numeric precision and scale.
    pub fn is_numeric(code: i32) -> bool {
        matches!(
            code,
            TINYINT | SMALLINT | INTEGER | BIGINT | FLOAT | REAL | DOUBLE | NUMERIC | DECIMAL
        )
    }
}

/// Basic table information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Schema the table belongs to.
    pub schema: String,
    /// Table name.
    pub name: String,
    /// Table type ("table", "view").
    pub table_type: String,
}

impl TableInfo {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            table_type: "table".to_string(),
        }
    }
}

/// Column information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name. Some drivers report rows without one; those are skipped.
    pub name: Option<String>,
    /// Ordinal position (0-based).
    pub position: i32,
    /// Database-specific type name.
    pub type_name: String,
    /// Vendor type code, see [`type_codes`].
    pub type_code: i32,
    /// Whether NULL values are allowed.
    pub is_nullable: bool,
    /// Whether a single-column unique constraint covers this column.
    #[serde(default)]
    pub is_unique: bool,
    /// Numeric precision.
    #[serde(default)]
    pub numeric_precision: Option<u32>,
    /// Numeric scale.
    #[serde(default)]
    pub numeric_scale: Option<u32>,
}

/// One column of a primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKeyColumn {
    /// Column name.
    pub column: String,
    /// Position within the key (1-based).
    pub key_sequence: u32,
}

/// One row of an imported-key listing: a single column pair of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportedKeyRow {
    /// Constraint name, when the database tracks one.
    pub constraint_name: Option<String>,
    /// Position of the constraint among the table's imported keys (1-based).
    pub constraint_ordinal: u32,
    /// Column on the importing (dependent) table.
    pub source_column: String,
    /// Schema of the referenced table.
    pub target_schema: String,
    /// Referenced table.
    pub target_table: String,
    /// Referenced column.
    pub target_column: String,
    /// Position of this pair within the constraint (1-based).
    pub key_sequence: u32,
}

/// Opaque vendor metadata (constraints, UDTs, DDL) passed through untouched.
pub type VendorMetadata = BTreeMap<String, serde_json::Value>;

/// A driver-native value read from a row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RawValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
}

impl RawValue {
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => write!(f, "NULL"),
            RawValue::Integer(i) => write!(f, "{}", i),
            RawValue::Real(r) => write!(f, "{}", r),
            RawValue::Text(s) => write!(f, "{}", s),
            RawValue::Blob(b) => write!(f, "<{} bytes>", b.len()),
            RawValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// One row of a table scan.
///
/// Column names are shared between all rows of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<RawValue>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<RawValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Look up a value by the exact column name the driver reported.
    pub fn get(&self, column: &str) -> Option<&RawValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    /// Value at a select position.
    pub fn value_at(&self, idx: usize) -> Option<&RawValue> {
        self.values.get(idx)
    }

    /// Column names in select order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// (column, value) pairs in select order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

//! SQLite implementation of the driver traits.
//!
//! Metadata comes from `sqlite_master` and the table-valued pragma
//! functions. SQLite never names foreign keys, so every imported key is
//! reported with `constraint_name: None` and the schema builder
//! synthesises one.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OptionalExtension};

use super::error::{SourceError, SourceResult};
use super::source::{MetadataSource, RowCursor, RowSource};
use super::types::{type_codes, *};

/// Matches the `(p)` or `(p, s)` suffix of a declared type.
static TYPE_ARGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*(\d+)\s*(?:,\s*(\d+)\s*)?\)").unwrap());

/// Metadata and row source backed by a SQLite connection.
pub struct SqliteSource {
    conn: Connection,
}

impl SqliteSource {
    /// Open a database file.
    pub fn open(path: impl AsRef<Path>) -> SourceResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| SourceError::open_failed(path.display().to_string(), e))?;
        Ok(Self { conn })
    }

    /// Open an empty in-memory database (for testing).
    pub fn open_in_memory() -> SourceResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Raw `pragma_table_info` rows: (cid, name, declared type, notnull, pk).
    fn table_info(
        &self,
        table: &TableInfo,
    ) -> SourceResult<Vec<(i32, Option<String>, String, bool, u32)>> {
        let mut stmt = self.conn.prepare(
            "SELECT cid, name, type, \"notnull\", pk FROM pragma_table_info(?1, ?2) ORDER BY cid",
        )?;
        let rows = stmt
            .query_map(params![table.name, table.schema], |row| {
                Ok((
                    row.get::<_, i32>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    row.get::<_, bool>(3)?,
                    row.get::<_, u32>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if rows.is_empty() {
            return Err(SourceError::TableNotFound(format!(
                "{}.{}",
                table.schema, table.name
            )));
        }
        Ok(rows)
    }

    /// Columns covered by a single-column unique index.
    fn unique_columns(&self, table: &TableInfo) -> SourceResult<HashSet<String>> {
        let mut indexes = self
            .conn
            .prepare("SELECT name FROM pragma_index_list(?1, ?2) WHERE \"unique\" = 1")?;
        let names = indexes
            .query_map(params![table.name, table.schema], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut info = self
            .conn
            .prepare("SELECT name FROM pragma_index_info(?1, ?2)")?;
        let mut unique = HashSet::new();
        for index in names {
            let columns = info
                .query_map(params![index, table.schema], |row| {
                    row.get::<_, Option<String>>(0)
                })?
                .collect::<Result<Vec<_>, _>>()?;
            if let [Some(column)] = columns.as_slice() {
                unique.insert(column.clone());
            }
        }
        Ok(unique)
    }

    /// Whether `table` is an ordinary rowid table (not `WITHOUT ROWID` or virtual).
    fn has_rowid(&self, schema: &str, table: &str) -> SourceResult<bool> {
        let without_rowid: Option<bool> = self
            .conn
            .query_row(
                "SELECT wr FROM pragma_table_list WHERE schema = ?1 AND name = ?2 AND type = 'table'",
                params![schema, table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(without_rowid == Some(false))
    }
}

impl MetadataSource for SqliteSource {
    fn list_tables(&self, schema: &str) -> SourceResult<Vec<TableInfo>> {
        let sql = format!(
            "SELECT name, type FROM {}.sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid",
            quote_ident(schema)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tables = stmt
            .query_map([], |row| {
                Ok(TableInfo {
                    schema: schema.to_string(),
                    name: row.get(0)?,
                    table_type: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tables)
    }

    fn get_columns(&self, table: &TableInfo) -> SourceResult<Vec<ColumnInfo>> {
        let info = self.table_info(table)?;
        let mut unique = self.unique_columns(table)?;

        let pk: Vec<_> = info.iter().filter(|c| c.4 > 0).collect();
        if let [(_, Some(name), ..)] = pk.as_slice() {
            unique.insert(name.clone());
        }

        Ok(info
            .iter()
            .map(|(cid, name, declared, not_null, pk)| {
                let type_code = type_code_for(declared);
                let (precision, scale) = if type_codes::is_numeric(type_code) {
                    precision_scale(declared)
                } else {
                    (None, None)
                };
                ColumnInfo {
                    is_unique: name.as_ref().is_some_and(|n| unique.contains(n)),
                    name: name.clone(),
                    position: *cid,
                    type_name: declared.clone(),
                    type_code,
                    // SQLite lets rowid-table key columns hold NULL unless declared
                    // otherwise; key columns are treated as NOT NULL regardless.
                    is_nullable: !*not_null && *pk == 0,
                    numeric_precision: precision,
                    numeric_scale: scale,
                }
            })
            .collect())
    }

    fn get_primary_key(&self, table: &TableInfo) -> SourceResult<Vec<PrimaryKeyColumn>> {
        let mut key: Vec<PrimaryKeyColumn> = self
            .table_info(table)?
            .into_iter()
            .filter(|c| c.4 > 0)
            .filter_map(|(_, name, _, _, pk)| {
                name.map(|column| PrimaryKeyColumn {
                    column,
                    key_sequence: pk,
                })
            })
            .collect();
        key.sort_by_key(|c| c.key_sequence);
        Ok(key)
    }

    fn get_imported_keys(&self, table: &TableInfo) -> SourceResult<Vec<ImportedKeyRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, seq, \"table\", \"from\", \"to\" \
             FROM pragma_foreign_key_list(?1, ?2) ORDER BY id, seq",
        )?;
        let raw = stmt
            .query_map(params![table.name, table.schema], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if raw.is_empty() {
            return Ok(Vec::new());
        }

        // Group pairs per constraint id
        let mut groups: BTreeMap<i64, Vec<(u32, String, String, Option<String>)>> =
            BTreeMap::new();
        for (id, seq, target, from, to) in raw {
            groups.entry(id).or_default().push((seq, target, from, to));
        }

        // SQLite numbers constraints in reverse declaration order; report them
        // in the order their first column appears in the table instead.
        let positions: HashMap<String, i32> = self
            .table_info(table)?
            .into_iter()
            .filter_map(|(cid, name, ..)| name.map(|n| (n, cid)))
            .collect();
        let mut groups: Vec<_> = groups.into_values().collect();
        groups.sort_by_key(|pairs| {
            pairs
                .first()
                .and_then(|(_, _, from, _)| positions.get(from).copied())
                .unwrap_or(i32::MAX)
        });

        let mut rows = Vec::new();
        for (ordinal, pairs) in groups.into_iter().enumerate() {
            let mut target_key: Option<Vec<PrimaryKeyColumn>> = None;
            for (seq, target, from, to) in pairs {
                let target_column = match to {
                    Some(column) => column,
                    None => {
                        // `REFERENCES t` without columns targets t's primary key
                        if target_key.is_none() {
                            target_key = Some(
                                self.get_primary_key(&TableInfo::new(&table.schema, &target))?,
                            );
                        }
                        target_key
                            .as_ref()
                            .and_then(|key| key.get(seq as usize))
                            .map(|c| c.column.clone())
                            .ok_or_else(|| {
                                SourceError::TableNotFound(format!("{}.{}", table.schema, target))
                            })?
                    }
                };
                rows.push(ImportedKeyRow {
                    constraint_name: None,
                    constraint_ordinal: ordinal as u32 + 1,
                    source_column: from,
                    target_schema: table.schema.clone(),
                    target_table: target,
                    target_column,
                    key_sequence: seq + 1,
                });
            }
        }
        Ok(rows)
    }

    fn get_vendor_metadata(&self, schema: &str) -> SourceResult<VendorMetadata> {
        let sql = format!(
            "SELECT name, sql FROM {}.sqlite_master \
             WHERE sql IS NOT NULL AND name NOT LIKE 'sqlite_%' ORDER BY rowid",
            quote_ident(schema)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let ddl: BTreeMap<String, String> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<_, _>>()?;

        let mut vendor = VendorMetadata::new();
        vendor.insert("ddl".to_string(), serde_json::to_value(ddl)?);
        Ok(vendor)
    }
}

impl RowSource for SqliteSource {
    fn scan<'a>(
        &'a self,
        schema: &str,
        table: &str,
        fetch_size: usize,
    ) -> SourceResult<Box<dyn RowCursor + 'a>> {
        let from = format!("{}.{}", quote_ident(schema), quote_ident(table));
        let (sql, paging) = if self.has_rowid(schema, table)? {
            (
                format!("SELECT rowid, * FROM {from} WHERE rowid >= ?1 ORDER BY rowid LIMIT ?2"),
                Paging::Rowid { next: i64::MIN },
            )
        } else {
            let key: Vec<String> = self
                .get_primary_key(&TableInfo::new(schema, table))?
                .iter()
                .map(|c| quote_ident(&c.column))
                .collect();
            let order = if key.is_empty() {
                String::new()
            } else {
                format!(" ORDER BY {}", key.join(", "))
            };
            (
                format!("SELECT * FROM {from}{order} LIMIT ?1 OFFSET ?2"),
                Paging::Offset(0),
            )
        };

        Ok(Box::new(SqliteCursor {
            conn: &self.conn,
            sql,
            fetch_size: fetch_size.max(1),
            paging,
            done: false,
        }))
    }
}

#[derive(Debug, Clone, Copy)]
enum Paging {
    /// Keyset paging; `next` is the smallest rowid not read yet.
    Rowid { next: i64 },
    /// Primary-key ordered `LIMIT/OFFSET` paging.
    Offset(usize),
}

/// Ordered full-table scan, one page per batch.
struct SqliteCursor<'a> {
    conn: &'a Connection,
    sql: String,
    fetch_size: usize,
    paging: Paging,
    done: bool,
}

impl RowCursor for SqliteCursor<'_> {
    fn next_batch(&mut self) -> SourceResult<Option<Vec<Row>>> {
        if self.done {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare_cached(&self.sql)?;
        // The leading rowid column is bookkeeping, not table data
        let skip = usize::from(matches!(self.paging, Paging::Rowid { .. }));
        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .skip(skip)
            .map(String::from)
            .collect::<Vec<_>>()
            .into();

        let limit = self.fetch_size as i64;
        let mut rows = match self.paging {
            Paging::Rowid { next } => stmt.query(params![next, limit])?,
            Paging::Offset(offset) => stmt.query(params![limit, offset as i64])?,
        };
        let mut batch = Vec::with_capacity(self.fetch_size);
        let mut last_rowid = None;
        while let Some(row) = rows.next()? {
            if skip == 1 {
                last_rowid = Some(row.get::<_, i64>(0)?);
            }
            let mut values = Vec::with_capacity(columns.len());
            for idx in skip..skip + columns.len() {
                values.push(raw_value(row.get_ref(idx)?));
            }
            batch.push(Row::new(Arc::clone(&columns), values));
        }

        if batch.len() < self.fetch_size {
            self.done = true;
        }
        match &mut self.paging {
            Paging::Rowid { next } => match last_rowid.and_then(|r| r.checked_add(1)) {
                Some(after) => *next = after,
                None => self.done = true,
            },
            Paging::Offset(offset) => *offset += batch.len(),
        }
        Ok(if batch.is_empty() { None } else { Some(batch) })
    }
}

fn raw_value(value: ValueRef<'_>) -> RawValue {
    match value {
        ValueRef::Null => RawValue::Null,
        ValueRef::Integer(i) => RawValue::Integer(i),
        ValueRef::Real(r) => RawValue::Real(r),
        ValueRef::Text(bytes) => RawValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => RawValue::Blob(bytes.to_vec()),
    }
}

/// Quote an identifier for SQLite.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Map a declared column type to a vendor type code using SQLite's
/// affinity rules, with exact matches for the common ANSI names.
pub fn type_code_for(declared: &str) -> i32 {
    let upper = declared.to_ascii_uppercase();
    let base = upper.split('(').next().unwrap_or("").trim();
    match base {
        "BOOLEAN" | "BOOL" => type_codes::BOOLEAN,
        "BIT" => type_codes::BIT,
        "DATE" => type_codes::DATE,
        "TIME" => type_codes::TIME,
        "DATETIME" | "TIMESTAMP" => type_codes::TIMESTAMP,
        "BIGINT" => type_codes::BIGINT,
        "SMALLINT" => type_codes::SMALLINT,
        "TINYINT" => type_codes::TINYINT,
        "DECIMAL" => type_codes::DECIMAL,
        "NUMERIC" => type_codes::NUMERIC,
        "FLOAT" => type_codes::FLOAT,
        "REAL" => type_codes::REAL,
        "DOUBLE" | "DOUBLE PRECISION" => type_codes::DOUBLE,
        "CHAR" | "CHARACTER" | "NCHAR" => type_codes::CHAR,
        "CLOB" => type_codes::CLOB,
        _ if base.contains("INT") => type_codes::INTEGER,
        _ if base.contains("CHAR") || base.contains("CLOB") || base.contains("TEXT") => {
            type_codes::VARCHAR
        }
        _ if base.is_empty() || base.contains("BLOB") => type_codes::BLOB,
        _ if base.contains("REAL") || base.contains("FLOA") || base.contains("DOUB") => {
            type_codes::DOUBLE
        }
        _ => type_codes::NUMERIC,
    }
}

/// Parse `(precision[, scale])` from a declared type.
fn precision_scale(declared: &str) -> (Option<u32>, Option<u32>) {
    match TYPE_ARGS.captures(declared) {
        Some(caps) => (
            caps.get(1).and_then(|m| m.as_str().parse().ok()),
            caps.get(2).and_then(|m| m.as_str().parse().ok()),
        ),
        None => (None, None),
    }
}

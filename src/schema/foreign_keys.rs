//! Foreign key aggregation.
//!
//! Drivers report imported keys one column pair at a time. This module groups
//! those rows per constraint into ordered composite keys and attaches each
//! resolved key to its source table (outgoing) and target table (incoming).

use crate::metadata::{ImportedKeyRow, TableInfo};

use super::{ForeignKey, ForeignKeyColumn, ForeignKeyId, QualifiedName, Schema, SchemaError, SchemaResult};

/// One column pair of an unresolved foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyColumnSpec {
    pub sequence: u32,
    pub source_column: String,
    pub target_column: String,
}

/// A foreign key as reported by the driver, not yet resolved against tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeySpec {
    pub name: String,
    pub source_table: QualifiedName,
    pub target_table: QualifiedName,
    /// Sorted by sequence.
    pub columns: Vec<ForeignKeyColumnSpec>,
}

/// Name used for constraints the database does not name.
fn synthetic_name(table: &str, ordinal: u32) -> String {
    format!("fk_{}_{}", table, ordinal)
}

/// Group imported-key rows of one table into one spec per constraint.
///
/// Specs keep the order in which their constraint first appears.
pub fn aggregate(table: &TableInfo, rows: Vec<ImportedKeyRow>) -> Vec<ForeignKeySpec> {
    let source_table = QualifiedName::new(&table.schema, &table.name);
    let mut specs: Vec<ForeignKeySpec> = Vec::new();

    for row in rows {
        let name = row
            .constraint_name
            .clone()
            .unwrap_or_else(|| synthetic_name(&table.name, row.constraint_ordinal));

        let idx = match specs.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                specs.push(ForeignKeySpec {
                    name,
                    source_table: source_table.clone(),
                    target_table: QualifiedName::new(&row.target_schema, &row.target_table),
                    columns: Vec::new(),
                });
                specs.len() - 1
            }
        };

        specs[idx].columns.push(ForeignKeyColumnSpec {
            sequence: row.key_sequence,
            source_column: row.source_column,
            target_column: row.target_column,
        });
    }

    for spec in &mut specs {
        spec.columns.sort_by_key(|c| c.sequence);
    }
    specs
}

/// Resolve specs against the schema and attach them to both endpoints.
///
/// A spec whose source or target table is not part of the schema (another
/// schema, or a filtered table) is dropped without error.
pub fn attach(schema: &mut Schema, specs: Vec<ForeignKeySpec>) -> SchemaResult<Vec<ForeignKeyId>> {
    let mut attached = Vec::with_capacity(specs.len());

    for spec in specs {
        let (Some(source), Some(target)) = (
            schema.find_table(&spec.source_table),
            schema.find_table(&spec.target_table),
        ) else {
            log::warn!(
                "dropping foreign key {} from {} to {}: table not in schema",
                spec.name,
                spec.source_table,
                spec.target_table
            );
            continue;
        };

        let source_table = schema.table(source);
        let target_table = schema.table(target);

        let mut columns = Vec::with_capacity(spec.columns.len());
        let mut nullable = false;
        for pair in &spec.columns {
            let source_index = source_table.column_index(&pair.source_column).ok_or_else(|| {
                SchemaError::UnknownForeignKeyColumn {
                    constraint: spec.name.clone(),
                    table: spec.source_table.to_string(),
                    column: pair.source_column.clone(),
                }
            })?;
            let target_index = target_table.column_index(&pair.target_column).ok_or_else(|| {
                SchemaError::UnknownForeignKeyColumn {
                    constraint: spec.name.clone(),
                    table: spec.target_table.to_string(),
                    column: pair.target_column.clone(),
                }
            })?;

            nullable |= source_table.columns[source_index].nullable;
            columns.push(ForeignKeyColumn {
                source_column: pair.source_column.clone(),
                target_column: pair.target_column.clone(),
                source_index,
                target_index,
            });
        }

        let id = schema.add_foreign_key(ForeignKey {
            id: ForeignKeyId(0),
            name: spec.name,
            source,
            target,
            source_table: spec.source_table,
            target_table: spec.target_table,
            columns,
            nullable,
        });
        attached.push(id);
    }

    Ok(attached)
}

//! Row entity extraction.
//!
//! Every row of every requested table becomes one [`Entity`]. Outgoing foreign
//! keys become placeholder references carrying the key values under the
//! target's attribute names; the remaining columns become plain values.

use crate::metadata::{type_codes, RawValue, Row, RowSource};
use crate::schema::{Column, DataType, ForeignKey, Schema, Table, TableId};
use crate::strategy::{RenderedValue, Strategies};

use super::error::{ExtractError, ExtractResult};
use super::{Attribute, Entity, EntitySet, FkTag, Link, Reference, ReferencingEntity, ValueModel};

/// Default number of rows fetched per batch.
pub const DEFAULT_FETCH_SIZE: usize = 500;

/// Characters stripped from a column name when the driver does not report it
/// verbatim.
const QUOTE_CHARS: &[char] = &['"', '`', '[', ']', '\''];

/// Turns table scans into entities.
pub struct EntityExtractor<'a> {
    schema: &'a Schema,
    rows: &'a dyn RowSource,
    strategies: Strategies<'a>,
    fetch_size: usize,
}

impl<'a> EntityExtractor<'a> {
    pub fn new(schema: &'a Schema, rows: &'a dyn RowSource, strategies: Strategies<'a>) -> Self {
        Self {
            schema,
            rows,
            strategies,
            fetch_size: DEFAULT_FETCH_SIZE,
        }
    }

    pub fn fetch_size(mut self, fetch_size: usize) -> Self {
        self.fetch_size = fetch_size.max(1);
        self
    }

    /// Scan the tables in the given order and extract one entity per row.
    pub fn extract(&self, order: &[TableId]) -> ExtractResult<EntitySet> {
        let mut set = EntitySet::new();
        for &table in order {
            let count = self.extract_table(table, &mut set)?;
            log::info!("extracted {} rows from {}", count, self.schema.table(table).name);
        }
        Ok(set)
    }

    fn extract_table(&self, id: TableId, set: &mut EntitySet) -> ExtractResult<usize> {
        let table = self.schema.table(id);
        let layout = TableLayout::new(self.schema, table, &self.strategies);

        let mut cursor = self
            .rows
            .scan(&table.name.schema, &table.name.name, self.fetch_size)?;
        let mut columns: Option<ColumnMap> = None;
        let mut count = 0;

        while let Some(batch) = cursor.next_batch()? {
            let Some(first) = batch.first() else {
                continue;
            };
            if columns.is_none() {
                columns = Some(ColumnMap::new(table, first.columns())?);
            }
            let Some(columns) = columns.as_ref() else {
                continue;
            };

            for row in &batch {
                count += 1;
                let entity = self.extract_row(&layout, columns, row, count)?;
                set.push(entity);
            }
        }
        Ok(count)
    }

    fn extract_row(
        &self,
        layout: &TableLayout<'_>,
        columns: &ColumnMap,
        row: &Row,
        ordinal: usize,
    ) -> ExtractResult<Entity> {
        let table = layout.table;
        let mut entity = Entity::new(table.id, self.label(table, columns, row, ordinal)?);
        let mut attached = vec![false; layout.references.len()];

        // References
        for (slot, (fk, attribute)) in layout.references.iter().enumerate() {
            let target = self.schema.table(fk.target);
            let mut key_values = Vec::with_capacity(fk.columns.len());
            let mut complete = true;

            for pair in &fk.columns {
                let raw = columns.read(table, row, pair.source_index)?;
                if raw.is_null() {
                    complete = false;
                    continue;
                }
                let target_column = &target.columns[pair.target_index];
                key_values.push((
                    self.strategies.naming.attribute_name(target, target_column),
                    self.render(raw, target_column),
                ));
            }

            let link = Link {
                attribute: attribute.clone(),
                foreign_key: fk.id,
                target: Reference::Placeholder(ReferencingEntity {
                    target_table: fk.target,
                    foreign_key: fk.id,
                    key_values,
                }),
            };
            if !fk.nullable {
                entity.required.push(link);
                attached[slot] = true;
            } else if complete {
                entity.optional.insert(attribute.clone(), link);
                attached[slot] = true;
            }
        }

        // Plain values
        for (idx, column) in table.columns.iter().enumerate() {
            if layout.is_consumed(idx, &attached) {
                continue;
            }
            let raw = columns.read(table, row, idx)?;
            if raw.is_null() {
                continue;
            }
            let fk = if layout.in_foreign_key[idx] {
                FkTag::Fk
            } else {
                FkTag::NonFk
            };
            entity.values.push(Attribute {
                name: layout.attributes[idx].clone(),
                value: ValueModel {
                    value: self.render(raw, column),
                    fk,
                },
            });
        }

        // Columns the metadata does not describe
        for &position in &columns.unknown {
            let (Some(name), Some(raw)) = (row.columns().get(position), row.value_at(position)) else {
                continue;
            };
            if raw.is_null() {
                continue;
            }
            let column = undescribed_column(name);
            entity.values.push(Attribute {
                name: self.strategies.naming.attribute_name(table, &column),
                value: ValueModel {
                    value: self.render(raw, &column),
                    fk: FkTag::Unknown,
                },
            });
        }

        Ok(entity)
    }

    fn render(&self, raw: &RawValue, column: &Column) -> RenderedValue {
        let target = self.strategies.types.target_type(column);
        self.strategies
            .values
            .render(raw, &column.data_type.name, column.data_type.type_code, &target)
    }

    /// `table[id=1]`, `table[a=1,b=2]`, or `table[#n]` without a primary key.
    fn label(
        &self,
        table: &Table,
        columns: &ColumnMap,
        row: &Row,
        ordinal: usize,
    ) -> ExtractResult<String> {
        if table.primary_key.is_empty() {
            return Ok(format!("{}[#{}]", table.name.name, ordinal));
        }

        let mut parts = Vec::with_capacity(table.primary_key.len());
        for &idx in &table.primary_key {
            let column = &table.columns[idx];
            let raw = columns.read(table, row, idx)?;
            parts.push(format!("{}={}", column.name, self.render(raw, column)));
        }
        Ok(format!("{}[{}]", table.name.name, parts.join(",")))
    }
}

/// Per-table facts computed once before scanning.
struct TableLayout<'s> {
    table: &'s Table,
    /// Outgoing keys and their reference attribute names.
    references: Vec<(&'s ForeignKey, String)>,
    attributes: Vec<String>,
    in_foreign_key: Vec<bool>,
    /// Key columns and incoming key targets: their values are needed for matching.
    keep_value: Vec<bool>,
}

impl<'s> TableLayout<'s> {
    fn new(schema: &'s Schema, table: &'s Table, strategies: &Strategies<'_>) -> Self {
        let mut references: Vec<(&ForeignKey, String)> = Vec::new();
        for fk in schema.outgoing(table.id) {
            let mut attribute = strategies.naming.reference_name(schema, fk);
            let taken = |name: &str| references.iter().any(|(_, existing)| existing == name);
            if taken(&attribute) {
                let fallback = (2..)
                    .map(|n| format!("{}{}", attribute, n))
                    .find(|candidate| !taken(candidate))
                    .unwrap_or_default();
                log::debug!(
                    "reference name {} on {} already taken, using {}",
                    attribute,
                    table.name,
                    fallback
                );
                attribute = fallback;
            }
            references.push((fk, attribute));
        }

        let attributes = table
            .columns
            .iter()
            .map(|c| strategies.naming.attribute_name(table, c))
            .collect();
        let in_foreign_key = (0..table.columns.len())
            .map(|idx| schema.column_in_foreign_key(table.id, idx))
            .collect();
        let keep_value = (0..table.columns.len())
            .map(|idx| {
                table.is_primary_key(idx)
                    || schema
                        .incoming(table.id)
                        .any(|fk| fk.columns.iter().any(|c| c.target_index == idx))
            })
            .collect();

        Self {
            table,
            references,
            attributes,
            in_foreign_key,
            keep_value,
        }
    }

    /// A column is consumed when every outgoing key it belongs to was attached
    /// as a reference and nothing else needs its value.
    fn is_consumed(&self, column: usize, attached: &[bool]) -> bool {
        if self.keep_value[column] {
            return false;
        }
        let mut keys = self
            .references
            .iter()
            .enumerate()
            .filter(|(_, (fk, _))| fk.contains_source_column(column))
            .peekable();
        keys.peek().is_some() && keys.all(|(slot, _)| attached[slot])
    }
}

/// Where each table column sits in the scanned rows.
struct ColumnMap {
    positions: Vec<usize>,
    /// Row positions not matched by any table column.
    unknown: Vec<usize>,
}

impl ColumnMap {
    fn new(table: &Table, row_columns: &[String]) -> ExtractResult<Self> {
        let mut positions = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            positions.push(locate(table, row_columns, &column.name)?);
        }
        let unknown = (0..row_columns.len())
            .filter(|p| !positions.contains(p))
            .collect();
        Ok(Self { positions, unknown })
    }

    fn read<'r>(&self, table: &Table, row: &'r Row, column: usize) -> ExtractResult<&'r RawValue> {
        self.positions
            .get(column)
            .and_then(|&p| row.value_at(p))
            .ok_or_else(|| ExtractError::ColumnUnreadable {
                table: table.name.to_string(),
                column: table.columns[column].name.clone(),
            })
    }
}

/// Find a column by its declared name, retrying once without quote characters.
fn locate(table: &Table, row_columns: &[String], name: &str) -> ExtractResult<usize> {
    if let Some(position) = row_columns.iter().position(|c| c == name) {
        return Ok(position);
    }

    let stripped: String = name.chars().filter(|c| !QUOTE_CHARS.contains(c)).collect();
    if stripped != name {
        if let Some(position) = row_columns.iter().position(|c| *c == stripped) {
            log::warn!(
                "column {} of {} is reported as {} by the driver; reading it unquoted",
                name,
                table.name,
                stripped
            );
            return Ok(position);
        }
    }

    Err(ExtractError::ColumnUnreadable {
        table: table.name.to_string(),
        column: name.to_string(),
    })
}

fn undescribed_column(name: &str) -> Column {
    Column {
        name: name.to_string(),
        data_type: DataType {
            name: String::new(),
            type_code: type_codes::OTHER,
            nullable: true,
            precision: None,
            scale: None,
        },
        nullable: true,
        unique: false,
    }
}

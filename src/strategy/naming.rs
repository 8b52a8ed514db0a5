//! Naming strategy: output names for tables, columns and foreign keys.
//!
//! The default strategy uses the `inflector` crate with additional handling
//! for irregular plurals that appear in database schemas.

use inflector::Inflector;

use crate::schema::{Column, ForeignKey, Schema, Table};

/// Maps schema identities to output names.
pub trait NamingStrategy {
    /// Type name for entities of a table (e.g. `order_items` -> `OrderItem`).
    fn entity_name(&self, table: &Table) -> String;

    /// Attribute name for a column.
    fn attribute_name(&self, table: &Table, column: &Column) -> String;

    /// Attribute name for the reference a foreign key produces.
    fn reference_name(&self, schema: &Schema, foreign_key: &ForeignKey) -> String;

    /// Parameter name for a foreign key endpoint in a join-table constructor.
    fn parameter_name(&self, schema: &Schema, foreign_key: &ForeignKey) -> String {
        let table = schema.table(foreign_key.source);
        let joined: Vec<String> = foreign_key
            .columns
            .iter()
            .map(|c| self.attribute_name(table, &table.columns[c.source_index]))
            .collect();
        joined.join("_").to_camel_case()
    }
}

/// Naming based on `inflector`: PascalCase entities, camelCase attributes.
#[derive(Debug, Clone)]
pub struct InflectorNaming {
    singularize: bool,
}

impl InflectorNaming {
    pub fn new(singularize: bool) -> Self {
        Self { singularize }
    }
}

impl Default for InflectorNaming {
    fn default() -> Self {
        Self::new(true)
    }
}

impl NamingStrategy for InflectorNaming {
    fn entity_name(&self, table: &Table) -> String {
        let name = if self.singularize {
            singularize(&table.name.name)
        } else {
            table.name.name.clone()
        };
        name.to_pascal_case()
    }

    fn attribute_name(&self, _table: &Table, column: &Column) -> String {
        column.name.to_camel_case()
    }

    fn reference_name(&self, schema: &Schema, foreign_key: &ForeignKey) -> String {
        if let [pair] = foreign_key.columns.as_slice() {
            if let Some(stem) = strip_id_suffix(&pair.source_column) {
                return stem.to_camel_case();
            }
        }
        self.entity_name(schema.table(foreign_key.target))
            .to_camel_case()
    }
}

/// `customer_id` -> `customer`, `parentId` -> `parent`.
fn strip_id_suffix(column: &str) -> Option<&str> {
    if column.len() > 3 && column.to_ascii_lowercase().ends_with("_id") {
        return Some(&column[..column.len() - 3]);
    }
    if column.len() > 2 && column.ends_with("Id") {
        return Some(&column[..column.len() - 2]);
    }
    None
}

/// Known irregular plurals that inflector doesn't handle well for database contexts.
static IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("analysis", "analyses"),
    ("criterion", "criteria"),
    ("datum", "data"),
    ("medium", "media"),
    ("index", "indices"),
    ("matrix", "matrices"),
    ("vertex", "vertices"),
    ("status", "statuses"),
];

/// Singularize a word, handling irregulars first then falling back to inflector.
///
/// Only the last `_`-separated segment is inflected, so `order_items`
/// becomes `order_item`.
pub fn singularize(word: &str) -> String {
    if word.is_empty() {
        return String::new();
    }

    let (prefix, last) = match word.rfind('_') {
        Some(idx) => word.split_at(idx + 1),
        None => ("", word),
    };
    let lower = last.to_lowercase();

    for (singular, plural) in IRREGULAR_PLURALS {
        if lower == *plural || lower == *singular {
            return format!("{}{}", prefix, singular);
        }
    }

    format!("{}{}", prefix, last.to_singular())
}

//! Join (association) table classification.
//!
//! A join table is consumed entirely by its primary key and its outgoing
//! foreign keys. For each table such a join table points at, we record a
//! simplified construction shape: the anchor table itself becomes `this`, every
//! other endpoint becomes a named parameter.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::strategy::NamingStrategy;

use super::{ForeignKeyId, Schema, TableId};

/// One argument of a simplified join-table constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstructorArg {
    /// The anchor entity.
    This,
    /// Another endpoint of the join table.
    Param {
        name: String,
        table: TableId,
        foreign_key: ForeignKeyId,
    },
}

impl fmt::Display for ConstructorArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstructorArg::This => f.write_str("this"),
            ConstructorArg::Param { name, .. } => f.write_str(name),
        }
    }
}

/// Per anchor table: join table -> constructor shape.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JoinSimplifications {
    by_anchor: BTreeMap<TableId, BTreeMap<TableId, Vec<ConstructorArg>>>,
}

impl JoinSimplifications {
    /// Shapes recorded for an anchor table, keyed by join table.
    pub fn for_anchor(&self, anchor: TableId) -> Option<&BTreeMap<TableId, Vec<ConstructorArg>>> {
        self.by_anchor.get(&anchor)
    }

    /// The shape of one join table as seen from one anchor.
    pub fn shape(&self, anchor: TableId, join_table: TableId) -> Option<&[ConstructorArg]> {
        self.by_anchor
            .get(&anchor)
            .and_then(|shapes| shapes.get(&join_table))
            .map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.by_anchor.is_empty()
    }

    /// (anchor, join table, shape) triples.
    pub fn iter(&self) -> impl Iterator<Item = (TableId, TableId, &[ConstructorArg])> {
        self.by_anchor.iter().flat_map(|(&anchor, shapes)| {
            shapes
                .iter()
                .map(move |(&join, args)| (anchor, join, args.as_slice()))
        })
    }
}

/// Whether a table is a join table.
///
/// The table needs a primary key and at least one outgoing foreign key.
/// With a composite key every column must be both a key column and a foreign
/// key column; with a single-column key every column must be one or the other.
pub fn is_join_table(schema: &Schema, id: TableId) -> bool {
    let table = schema.table(id);
    if table.primary_key.is_empty() || table.outgoing.is_empty() {
        return false;
    }

    let composite = table.primary_key.len() > 1;
    (0..table.columns.len()).all(|idx| {
        let in_key = table.is_primary_key(idx);
        let in_fk = schema.outgoing(id).any(|fk| fk.contains_source_column(idx));
        if composite {
            in_key && in_fk
        } else {
            in_key || in_fk
        }
    })
}

/// Classify join tables and build the per-anchor construction shapes.
///
/// When a join table points at the same anchor through several keys, the
/// first key wins.
pub fn classify(schema: &Schema, naming: &dyn NamingStrategy) -> JoinSimplifications {
    let mut result = JoinSimplifications::default();

    for join_table in schema.join_tables() {
        let keys = &schema.table(join_table).outgoing;
        for &anchor_key in keys {
            let anchor = schema.foreign_key(anchor_key).target;
            let args = keys
                .iter()
                .map(|&other| {
                    if other == anchor_key {
                        ConstructorArg::This
                    } else {
                        let fk = schema.foreign_key(other);
                        ConstructorArg::Param {
                            name: naming.parameter_name(schema, fk),
                            table: fk.target,
                            foreign_key: other,
                        }
                    }
                })
                .collect();

            result
                .by_anchor
                .entry(anchor)
                .or_default()
                .entry(join_table)
                .or_insert(args);
        }
        log::debug!("classified {} as join table", schema.table(join_table).name);
    }

    result
}

//! Schema graph: tables, columns and foreign keys.
//!
//! Tables and foreign keys reference each other. The graph is stored as an
//! arena: the [`Schema`] owns every [`Table`] and every [`ForeignKey`], and the
//! cross references are [`TableId`] / [`ForeignKeyId`] indices. Foreign key
//! equality is computed from qualified table names and column names, never by
//! following the indices.
//!
//! Construction happens in three phases (see [`SchemaBuilder`]):
//! - Phase 1: table shells (identity only)
//! - Phase 2: columns and primary keys
//! - Phase 3: foreign keys, attached to both endpoints

mod builder;
pub mod foreign_keys;
pub mod join;

pub use builder::{SchemaBuilder, SchemaError, SchemaResult};
pub use foreign_keys::{ForeignKeyColumnSpec, ForeignKeySpec};
pub use join::{ConstructorArg, JoinSimplifications};

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{Hash, Hasher};

use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::metadata::{type_codes, VendorMetadata};

// ============================================================================
// Identifiers
// ============================================================================

/// Index of a table in its schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TableId(pub usize);

/// Index of a foreign key in its schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ForeignKeyId(pub usize);

/// Schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QualifiedName {
    pub schema: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.schema.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.schema, self.name)
        }
    }
}

// ============================================================================
// Columns
// ============================================================================

/// Data type descriptor of a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataType {
    /// Database-specific type name.
    pub name: String,
    /// Vendor type code.
    pub type_code: i32,
    /// Whether the type admits NULL.
    pub nullable: bool,
    /// Precision, for numeric types only.
    pub precision: Option<u32>,
    /// Scale, for numeric types only.
    pub scale: Option<u32>,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        type_codes::is_numeric(self.type_code)
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub unique: bool,
}

// ============================================================================
// Tables
// ============================================================================

/// A table node.
///
/// Owns its columns. Foreign keys are owned by the schema; the table only
/// lists the ids of keys leaving it (`outgoing`) and pointing at it
/// (`incoming`).
#[derive(Debug, Clone, Serialize)]
pub struct Table {
    pub id: TableId,
    pub name: QualifiedName,
    pub columns: Vec<Column>,
    /// Indices into `columns`, in key sequence order.
    pub primary_key: Vec<usize>,
    pub outgoing: Vec<ForeignKeyId>,
    pub incoming: Vec<ForeignKeyId>,
}

impl Table {
    /// Create an empty shell with identity only.
    fn shell(id: TableId, name: QualifiedName) -> Self {
        Self {
            id,
            name,
            columns: Vec::new(),
            primary_key: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }

    /// Index of a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_primary_key(&self, column: usize) -> bool {
        self.primary_key.contains(&column)
    }

    /// Primary key columns in key order.
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &Column> {
        self.primary_key.iter().map(|&idx| &self.columns[idx])
    }
}

// ============================================================================
// Foreign keys
// ============================================================================

/// One column pair of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ForeignKeyColumn {
    pub source_column: String,
    pub target_column: String,
    /// Index into the source table's columns.
    pub source_index: usize,
    /// Index into the target table's columns.
    pub target_index: usize,
}

/// A (possibly composite) foreign key edge.
#[derive(Debug, Clone, Serialize)]
pub struct ForeignKey {
    pub id: ForeignKeyId,
    pub name: String,
    pub source: TableId,
    pub target: TableId,
    pub source_table: QualifiedName,
    pub target_table: QualifiedName,
    /// Column pairs in declaration sequence.
    pub columns: Vec<ForeignKeyColumn>,
    /// True when any source column admits NULL.
    pub nullable: bool,
}

impl ForeignKey {
    pub fn is_self_reference(&self) -> bool {
        self.source == self.target
    }

    pub fn contains_source_column(&self, column: usize) -> bool {
        self.columns.iter().any(|c| c.source_index == column)
    }
}

impl PartialEq for ForeignKey {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.source_table == other.source_table
            && self.target_table == other.target_table
            && self.columns == other.columns
    }
}

impl Eq for ForeignKey {}

impl Hash for ForeignKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.source_table.hash(state);
        self.target_table.hash(state);
        self.columns.hash(state);
    }
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source: Vec<_> = self.columns.iter().map(|c| c.source_column.as_str()).collect();
        let target: Vec<_> = self.columns.iter().map(|c| c.target_column.as_str()).collect();
        write!(
            f,
            "{} ({}({}) -> {}({}))",
            self.name,
            self.source_table,
            source.join(", "),
            self.target_table,
            target.join(", ")
        )
    }
}

// ============================================================================
// Schema
// ============================================================================

/// The complete schema graph. Read-only once built.
#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    pub name: String,
    tables: Vec<Table>,
    foreign_keys: Vec<ForeignKey>,
    #[serde(skip)]
    table_index: HashMap<QualifiedName, TableId>,
    /// Opaque driver metadata, not interpreted by the core.
    pub vendor: VendorMetadata,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
            foreign_keys: Vec::new(),
            table_index: HashMap::new(),
            vendor: VendorMetadata::new(),
        }
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    pub fn table(&self, id: TableId) -> &Table {
        &self.tables[id.0]
    }

    pub fn foreign_key(&self, id: ForeignKeyId) -> &ForeignKey {
        &self.foreign_keys[id.0]
    }

    pub fn find_table(&self, name: &QualifiedName) -> Option<TableId> {
        self.table_index.get(name).copied()
    }

    /// Find a table by bare name within this schema.
    pub fn find_table_by_name(&self, name: &str) -> Option<TableId> {
        self.find_table(&QualifiedName::new(&self.name, name))
    }

    /// Foreign keys leaving a table.
    pub fn outgoing(&self, id: TableId) -> impl Iterator<Item = &ForeignKey> {
        self.table(id).outgoing.iter().map(|&fk| self.foreign_key(fk))
    }

    /// Foreign keys pointing at a table.
    pub fn incoming(&self, id: TableId) -> impl Iterator<Item = &ForeignKey> {
        self.table(id).incoming.iter().map(|&fk| self.foreign_key(fk))
    }

    /// Whether a column of a table takes part in any foreign key, on either side.
    pub fn column_in_foreign_key(&self, table: TableId, column: usize) -> bool {
        self.outgoing(table).any(|fk| fk.contains_source_column(column))
            || self
                .incoming(table)
                .any(|fk| fk.columns.iter().any(|c| c.target_index == column))
    }

    // =========================================================================
    // Construction (used by the builder)
    // =========================================================================

    pub(crate) fn add_table_shell(&mut self, name: QualifiedName) -> SchemaResult<TableId> {
        if self.table_index.contains_key(&name) {
            return Err(SchemaError::DuplicateTable(name.to_string()));
        }
        let id = TableId(self.tables.len());
        self.tables.push(Table::shell(id, name.clone()));
        self.table_index.insert(name, id);
        Ok(id)
    }

    pub(crate) fn table_mut(&mut self, id: TableId) -> &mut Table {
        &mut self.tables[id.0]
    }

    pub(crate) fn add_foreign_key(&mut self, mut key: ForeignKey) -> ForeignKeyId {
        let id = ForeignKeyId(self.foreign_keys.len());
        key.id = id;
        self.tables[key.source.0].outgoing.push(id);
        self.tables[key.target.0].incoming.push(id);
        self.foreign_keys.push(key);
        id
    }

    // =========================================================================
    // Ordering
    // =========================================================================

    /// Order tables so that every table follows the tables it references
    /// through NOT NULL foreign keys.
    ///
    /// Nullable keys and self references impose no ordering. If NOT NULL keys
    /// form a cycle between tables the discovery order is returned; entity
    /// level ordering still catches genuine row cycles later.
    pub fn creation_order(&self) -> Vec<TableId> {
        let mut dag: DiGraph<TableId, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = self.tables.iter().map(|t| dag.add_node(t.id)).collect();

        for fk in &self.foreign_keys {
            if !fk.nullable && !fk.is_self_reference() {
                dag.add_edge(nodes[fk.target.0], nodes[fk.source.0], ());
            }
        }

        // Kahn's algorithm, lowest discovery index first
        let mut in_degree: Vec<usize> = nodes
            .iter()
            .map(|&n| dag.neighbors_directed(n, petgraph::Direction::Incoming).count())
            .collect();
        let mut ready: BTreeSet<NodeIndex> = nodes
            .iter()
            .copied()
            .filter(|n| in_degree[n.index()] == 0)
            .collect();
        let mut order = Vec::with_capacity(nodes.len());

        while let Some(next) = ready.pop_first() {
            order.push(dag[next]);
            for dependent in dag.neighbors_directed(next, petgraph::Direction::Outgoing) {
                in_degree[dependent.index()] -= 1;
                if in_degree[dependent.index()] == 0 {
                    ready.insert(dependent);
                }
            }
        }

        if order.len() != self.tables.len() {
            log::warn!(
                "NOT NULL foreign keys form a cycle between tables; using discovery order"
            );
            return self.tables.iter().map(|t| t.id).collect();
        }
        order
    }

    /// Tables classified as join/association tables.
    pub fn join_tables(&self) -> Vec<TableId> {
        self.tables
            .iter()
            .filter(|t| join::is_join_table(self, t.id))
            .map(|t| t.id)
            .collect()
    }
}

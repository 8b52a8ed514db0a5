//! Entity model: one entity per extracted row.
//!
//! Entities live in an [`EntitySet`] arena and point at each other through
//! [`EntityId`]s. A reference starts out as a [`Reference::Placeholder`]
//! carrying only the referenced key values, is matched by the
//! [`ReferenceResolver`], and may later be redirected to an existing-entity
//! stand-in by the inclusion pass.
//!
//! ```text
//! extract ──► Placeholder ──resolve──► Resolved(id) ──inclusion──► Resolved(stand-in)
//!                             │
//!                             └──(lenient policy)──► Unresolved
//! ```

mod error;
pub mod extract;
pub mod resolve;

pub use error::{ExtractError, ExtractResult, ResolveError, ResolveResult};
pub use extract::EntityExtractor;
pub use resolve::{ReferenceResolver, ResolveStats, UnresolvedPolicy};

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::schema::{ForeignKeyId, TableId};
use crate::strategy::RenderedValue;

// ============================================================================
// Values
// ============================================================================

/// Index of an entity in its set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(pub usize);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a value's column takes part in a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FkTag {
    NonFk,
    Fk,
    /// The column is not described by the table metadata.
    Unknown,
}

/// A rendered value and its foreign key tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueModel {
    pub value: RenderedValue,
    pub fk: FkTag,
}

/// A named value of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: ValueModel,
}

// ============================================================================
// References
// ============================================================================

/// Placeholder for a referenced row: the target table and the key values
/// needed to find it, keyed by the target's attribute names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferencingEntity {
    pub target_table: TableId,
    pub foreign_key: ForeignKeyId,
    pub key_values: Vec<(String, RenderedValue)>,
}

impl ReferencingEntity {
    pub fn key_value(&self, attribute: &str) -> Option<&RenderedValue> {
        self.key_values
            .iter()
            .find(|(name, _)| name == attribute)
            .map(|(_, value)| value)
    }
}

/// State of one reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "target", rename_all = "snake_case")]
pub enum Reference {
    Placeholder(ReferencingEntity),
    Resolved(EntityId),
    /// No match was found; kept only under the lenient policy.
    Unresolved(ReferencingEntity),
}

impl Reference {
    /// The referenced entity, once resolved.
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Reference::Resolved(id) => Some(*id),
            _ => None,
        }
    }
}

/// A reference attribute produced by one foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub attribute: String,
    pub foreign_key: ForeignKeyId,
    pub target: Reference,
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityKind {
    /// Built from a scanned row.
    Extracted,
    /// Stand-in for an entity assumed to be present already. Never created.
    Existing { replaces: EntityId },
}

/// One row instance.
#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    pub id: EntityId,
    pub table: TableId,
    pub kind: EntityKind,
    /// Diagnostic label, `table[pk=value]`.
    pub label: String,
    pub values: Vec<Attribute>,
    /// NOT NULL references, in foreign key order.
    pub required: Vec<Link>,
    /// Nullable references by attribute name.
    pub optional: BTreeMap<String, Link>,
}

impl Entity {
    /// A fresh entity for a table. The id is assigned by [`EntitySet::push`].
    pub fn new(table: TableId, label: impl Into<String>) -> Self {
        Self {
            id: EntityId(0),
            table,
            kind: EntityKind::Extracted,
            label: label.into(),
            values: Vec::new(),
            required: Vec::new(),
            optional: BTreeMap::new(),
        }
    }

    pub fn value(&self, attribute: &str) -> Option<&ValueModel> {
        self.values
            .iter()
            .find(|a| a.name == attribute)
            .map(|a| &a.value)
    }

    pub fn is_existing(&self) -> bool {
        matches!(self.kind, EntityKind::Existing { .. })
    }

    /// Required links, then optional links.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.required.iter().chain(self.optional.values())
    }

    /// Entities this one must be created after.
    pub fn required_entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.required.iter().filter_map(|link| link.target.entity())
    }

    /// Redirect every reference to `from` at `to`. Returns how many changed.
    pub fn replace_reference(&mut self, from: EntityId, to: EntityId) -> usize {
        let mut changed = 0;
        for link in self.required.iter_mut().chain(self.optional.values_mut()) {
            if link.target == Reference::Resolved(from) {
                link.target = Reference::Resolved(to);
                changed += 1;
            }
        }
        changed
    }

    /// Remove optional links whose target satisfies `pred`, returning their attributes.
    pub fn clear_optional_where(&mut self, pred: impl Fn(EntityId) -> bool) -> Vec<String> {
        let cleared: Vec<String> = self
            .optional
            .iter()
            .filter(|(_, link)| link.target.entity().is_some_and(&pred))
            .map(|(name, _)| name.clone())
            .collect();
        for name in &cleared {
            self.optional.remove(name);
        }
        cleared
    }

    /// A terminal stand-in for this entity: same table and values, no references.
    pub fn existing(&self) -> Entity {
        Entity {
            id: EntityId(0),
            table: self.table,
            kind: EntityKind::Existing { replaces: self.id },
            label: self.label.clone(),
            values: self.values.clone(),
            required: Vec::new(),
            optional: BTreeMap::new(),
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_existing() {
            write!(f, "{} (existing)", self.label)
        } else {
            f.write_str(&self.label)
        }
    }
}

// ============================================================================
// Arena
// ============================================================================

/// Arena of entities. Ids are positions and never reused.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct EntitySet {
    entities: Vec<Entity>,
}

impl EntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity, assigning its id.
    pub fn push(&mut self, mut entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len());
        entity.id = id;
        self.entities.push(entity);
        id
    }

    pub fn get(&self, id: EntityId) -> &Entity {
        &self.entities[id.0]
    }

    pub fn get_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> {
        (0..self.entities.len()).map(EntityId)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn label(&self, id: EntityId) -> String {
        self.get(id).to_string()
    }

    /// Entities of one table, in extraction order.
    pub fn of_table(&self, table: TableId) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.table == table)
    }
}

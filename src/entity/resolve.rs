//! Reference resolution.
//!
//! Placeholders are matched against the extracted entities by target table and
//! key value equality. Candidates are indexed per (table, attribute list) on
//! first use; each key tuple maps to the first entity, in extraction order,
//! that carries it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::schema::{Schema, TableId};
use crate::strategy::RenderedValue;

use super::error::{ResolveError, ResolveResult};
use super::{EntityId, EntitySet, Reference, ReferencingEntity};

/// What to do with a required reference that matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnresolvedPolicy {
    /// Abort the run.
    #[default]
    Fail,
    /// Log a warning and keep an explicit unresolved marker.
    Warn,
}

/// Counters reported after a resolution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveStats {
    pub resolved: usize,
    pub unresolved_optional: usize,
    pub unresolved_required: usize,
}

type KeyIndex = HashMap<Vec<RenderedValue>, EntityId>;

/// Matches placeholder references to entities.
pub struct ReferenceResolver<'a> {
    schema: &'a Schema,
    policy: UnresolvedPolicy,
}

enum Slot {
    Required(usize),
    Optional(String),
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            schema,
            policy: UnresolvedPolicy::default(),
        }
    }

    pub fn policy(mut self, policy: UnresolvedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace every placeholder in the set with a link to its match.
    pub fn resolve(&self, set: &mut EntitySet) -> ResolveResult<ResolveStats> {
        let mut index: HashMap<(TableId, Vec<String>), KeyIndex> = HashMap::new();
        let mut stats = ResolveStats::default();

        for id in set.ids().collect::<Vec<_>>() {
            let pending = pending_placeholders(set, id);

            for (slot, placeholder) in pending {
                let found = self.lookup(set, &mut index, &placeholder);
                let entity = set.get_mut(id);

                match (slot, found) {
                    (Slot::Required(i), Some(target)) => {
                        entity.required[i].target = Reference::Resolved(target);
                        stats.resolved += 1;
                    }
                    (Slot::Optional(name), Some(target)) => {
                        if let Some(link) = entity.optional.get_mut(&name) {
                            link.target = Reference::Resolved(target);
                        }
                        stats.resolved += 1;
                    }
                    (Slot::Optional(name), None) => {
                        log::warn!(
                            "{}: optional reference {} matches no {}, leaving it unset",
                            entity,
                            name,
                            self.describe(&placeholder)
                        );
                        entity.optional.remove(&name);
                        stats.unresolved_optional += 1;
                    }
                    (Slot::Required(i), None) => {
                        let foreign_key = self.schema.foreign_key(placeholder.foreign_key);
                        match self.policy {
                            UnresolvedPolicy::Fail => {
                                return Err(ResolveError::UnresolvedRequired {
                                    entity: entity.to_string(),
                                    foreign_key: foreign_key.name.clone(),
                                    target: self.describe(&placeholder),
                                });
                            }
                            UnresolvedPolicy::Warn => {
                                log::warn!(
                                    "{}: required reference {} matches no {}",
                                    entity,
                                    foreign_key.name,
                                    self.describe(&placeholder)
                                );
                                entity.required[i].target = Reference::Unresolved(placeholder);
                                stats.unresolved_required += 1;
                            }
                        }
                    }
                }
            }
        }

        log::info!(
            "resolved {} references ({} optional and {} required unresolved)",
            stats.resolved,
            stats.unresolved_optional,
            stats.unresolved_required
        );
        Ok(stats)
    }

    /// First entity of the target table whose key attributes equal the placeholder's.
    fn lookup(
        &self,
        set: &EntitySet,
        index: &mut HashMap<(TableId, Vec<String>), KeyIndex>,
        placeholder: &ReferencingEntity,
    ) -> Option<EntityId> {
        // A key with a NULL column matches nothing
        let fk = self.schema.foreign_key(placeholder.foreign_key);
        if placeholder.key_values.len() < fk.columns.len() {
            return None;
        }

        let (attributes, key): (Vec<String>, Vec<RenderedValue>) =
            placeholder.key_values.iter().cloned().unzip();
        let candidates = index
            .entry((placeholder.target_table, attributes))
            .or_insert_with_key(|(table, attributes)| build_index(set, *table, attributes));
        candidates.get(&key).copied()
    }

    /// `table[attr=value,…]` for diagnostics.
    fn describe(&self, placeholder: &ReferencingEntity) -> String {
        let values: Vec<String> = placeholder
            .key_values
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        format!(
            "{}[{}]",
            self.schema.table(placeholder.target_table).name.name,
            values.join(",")
        )
    }
}

/// Placeholders still attached to an entity.
fn pending_placeholders(set: &EntitySet, id: EntityId) -> Vec<(Slot, ReferencingEntity)> {
    let entity = set.get(id);
    let required = entity
        .required
        .iter()
        .enumerate()
        .filter_map(|(i, link)| match &link.target {
            Reference::Placeholder(p) => Some((Slot::Required(i), p.clone())),
            _ => None,
        });
    let optional = entity
        .optional
        .iter()
        .filter_map(|(name, link)| match &link.target {
            Reference::Placeholder(p) => Some((Slot::Optional(name.clone()), p.clone())),
            _ => None,
        });
    required.chain(optional).collect()
}

/// Key tuple -> first entity of `table` carrying it.
fn build_index(set: &EntitySet, table: TableId, attributes: &[String]) -> KeyIndex {
    let mut index = KeyIndex::new();
    for entity in set.of_table(table) {
        let key: Option<Vec<RenderedValue>> = attributes
            .iter()
            .map(|attr| entity.value(attr).map(|v| v.value.clone()))
            .collect();
        if let Some(key) = key {
            index.entry(key).or_insert(entity.id);
        }
    }
    log::debug!(
        "indexed {} keys of table {} on ({})",
        index.len(),
        table.0,
        attributes.join(", ")
    );
    index
}

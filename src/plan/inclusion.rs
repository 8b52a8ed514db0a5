//! Inclusion pass.
//!
//! Walks the sorted entities once and applies a per-entity decision:
//! - keep: the entity stays; it must not require anything dropped earlier
//! - drop: the entity leaves the output and is remembered as dropped
//! - existing: the entity is replaced in place by a stand-in, and every
//!   reference to it, earlier or later in the list, is redirected

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId, EntitySet};
use crate::schema::TableId;

use super::{PlanError, PlanResult};

/// Decision for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Inclusion {
    #[default]
    Keep,
    Drop,
    /// Assume the row is already present in the target system.
    Existing,
}

/// Decides the inclusion of each entity.
pub trait InclusionDecider {
    fn decide(&self, entity: &Entity) -> Inclusion;
}

impl<F> InclusionDecider for F
where
    F: Fn(&Entity) -> Inclusion,
{
    fn decide(&self, entity: &Entity) -> Inclusion {
        self(entity)
    }
}

/// Keeps every entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAll;

impl InclusionDecider for KeepAll {
    fn decide(&self, _entity: &Entity) -> Inclusion {
        Inclusion::Keep
    }
}

/// Per-table decisions with a default for unlisted tables.
#[derive(Debug, Clone, Default)]
pub struct TableRules {
    default: Inclusion,
    tables: HashMap<TableId, Inclusion>,
}

impl TableRules {
    pub fn new(default: Inclusion) -> Self {
        Self {
            default,
            tables: HashMap::new(),
        }
    }

    pub fn with(mut self, table: TableId, inclusion: Inclusion) -> Self {
        self.tables.insert(table, inclusion);
        self
    }
}

impl InclusionDecider for TableRules {
    fn decide(&self, entity: &Entity) -> Inclusion {
        self.tables.get(&entity.table).copied().unwrap_or(self.default)
    }
}

/// Result of the inclusion pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InclusionOutcome {
    /// Final creation order. Stand-ins sit where their originals were.
    pub order: Vec<EntityId>,
    pub dropped: BTreeSet<EntityId>,
    /// Original -> stand-in.
    pub replaced: BTreeMap<EntityId, EntityId>,
}

/// Apply the decider to `order` (a topological order of `set`).
///
/// Stand-ins are appended to the arena. Fails when a kept entity requires an
/// entity that was dropped.
pub fn apply_inclusion(
    set: &mut EntitySet,
    order: &[EntityId],
    decider: &dyn InclusionDecider,
) -> PlanResult<InclusionOutcome> {
    let mut outcome = InclusionOutcome {
        order: Vec::with_capacity(order.len()),
        ..Default::default()
    };

    for (position, &id) in order.iter().enumerate() {
        match decider.decide(set.get(id)) {
            Inclusion::Keep => {
                let entity = set.get(id);
                if let Some(dependency) = entity
                    .required_entities()
                    .find(|dep| outcome.dropped.contains(dep))
                {
                    return Err(PlanError::DroppedDependency {
                        entity: entity.to_string(),
                        dependency: set.label(dependency),
                    });
                }
                clear_dropped(set, id, &outcome.dropped);
                outcome.order.push(id);
            }
            Inclusion::Drop => {
                log::debug!("dropping {}", set.get(id));
                outcome.dropped.insert(id);
            }
            Inclusion::Existing => {
                let stand_in = set.push(set.get(id).existing());
                outcome.replaced.insert(id, stand_in);
                outcome.order.push(stand_in);

                let mut rewritten = 0;
                for &other in outcome.order.iter().chain(&order[position + 1..]) {
                    rewritten += set.get_mut(other).replace_reference(id, stand_in);
                }
                log::debug!(
                    "{} treated as existing, {} references rewritten",
                    set.get(id),
                    rewritten
                );
            }
        }
    }

    // Optional references impose no order, so a kept entity may point at an
    // entity dropped after it was placed.
    for &id in &outcome.order {
        clear_dropped(set, id, &outcome.dropped);
    }

    log::info!(
        "inclusion: {} kept, {} dropped, {} existing",
        outcome.order.len() - outcome.replaced.len(),
        outcome.dropped.len(),
        outcome.replaced.len()
    );
    Ok(outcome)
}

fn clear_dropped(set: &mut EntitySet, id: EntityId, dropped: &BTreeSet<EntityId>) {
    if dropped.is_empty() {
        return;
    }
    let entity = set.get_mut(id);
    for attribute in entity.clear_optional_where(|target| dropped.contains(&target)) {
        log::warn!(
            "{}: clearing optional reference {} to a dropped entity",
            entity,
            attribute
        );
    }
}

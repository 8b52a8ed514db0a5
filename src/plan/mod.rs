//! Fixture planning: ordering entities and applying inclusion decisions.
//!
//! The resulting [`FixturePlan`] is what a code renderer consumes: the schema,
//! the join-table simplifications, the entity arena and the creation order.

pub mod inclusion;
pub mod sort;

pub use inclusion::{apply_inclusion, Inclusion, InclusionDecider, InclusionOutcome, KeepAll, TableRules};
pub use sort::topological_order;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use thiserror::Error;

use crate::entity::{Entity, EntityId, EntitySet};
use crate::schema::{JoinSimplifications, Schema};

pub type PlanResult<T> = Result<T, PlanError>;

/// Data-shape errors that leave no valid creation order.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("required references form a cycle: {}", .entities.join(" -> "))]
    RequiredCycle { entities: Vec<String> },

    #[error("{entity} requires {dependency}, which was dropped")]
    DroppedDependency { entity: String, dependency: String },

    #[error("{entity}: required reference {attribute} was never resolved")]
    UnresolvedPlaceholder { entity: String, attribute: String },
}

/// The ordered output of a run.
#[derive(Debug, Clone, Serialize)]
pub struct FixturePlan {
    pub schema: Schema,
    pub joins: JoinSimplifications,
    pub entities: EntitySet,
    /// Creation order over `entities`.
    pub order: Vec<EntityId>,
    pub dropped: BTreeSet<EntityId>,
    pub replaced: BTreeMap<EntityId, EntityId>,
}

impl FixturePlan {
    /// Sort the entities and apply the inclusion decisions.
    pub fn build(
        schema: Schema,
        joins: JoinSimplifications,
        mut entities: EntitySet,
        decider: &dyn InclusionDecider,
    ) -> PlanResult<Self> {
        let sorted = topological_order(&entities)?;
        let outcome = apply_inclusion(&mut entities, &sorted, decider)?;

        Ok(Self {
            schema,
            joins,
            entities,
            order: outcome.order,
            dropped: outcome.dropped,
            replaced: outcome.replaced,
        })
    }

    /// Entities in creation order.
    pub fn ordered(&self) -> impl Iterator<Item = &Entity> {
        self.order.iter().map(|&id| self.entities.get(id))
    }

    /// Labels in creation order; stand-ins are marked `(existing)`.
    pub fn labels(&self) -> Vec<String> {
        self.ordered().map(ToString::to_string).collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

//! Entity ordering.
//!
//! Only required references are ordering edges. Among entities that are ready
//! at the same time the lowest id (extraction order) goes first, so the output
//! is deterministic.

use std::collections::BTreeSet;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use crate::entity::{EntityId, EntitySet, Reference};

use super::{PlanError, PlanResult};

/// Order entities so that every required dependency precedes its dependent.
///
/// Fails on a placeholder that was never resolved, and on a cycle of required
/// references, naming the entities on the cycle.
pub fn topological_order(set: &EntitySet) -> PlanResult<Vec<EntityId>> {
    let mut dag: DiGraph<EntityId, ()> = DiGraph::with_capacity(set.len(), set.len());
    let nodes: Vec<NodeIndex> = set.ids().map(|id| dag.add_node(id)).collect();

    for entity in set.iter() {
        for link in &entity.required {
            match &link.target {
                Reference::Resolved(dependency) => {
                    dag.add_edge(nodes[dependency.0], nodes[entity.id.0], ());
                }
                Reference::Placeholder(_) => {
                    return Err(PlanError::UnresolvedPlaceholder {
                        entity: entity.to_string(),
                        attribute: link.attribute.clone(),
                    });
                }
                Reference::Unresolved(_) => {}
            }
        }
    }

    let mut in_degree: Vec<usize> = nodes
        .iter()
        .map(|&n| dag.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut ready: BTreeSet<NodeIndex> = nodes
        .iter()
        .copied()
        .filter(|n| in_degree[n.index()] == 0)
        .collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(next) = ready.pop_first() {
        order.push(dag[next]);
        for dependent in dag.neighbors_directed(next, Direction::Outgoing) {
            in_degree[dependent.index()] -= 1;
            if in_degree[dependent.index()] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() != nodes.len() {
        return Err(PlanError::RequiredCycle {
            entities: find_cycle(&dag, set),
        });
    }
    Ok(order)
}

/// Labels of the entities on one required-reference cycle.
fn find_cycle(dag: &DiGraph<EntityId, ()>, set: &EntitySet) -> Vec<String> {
    tarjan_scc(dag)
        .into_iter()
        .find(|scc| scc.len() > 1 || dag.contains_edge(scc[0], scc[0]))
        .map(|mut scc| {
            scc.sort();
            scc.into_iter().map(|n| set.label(dag[n])).collect()
        })
        .unwrap_or_default()
}

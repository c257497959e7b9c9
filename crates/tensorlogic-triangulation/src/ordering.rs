//! Elimination strategies.
//!
//! The strategy decides which nodes the triangulation may eliminate next.
//! The greedy heuristic is the default; callers that already know a good
//! order (or must respect constraints, e.g. eliminating non-query variables
//! first) can fix the order entirely or only partially.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{Result, TriangulationError};
use crate::graph::{NodeId, NodeSet, UndiGraph};

/// Strategy for computing the elimination order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EliminationStrategy {
    /// Simplicial, almost simplicial, quasi simplicial, then min clique weight
    #[default]
    Greedy,
    /// Eliminate the nodes exactly in the given order
    Ordered(Vec<NodeId>),
    /// Eliminate the groups one after the other, greedily inside each group
    PartialOrder(Vec<Vec<NodeId>>),
}

/// A validated strategy, ready to drive the elimination loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum EliminationPlan {
    /// Greedy over the given groups, in sequence
    Greedy(Vec<NodeSet>),
    Fixed(Vec<NodeId>),
}

impl EliminationStrategy {
    /// Check the strategy against the nodes of `graph`.
    pub fn validate(&self, graph: &UndiGraph) -> Result<()> {
        self.plan(graph).map(|_| ())
    }

    pub(crate) fn plan(&self, graph: &UndiGraph) -> Result<EliminationPlan> {
        match self {
            Self::Greedy => {
                let all: NodeSet = graph.nodes().collect();
                let groups = if all.is_empty() { Vec::new() } else { vec![all] };
                Ok(EliminationPlan::Greedy(groups))
            }
            Self::Ordered(order) => {
                check_partition(graph, order.iter().map(std::slice::from_ref))?;
                Ok(EliminationPlan::Fixed(order.clone()))
            }
            Self::PartialOrder(groups) => {
                check_partition(graph, groups.iter().map(Vec::as_slice))?;
                let groups = groups
                    .iter()
                    .filter(|group| !group.is_empty())
                    .map(|group| group.iter().copied().collect())
                    .collect();
                Ok(EliminationPlan::Greedy(groups))
            }
        }
    }
}

/// The groups must cover every node of the graph exactly once.
fn check_partition<'a>(
    graph: &UndiGraph,
    groups: impl Iterator<Item = &'a [NodeId]>,
) -> Result<()> {
    let mut seen = BTreeSet::new();
    for group in groups {
        for &node in group {
            if !graph.exists_node(node) {
                return Err(TriangulationError::InvalidOrder(format!(
                    "node {} does not belong to the graph",
                    node
                )));
            }
            if !seen.insert(node) {
                return Err(TriangulationError::InvalidOrder(format!(
                    "node {} appears more than once",
                    node
                )));
            }
        }
    }

    if let Some(missing) = graph.nodes().find(|node| !seen.contains(node)) {
        return Err(TriangulationError::InvalidOrder(format!(
            "node {} is never eliminated",
            missing
        )));
    }

    Ok(())
}

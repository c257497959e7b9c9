//! Recursive thinning of triangulations.
//!
//! A greedy elimination may add fill-ins that the final triangulated graph
//! does not need. A fill-in `(u, v)` can be dropped, keeping the graph
//! triangulated, whenever the common neighbours of `u` and `v` form a
//! clique. Dropping one fill-in may make another one removable, so the
//! candidates are rescanned until nothing changes (Kjaerulff, 1990).

use indexmap::IndexSet;
use tracing::{trace, warn};

use crate::graph::{Edge, NodeId, NodeSet, UndiGraph};

/// Remove every redundant fill-in from `triangulated`.
///
/// `fill_ins` must list edges of `triangulated` in the order they were
/// added; they are examined from the most recent one. Removed edges are
/// dropped from both `triangulated` and `fill_ins`. Returns the number of
/// removed edges. The result is a minimal triangulation, so a second call
/// removes nothing.
pub fn recursive_thinning(triangulated: &mut UndiGraph, fill_ins: &mut IndexSet<Edge>) -> usize {
    let mut removed = 0;

    loop {
        let candidates: Vec<Edge> = fill_ins.iter().rev().copied().collect();
        let mut changed = false;

        for edge in candidates {
            if is_redundant(triangulated, edge) {
                triangulated.erase_edge(edge.first(), edge.second());
                fill_ins.shift_remove(&edge);
                trace!(first = edge.first(), second = edge.second(), "Removed redundant fill-in");
                removed += 1;
                changed = true;
            }
        }

        if !changed {
            return removed;
        }
    }
}

fn is_redundant(graph: &UndiGraph, edge: Edge) -> bool {
    let (Some(a), Some(b)) = (graph.neighbours(edge.first()), graph.neighbours(edge.second())) else {
        return false;
    };
    let common: NodeSet = a.intersection(b).copied().collect();
    graph.is_complete(&common)
}

/// Derive a perfect elimination order of a triangulated graph.
///
/// At each step the first node of `preferred` that is simplicial in the
/// remaining graph is eliminated. Returns the order and the clique created
/// at each step.
///
/// If no remaining node is simplicial the graph was not triangulated; the
/// neighbourhood of the first remaining node is then completed, and the
/// added edges are recorded in `triangulated` and `fill_ins`.
pub(crate) fn perfect_elimination_order(
    triangulated: &mut UndiGraph,
    fill_ins: &mut IndexSet<Edge>,
    preferred: &[NodeId],
) -> (Vec<NodeId>, Vec<NodeSet>) {
    let mut working = triangulated.clone();
    let mut pending = preferred.to_vec();
    let mut order = Vec::with_capacity(pending.len());
    let mut cliques = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let simplicial = pending.iter().position(|&node| {
            working
                .neighbours(node)
                .map_or(true, |neighbours| working.is_complete(neighbours))
        });

        let index = match simplicial {
            Some(index) => index,
            None => {
                let node = pending[0];
                let neighbours = working.neighbours(node).cloned().unwrap_or_default();
                let missing = working.missing_edges(&neighbours);
                warn!(
                    node,
                    missing = missing.len(),
                    "No simplicial node left, completing a neighbourhood"
                );
                for edge in missing {
                    working.link(edge.first(), edge.second());
                    triangulated.link(edge.first(), edge.second());
                    fill_ins.insert(edge);
                }
                0
            }
        };

        let node = pending.remove(index);
        let mut clique = working.erase_node(node).unwrap_or_default();
        clique.insert(node);
        order.push(node);
        cliques.push(clique);
    }

    (order, cliques)
}

//! Elimination trees.

use std::collections::BTreeMap;

use crate::clique_graph::CliqueGraph;
use crate::error::{Result, TriangulationError};
use crate::graph::{NodeId, NodeSet};

impl CliqueGraph {
    /// Build the elimination tree of an elimination sequence.
    ///
    /// Clique `i` is `cliques[i]`, created when eliminating `order[i]`. Its
    /// parent is the clique of the earliest eliminated node among the other
    /// members of `cliques[i]`. Cliques without such a node are roots, so
    /// disconnected graphs give a forest.
    pub fn from_elimination(order: &[NodeId], cliques: &[NodeSet]) -> Result<Self> {
        if order.len() != cliques.len() {
            return Err(TriangulationError::InvalidOrder(format!(
                "{} eliminated nodes but {} cliques",
                order.len(),
                cliques.len()
            )));
        }

        let mut position = BTreeMap::new();
        for (i, &node) in order.iter().enumerate() {
            if position.insert(node, i).is_some() {
                return Err(TriangulationError::InvalidOrder(format!(
                    "node {} is eliminated twice",
                    node
                )));
            }
        }

        let mut tree = CliqueGraph::new();
        for (i, clique) in cliques.iter().enumerate() {
            if !clique.contains(&order[i]) {
                return Err(TriangulationError::InvalidOrder(format!(
                    "clique {} does not contain its eliminated node {}",
                    i, order[i]
                )));
            }
            tree.add_clique_with_id(i, clique.clone())?;
        }

        for (i, clique) in cliques.iter().enumerate() {
            let mut parent = None;
            for &node in clique.iter().filter(|&&node| node != order[i]) {
                match position.get(&node) {
                    Some(&pos) if pos > i => {
                        parent = Some(parent.map_or(pos, |p: usize| p.min(pos)));
                    }
                    _ => {
                        return Err(TriangulationError::InvalidOrder(format!(
                            "node {} of clique {} is not eliminated after node {}",
                            node, i, order[i]
                        )));
                    }
                }
            }
            if let Some(parent) = parent {
                tree.add_edge(i, parent)?;
            }
        }

        Ok(tree)
    }
}

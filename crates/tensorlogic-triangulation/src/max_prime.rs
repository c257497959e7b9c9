//! Maximal prime subgraph decomposition.
//!
//! Adjacent junction-tree cliques are merged as long as their separator is
//! not complete in the original graph. When the junction tree comes from a
//! minimal triangulation, the remaining cliques are the maximal prime
//! subgraphs of the original graph. Minimality is the caller's
//! responsibility.

use std::collections::BTreeMap;

use tracing::trace;

use crate::clique_graph::{CliqueGraph, CliqueId};
use crate::error::{Result, TriangulationError};
use crate::graph::{Edge, NodeId, UndiGraph};
use crate::junction_tree::{resolve, JunctionTree};

/// Tree of maximal prime subgraphs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MaxPrimeSubgraphTree {
    tree: CliqueGraph,
    created_subgraphs: BTreeMap<NodeId, CliqueId>,
}

impl MaxPrimeSubgraphTree {
    /// Merge the cliques of `junction_tree` across separators that are not
    /// complete in `original`.
    pub fn from_junction_tree(junction_tree: &JunctionTree, original: &UndiGraph) -> Result<Self> {
        let mut tree = junction_tree.tree().clone();
        let mut substitution = BTreeMap::new();

        while let Some(edge) = first_incomplete_separator(&tree, original) {
            let (kept, absorbed) = (edge.first(), edge.second());
            tree.merge_cliques(kept, absorbed)?;
            substitution.insert(absorbed, kept);
            trace!(absorbed, into = kept, "Merged cliques across incomplete separator");
        }

        let created_subgraphs = junction_tree
            .created_cliques()
            .iter()
            .map(|(&node, &clique)| (node, resolve(&substitution, clique)))
            .collect();

        Ok(Self {
            tree,
            created_subgraphs,
        })
    }

    pub fn tree(&self) -> &CliqueGraph {
        &self.tree
    }

    /// Maximal prime subgraph containing the clique created by `node`.
    pub fn created_max_prime_subgraph(&self, node: NodeId) -> Result<CliqueId> {
        self.created_subgraphs
            .get(&node)
            .copied()
            .ok_or(TriangulationError::NodeNotFound(node))
    }
}

fn first_incomplete_separator(
    tree: &CliqueGraph,
    original: &UndiGraph,
) -> Option<Edge> {
    tree.edges()
        .find(|(_, separator)| !original.is_complete(separator))
        .map(|(edge, _)| edge)
}

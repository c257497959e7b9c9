//! Junction trees.
//!
//! A junction tree is obtained from an elimination tree by absorbing every
//! clique that is a subset of one of its neighbours. The compaction keeps
//! the running intersection property of the elimination tree, and no clique
//! of the result is contained in an adjacent clique.
//!
//! # Example
//!
//! ```text
//! path 0-1-2-3, eliminated as [0, 3, 1, 2]
//!
//! elimination tree          junction tree
//! {0,1} - {1,2} - {2}       {0,1} - {1,2} - {2,3}
//!                  |
//!                {2,3}
//! ```

use std::collections::{BTreeMap, VecDeque};

use tracing::trace;

use crate::clique_graph::{CliqueGraph, CliqueId};
use crate::error::{Result, TriangulationError};
use crate::graph::NodeId;

/// Junction tree with the clique created by each eliminated node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JunctionTree {
    tree: CliqueGraph,
    created_cliques: BTreeMap<NodeId, CliqueId>,
}

impl JunctionTree {
    /// Compact an elimination tree built from `order`.
    ///
    /// Clique `i` of `elimination_tree` must be the clique created when
    /// eliminating `order[i]`.
    pub fn from_elimination_tree(elimination_tree: &CliqueGraph, order: &[NodeId]) -> Result<Self> {
        if let Some(id) = (0..order.len()).find(|&id| !elimination_tree.exists_clique(id)) {
            return Err(TriangulationError::CliqueNotFound(id));
        }

        let mut tree = elimination_tree.clone();
        let mut substitution: BTreeMap<CliqueId, CliqueId> = BTreeMap::new();
        let mut queue: VecDeque<CliqueId> = tree.clique_ids().collect();

        while let Some(id) = queue.pop_front() {
            let Ok(nodes) = tree.clique(id) else {
                continue;
            };
            let container = tree.neighbours(id).find(|&neighbour| {
                tree.clique(neighbour)
                    .map_or(false, |other| nodes.is_subset(other))
            });
            let Some(container) = container else {
                continue;
            };

            let touched: Vec<CliqueId> = tree.neighbours(id).collect();
            tree.merge_cliques(container, id)?;
            substitution.insert(id, container);
            trace!(absorbed = id, into = container, "Absorbed clique");

            queue.extend(touched);
        }

        let created_cliques = order
            .iter()
            .enumerate()
            .map(|(id, &node)| (node, resolve(&substitution, id)))
            .collect();

        Ok(Self {
            tree,
            created_cliques,
        })
    }

    /// The compacted clique tree.
    pub fn tree(&self) -> &CliqueGraph {
        &self.tree
    }

    /// Clique that absorbed the clique created by eliminating `node`.
    pub fn created_clique(&self, node: NodeId) -> Result<CliqueId> {
        self.created_cliques
            .get(&node)
            .copied()
            .ok_or(TriangulationError::NodeNotFound(node))
    }

    pub fn created_cliques(&self) -> &BTreeMap<NodeId, CliqueId> {
        &self.created_cliques
    }

    /// Treewidth of the junction tree (largest clique size minus one).
    pub fn treewidth(&self) -> usize {
        self.tree.max_clique_size().saturating_sub(1)
    }

    pub fn verify_running_intersection_property(&self) -> bool {
        self.tree.has_running_intersection()
    }
}

/// Follow a substitution chain to the clique that survived.
pub(crate) fn resolve(substitution: &BTreeMap<CliqueId, CliqueId>, mut id: CliqueId) -> CliqueId {
    while let Some(&next) = substitution.get(&id) {
        id = next;
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeSet;

    fn set(nodes: &[NodeId]) -> NodeSet {
        nodes.iter().copied().collect()
    }

    #[test]
    fn test_path_compaction() {
        let order = [0, 3, 1, 2];
        let cliques = [set(&[0, 1]), set(&[2, 3]), set(&[1, 2]), set(&[2])];
        let elimination_tree = CliqueGraph::from_elimination(&order, &cliques).unwrap();
        let jt = JunctionTree::from_elimination_tree(&elimination_tree, &order).unwrap();

        assert_eq!(jt.tree().size(), 3);
        assert!(!jt.tree().exists_clique(3));
        assert!(jt.tree().exists_edge(0, 2));
        assert!(jt.tree().exists_edge(1, 2));
        assert_eq!(jt.created_clique(2), Ok(1));
        assert_eq!(jt.created_clique(1), Ok(2));
        assert_eq!(jt.treewidth(), 1);
        assert!(jt.verify_running_intersection_property());
    }

    #[test]
    fn test_complete_graph_collapses() {
        let order = [0, 1, 2];
        let cliques = [set(&[0, 1, 2]), set(&[1, 2]), set(&[2])];
        let elimination_tree = CliqueGraph::from_elimination(&order, &cliques).unwrap();
        let jt = JunctionTree::from_elimination_tree(&elimination_tree, &order).unwrap();

        assert_eq!(jt.tree().size(), 1);
        assert_eq!(jt.tree().clique(0).unwrap(), &set(&[0, 1, 2]));
        for node in 0..3 {
            assert_eq!(jt.created_clique(node), Ok(0));
        }
        assert_eq!(jt.created_clique(9), Err(TriangulationError::NodeNotFound(9)));
    }

    #[test]
    fn test_missing_clique() {
        let tree = CliqueGraph::new();
        assert_eq!(
            JunctionTree::from_elimination_tree(&tree, &[0]),
            Err(TriangulationError::CliqueNotFound(0))
        );
    }

    #[test]
    fn test_resolve_chain() {
        let substitution = BTreeMap::from([(0, 2), (2, 5)]);
        assert_eq!(resolve(&substitution, 0), 5);
        assert_eq!(resolve(&substitution, 1), 1);
    }
}

//! Running intersection property check for arbitrary clique graphs.
//!
//! The graph may be cyclic or disconnected. Components are visited one at a
//! time with an explicit stack. A variable owned by an already closed
//! component must not show up again. Inside a component, every occurrence
//! `(clique, variable)` is linked to the occurrences reachable through
//! separators containing the variable, and each variable must end up with a
//! single group of occurrences.

use std::collections::{BTreeMap, BTreeSet};

use crate::clique_graph::{CliqueGraph, CliqueId};
use crate::graph::NodeId;

/// Union-find over the occurrences of one component.
#[derive(Default)]
struct Occurrences {
    index: BTreeMap<(CliqueId, NodeId), usize>,
    parent: Vec<usize>,
}

impl Occurrences {
    fn insert(&mut self, occurrence: (CliqueId, NodeId)) -> usize {
        let next = self.parent.len();
        let id = *self.index.entry(occurrence).or_insert(next);
        if id == next {
            self.parent.push(next);
        }
        id
    }

    fn find(&mut self, mut id: usize) -> usize {
        while self.parent[id] != id {
            self.parent[id] = self.parent[self.parent[id]];
            id = self.parent[id];
        }
        id
    }

    fn union(&mut self, a: (CliqueId, NodeId), b: (CliqueId, NodeId)) {
        let a = self.insert(a);
        let b = self.insert(b);
        let (root_a, root_b) = (self.find(a), self.find(b));
        if root_a != root_b {
            self.parent[root_b] = root_a;
        }
    }

    /// Every variable has exactly one group.
    fn is_connected_per_variable(&mut self) -> bool {
        let occurrences: Vec<_> = self.index.iter().map(|(&key, &id)| (key, id)).collect();
        let mut roots: BTreeMap<NodeId, usize> = BTreeMap::new();
        for ((_, node), id) in occurrences {
            let root = self.find(id);
            if *roots.entry(node).or_insert(root) != root {
                return false;
            }
        }
        true
    }
}

/// Traversal state shared by all components.
struct Traversal<'a> {
    graph: &'a CliqueGraph,
    visited: BTreeSet<CliqueId>,
    closed_variables: BTreeSet<NodeId>,
}

impl<'a> Traversal<'a> {
    fn new(graph: &'a CliqueGraph) -> Self {
        Self {
            graph,
            visited: BTreeSet::new(),
            closed_variables: BTreeSet::new(),
        }
    }

    fn run(mut self) -> bool {
        let graph = self.graph;
        graph
            .clique_ids()
            .all(|start| self.visited.contains(&start) || self.check_component(start))
    }

    fn check_component(&mut self, start: CliqueId) -> bool {
        let graph = self.graph;
        let mut occurrences = Occurrences::default();
        let mut variables = BTreeSet::new();
        let mut stack = vec![start];
        self.visited.insert(start);

        while let Some(clique) = stack.pop() {
            let Ok(nodes) = graph.clique(clique) else {
                return false;
            };
            for &node in nodes {
                if self.closed_variables.contains(&node) {
                    return false;
                }
                variables.insert(node);
                occurrences.insert((clique, node));
            }

            for neighbour in graph.neighbours(clique) {
                let (Ok(separator), Ok(other)) =
                    (graph.separator(clique, neighbour), graph.clique(neighbour))
                else {
                    return false;
                };
                if !separator.is_subset(nodes) || !separator.is_subset(other) {
                    return false;
                }
                for &node in separator {
                    occurrences.union((clique, node), (neighbour, node));
                }
                if self.visited.insert(neighbour) {
                    stack.push(neighbour);
                }
            }
        }

        self.closed_variables.extend(variables);
        occurrences.is_connected_per_variable()
    }
}

/// Whether `graph` satisfies the running intersection property.
pub(crate) fn check(graph: &CliqueGraph) -> bool {
    Traversal::new(graph).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeSet;

    fn set(nodes: &[NodeId]) -> NodeSet {
        nodes.iter().copied().collect()
    }

    fn chain(cliques: &[&[NodeId]]) -> CliqueGraph {
        let mut graph = CliqueGraph::new();
        let ids: Vec<_> = cliques.iter().map(|c| graph.add_clique(set(c))).collect();
        for pair in ids.windows(2) {
            graph.add_edge(pair[0], pair[1]).unwrap();
        }
        graph
    }

    #[test]
    fn test_empty_graph() {
        assert!(check(&CliqueGraph::new()));
    }

    #[test]
    fn test_valid_chain() {
        assert!(check(&chain(&[&[0, 1], &[1, 2], &[2, 3]])));
    }

    #[test]
    fn test_broken_chain() {
        // 0 appears at both ends but not in the middle
        assert!(!check(&chain(&[&[0, 1], &[2, 3], &[0, 4]])));
    }

    #[test]
    fn test_shared_variable_across_components() {
        let mut graph = CliqueGraph::new();
        graph.add_clique(set(&[0, 1]));
        graph.add_clique(set(&[1, 2]));
        assert!(!check(&graph));
    }

    #[test]
    fn test_disjoint_forest() {
        let mut graph = chain(&[&[0, 1], &[1, 2]]);
        graph.add_clique(set(&[3, 4]));
        assert!(check(&graph));
    }

    #[test]
    fn test_cycle_of_cliques() {
        let mut graph = chain(&[&[0, 1], &[1, 2], &[0, 2]]);
        graph.add_edge(0, 2).unwrap();
        assert!(check(&graph));
    }
}

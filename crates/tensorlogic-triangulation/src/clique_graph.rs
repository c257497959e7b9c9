//! Clique graphs: graphs whose nodes are sets of variables.
//!
//! Elimination trees, junction trees and maximal prime subgraph trees are
//! all clique graphs. Every edge carries a separator, the intersection of
//! the two cliques it connects, and the separators are kept up to date by
//! every mutation.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Result, TriangulationError};
use crate::graph::{Edge, NodeId, NodeSet};
use crate::running_intersection;

/// Identifier of a clique.
pub type CliqueId = usize;

/// Graph of cliques with separators on its edges.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CliqueGraph {
    cliques: BTreeMap<CliqueId, NodeSet>,
    neighbours: BTreeMap<CliqueId, BTreeSet<CliqueId>>,
    separators: BTreeMap<Edge, NodeSet>,
}

impl CliqueGraph {
    /// Create an empty clique graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clique with the next free id.
    pub fn add_clique(&mut self, nodes: NodeSet) -> CliqueId {
        let id = self
            .cliques
            .keys()
            .next_back()
            .map_or(0, |&last| last + 1);
        self.cliques.insert(id, nodes);
        self.neighbours.insert(id, BTreeSet::new());
        id
    }

    /// Add a clique with a given id.
    pub fn add_clique_with_id(&mut self, id: CliqueId, nodes: NodeSet) -> Result<()> {
        if self.cliques.contains_key(&id) {
            return Err(TriangulationError::DuplicateClique(id));
        }
        self.cliques.insert(id, nodes);
        self.neighbours.insert(id, BTreeSet::new());
        Ok(())
    }

    /// Remove a clique and its edges, returning its nodes.
    pub fn erase_clique(&mut self, id: CliqueId) -> Option<NodeSet> {
        let nodes = self.cliques.remove(&id)?;
        for neighbour in self.neighbours.remove(&id).unwrap_or_default() {
            if let Some(adj) = self.neighbours.get_mut(&neighbour) {
                adj.remove(&id);
            }
            self.separators.remove(&Edge::new(id, neighbour));
        }
        Some(nodes)
    }

    pub fn clique(&self, id: CliqueId) -> Result<&NodeSet> {
        self.cliques
            .get(&id)
            .ok_or(TriangulationError::CliqueNotFound(id))
    }

    pub fn exists_clique(&self, id: CliqueId) -> bool {
        self.cliques.contains_key(&id)
    }

    /// Connect two cliques. The separator is their intersection.
    ///
    /// Returns `Ok(false)` if the edge already existed.
    pub fn add_edge(&mut self, a: CliqueId, b: CliqueId) -> Result<bool> {
        if a == b {
            return Err(TriangulationError::SelfLoop(a));
        }
        let separator: NodeSet = self
            .clique(a)?
            .intersection(self.clique(b)?)
            .copied()
            .collect();

        let inserted = self.neighbours.entry(a).or_default().insert(b);
        if inserted {
            self.neighbours.entry(b).or_default().insert(a);
            self.separators.insert(Edge::new(a, b), separator);
        }
        Ok(inserted)
    }

    /// Remove an edge. Returns `false` if it was absent.
    pub fn erase_edge(&mut self, a: CliqueId, b: CliqueId) -> bool {
        let removed = self.separators.remove(&Edge::new(a, b)).is_some();
        if removed {
            for (from, to) in [(a, b), (b, a)] {
                if let Some(adj) = self.neighbours.get_mut(&from) {
                    adj.remove(&to);
                }
            }
        }
        removed
    }

    pub fn exists_edge(&self, a: CliqueId, b: CliqueId) -> bool {
        self.separators.contains_key(&Edge::new(a, b))
    }

    /// Separator of the edge between `a` and `b`.
    pub fn separator(&self, a: CliqueId, b: CliqueId) -> Result<&NodeSet> {
        self.separators
            .get(&Edge::new(a, b))
            .ok_or(TriangulationError::EdgeNotFound(a, b))
    }

    /// Neighbours of a clique in increasing id order.
    pub fn neighbours(&self, id: CliqueId) -> impl Iterator<Item = CliqueId> + '_ {
        self.neighbours.get(&id).into_iter().flatten().copied()
    }

    pub fn degree(&self, id: CliqueId) -> usize {
        self.neighbours.get(&id).map_or(0, BTreeSet::len)
    }

    pub fn clique_ids(&self) -> impl Iterator<Item = CliqueId> + '_ {
        self.cliques.keys().copied()
    }

    pub fn cliques(&self) -> impl Iterator<Item = (CliqueId, &NodeSet)> {
        self.cliques.iter().map(|(&id, nodes)| (id, nodes))
    }

    /// Edges with their separators.
    pub fn edges(&self) -> impl Iterator<Item = (Edge, &NodeSet)> {
        self.separators.iter().map(|(&edge, separator)| (edge, separator))
    }

    /// Number of cliques.
    pub fn size(&self) -> usize {
        self.cliques.len()
    }

    pub fn num_edges(&self) -> usize {
        self.separators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cliques.is_empty()
    }

    /// Add a variable to a clique, growing the separators it now shares.
    pub fn add_to_clique(&mut self, id: CliqueId, node: NodeId) -> Result<()> {
        let Self {
            cliques,
            neighbours,
            separators,
        } = self;

        let clique = cliques
            .get_mut(&id)
            .ok_or(TriangulationError::CliqueNotFound(id))?;
        if !clique.insert(node) {
            return Ok(());
        }

        for &neighbour in neighbours.get(&id).into_iter().flatten() {
            let shared = cliques
                .get(&neighbour)
                .map_or(false, |other| other.contains(&node));
            if shared {
                if let Some(separator) = separators.get_mut(&Edge::new(id, neighbour)) {
                    separator.insert(node);
                }
            }
        }
        Ok(())
    }

    /// Remove a variable from a clique and from the separators around it.
    pub fn erase_from_clique(&mut self, id: CliqueId, node: NodeId) -> Result<()> {
        let clique = self
            .cliques
            .get_mut(&id)
            .ok_or(TriangulationError::CliqueNotFound(id))?;
        if !clique.remove(&node) {
            return Ok(());
        }

        for &neighbour in self.neighbours.get(&id).into_iter().flatten() {
            if let Some(separator) = self.separators.get_mut(&Edge::new(id, neighbour)) {
                separator.remove(&node);
            }
        }
        Ok(())
    }

    /// Merge clique `absorbed` into `target`.
    ///
    /// `target` receives the union of both node sets and every other
    /// neighbour of `absorbed` is reconnected to `target`. On a tree this is
    /// an edge contraction, so the result is still a tree.
    pub fn merge_cliques(&mut self, target: CliqueId, absorbed: CliqueId) -> Result<()> {
        if target == absorbed {
            return Err(TriangulationError::SelfLoop(target));
        }
        self.clique(target)?;
        let others: Vec<CliqueId> = self
            .neighbours(absorbed)
            .filter(|&neighbour| neighbour != target)
            .collect();
        let nodes = self
            .erase_clique(absorbed)
            .ok_or(TriangulationError::CliqueNotFound(absorbed))?;

        for node in nodes {
            self.add_to_clique(target, node)?;
        }
        for other in others {
            self.add_edge(target, other)?;
        }
        Ok(())
    }

    /// Cliques containing `node`.
    pub fn cliques_containing(&self, node: NodeId) -> Vec<CliqueId> {
        self.cliques
            .iter()
            .filter(|(_, nodes)| nodes.contains(&node))
            .map(|(&id, _)| id)
            .collect()
    }

    /// First clique containing every node of `nodes`.
    pub fn container_clique(&self, nodes: &NodeSet) -> Option<CliqueId> {
        self.cliques
            .iter()
            .find(|(_, clique)| nodes.is_subset(clique))
            .map(|(&id, _)| id)
    }

    /// Number of connected components.
    pub fn num_components(&self) -> usize {
        let mut visited = BTreeSet::new();
        let mut components = 0;
        for start in self.clique_ids() {
            if !visited.insert(start) {
                continue;
            }
            components += 1;
            let mut stack = vec![start];
            while let Some(clique) = stack.pop() {
                for neighbour in self.neighbours(clique) {
                    if visited.insert(neighbour) {
                        stack.push(neighbour);
                    }
                }
            }
        }
        components
    }

    /// Whether the graph has no cycle.
    pub fn is_forest(&self) -> bool {
        self.num_edges() + self.num_components() == self.size()
    }

    /// Size of the largest clique.
    pub fn max_clique_size(&self) -> usize {
        self.cliques.values().map(BTreeSet::len).max().unwrap_or(0)
    }

    /// Check the running intersection property: for every variable, the
    /// cliques containing it are connected through edges whose separators
    /// contain it.
    pub fn has_running_intersection(&self) -> bool {
        running_intersection::check(self)
    }
}

//! Graph representations consumed by the triangulation.
//!
//! Three input shapes are supported: undirected graphs (Markov networks),
//! directed graphs (Bayesian networks) and mixed graphs (chain graphs).
//! All of them are normalized into a single [`UndiGraph`] by [`moralize`]
//! before triangulation starts.
//!
//! # Moralization
//!
//! ```text
//!   A     B            A --- B
//!    \   /              \   /
//!     v v      ==>       \ /
//!      C                  C
//! ```
//!
//! Every arc becomes an edge and the parents of every node are connected
//! pairwise.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use crate::error::{Result, TriangulationError};

/// Stable identifier of a variable node.
pub type NodeId = usize;

/// Ordered set of nodes. Ordered sets keep every traversal deterministic.
pub type NodeSet = BTreeSet<NodeId>;

/// Undirected edge between two distinct nodes.
///
/// The endpoints are normalized so that `first() < second()`, which makes
/// `Edge::new(a, b) == Edge::new(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    first: NodeId,
    second: NodeId,
}

impl Edge {
    /// Create a normalized edge.
    pub fn new(a: NodeId, b: NodeId) -> Self {
        if a <= b {
            Self {
                first: a,
                second: b,
            }
        } else {
            Self {
                first: b,
                second: a,
            }
        }
    }

    /// Smaller endpoint.
    pub fn first(&self) -> NodeId {
        self.first
    }

    /// Larger endpoint.
    pub fn second(&self) -> NodeId {
        self.second
    }
}

/// Undirected graph with ordered adjacency sets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UndiGraph {
    adjacency: BTreeMap<NodeId, NodeSet>,
}

impl UndiGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            adjacency: BTreeMap::new(),
        }
    }

    /// Create a graph with the given nodes and no edges.
    pub fn with_nodes(nodes: impl IntoIterator<Item = NodeId>) -> Self {
        let mut graph = Self::new();
        for node in nodes {
            graph.add_node(node);
        }
        graph
    }

    /// Add a node. Returns `false` if it already existed.
    pub fn add_node(&mut self, node: NodeId) -> bool {
        if self.adjacency.contains_key(&node) {
            return false;
        }
        self.adjacency.insert(node, NodeSet::new());
        true
    }

    /// Add an edge between two existing nodes.
    ///
    /// Returns `Ok(false)` if the edge was already present.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> Result<bool> {
        if a == b {
            return Err(TriangulationError::SelfLoop(a));
        }
        for node in [a, b] {
            if !self.adjacency.contains_key(&node) {
                return Err(TriangulationError::NodeNotFound(node));
            }
        }
        Ok(self.link(a, b))
    }

    /// Insert an edge whose endpoints are known to exist and be distinct.
    pub(crate) fn link(&mut self, a: NodeId, b: NodeId) -> bool {
        let inserted = self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
        inserted
    }

    /// Remove an edge. Returns `false` if it was absent.
    pub fn erase_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        let removed = self
            .adjacency
            .get_mut(&a)
            .map(|adj| adj.remove(&b))
            .unwrap_or(false);
        if let Some(adj) = self.adjacency.get_mut(&b) {
            adj.remove(&a);
        }
        removed
    }

    /// Remove a node with its incident edges, returning its former neighbours.
    pub fn erase_node(&mut self, node: NodeId) -> Option<NodeSet> {
        let neighbours = self.adjacency.remove(&node)?;
        for neighbour in &neighbours {
            if let Some(adj) = self.adjacency.get_mut(neighbour) {
                adj.remove(&node);
            }
        }
        Some(neighbours)
    }

    pub fn exists_node(&self, node: NodeId) -> bool {
        self.adjacency.contains_key(&node)
    }

    pub fn exists_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.adjacency
            .get(&a)
            .map(|adj| adj.contains(&b))
            .unwrap_or(false)
    }

    /// Neighbours of a node, `None` if the node does not exist.
    pub fn neighbours(&self, node: NodeId) -> Option<&NodeSet> {
        self.adjacency.get(&node)
    }

    /// Number of neighbours of a node (0 for unknown nodes).
    pub fn degree(&self, node: NodeId) -> usize {
        self.adjacency.get(&node).map(|adj| adj.len()).unwrap_or(0)
    }

    /// All nodes in increasing id order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.keys().copied()
    }

    /// All edges, each reported once.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.adjacency.iter().flat_map(|(&node, adj)| {
            after(adj, node).map(move |&neighbour| Edge::new(node, neighbour))
        })
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.adjacency.len()
    }

    pub fn num_edges(&self) -> usize {
        self.adjacency.values().map(|adj| adj.len()).sum::<usize>() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Check whether the nodes of `set` are pairwise adjacent.
    pub fn is_complete(&self, set: &NodeSet) -> bool {
        set.iter()
            .all(|&a| after(set, a).all(|&b| self.exists_edge(a, b)))
    }

    /// Edges needed to make `set` a clique.
    pub fn missing_edges(&self, set: &NodeSet) -> Vec<Edge> {
        let mut missing = Vec::new();
        for &a in set {
            for &b in after(set, a) {
                if !self.exists_edge(a, b) {
                    missing.push(Edge::new(a, b));
                }
            }
        }
        missing
    }
}

/// Elements of `set` strictly greater than `node`.
fn after(set: &NodeSet, node: NodeId) -> impl Iterator<Item = &NodeId> + '_ {
    set.range((Bound::Excluded(node), Bound::Unbounded))
}

/// Directed graph, stored as the parent set of each node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiGraph {
    parents: BTreeMap<NodeId, NodeSet>,
}

impl DiGraph {
    /// Create an empty directed graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Returns `false` if it already existed.
    pub fn add_node(&mut self, node: NodeId) -> bool {
        if self.parents.contains_key(&node) {
            return false;
        }
        self.parents.insert(node, NodeSet::new());
        true
    }

    /// Add the arc `tail -> head` between two existing nodes.
    pub fn add_arc(&mut self, tail: NodeId, head: NodeId) -> Result<bool> {
        if tail == head {
            return Err(TriangulationError::SelfLoop(tail));
        }
        for node in [tail, head] {
            if !self.parents.contains_key(&node) {
                return Err(TriangulationError::NodeNotFound(node));
            }
        }
        Ok(self.parents.entry(head).or_default().insert(tail))
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.parents.keys().copied()
    }

    /// Parents of a node, `None` if the node does not exist.
    pub fn parents(&self, node: NodeId) -> Option<&NodeSet> {
        self.parents.get(&node)
    }

    pub fn size(&self) -> usize {
        self.parents.len()
    }
}

/// Graph with both undirected edges and arcs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MixedGraph {
    edges: UndiGraph,
    arcs: DiGraph,
}

impl MixedGraph {
    /// Create an empty mixed graph.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: NodeId) -> bool {
        let added = self.edges.add_node(node);
        self.arcs.add_node(node);
        added
    }

    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> Result<bool> {
        self.edges.add_edge(a, b)
    }

    pub fn add_arc(&mut self, tail: NodeId, head: NodeId) -> Result<bool> {
        self.arcs.add_arc(tail, head)
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.edges.nodes()
    }

    pub fn size(&self) -> usize {
        self.edges.size()
    }
}

/// Read access needed to build the moral graph of an input graph.
pub trait MoralGraphSource {
    /// All nodes of the graph.
    fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_;

    /// Undirected edges of the graph.
    fn undirected_edges(&self) -> impl Iterator<Item = Edge> + '_;

    /// Tails of the arcs pointing to `node`.
    fn parents_of(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_;
}

impl MoralGraphSource for UndiGraph {
    fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes()
    }

    fn undirected_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges()
    }

    fn parents_of(&self, _node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::empty()
    }
}

impl MoralGraphSource for DiGraph {
    fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes()
    }

    fn undirected_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        std::iter::empty()
    }

    fn parents_of(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.parents.get(&node).into_iter().flatten().copied()
    }
}

impl MoralGraphSource for MixedGraph {
    fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes()
    }

    fn undirected_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edges.edges()
    }

    fn parents_of(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.arcs.parents_of(node)
    }
}

/// Build the moral graph of any supported input graph.
pub fn moralize<G: MoralGraphSource>(graph: &G) -> UndiGraph {
    let mut moral = UndiGraph::with_nodes(graph.node_ids());

    for edge in graph.undirected_edges() {
        moral.link(edge.first(), edge.second());
    }

    let nodes: Vec<NodeId> = moral.nodes().collect();
    for node in nodes {
        let parents: Vec<NodeId> = graph.parents_of(node).collect();
        for (i, &parent) in parents.iter().enumerate() {
            moral.link(parent, node);
            for &other in &parents[i + 1..] {
                moral.link(parent, other);
            }
        }
    }

    moral
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_normalization() {
        let edge = Edge::new(5, 2);
        assert_eq!(edge.first(), 2);
        assert_eq!(edge.second(), 5);
        assert_eq!(edge, Edge::new(2, 5));
    }

    #[test]
    fn test_add_and_erase() {
        let mut graph = UndiGraph::with_nodes(0..3);
        assert!(graph.add_edge(0, 1).unwrap());
        assert!(!graph.add_edge(1, 0).unwrap());
        assert!(graph.add_edge(1, 2).unwrap());
        assert_eq!(graph.num_edges(), 2);

        let former = graph.erase_node(1).unwrap();
        assert_eq!(former, NodeSet::from([0, 2]));
        assert_eq!(graph.num_edges(), 0);
        assert!(!graph.exists_node(1));
    }

    #[test]
    fn test_add_edge_errors() {
        let mut graph = UndiGraph::with_nodes(0..2);
        assert_eq!(graph.add_edge(0, 0), Err(TriangulationError::SelfLoop(0)));
        assert_eq!(
            graph.add_edge(0, 9),
            Err(TriangulationError::NodeNotFound(9))
        );
    }

    #[test]
    fn test_edges_reported_once() {
        let mut graph = UndiGraph::with_nodes(0..3);
        graph.add_edge(0, 1).unwrap();
        graph.add_edge(2, 0).unwrap();
        let edges: Vec<Edge> = graph.edges().collect();
        assert_eq!(edges, vec![Edge::new(0, 1), Edge::new(0, 2)]);
    }

    #[test]
    fn test_completeness() {
        let mut graph = UndiGraph::with_nodes(0..3);
        graph.add_edge(0, 1).unwrap();
        graph.add_edge(1, 2).unwrap();

        let all = NodeSet::from([0, 1, 2]);
        assert!(!graph.is_complete(&all));
        assert_eq!(graph.missing_edges(&all), vec![Edge::new(0, 2)]);

        graph.add_edge(0, 2).unwrap();
        assert!(graph.is_complete(&all));
        assert!(graph.is_complete(&NodeSet::new()));
    }

    #[test]
    fn test_moralize_v_structure() {
        let mut dag = DiGraph::new();
        for node in 0..3 {
            dag.add_node(node);
        }
        dag.add_arc(0, 2).unwrap();
        dag.add_arc(1, 2).unwrap();

        let moral = moralize(&dag);
        assert!(moral.exists_edge(0, 2));
        assert!(moral.exists_edge(1, 2));
        assert!(moral.exists_edge(0, 1));
        assert_eq!(moral.num_edges(), 3);
    }

    #[test]
    fn test_moralize_mixed_graph() {
        let mut graph = MixedGraph::new();
        for node in 0..4 {
            graph.add_node(node);
        }
        graph.add_edge(2, 3).unwrap();
        graph.add_arc(0, 3).unwrap();
        graph.add_arc(1, 3).unwrap();

        let moral = moralize(&graph);
        assert!(moral.exists_edge(2, 3));
        assert!(moral.exists_edge(0, 1));
        assert!(moral.exists_edge(0, 3));
        assert!(!moral.exists_edge(0, 2));
        assert_eq!(moral.size(), 4);
    }

    #[test]
    fn test_moralize_undirected_is_copy() {
        let mut graph = UndiGraph::with_nodes(0..3);
        graph.add_edge(0, 1).unwrap();
        assert_eq!(moralize(&graph), graph);
    }
}

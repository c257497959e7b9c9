//! Classification of the nodes of a graph under elimination.
//!
//! The elimination heuristic prefers nodes whose elimination creates few or
//! no fill-ins. Rescanning the whole graph at every step to find them would
//! be quadratic, so this module keeps every node in one of four classes and
//! only reclassifies the nodes touched by an elimination.
//!
//! # Classes
//!
//! - **Simplicial**: the neighbourhood is already a clique (no fill-in).
//! - **Almost simplicial**: removing one neighbour leaves a clique.
//! - **Quasi simplicial**: few edges are missing from the neighbourhood.
//! - **Other**: everything else, handled by a full scan.
//!
//! Within a class, candidates are ordered by clique weight, then by the
//! order in which they entered the class, then by node id.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::TriangulationConfig;
use crate::error::Result;
use crate::graph::{Edge, NodeId, NodeSet, UndiGraph};
use crate::weights::NodeWeights;

/// Class of a node with respect to the current graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeClass {
    Simplicial,
    AlmostSimplicial,
    QuasiSimplicial,
    Other,
}

/// Entry of a class queue.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    weight: f64,
    stamp: u64,
    node: NodeId,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then(self.stamp.cmp(&other.stamp))
            .then(self.node.cmp(&other.node))
    }
}

#[derive(Debug, Clone, Copy)]
struct NodeState {
    class: NodeClass,
    weight: f64,
    stamp: u64,
}

impl NodeState {
    fn candidate(&self, node: NodeId) -> Candidate {
        Candidate {
            weight: self.weight,
            stamp: self.stamp,
            node,
        }
    }
}

/// Simplicial, almost simplicial and quasi simplicial nodes of a graph.
///
/// The set does not own the graph: every mutating call receives the graph
/// as it is *after* the mutation.
///
/// Besides the classes, the set keeps two structural counts up to date so
/// that reclassifying a node never rescans its neighbourhood: the number of
/// edges among the neighbours of each node, and for each edge the number of
/// common neighbours of its endpoints.
#[derive(Debug, Clone)]
pub struct SimplicialSet {
    states: BTreeMap<NodeId, NodeState>,
    simplicial: BTreeSet<Candidate>,
    almost_simplicial: BTreeSet<Candidate>,
    quasi_simplicial: BTreeSet<Candidate>,
    inner_edges: BTreeMap<NodeId, usize>,
    triangles: BTreeMap<Edge, usize>,
    next_stamp: u64,
    log_tree_width: f64,
    log_threshold: f64,
    quasi_ratio: f64,
}

impl SimplicialSet {
    /// Classify every node of `graph`.
    ///
    /// Fails with [`MissingWeight`](crate::TriangulationError::MissingWeight)
    /// if a node of `graph` has no weight.
    pub fn new(graph: &UndiGraph, weights: &NodeWeights, config: &TriangulationConfig) -> Result<Self> {
        weights.check_covers(graph.nodes())?;

        let mut set = Self {
            states: BTreeMap::new(),
            simplicial: BTreeSet::new(),
            almost_simplicial: BTreeSet::new(),
            quasi_simplicial: BTreeSet::new(),
            inner_edges: BTreeMap::new(),
            triangles: BTreeMap::new(),
            next_stamp: 0,
            log_tree_width: 0.0,
            log_threshold: config.log_threshold(),
            quasi_ratio: config.quasi_ratio,
        };

        for edge in graph.edges() {
            set.triangles
                .insert(edge, common_neighbours(graph, edge.first(), edge.second()).count());
        }
        for node in graph.nodes() {
            let twice: usize = graph
                .neighbours(node)
                .into_iter()
                .flatten()
                .map(|&y| set.triangle_count(node, y))
                .sum();
            set.inner_edges.insert(node, twice / 2);
        }

        for node in graph.nodes() {
            set.classify(graph, weights, node)?;
        }

        // Any triangulation creates a clique at least as heavy as the lightest
        // closed neighbourhood.
        set.log_tree_width = set
            .states
            .values()
            .map(|state| state.weight)
            .min_by(f64::total_cmp)
            .unwrap_or(0.0);

        Ok(set)
    }

    /// Number of nodes still tracked.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn class_of(&self, node: NodeId) -> Option<NodeClass> {
        self.states.get(&node).map(|state| state.class)
    }

    /// Weight of the clique that eliminating `node` now would create.
    pub fn clique_weight(&self, node: NodeId) -> Option<f64> {
        self.states.get(&node).map(|state| state.weight)
    }

    /// Largest clique weight created so far (log space).
    pub fn log_tree_width(&self) -> f64 {
        self.log_tree_width
    }

    /// Almost and quasi simplicial nodes heavier than this are not eligible.
    pub fn eligibility_bound(&self) -> f64 {
        self.log_tree_width + self.log_threshold
    }

    /// Cheapest simplicial node, optionally restricted to `within`.
    pub fn lowest_cost_simplicial(&self, within: Option<&NodeSet>) -> Option<NodeId> {
        first_in(&self.simplicial, within).map(|candidate| candidate.node)
    }

    /// Cheapest eligible almost simplicial node.
    pub fn lowest_cost_almost_simplicial(&self, within: Option<&NodeSet>) -> Option<NodeId> {
        self.first_eligible(&self.almost_simplicial, within)
    }

    /// Cheapest eligible quasi simplicial node.
    pub fn lowest_cost_quasi_simplicial(&self, within: Option<&NodeSet>) -> Option<NodeId> {
        self.first_eligible(&self.quasi_simplicial, within)
    }

    /// Node of minimal clique weight over all tracked nodes, ties broken by
    /// lowest node id. This is a full scan.
    pub fn lowest_cost_node(&self, within: Option<&NodeSet>) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for (&node, state) in &self.states {
            if !allowed(within, node) {
                continue;
            }
            if best.map_or(true, |(_, weight)| state.weight < weight) {
                best = Some((node, state.weight));
            }
        }
        best.map(|(node, _)| node)
    }

    /// Update the classification after `eliminated` has been removed from
    /// `graph` and `fill_ins` inserted among its former neighbours.
    ///
    /// `fill_ins` must be listed in the order they were added. Only the
    /// former neighbours and the common neighbours of each fill-in's
    /// endpoints can change class.
    pub fn update_after_elimination(
        &mut self,
        graph: &UndiGraph,
        weights: &NodeWeights,
        eliminated: NodeId,
        former_neighbours: &NodeSet,
        fill_ins: &[Edge],
    ) -> Result<()> {
        if let Some(state) = self.remove(eliminated) {
            if state.weight > self.log_tree_width {
                self.log_tree_width = state.weight;
            }
        }

        let mut affected = former_neighbours.clone();
        let mut pending: BTreeSet<Edge> = fill_ins.iter().copied().collect();
        for &edge in fill_ins {
            pending.remove(&edge);
            let common = self.record_fill_in(graph, eliminated, edge, &pending);
            affected.extend(common);
        }
        self.record_erasure(eliminated, former_neighbours);

        for node in affected {
            self.classify(graph, weights, node)?;
        }
        Ok(())
    }

    /// Account for `edge` joining two former neighbours of `eliminated`,
    /// before the later fill-ins in `pending` exist. Returns the common
    /// neighbours of the endpoints other than `eliminated`.
    fn record_fill_in(
        &mut self,
        graph: &UndiGraph,
        eliminated: NodeId,
        edge: Edge,
        pending: &BTreeSet<Edge>,
    ) -> Vec<NodeId> {
        let (u, v) = (edge.first(), edge.second());
        let common: Vec<NodeId> = common_neighbours(graph, u, v)
            .filter(|&w| !pending.contains(&Edge::new(u, w)) && !pending.contains(&Edge::new(v, w)))
            .collect();

        // The eliminated node is still adjacent to both endpoints here.
        let shared = common.len() + 1;
        self.triangles.insert(edge, shared);
        for end in [u, v] {
            *self.inner_edges.entry(end).or_default() += shared;
        }
        for &w in common.iter().chain(std::iter::once(&eliminated)) {
            *self.inner_edges.entry(w).or_default() += 1;
            for end in [u, v] {
                *self.triangles.entry(Edge::new(end, w)).or_default() += 1;
            }
        }
        common
    }

    /// Account for `eliminated` leaving the graph once its neighbourhood
    /// has been completed.
    fn record_erasure(&mut self, eliminated: NodeId, former_neighbours: &NodeSet) {
        self.inner_edges.remove(&eliminated);
        let members: Vec<NodeId> = former_neighbours.iter().copied().collect();
        for (i, &y) in members.iter().enumerate() {
            let shared = self.triangles.remove(&Edge::new(eliminated, y)).unwrap_or(0);
            if let Some(count) = self.inner_edges.get_mut(&y) {
                *count = count.saturating_sub(shared);
            }
            for &z in &members[i + 1..] {
                if let Some(count) = self.triangles.get_mut(&Edge::new(y, z)) {
                    *count = count.saturating_sub(1);
                }
            }
        }
    }

    fn triangle_count(&self, a: NodeId, b: NodeId) -> usize {
        self.triangles.get(&Edge::new(a, b)).copied().unwrap_or(0)
    }

    fn first_eligible(&self, queue: &BTreeSet<Candidate>, within: Option<&NodeSet>) -> Option<NodeId> {
        // Queues are sorted by weight: if the first allowed candidate is too
        // heavy, all the others are too.
        let candidate = first_in(queue, within)?;
        (candidate.weight <= self.eligibility_bound()).then_some(candidate.node)
    }

    fn queue_mut(&mut self, class: NodeClass) -> Option<&mut BTreeSet<Candidate>> {
        match class {
            NodeClass::Simplicial => Some(&mut self.simplicial),
            NodeClass::AlmostSimplicial => Some(&mut self.almost_simplicial),
            NodeClass::QuasiSimplicial => Some(&mut self.quasi_simplicial),
            NodeClass::Other => None,
        }
    }

    fn remove(&mut self, node: NodeId) -> Option<NodeState> {
        let state = self.states.remove(&node)?;
        if let Some(queue) = self.queue_mut(state.class) {
            queue.remove(&state.candidate(node));
        }
        Some(state)
    }

    fn classify(&mut self, graph: &UndiGraph, weights: &NodeWeights, node: NodeId) -> Result<()> {
        let Some(neighbours) = graph.neighbours(node) else {
            self.remove(node);
            return Ok(());
        };

        let weight = weights.clique_weight(std::iter::once(&node).chain(neighbours))?;
        let class = self.structural_class(node, neighbours);

        // A node keeps its rank while it stays in the same class.
        let stamp = match self.states.get(&node) {
            Some(state) if state.class == class => state.stamp,
            _ => {
                let stamp = self.next_stamp;
                self.next_stamp += 1;
                stamp
            }
        };

        self.remove(node);
        let state = NodeState {
            class,
            weight,
            stamp,
        };
        self.states.insert(node, state);
        if let Some(queue) = self.queue_mut(class) {
            queue.insert(state.candidate(node));
        }
        Ok(())
    }

    fn structural_class(&self, node: NodeId, neighbours: &NodeSet) -> NodeClass {
        let degree = neighbours.len();
        let full = degree * degree.saturating_sub(1) / 2;
        let edges = self.inner_edges.get(&node).copied().unwrap_or(0);

        if edges >= full {
            return NodeClass::Simplicial;
        }

        // degree >= 2 from here on. A neighbour y is adjacent to exactly
        // `triangle_count(node, y)` of the other neighbours.
        let rest = (degree - 1) * (degree - 2) / 2;
        if neighbours
            .iter()
            .any(|&y| edges.saturating_sub(self.triangle_count(node, y)) == rest)
        {
            return NodeClass::AlmostSimplicial;
        }

        let missing = full - edges;
        if (missing as f64) / (full as f64) <= self.quasi_ratio {
            return NodeClass::QuasiSimplicial;
        }

        NodeClass::Other
    }
}

fn common_neighbours(graph: &UndiGraph, a: NodeId, b: NodeId) -> impl Iterator<Item = NodeId> + '_ {
    let both = graph.neighbours(a).zip(graph.neighbours(b));
    both.into_iter().flat_map(|(x, y)| x.intersection(y).copied())
}

fn allowed(within: Option<&NodeSet>, node: NodeId) -> bool {
    within.map_or(true, |set| set.contains(&node))
}

fn first_in<'a>(queue: &'a BTreeSet<Candidate>, within: Option<&NodeSet>) -> Option<&'a Candidate> {
    queue.iter().find(|candidate| allowed(within, candidate.node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cycle(n: usize) -> UndiGraph {
        let mut graph = UndiGraph::with_nodes(0..n);
        for i in 0..n {
            graph.add_edge(i, (i + 1) % n).unwrap();
        }
        graph
    }

    #[test]
    fn test_classes_on_path() {
        let mut graph = UndiGraph::with_nodes(0..4);
        graph.add_edge(0, 1).unwrap();
        graph.add_edge(1, 2).unwrap();
        graph.add_edge(2, 3).unwrap();
        let weights = NodeWeights::uniform(0..4, 2).unwrap();

        let set = SimplicialSet::new(&graph, &weights, &TriangulationConfig::default()).unwrap();
        assert_eq!(set.class_of(0), Some(NodeClass::Simplicial));
        assert_eq!(set.class_of(1), Some(NodeClass::AlmostSimplicial));
        assert_eq!(set.class_of(2), Some(NodeClass::AlmostSimplicial));
        assert_eq!(set.class_of(3), Some(NodeClass::Simplicial));
        assert_eq!(set.lowest_cost_simplicial(None), Some(0));
        assert_abs_diff_eq!(set.clique_weight(1).unwrap(), 8f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_star_centre_is_other() {
        let mut graph = UndiGraph::with_nodes(0..5);
        for leaf in 1..5 {
            graph.add_edge(0, leaf).unwrap();
        }
        let weights = NodeWeights::uniform(0..5, 2).unwrap();

        let set = SimplicialSet::new(&graph, &weights, &TriangulationConfig::default()).unwrap();
        assert_eq!(set.class_of(0), Some(NodeClass::Other));
        for leaf in 1..5 {
            assert_eq!(set.class_of(leaf), Some(NodeClass::Simplicial));
        }
        assert_eq!(set.lowest_cost_almost_simplicial(None), None);
        assert_eq!(set.lowest_cost_quasi_simplicial(None), None);
    }

    #[test]
    fn test_quasi_simplicial_ratio() {
        // Node 0 sees 1..=4; among them only the edge 1-2 is missing.
        let mut graph = UndiGraph::with_nodes(0..5);
        for a in 1..5 {
            graph.add_edge(0, a).unwrap();
            for b in (a + 1)..5 {
                if (a, b) != (1, 2) {
                    graph.add_edge(a, b).unwrap();
                }
            }
        }
        let weights = NodeWeights::uniform(0..5, 2).unwrap();

        let strict = SimplicialSet::new(&graph, &weights, &TriangulationConfig::default()).unwrap();
        // Removing neighbour 1 leaves a clique.
        assert_eq!(strict.class_of(0), Some(NodeClass::AlmostSimplicial));

        // Two missing edges out of six: not almost simplicial any more.
        graph.erase_edge(3, 4);
        let strict = SimplicialSet::new(&graph, &weights, &TriangulationConfig::default()).unwrap();
        assert_eq!(strict.class_of(0), Some(NodeClass::Other));

        let loose = SimplicialSet::new(
            &graph,
            &weights,
            &TriangulationConfig::default().with_quasi_ratio(0.5),
        )
        .unwrap();
        assert_eq!(loose.class_of(0), Some(NodeClass::QuasiSimplicial));
    }

    #[test]
    fn test_eligibility_bound() {
        // In a 4-cycle every node is almost simplicial with the same weight,
        // which is also the initial tree width.
        let graph = cycle(4);
        let weights = NodeWeights::uniform(0..4, 2).unwrap();
        let set = SimplicialSet::new(&graph, &weights, &TriangulationConfig::default()).unwrap();

        assert_abs_diff_eq!(set.log_tree_width(), 8f64.ln(), epsilon = 1e-12);
        assert_eq!(set.lowest_cost_simplicial(None), None);
        assert_eq!(set.lowest_cost_almost_simplicial(None), Some(0));

        let within = NodeSet::from([2, 3]);
        assert_eq!(set.lowest_cost_almost_simplicial(Some(&within)), Some(2));
    }

    #[test]
    fn test_heavy_almost_simplicial_not_eligible() {
        // Path 0 - 1 - 2 where the middle node is huge: the endpoints are
        // simplicial and light, so the tree width starts below node 1's weight.
        let mut graph = UndiGraph::with_nodes(0..3);
        graph.add_edge(0, 1).unwrap();
        graph.add_edge(1, 2).unwrap();
        let weights = NodeWeights::from_domain_sizes([(0, 2), (1, 100), (2, 2)]).unwrap();

        let set = SimplicialSet::new(&graph, &weights, &TriangulationConfig::default()).unwrap();
        assert_eq!(set.class_of(1), Some(NodeClass::AlmostSimplicial));
        assert_eq!(set.lowest_cost_almost_simplicial(None), None);

        let lenient = SimplicialSet::new(
            &graph,
            &weights,
            &TriangulationConfig::default().with_weight_threshold(10.0),
        )
        .unwrap();
        assert_eq!(lenient.lowest_cost_almost_simplicial(None), Some(1));
    }

    #[test]
    fn test_update_after_elimination() {
        let mut graph = cycle(4);
        let weights = NodeWeights::uniform(0..4, 2).unwrap();
        let mut set = SimplicialSet::new(&graph, &weights, &TriangulationConfig::default()).unwrap();

        // Eliminate node 0 by hand: fill-in 1-3, then remove it.
        graph.add_edge(1, 3).unwrap();
        let former = graph.erase_node(0).unwrap();
        set.update_after_elimination(&graph, &weights, 0, &former, &[Edge::new(1, 3)])
            .unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.class_of(0), None);
        for node in 1..4 {
            assert_eq!(set.class_of(node), Some(NodeClass::Simplicial));
        }
        assert_eq!(set.lowest_cost_simplicial(None), Some(1));
    }

    #[test]
    fn test_lowest_cost_node_ties_on_id() {
        let graph = cycle(5);
        let weights = NodeWeights::uniform(0..5, 3).unwrap();
        let set = SimplicialSet::new(&graph, &weights, &TriangulationConfig::default()).unwrap();
        assert_eq!(set.lowest_cost_node(None), Some(0));
        assert_eq!(set.lowest_cost_node(Some(&NodeSet::from([3, 4]))), Some(3));
    }

    #[test]
    fn test_missing_weight_is_an_error() {
        let mut graph = UndiGraph::with_nodes(0..3);
        graph.add_edge(0, 1).unwrap();
        graph.add_edge(1, 2).unwrap();
        let weights = NodeWeights::uniform([0, 1], 2).unwrap();

        let result = SimplicialSet::new(&graph, &weights, &TriangulationConfig::default());
        assert_eq!(
            result.err(),
            Some(crate::TriangulationError::MissingWeight { node: 2 })
        );
    }

    fn assert_counts_match(set: &SimplicialSet, graph: &UndiGraph, weights: &NodeWeights) {
        let fresh = SimplicialSet::new(graph, weights, &TriangulationConfig::default()).unwrap();
        assert_eq!(set.inner_edges, fresh.inner_edges);
        assert_eq!(set.triangles, fresh.triangles);
        for node in graph.nodes() {
            assert_eq!(set.class_of(node), fresh.class_of(node), "node {node}");
        }
    }

    #[test]
    fn test_counts_follow_eliminations() {
        // 3x3 grid, eliminated in an order that creates several fill-ins
        // per step.
        let mut graph = UndiGraph::with_nodes(0..9);
        for row in 0..3 {
            for col in 0..3 {
                let node = row * 3 + col;
                if col < 2 {
                    graph.add_edge(node, node + 1).unwrap();
                }
                if row < 2 {
                    graph.add_edge(node, node + 3).unwrap();
                }
            }
        }
        let weights = NodeWeights::uniform(0..9, 2).unwrap();
        let mut set = SimplicialSet::new(&graph, &weights, &TriangulationConfig::default()).unwrap();
        assert_counts_match(&set, &graph, &weights);

        for node in [4, 1, 0, 8, 3, 2, 5, 6, 7] {
            let neighbours = graph.neighbours(node).unwrap().clone();
            let fill_ins = graph.missing_edges(&neighbours);
            for edge in &fill_ins {
                graph.add_edge(edge.first(), edge.second()).unwrap();
            }
            let former = graph.erase_node(node).unwrap();
            set.update_after_elimination(&graph, &weights, node, &former, &fill_ins)
                .unwrap();
            assert_counts_match(&set, &graph, &weights);
        }
        assert!(set.is_empty());
    }
}

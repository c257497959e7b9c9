//! The triangulation engine.
//!
//! [`Triangulation`] owns a copy of the moral graph of its input and
//! computes, on demand, the elimination order, the triangulated graph and
//! the three clique trees derived from them. Every result is cached until
//! the graph, the strategy or the configuration changes.
//!
//! # Pipeline
//!
//! ```text
//! input graph → moralize → eliminate (greedy or fixed) → [thinning]
//!                               ↓
//!                       elimination records
//!                               ↓
//!             elimination tree → junction tree → max prime subgraph tree
//! ```
//!
//! # Example
//!
//! ```
//! use tensorlogic_triangulation::{NodeWeights, Triangulation, TriangulationConfig, UndiGraph};
//!
//! let mut graph = UndiGraph::with_nodes(0..4);
//! for (a, b) in [(0, 1), (1, 2), (2, 3), (3, 0)] {
//!     graph.add_edge(a, b).unwrap();
//! }
//! let weights = NodeWeights::uniform(0..4, 2).unwrap();
//!
//! let config = TriangulationConfig::default().with_fill_ins_tracking(true);
//! let mut triangulation = Triangulation::with_graph(&graph, &weights, config).unwrap();
//!
//! assert_eq!(triangulation.elimination_order().unwrap(), &[0, 1, 2, 3]);
//! assert_eq!(triangulation.fill_ins().unwrap().len(), 1);
//! assert_eq!(triangulation.junction_tree().unwrap().size(), 2);
//! ```

use std::collections::BTreeMap;

use indexmap::IndexSet;
use tracing::{debug, trace};

use crate::clique_graph::{CliqueGraph, CliqueId};
use crate::config::TriangulationConfig;
use crate::error::{Result, TriangulationError};
use crate::graph::{moralize, Edge, MoralGraphSource, NodeId, NodeSet, UndiGraph};
use crate::junction_tree::JunctionTree;
use crate::max_prime::MaxPrimeSubgraphTree;
use crate::ordering::{EliminationPlan, EliminationStrategy};
use crate::simplicial_set::SimplicialSet;
use crate::thinning::{perfect_elimination_order, recursive_thinning};
use crate::weights::NodeWeights;

/// Outcome of one elimination pass.
#[derive(Debug, Clone)]
struct EliminationRun {
    order: Vec<NodeId>,
    positions: BTreeMap<NodeId, usize>,
    cliques: Vec<NodeSet>,
    triangulated: UndiGraph,
    fill_ins: IndexSet<Edge>,
}

impl EliminationRun {
    fn new(
        order: Vec<NodeId>,
        cliques: Vec<NodeSet>,
        triangulated: UndiGraph,
        fill_ins: IndexSet<Edge>,
    ) -> Self {
        let positions = order.iter().enumerate().map(|(i, &node)| (node, i)).collect();
        Self {
            order,
            positions,
            cliques,
            triangulated,
            fill_ins,
        }
    }
}

/// Mutable state of the elimination loop.
struct Eliminator {
    working: UndiGraph,
    triangulated: UndiGraph,
    fill_ins: IndexSet<Edge>,
    order: Vec<NodeId>,
    cliques: Vec<NodeSet>,
}

impl Eliminator {
    fn new(graph: &UndiGraph) -> Self {
        Self {
            working: graph.clone(),
            triangulated: graph.clone(),
            fill_ins: IndexSet::new(),
            order: Vec::with_capacity(graph.size()),
            cliques: Vec::with_capacity(graph.size()),
        }
    }

    /// Eliminate `node`, returning its former neighbours and the fill-ins
    /// added among them.
    fn eliminate(&mut self, node: NodeId) -> (NodeSet, Vec<Edge>) {
        let neighbours = self.working.neighbours(node).cloned().unwrap_or_default();
        let added = self.working.missing_edges(&neighbours);
        for edge in &added {
            self.working.link(edge.first(), edge.second());
            self.triangulated.link(edge.first(), edge.second());
            self.fill_ins.insert(*edge);
        }
        self.working.erase_node(node);

        let mut clique = neighbours.clone();
        clique.insert(node);
        trace!(
            node,
            clique_size = clique.len(),
            fill_ins = added.len(),
            "Eliminated node"
        );
        self.order.push(node);
        self.cliques.push(clique);

        (neighbours, added)
    }
}

/// What an elimination pass reads.
#[derive(Clone, Copy)]
struct Inputs<'a> {
    graph: &'a UndiGraph,
    weights: &'a NodeWeights,
    config: &'a TriangulationConfig,
    strategy: &'a EliminationStrategy,
}

/// Results computed on demand. Each stage is built from the previous one
/// the first time it is asked for.
#[derive(Debug, Clone, Default)]
struct Cache {
    run: Option<EliminationRun>,
    elimination_tree: Option<CliqueGraph>,
    junction_tree: Option<JunctionTree>,
    max_prime_tree: Option<MaxPrimeSubgraphTree>,
}

impl Cache {
    fn run(&mut self, inputs: Inputs<'_>) -> Result<&EliminationRun> {
        cached(&mut self.run, || triangulate(inputs))
    }

    fn elimination_tree(&mut self, inputs: Inputs<'_>) -> Result<&CliqueGraph> {
        let run = cached(&mut self.run, || triangulate(inputs))?;
        cached(&mut self.elimination_tree, || build_elimination_tree(run))
    }

    fn junction_tree(&mut self, inputs: Inputs<'_>) -> Result<&JunctionTree> {
        let run = cached(&mut self.run, || triangulate(inputs))?;
        let elimination_tree = cached(&mut self.elimination_tree, || build_elimination_tree(run))?;
        cached(&mut self.junction_tree, || {
            build_junction_tree(elimination_tree, &run.order)
        })
    }

    fn max_prime_tree(&mut self, inputs: Inputs<'_>) -> Result<&MaxPrimeSubgraphTree> {
        let run = cached(&mut self.run, || triangulate(inputs))?;
        let elimination_tree = cached(&mut self.elimination_tree, || build_elimination_tree(run))?;
        let junction_tree = cached(&mut self.junction_tree, || {
            build_junction_tree(elimination_tree, &run.order)
        })?;
        cached(&mut self.max_prime_tree, || {
            build_max_prime_tree(junction_tree, inputs.graph)
        })
    }
}

/// Fill `slot` with `build` if it is empty, then borrow its content.
fn cached<T>(slot: &mut Option<T>, build: impl FnOnce() -> Result<T>) -> Result<&T> {
    let value = match slot.take() {
        Some(value) => value,
        None => build()?,
    };
    Ok(slot.insert(value))
}

fn build_elimination_tree(run: &EliminationRun) -> Result<CliqueGraph> {
    let tree = CliqueGraph::from_elimination(&run.order, &run.cliques)?;
    debug!(
        cliques = tree.size(),
        edges = tree.num_edges(),
        "Built elimination tree"
    );
    Ok(tree)
}

fn build_junction_tree(elimination_tree: &CliqueGraph, order: &[NodeId]) -> Result<JunctionTree> {
    let junction_tree = JunctionTree::from_elimination_tree(elimination_tree, order)?;
    debug!(
        cliques = junction_tree.tree().size(),
        treewidth = junction_tree.treewidth(),
        "Built junction tree"
    );
    Ok(junction_tree)
}

fn build_max_prime_tree(junction_tree: &JunctionTree, graph: &UndiGraph) -> Result<MaxPrimeSubgraphTree> {
    let max_prime_tree = MaxPrimeSubgraphTree::from_junction_tree(junction_tree, graph)?;
    debug!(
        subgraphs = max_prime_tree.tree().size(),
        "Built maximal prime subgraph tree"
    );
    Ok(max_prime_tree)
}

/// Triangulation of a graph and the clique trees derived from it.
#[derive(Debug, Clone)]
pub struct Triangulation {
    config: TriangulationConfig,
    strategy: EliminationStrategy,
    graph: Option<UndiGraph>,
    weights: NodeWeights,
    cache: Cache,
}

impl Triangulation {
    /// Create a triangulation without a graph.
    pub fn new(config: TriangulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            strategy: EliminationStrategy::default(),
            graph: None,
            weights: NodeWeights::new(),
            cache: Cache::default(),
        })
    }

    /// Create a triangulation of `graph`.
    pub fn with_graph<G: MoralGraphSource>(
        graph: &G,
        weights: &NodeWeights,
        config: TriangulationConfig,
    ) -> Result<Self> {
        let mut triangulation = Self::new(config)?;
        triangulation.set_graph(graph, weights)?;
        Ok(triangulation)
    }

    /// Replace the graph to triangulate.
    ///
    /// Directed arcs are moralized. Every node needs a weight, and the
    /// current strategy must fit the new graph. On error the previous
    /// graph is kept.
    pub fn set_graph<G: MoralGraphSource>(&mut self, graph: &G, weights: &NodeWeights) -> Result<()> {
        let moral = moralize(graph);
        weights.check_covers(moral.nodes())?;
        self.strategy.validate(&moral)?;

        debug!(
            nodes = moral.size(),
            edges = moral.num_edges(),
            "Set graph to triangulate"
        );
        self.graph = Some(moral);
        self.weights = weights.clone();
        self.clear();
        Ok(())
    }

    /// Replace the elimination strategy.
    pub fn set_strategy(&mut self, strategy: EliminationStrategy) -> Result<()> {
        if let Some(graph) = &self.graph {
            strategy.validate(graph)?;
        }
        self.strategy = strategy;
        self.clear();
        Ok(())
    }

    /// Replace the configuration.
    pub fn set_config(&mut self, config: TriangulationConfig) -> Result<()> {
        config.validate()?;
        self.config = config;
        self.clear();
        Ok(())
    }

    /// Drop every cached result. The graph and the settings are kept.
    pub fn clear(&mut self) {
        self.cache = Cache::default();
    }

    pub fn config(&self) -> &TriangulationConfig {
        &self.config
    }

    pub fn strategy(&self) -> &EliminationStrategy {
        &self.strategy
    }

    /// The moral graph being triangulated.
    pub fn original_graph(&self) -> Option<&UndiGraph> {
        self.graph.as_ref()
    }

    pub fn elimination_order(&mut self) -> Result<&[NodeId]> {
        Ok(&self.run()?.order)
    }

    /// Position of `node` in the elimination order.
    pub fn elimination_position(&mut self, node: NodeId) -> Result<usize> {
        self.run()?
            .positions
            .get(&node)
            .copied()
            .ok_or(TriangulationError::NodeNotFound(node))
    }

    /// Clique created when eliminating `node`.
    pub fn elimination_clique(&mut self, node: NodeId) -> Result<&NodeSet> {
        let run = self.run()?;
        let position = run
            .positions
            .get(&node)
            .copied()
            .ok_or(TriangulationError::NodeNotFound(node))?;
        Ok(&run.cliques[position])
    }

    /// All elimination cliques, indexed by elimination position.
    pub fn elimination_cliques(&mut self) -> Result<&[NodeSet]> {
        Ok(&self.run()?.cliques)
    }

    pub fn triangulated_graph(&mut self) -> Result<&UndiGraph> {
        Ok(&self.run()?.triangulated)
    }

    /// Edges added to the moral graph, in insertion order.
    ///
    /// Requires `track_fill_ins` in the configuration.
    pub fn fill_ins(&mut self) -> Result<&IndexSet<Edge>> {
        if !self.config.track_fill_ins {
            return Err(TriangulationError::FillInsNotTracked);
        }
        Ok(&self.run()?.fill_ins)
    }

    /// Largest elimination clique weight, i.e. the natural log of the
    /// largest clique domain size. `0.0` for an empty graph.
    pub fn max_clique_weight(&mut self) -> Result<f64> {
        let (inputs, cache) = self.parts()?;
        let run = cache.run(inputs)?;
        run.cliques.iter().try_fold(0.0, |max: f64, clique| {
            Ok(max.max(inputs.weights.clique_weight(clique)?))
        })
    }

    /// Base 10 log of the largest clique domain size.
    pub fn max_log10_clique_domain_size(&mut self) -> Result<f64> {
        Ok(self.max_clique_weight()? / std::f64::consts::LN_10)
    }

    /// Elimination tree: clique `i` is the clique created at position `i`.
    pub fn elimination_tree(&mut self) -> Result<&CliqueGraph> {
        let (inputs, cache) = self.parts()?;
        cache.elimination_tree(inputs)
    }

    /// Junction tree obtained by compacting the elimination tree.
    pub fn junction_tree(&mut self) -> Result<&CliqueGraph> {
        let (inputs, cache) = self.parts()?;
        Ok(cache.junction_tree(inputs)?.tree())
    }

    /// Junction-tree clique containing the clique created by `node`.
    pub fn created_clique(&mut self, node: NodeId) -> Result<CliqueId> {
        let (inputs, cache) = self.parts()?;
        cache.junction_tree(inputs)?.created_clique(node)
    }

    /// Tree of maximal prime subgraphs.
    ///
    /// The cliques are guaranteed to be the maximal prime subgraphs only if
    /// the configuration asks for minimality.
    pub fn max_prime_subgraph_tree(&mut self) -> Result<&CliqueGraph> {
        let (inputs, cache) = self.parts()?;
        Ok(cache.max_prime_tree(inputs)?.tree())
    }

    /// Maximal prime subgraph containing the clique created by `node`.
    pub fn created_max_prime_subgraph(&mut self, node: NodeId) -> Result<CliqueId> {
        let (inputs, cache) = self.parts()?;
        cache.max_prime_tree(inputs)?.created_max_prime_subgraph(node)
    }

    fn run(&mut self) -> Result<&EliminationRun> {
        let (inputs, cache) = self.parts()?;
        cache.run(inputs)
    }

    /// Split into the read-only inputs and the mutable cache.
    fn parts(&mut self) -> Result<(Inputs<'_>, &mut Cache)> {
        let graph = self.graph.as_ref().ok_or(TriangulationError::NoGraph)?;
        let inputs = Inputs {
            graph,
            weights: &self.weights,
            config: &self.config,
            strategy: &self.strategy,
        };
        Ok((inputs, &mut self.cache))
    }
}

fn triangulate(inputs: Inputs<'_>) -> Result<EliminationRun> {
    let Inputs {
        graph,
        weights,
        config,
        strategy,
    } = inputs;
    let mut eliminator = Eliminator::new(graph);

    match strategy.plan(graph)? {
        EliminationPlan::Fixed(order) => {
            for node in order {
                eliminator.eliminate(node);
            }
        }
        EliminationPlan::Greedy(groups) => {
            let mut simplicial = SimplicialSet::new(graph, weights, config)?;
            for mut group in groups {
                while let Some(node) = next_node(&simplicial, &group) {
                    group.remove(&node);
                    let (neighbours, added) = eliminator.eliminate(node);
                    simplicial.update_after_elimination(
                        &eliminator.working,
                        weights,
                        node,
                        &neighbours,
                        &added,
                    )?;
                }
            }
        }
    }

    let Eliminator {
        mut triangulated,
        mut fill_ins,
        mut order,
        mut cliques,
        ..
    } = eliminator;
    debug!(
        nodes = order.len(),
        fill_ins = fill_ins.len(),
        "Eliminated all nodes"
    );

    if config.minimality {
        let removed = recursive_thinning(&mut triangulated, &mut fill_ins);
        debug!(removed, remaining = fill_ins.len(), "Recursive thinning done");
        (order, cliques) = perfect_elimination_order(&mut triangulated, &mut fill_ins, &order);
    }

    if !config.track_fill_ins {
        fill_ins.clear();
    }

    Ok(EliminationRun::new(order, cliques, triangulated, fill_ins))
}

/// Next node to eliminate among `candidates`, by class priority.
fn next_node(simplicial: &SimplicialSet, candidates: &NodeSet) -> Option<NodeId> {
    let within = Some(candidates);
    simplicial
        .lowest_cost_simplicial(within)
        .or_else(|| simplicial.lowest_cost_almost_simplicial(within))
        .or_else(|| simplicial.lowest_cost_quasi_simplicial(within))
        .or_else(|| simplicial.lowest_cost_node(within))
}

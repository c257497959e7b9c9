//! Graph triangulation and clique trees for exact inference.
//!
//! This crate turns a (possibly directed or mixed) graph into a
//! triangulated graph by node elimination, and derives from the
//! elimination the clique trees used by exact inference engines.
//!
//! # Core Concepts
//!
//! - **Simplicial set**: incremental classification of nodes by how many
//!   fill-ins their elimination would create
//! - **Triangulation**: greedy (or user-ordered) elimination, with optional
//!   recursive thinning for minimal triangulations
//! - **Clique trees**: elimination tree, junction tree and maximal prime
//!   subgraph tree, all checked against the running intersection property
//!
//! # Architecture
//!
//! ```text
//! Graph → Moral graph → Elimination → Elimination tree → Junction tree → Max prime tree
//!   ↓          ↓             ↓               ↓                ↓                ↓
//! Arcs     Undirected   Order/Fill-ins    Forest of       Compacted       Complete
//!                                          cliques          cliques        separators
//! ```

mod clique_graph;
mod config;
mod elimination_tree;
mod error;
mod graph;
mod junction_tree;
mod max_prime;
mod ordering;
mod running_intersection;
mod simplicial_set;
mod thinning;
mod triangulation;
mod weights;

pub use clique_graph::{CliqueGraph, CliqueId};
pub use config::{TriangulationConfig, DEFAULT_QUASI_RATIO, DEFAULT_WEIGHT_THRESHOLD};
pub use error::{Result, TriangulationError};
pub use graph::{moralize, DiGraph, Edge, MixedGraph, MoralGraphSource, NodeId, NodeSet, UndiGraph};
pub use junction_tree::JunctionTree;
pub use max_prime::MaxPrimeSubgraphTree;
pub use ordering::EliminationStrategy;
pub use simplicial_set::{NodeClass, SimplicialSet};
pub use thinning::recursive_thinning;
pub use triangulation::Triangulation;
pub use weights::NodeWeights;

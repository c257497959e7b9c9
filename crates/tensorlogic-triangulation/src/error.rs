//! Error types for triangulation and clique-tree construction.

use thiserror::Error;

use crate::clique_graph::CliqueId;
use crate::graph::NodeId;

/// Errors that can occur while triangulating a graph or deriving its clique trees.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TriangulationError {
    /// A node of the graph has no entry in the weight table
    #[error("Node {node} has no weight")]
    MissingWeight { node: NodeId },

    /// Weights are logs of domain sizes, so they must be finite and non-negative
    #[error("Invalid weight {weight} for node {node}: weights must be finite and non-negative")]
    InvalidWeight { node: NodeId, weight: f64 },

    /// A variable cannot have an empty domain
    #[error("Invalid domain size 0 for node {node}")]
    InvalidDomainSize { node: NodeId },

    /// A derived structure was queried before any graph was supplied
    #[error("No graph has been supplied to the triangulation")]
    NoGraph,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid elimination order: {0}")]
    InvalidOrder(String),

    /// Fill-ins were queried while fill-in tracking is disabled
    #[error("Fill-in tracking is disabled in the triangulation configuration")]
    FillInsNotTracked,

    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    #[error("Self-loop on node {0} is not allowed")]
    SelfLoop(NodeId),

    #[error("Clique {0} not found")]
    CliqueNotFound(CliqueId),

    #[error("Clique {0} already exists")]
    DuplicateClique(CliqueId),

    #[error("No edge between cliques {0} and {1}")]
    EdgeNotFound(CliqueId, CliqueId),
}

/// Result type for triangulation operations.
pub type Result<T> = std::result::Result<T, TriangulationError>;

//! Per-node weights (log of domain sizes).
//!
//! Weights live in a dense table indexed by node id so that the hot paths
//! of the elimination loop never hash.

use crate::error::{Result, TriangulationError};
use crate::graph::NodeId;

/// Weight table: `weight(node) = ln(domain size of node)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeWeights {
    values: Vec<Option<f64>>,
}

impl NodeWeights {
    /// Create an empty weight table.
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Build the table from domain sizes.
    pub fn from_domain_sizes(sizes: impl IntoIterator<Item = (NodeId, usize)>) -> Result<Self> {
        let mut weights = Self::new();
        for (node, size) in sizes {
            if size == 0 {
                return Err(TriangulationError::InvalidDomainSize { node });
            }
            weights.insert(node, (size as f64).ln())?;
        }
        Ok(weights)
    }

    /// Give every node in `nodes` the same domain size.
    pub fn uniform(nodes: impl IntoIterator<Item = NodeId>, domain_size: usize) -> Result<Self> {
        Self::from_domain_sizes(nodes.into_iter().map(|node| (node, domain_size)))
    }

    /// Set the weight of a node.
    pub fn insert(&mut self, node: NodeId, weight: f64) -> Result<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(TriangulationError::InvalidWeight { node, weight });
        }
        if node >= self.values.len() {
            self.values.resize(node + 1, None);
        }
        self.values[node] = Some(weight);
        Ok(())
    }

    pub fn get(&self, node: NodeId) -> Option<f64> {
        self.values.get(node).copied().flatten()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.get(node).is_some()
    }

    /// Number of nodes with a weight.
    pub fn len(&self) -> usize {
        self.values.iter().filter(|w| w.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Log of the domain size of a set of nodes.
    pub fn clique_weight<'a>(&self, nodes: impl IntoIterator<Item = &'a NodeId>) -> Result<f64> {
        nodes.into_iter().try_fold(0.0, |total, &node| {
            self.get(node)
                .map(|weight| total + weight)
                .ok_or(TriangulationError::MissingWeight { node })
        })
    }

    /// Ensure every node of `nodes` has a weight.
    pub fn check_covers(&self, nodes: impl IntoIterator<Item = NodeId>) -> Result<()> {
        for node in nodes {
            if !self.contains(node) {
                return Err(TriangulationError::MissingWeight { node });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_from_domain_sizes() {
        let weights = NodeWeights::from_domain_sizes([(0, 2), (3, 4)]).unwrap();
        assert_eq!(weights.len(), 2);
        assert_abs_diff_eq!(weights.get(0).unwrap(), 2f64.ln(), epsilon = 1e-12);
        assert_abs_diff_eq!(weights.get(3).unwrap(), 4f64.ln(), epsilon = 1e-12);
        assert!(weights.get(1).is_none());
        assert!(weights.get(100).is_none());
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(
            NodeWeights::from_domain_sizes([(1, 0)]),
            Err(TriangulationError::InvalidDomainSize { node: 1 })
        );

        let mut weights = NodeWeights::new();
        assert!(weights.insert(0, -1.0).is_err());
        assert!(weights.insert(0, f64::NAN).is_err());
        assert!(weights.insert(0, f64::INFINITY).is_err());
        assert!(weights.is_empty());
    }

    #[test]
    fn test_clique_weight() {
        let weights = NodeWeights::uniform(0..3, 2).unwrap();
        let clique = [0, 1, 2];
        assert_abs_diff_eq!(weights.clique_weight(&clique).unwrap(), 8f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_clique_weight_missing_node() {
        let weights = NodeWeights::uniform([0, 1], 2).unwrap();
        assert_eq!(
            weights.clique_weight(&[0, 1, 2]),
            Err(TriangulationError::MissingWeight { node: 2 })
        );
    }

    #[test]
    fn test_check_covers() {
        let weights = NodeWeights::uniform([0, 1], 3).unwrap();
        assert!(weights.check_covers([0, 1]).is_ok());
        assert_eq!(
            weights.check_covers([0, 2]),
            Err(TriangulationError::MissingWeight { node: 2 })
        );
    }
}

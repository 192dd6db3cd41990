//! Builder for [`HashRing`].

use crate::node::NodeId;
use crate::partitioner::{Partitioner, SipPartitioner};
use crate::ring::ring::{HashRing, DEFAULT_VNODES_PER_NODE};

/// Collects settings and initial members, then builds a ring in one go.
///
/// ```rust
/// use corelib::ring::RingBuilder;
///
/// let ring = RingBuilder::new()
///     .with_vnodes(8)
///     .add_nodes(["cache-a", "cache-b", "cache-c"])
///     .build();
/// assert_eq!(ring.token_count(), 24);
/// ```
#[derive(Debug)]
pub struct RingBuilder<P: Partitioner = SipPartitioner> {
    partitioner: P,
    vnodes_per_node: usize,
    nodes: Vec<NodeId>,
}

impl RingBuilder<SipPartitioner> {
    pub fn new() -> Self {
        Self {
            partitioner: SipPartitioner,
            vnodes_per_node: DEFAULT_VNODES_PER_NODE,
            nodes: Vec::new(),
        }
    }
}

impl Default for RingBuilder<SipPartitioner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Partitioner> RingBuilder<P> {
    /// Swap the hash function.
    pub fn with_partitioner<Q: Partitioner>(self, partitioner: Q) -> RingBuilder<Q> {
        RingBuilder {
            partitioner,
            vnodes_per_node: self.vnodes_per_node,
            nodes: self.nodes,
        }
    }

    pub fn with_vnodes(mut self, vnodes_per_node: usize) -> Self {
        self.vnodes_per_node = vnodes_per_node;
        self
    }

    pub fn add_node(mut self, node: impl Into<NodeId>) -> Self {
        self.nodes.push(node.into());
        self
    }

    pub fn add_nodes<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        self.nodes.extend(nodes.into_iter().map(Into::into));
        self
    }

    /// Build the ring, adding nodes in the order they were given.
    pub fn build(self) -> HashRing<P> {
        let ring = HashRing::with_partitioner(self.partitioner, self.vnodes_per_node);
        for node in self.nodes {
            ring.add_node(node);
        }
        ring
    }
}

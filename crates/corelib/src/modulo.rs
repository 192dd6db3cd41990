//! Modulo sharding baseline.
//!
//! `nodes[hash(key) mod len(nodes)]`. This exists only to be compared with
//! the ring: changing the node count remaps almost every key, which is the
//! failure mode consistent hashing avoids. Keep it naive.

use crate::distribution::{Distribution, Scheme};
use crate::error::{Error, Result};
use crate::node::NodeId;
use crate::partitioner::{Partitioner, SipPartitioner};

/// Static modulo sharder over an ordered node list.
///
/// The order of `nodes` is part of the arithmetic: the same set in a
/// different order shards differently.
#[derive(Debug, Clone)]
pub struct ModuloSharder<P: Partitioner = SipPartitioner> {
    partitioner: P,
    nodes: Vec<NodeId>,
}

impl ModuloSharder<SipPartitioner> {
    pub fn new<I, N>(nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        Self::with_partitioner(SipPartitioner, nodes)
    }
}

impl<P: Partitioner> ModuloSharder<P> {
    pub fn with_partitioner<I, N>(partitioner: P, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        Self {
            partitioner,
            nodes: nodes.into_iter().map(Into::into).collect(),
        }
    }

    /// The node at `hash(key) mod len(nodes)`.
    pub fn assign(&self, key: &str) -> Result<NodeId> {
        if self.nodes.is_empty() {
            return Err(Error::EmptyTopology {
                scheme: Scheme::Modulo,
            });
        }
        let index = self.partitioner.token(key).value() % self.nodes.len() as u64;
        Ok(self.nodes[index as usize].clone())
    }

    /// Count of keys per node, built by repeated [`assign`](Self::assign).
    pub fn distribution<I, S>(&self, keys: I) -> Result<Distribution>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if self.nodes.is_empty() {
            return Err(Error::EmptyTopology {
                scheme: Scheme::Modulo,
            });
        }
        let mut distribution = Distribution::default();
        for key in keys {
            distribution.record(self.assign(key.as_ref())?);
        }
        Ok(distribution)
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn partitioner(&self) -> &P {
        &self.partitioner
    }
}

//! Distribution analysis over the ring and the modulo baseline.
//!
//! Everything here reads a scheme and never mutates it. Churn is measured by
//! resolving the same keys before and after a membership change and counting
//! the keys whose owner differs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::modulo::ModuloSharder;
use crate::node::NodeId;
use crate::partitioner::Partitioner;
use crate::ring::HashRing;

/// Which partitioning scheme produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scheme {
    ConsistentHash,
    Modulo,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::ConsistentHash => f.write_str("consistent hash ring"),
            Scheme::Modulo => f.write_str("modulo sharder"),
        }
    }
}

/// Anything that maps a key to its owning node.
pub trait KeyAssigner {
    fn assign(&self, key: &str) -> Result<NodeId>;

    fn scheme(&self) -> Scheme;

    /// True when there is no node to assign to.
    fn is_empty(&self) -> bool;

    /// Count of keys per node. Fails on an empty scheme even for zero keys.
    fn distribution<S: AsRef<str>>(&self, keys: &[S]) -> Result<Distribution>
    where
        Self: Sized,
    {
        if self.is_empty() {
            return Err(Error::EmptyTopology {
                scheme: self.scheme(),
            });
        }
        let mut distribution = Distribution::default();
        for key in keys {
            distribution.record(self.assign(key.as_ref())?);
        }
        Ok(distribution)
    }
}

impl<P: Partitioner> KeyAssigner for HashRing<P> {
    fn assign(&self, key: &str) -> Result<NodeId> {
        HashRing::assign(self, key)
    }

    fn scheme(&self) -> Scheme {
        Scheme::ConsistentHash
    }

    fn is_empty(&self) -> bool {
        HashRing::is_empty(self)
    }

    fn distribution<S: AsRef<str>>(&self, keys: &[S]) -> Result<Distribution> {
        HashRing::distribution(self, keys)
    }
}

impl<P: Partitioner> KeyAssigner for ModuloSharder<P> {
    fn assign(&self, key: &str) -> Result<NodeId> {
        ModuloSharder::assign(self, key)
    }

    fn scheme(&self) -> Scheme {
        Scheme::Modulo
    }

    fn is_empty(&self) -> bool {
        self.node_count() == 0
    }

    fn distribution<S: AsRef<str>>(&self, keys: &[S]) -> Result<Distribution> {
        ModuloSharder::distribution(self, keys)
    }
}

/// Keys per node. Nodes that received no key are absent, not zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distribution(BTreeMap<NodeId, usize>);

impl Distribution {
    pub(crate) fn record(&mut self, node: NodeId) {
        *self.0.entry(node).or_insert(0) += 1;
    }

    /// Keys assigned to `node` (zero if absent).
    pub fn get(&self, node: &str) -> usize {
        self.0.get(node).copied().unwrap_or(0)
    }

    /// Sum of all counts; equals the number of keys resolved.
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Number of nodes that received at least one key.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, usize)> {
        self.0.iter().map(|(node, count)| (node, *count))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.0.keys()
    }

    /// Spread of counts across the reported nodes, `None` if empty.
    pub fn balance(&self) -> Option<BalanceStats> {
        let min = *self.0.values().min()?;
        let max = *self.0.values().max()?;
        let mean = self.total() as f64 / self.0.len() as f64;
        Some(BalanceStats {
            mean,
            min,
            max,
            min_over_mean: min as f64 / mean,
            max_over_mean: max as f64 / mean,
        })
    }

    pub fn into_inner(self) -> BTreeMap<NodeId, usize> {
        self.0
    }
}

/// Load-balance summary of a [`Distribution`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BalanceStats {
    pub mean: f64,
    pub min: usize,
    pub max: usize,
    pub min_over_mean: f64,
    pub max_over_mean: f64,
}

/// Both schemes' distributions over the same key batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingComparison {
    pub consistent_hash: Distribution,
    pub modulo: Distribution,
}

/// Keys whose owner changed between two resolutions of the same batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChurnReport {
    pub total: usize,
    pub moved: usize,
    /// `moved / total`, 0.0 for an empty batch.
    pub fraction: f64,
}

/// Read-only analysis over any [`KeyAssigner`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DistributionAnalyzer;

impl DistributionAnalyzer {
    pub fn distribution<A, S>(scheme: &A, keys: &[S]) -> Result<Distribution>
    where
        A: KeyAssigner,
        S: AsRef<str>,
    {
        scheme.distribution(keys)
    }

    /// Owner of each key, in key order.
    pub fn assignments<A, S>(scheme: &A, keys: &[S]) -> Result<Vec<NodeId>>
    where
        A: KeyAssigner,
        S: AsRef<str>,
    {
        keys.iter().map(|key| scheme.assign(key.as_ref())).collect()
    }

    /// Ring and modulo distributions of the same batch.
    pub fn compare<R, M, S>(ring: &R, modulo: &M, keys: &[S]) -> Result<ShardingComparison>
    where
        R: KeyAssigner,
        M: KeyAssigner,
        S: AsRef<str>,
    {
        Ok(ShardingComparison {
            consistent_hash: ring.distribution(keys)?,
            modulo: modulo.distribution(keys)?,
        })
    }

    /// Compare two owner lists produced by [`assignments`](Self::assignments)
    /// over the same keys.
    pub fn churn(before: &[NodeId], after: &[NodeId]) -> ChurnReport {
        debug_assert_eq!(before.len(), after.len());
        let total = before.len().min(after.len());
        let moved = before
            .iter()
            .zip(after)
            .filter(|(old, new)| old != new)
            .count();
        let fraction = if total == 0 {
            0.0
        } else {
            moved as f64 / total as f64
        };
        ChurnReport {
            total,
            moved,
            fraction,
        }
    }
}

//! Shard assignment for a processing pipeline.
//!
//! A [`ShardRouter`] is the one object an orchestration layer holds: it owns
//! the ring that decides which cache node a record belongs to, and the modulo
//! baseline built over the same configured nodes for comparison. Construct it
//! explicitly and pass it around; there is no process-wide instance.

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::distribution::{ChurnReport, DistributionAnalyzer, ShardingComparison};
use crate::error::{Error, Result};
use crate::modulo::ModuloSharder;
use crate::node::NodeId;
use crate::partitioner::HashAlgorithm;
use crate::ring::HashRing;

/// A single membership change to evaluate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipChange {
    Add(NodeId),
    Remove(NodeId),
}

/// Churn of both schemes under the same membership change.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChurnComparison {
    pub consistent_hash: ChurnReport,
    pub modulo: ChurnReport,
}

/// Ring plus modulo baseline over one configured node list.
///
/// Both schemes always cover the same nodes. The modulo sharder sits behind
/// the membership lock; a membership change holds it for writing while it
/// updates the ring and rebuilds the sharder, and comparisons hold it for
/// reading.
#[derive(Debug)]
pub struct ShardRouter {
    ring: HashRing<HashAlgorithm>,
    modulo: RwLock<ModuloSharder<HashAlgorithm>>,
}

impl ShardRouter {
    /// Build both schemes over `nodes`, in the given order.
    pub fn new<I, N>(nodes: I, vnodes_per_node: usize, algorithm: HashAlgorithm) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        let nodes: Vec<NodeId> = nodes.into_iter().map(Into::into).collect();
        let ring = HashRing::with_partitioner(algorithm, vnodes_per_node);
        for node in &nodes {
            ring.add_node(node);
        }
        info!(
            nodes = nodes.len(),
            vnodes_per_node = ring.vnodes_per_node(),
            %algorithm,
            "shard router ready"
        );
        Self {
            ring,
            modulo: RwLock::new(ModuloSharder::with_partitioner(algorithm, nodes)),
        }
    }

    /// Ring owner of a record key.
    pub fn assign(&self, key: &str) -> Result<NodeId> {
        self.ring.assign(key)
    }

    /// Ring and modulo distributions of the same keys.
    pub fn comparison<S: AsRef<str>>(&self, keys: &[S]) -> Result<ShardingComparison> {
        if keys.is_empty() {
            return Err(Error::EmptyBatch);
        }
        let modulo = self.modulo.read();
        DistributionAnalyzer::compare(&self.ring, &*modulo, keys)
    }

    /// Add a node to both schemes. The modulo sharder is rebuilt with the
    /// node appended to its list.
    pub fn add_node(&self, node: impl Into<NodeId>) {
        let node = node.into();
        let mut modulo = self.modulo.write();
        self.ring.add_node(&node);
        if !modulo.nodes().contains(&node) {
            let mut nodes = modulo.nodes().to_vec();
            nodes.push(node);
            *modulo = ModuloSharder::with_partitioner(*modulo.partitioner(), nodes);
        }
    }

    /// Remove a node from both schemes. Returns `false` if it was not a member.
    pub fn remove_node(&self, node: &str) -> bool {
        let mut modulo = self.modulo.write();
        if !self.ring.remove_node(node) {
            return false;
        }
        let nodes: Vec<NodeId> = modulo.nodes().iter().filter(|n| *n != node).cloned().collect();
        *modulo = ModuloSharder::with_partitioner(*modulo.partitioner(), nodes);
        true
    }

    /// Churn each scheme would see if `change` were applied.
    ///
    /// Both sides are resolved from copies taken under the membership lock:
    /// the ring before and after the change, and the modulo sharder before
    /// and rebuilt over the changed node list. Live state is untouched.
    pub fn churn_comparison<S: AsRef<str>>(
        &self,
        keys: &[S],
        change: &MembershipChange,
    ) -> Result<ChurnComparison> {
        if keys.is_empty() {
            return Err(Error::EmptyBatch);
        }

        let (ring_before, modulo_before) = {
            let modulo = self.modulo.read();
            (self.ring.snapshot(), modulo.clone())
        };
        let ring_after = ring_before.snapshot();
        let mut modulo_nodes = modulo_before.nodes().to_vec();
        match change {
            MembershipChange::Add(node) => {
                ring_after.add_node(node);
                if !modulo_nodes.contains(node) {
                    modulo_nodes.push(node.clone());
                }
            }
            MembershipChange::Remove(node) => {
                ring_after.remove_node(node.as_str());
                modulo_nodes.retain(|n| n != node);
            }
        }
        let modulo_after =
            ModuloSharder::with_partitioner(*modulo_before.partitioner(), modulo_nodes);

        let consistent_hash = DistributionAnalyzer::churn(
            &DistributionAnalyzer::assignments(&ring_before, keys)?,
            &DistributionAnalyzer::assignments(&ring_after, keys)?,
        );
        let modulo = DistributionAnalyzer::churn(
            &DistributionAnalyzer::assignments(&modulo_before, keys)?,
            &DistributionAnalyzer::assignments(&modulo_after, keys)?,
        );
        debug!(
            ring_moved = consistent_hash.moved,
            modulo_moved = modulo.moved,
            total = keys.len(),
            "evaluated membership change"
        );
        Ok(ChurnComparison {
            consistent_hash,
            modulo,
        })
    }

    /// The live ring. Change membership through the router so the modulo
    /// baseline follows.
    pub fn ring(&self) -> &HashRing<HashAlgorithm> {
        &self.ring
    }

    /// Copy of the current modulo sharder.
    pub fn modulo(&self) -> ModuloSharder<HashAlgorithm> {
        self.modulo.read().clone()
    }

    /// Configured nodes, in modulo order.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.modulo.read().nodes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> ShardRouter {
        ShardRouter::new(["cache-a", "cache-b", "cache-c"], 50, HashAlgorithm::Sip)
    }

    fn keys(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("record-{i}")).collect()
    }

    #[test]
    fn test_comparison_rejects_empty_batch() {
        let none: [&str; 0] = [];
        assert_eq!(router().comparison(&none).unwrap_err(), Error::EmptyBatch);
    }

    #[test]
    fn test_assign_matches_ring() {
        let router = router();
        assert_eq!(
            router.assign("record-1").unwrap(),
            router.ring().assign("record-1").unwrap()
        );
    }

    #[test]
    fn test_churn_comparison_leaves_live_state_alone() {
        let router = router();
        let batch = keys(2_000);
        let before = router.comparison(&batch).unwrap();

        let churn = router
            .churn_comparison(&batch, &MembershipChange::Add(NodeId::from("cache-d")))
            .unwrap();

        assert_eq!(churn.consistent_hash.total, 2_000);
        assert!(churn.consistent_hash.moved < churn.modulo.moved);
        assert_eq!(router.ring().node_count(), 3);
        assert_eq!(router.modulo().node_count(), 3);
        assert_eq!(router.comparison(&batch).unwrap(), before);
    }

    #[test]
    fn test_churn_on_remove_only_moves_removed_nodes_keys() {
        let router = router();
        let batch = keys(1_000);
        let owned_by_b = batch
            .iter()
            .filter(|k| router.assign(k).unwrap() == "cache-b")
            .count();

        let churn = router
            .churn_comparison(&batch, &MembershipChange::Remove(NodeId::from("cache-b")))
            .unwrap();
        assert_eq!(churn.consistent_hash.moved, owned_by_b);
    }

    #[test]
    fn test_removing_last_node_surfaces_empty_topology() {
        let router = ShardRouter::new(["solo"], 8, HashAlgorithm::Xxh3);
        let err = router
            .churn_comparison(&["k"], &MembershipChange::Remove(NodeId::from("solo")))
            .unwrap_err();
        assert!(err.is_empty_topology());
    }

    fn reported_nodes(distribution: &crate::Distribution) -> Vec<&str> {
        distribution.nodes().map(NodeId::as_str).collect()
    }

    #[test]
    fn test_comparison_covers_same_nodes_after_add() {
        let router = router();
        router.add_node("cache-d");
        assert_eq!(router.ring().node_count(), 4);
        assert_eq!(router.modulo().node_count(), 4);

        let comparison = router.comparison(&keys(1_000)).unwrap();
        let expected = ["cache-a", "cache-b", "cache-c", "cache-d"];
        assert_eq!(reported_nodes(&comparison.consistent_hash), expected);
        assert_eq!(reported_nodes(&comparison.modulo), expected);
    }

    #[test]
    fn test_comparison_covers_same_nodes_after_remove() {
        let router = router();
        assert!(router.remove_node("cache-b"));
        assert!(!router.remove_node("cache-b"));
        assert_eq!(router.nodes(), [NodeId::from("cache-a"), NodeId::from("cache-c")]);

        let comparison = router.comparison(&keys(1_000)).unwrap();
        assert_eq!(reported_nodes(&comparison.consistent_hash), ["cache-a", "cache-c"]);
        assert_eq!(reported_nodes(&comparison.modulo), ["cache-a", "cache-c"]);
    }

    #[test]
    fn test_re_adding_node_keeps_modulo_list_unique() {
        let router = router();
        router.add_node("cache-a");
        assert_eq!(router.modulo().node_count(), 3);
    }

    #[test]
    fn test_churn_baseline_is_stable_under_concurrent_membership_changes() {
        use std::sync::Arc;
        use std::thread;

        let router = Arc::new(router());
        let batch = keys(500);
        let change = MembershipChange::Add(NodeId::from("cache-d"));
        let without_x = router.churn_comparison(&batch, &change).unwrap();
        router.add_node("cache-x");
        let with_x = router.churn_comparison(&batch, &change).unwrap();
        assert!(router.remove_node("cache-x"));

        let writer = {
            let router = Arc::clone(&router);
            thread::spawn(move || {
                for _ in 0..200 {
                    router.add_node("cache-x");
                    router.remove_node("cache-x");
                }
            })
        };
        for _ in 0..50 {
            let churn = router.churn_comparison(&batch, &change).unwrap();
            assert!(churn == without_x || churn == with_x, "mixed membership: {churn:?}");
        }
        writer.join().unwrap();
    }
}

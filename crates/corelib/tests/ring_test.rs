//! Tests for the hash ring implementation.
//!
//! # Test Strategy
//!
//! 1. **Basic functionality**: Empty ring, add/lookup, remove
//! 2. **Multiple nodes**: Distribution, consistency
//! 3. **Edge cases**: Wraparound, single node, duplicate adds
//! 4. **Thread safety**: Concurrent lookups against membership changes

use std::sync::Arc;
use std::thread;

use corelib::node::NodeId;
use corelib::ring::{HashRing, RingBuilder};
use corelib::{Error, HashAlgorithm, Scheme};

// ============================================================================
// Basic Functionality Tests
// ============================================================================

#[test]
fn test_empty_ring_lookup() {
    let ring = HashRing::new();
    assert_eq!(
        ring.assign("key1"),
        Err(Error::EmptyTopology {
            scheme: Scheme::ConsistentHash
        })
    );
    assert!(ring.distribution(["key1"]).unwrap_err().is_empty_topology());
    assert!(ring
        .distribution(Vec::<String>::new())
        .unwrap_err()
        .is_empty_topology());
    assert_eq!(ring.node_count(), 0);
    assert_eq!(ring.token_count(), 0);
}

#[test]
fn test_add_node_and_lookup() {
    let ring = HashRing::with_vnodes(4);
    ring.add_node("node1");

    assert_eq!(ring.node_count(), 1);
    assert_eq!(ring.token_count(), 4);

    assert_eq!(ring.assign("test-key").unwrap(), "node1");
    assert!(ring.contains_node("node1"));
}

#[test]
fn test_remove_node() {
    let ring = HashRing::with_vnodes(4);
    ring.add_node("node1");
    ring.add_node("node2");

    assert_eq!(ring.node_count(), 2);
    assert_eq!(ring.token_count(), 8);

    assert!(ring.remove_node("node1"), "Should successfully remove node");

    assert_eq!(ring.node_count(), 1);
    assert_eq!(ring.token_count(), 4);
    assert_eq!(ring.assign("some-key").unwrap(), "node2");
    assert!(!ring.contains_node("node1"));

    // Removing a node that is not there is a no-op
    assert!(!ring.remove_node("node999"));
    assert_eq!(ring.token_count(), 4);
}

#[test]
fn test_remove_all_nodes_empties_ring() {
    let ring = HashRing::with_vnodes(4);
    ring.add_node("node1");
    ring.add_node("node2");
    ring.remove_node("node1");
    ring.remove_node("node2");

    assert!(ring.is_empty());
    assert!(ring.assign("key").unwrap_err().is_empty_topology());
}

// ============================================================================
// Multiple Nodes Tests
// ============================================================================

#[test]
fn test_multiple_nodes() {
    let ring = HashRing::with_vnodes(4);
    ring.add_node("node1");
    ring.add_node("node2");
    ring.add_node("node3");

    assert_eq!(ring.node_count(), 3);
    assert_eq!(ring.token_count(), 12);

    let members = ring.nodes();
    for key in ["key1", "key2", "key3"] {
        let owner = ring.assign(key).unwrap();
        assert!(members.contains(&owner), "{key} mapped to non-member {owner}");
    }
}

#[test]
fn test_consistent_lookup() {
    let ring = HashRing::with_vnodes(4);
    ring.add_node("node1");
    ring.add_node("node2");

    let first = ring.assign("consistent-key").unwrap();
    for _ in 0..10 {
        assert_eq!(ring.assign("consistent-key").unwrap(), first);
    }
}

#[test]
fn test_identical_rings_agree() {
    // nodes a, b, c with 3 vnodes each, built twice
    let build = || RingBuilder::new().with_vnodes(3).add_nodes(["a", "b", "c"]).build();
    let first = build();
    let second = build();

    assert_eq!(first.tokens(), second.tokens());
    assert_eq!(
        first.assign("user-42").unwrap(),
        second.assign("user-42").unwrap()
    );
}

#[test]
fn test_removed_node_never_returned() {
    let ring = HashRing::with_vnodes(50);
    for node in ["a", "b", "c", "d"] {
        ring.add_node(node);
    }
    let keys: Vec<String> = (0..2_000).map(|i| format!("key-{i}")).collect();
    let owned_by_c: Vec<&String> = keys
        .iter()
        .filter(|k| ring.assign(k).unwrap() == "c")
        .collect();
    assert!(!owned_by_c.is_empty());

    ring.remove_node("c");
    for key in owned_by_c {
        let owner = ring.assign(key).unwrap();
        assert_ne!(owner, "c");
        assert!(ring.contains_node(owner.as_str()));
    }
}

// ============================================================================
// Ring Builder Tests
// ============================================================================

#[test]
fn test_ring_builder_default() {
    let ring = RingBuilder::new()
        .add_node("node1")
        .add_node("node2")
        .build();

    assert!(ring.assign("key").is_ok());
    assert_eq!(ring.node_count(), 2);
    // Default is 50 vnodes per node
    assert_eq!(ring.token_count(), 100);
}

#[test]
fn test_ring_builder_custom_vnodes() {
    let ring = RingBuilder::new()
        .with_vnodes(8)
        .add_node("node1")
        .add_node("node2")
        .build();

    assert_eq!(ring.node_count(), 2);
    assert_eq!(ring.token_count(), 16);
}

#[test]
fn test_ring_builder_partitioner() {
    let ring = RingBuilder::new()
        .with_partitioner(HashAlgorithm::Xxh3)
        .with_vnodes(8)
        .add_node("node1")
        .build();

    assert_eq!(ring.partitioner_name(), "Xxh3Partitioner");
    assert_eq!(ring.token_count(), 8);
}

// ============================================================================
// Edge Cases
// ============================================================================

#[test]
fn test_single_node() {
    let ring = HashRing::with_vnodes(4);
    ring.add_node("node1");

    for key in ["key1", "key2", "", "very-long-key-name"] {
        assert_eq!(ring.assign(key).unwrap(), "node1");
    }
}

#[test]
fn test_add_remove_add() {
    let ring = HashRing::with_vnodes(4);
    ring.add_node("node1");
    let tokens = ring.tokens();

    assert!(ring.remove_node("node1"));
    assert_eq!(ring.node_count(), 0);

    ring.add_node("node1");
    assert_eq!(ring.node_count(), 1);
    assert_eq!(ring.tokens(), tokens, "re-added node lands on the same tokens");
}

#[test]
fn test_idempotent_add() {
    let ring = HashRing::with_vnodes(4);
    ring.add_node("node1");
    let tokens = ring.tokens();

    ring.add_node("node1");
    assert_eq!(ring.token_count(), 4);
    assert_eq!(ring.node_count(), 1);
    assert_eq!(ring.tokens(), tokens);
}

// ============================================================================
// Utility Tests
// ============================================================================

#[test]
fn test_get_all_nodes() {
    let ring = HashRing::with_vnodes(4);
    ring.add_node("node2");
    ring.add_node("node1");

    assert_eq!(ring.nodes(), vec![NodeId::from("node1"), NodeId::from("node2")]);
}

#[test]
fn test_get_all_tokens() {
    let ring = HashRing::with_vnodes(4);
    ring.add_node("node1");

    let tokens = ring.tokens();
    assert_eq!(tokens.len(), 4);
    assert!(tokens.windows(2).all(|w| w[0].0 < w[1].0), "tokens in ring order");
    for (_, node_id) in tokens {
        assert_eq!(node_id, "node1");
    }
}

#[test]
fn test_partitioner_name() {
    assert_eq!(HashRing::new().partitioner_name(), "SipPartitioner");
}

// ============================================================================
// Thread Safety
// ============================================================================

#[test]
fn test_concurrent_lookups_during_membership_changes() {
    let ring = Arc::new(RingBuilder::new().add_nodes(["a", "b", "c"]).build());

    let readers: Vec<_> = (0..4)
        .map(|t| {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                for i in 0..2_000 {
                    let owner = ring.assign(&format!("t{t}-k{i}")).unwrap();
                    assert!(["a", "b", "c", "d"].contains(&owner.as_str()));
                }
            })
        })
        .collect();

    for _ in 0..50 {
        ring.add_node("d");
        ring.remove_node("d");
    }

    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(ring.node_count(), 3);
}

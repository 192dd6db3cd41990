//! Virtual node abstractions.
//!
//! # Virtual Nodes (VNodes) Concept
//!
//! Instead of each physical node owning a single token on the ring, each node
//! owns `V` tokens scattered around it. This gives:
//!
//! 1. **Better Load Distribution**: each node's share of the ring is the sum
//!    of many small arcs, so shares converge on `1/N`.
//! 2. **Small Remap Scope**: when a node joins or leaves, only the keys on the
//!    arcs in front of its tokens move, about `1/N` of all keys.
//!
//! # Performance Characteristics
//!
//! - **Memory**: O(N·V) tokens for N nodes
//! - **Lookup**: O(log(N·V))
//!
//! Every node in a ring gets the same `V`; weighted nodes are not supported.

use std::fmt;

use crate::node::NodeId;
use crate::partitioner::Partitioner;
use crate::token::Token;

/// A single token position owned by a physical node.
///
/// Ordered by token first, so a sorted list of vnodes is a walk around the
/// ring.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualNode {
    /// Token position on the ring.
    pub token: Token,

    /// The physical node that owns this virtual node.
    pub node_id: NodeId,
}

impl VirtualNode {
    #[inline]
    pub fn new(token: Token, node_id: NodeId) -> Self {
        Self { token, node_id }
    }

    /// Derive the `vnode_index`-th virtual node of `node_id`.
    ///
    /// The token is `hash("{node_id}-{vnode_index}")`, so the same node always
    /// lands on the same positions under the same partitioner.
    ///
    /// # Example
    /// ```rust
    /// use corelib::{NodeId, SipPartitioner, VirtualNode};
    ///
    /// let node = NodeId::from("cache-a");
    /// let v0 = VirtualNode::from_index(&SipPartitioner, &node, 0);
    /// let v1 = VirtualNode::from_index(&SipPartitioner, &node, 1);
    /// assert_ne!(v0.token, v1.token);
    /// ```
    pub fn from_index<P: Partitioner + ?Sized>(
        partitioner: &P,
        node_id: &NodeId,
        vnode_index: usize,
    ) -> Self {
        let token = partitioner.token(&vnode_label(node_id, vnode_index));
        Self::new(token, node_id.clone())
    }

    #[inline]
    pub fn token(&self) -> Token {
        self.token
    }

    #[inline]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Clockwise distance from this vnode to `other`.
    #[inline]
    pub fn distance_to(&self, other: &Self) -> u64 {
        self.token.distance_to(&other.token)
    }
}

/// Label hashed to place a virtual node: `"{node}-{index}"`.
pub fn vnode_label(node_id: &NodeId, vnode_index: usize) -> String {
    format!("{}-{}", node_id, vnode_index)
}

impl fmt::Display for VirtualNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VNode(token={}, node={})", self.token, self.node_id)
    }
}

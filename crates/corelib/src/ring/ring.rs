//! Hash ring data structure.
//!
//! `BTreeMap<Token, NodeId>` ordered by position, plus the membership set,
//! both behind a single `RwLock`. Lookups take the read lock; membership
//! changes take the write lock, so a lookup never observes a node half-added
//! or half-removed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::distribution::{Distribution, Scheme};
use crate::error::{Error, Result};
use crate::node::NodeId;
use crate::partitioner::{Partitioner, SipPartitioner};
use crate::token::{Token, TOKEN_SPACE};
use crate::vnode::VirtualNode;

/// Virtual nodes per node when none is configured.
pub const DEFAULT_VNODES_PER_NODE: usize = 50;

#[derive(Debug, Clone, Default)]
struct RingState {
    /// Position -> owning node.
    tokens: BTreeMap<Token, NodeId>,
    /// Nodes added and not yet removed.
    members: BTreeSet<NodeId>,
}

impl RingState {
    /// Owner of the first token at or after `token`, wrapping to the first
    /// token on the ring.
    fn owner_for(&self, token: Token) -> Option<&NodeId> {
        self.tokens
            .range(token..)
            .next()
            .or_else(|| self.tokens.iter().next())
            .map(|(_, node_id)| node_id)
    }
}

/// Consistent hash ring with a fixed number of virtual nodes per node.
///
/// Safe to share between threads; see the module docs for the locking
/// discipline.
///
/// # Collisions
///
/// If two nodes' virtual nodes hash to the same token, the node inserted
/// last owns that token. The earlier node keeps its other tokens. Removing
/// the later node does not hand the token back.
#[derive(Debug)]
pub struct HashRing<P: Partitioner = SipPartitioner> {
    partitioner: Arc<P>,
    vnodes_per_node: usize,
    state: RwLock<RingState>,
}

impl HashRing<SipPartitioner> {
    /// Empty ring with the default partitioner and vnode count.
    pub fn new() -> Self {
        Self::with_vnodes(DEFAULT_VNODES_PER_NODE)
    }

    /// Empty ring with the default partitioner.
    pub fn with_vnodes(vnodes_per_node: usize) -> Self {
        Self::with_partitioner(SipPartitioner, vnodes_per_node)
    }
}

impl Default for HashRing<SipPartitioner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Partitioner> HashRing<P> {
    /// Empty ring over `partitioner`.
    ///
    /// A `vnodes_per_node` of zero is clamped to one: a ring with no tokens
    /// per node could never assign anything.
    pub fn with_partitioner(partitioner: P, vnodes_per_node: usize) -> Self {
        let vnodes_per_node = if vnodes_per_node == 0 {
            warn!("virtual node count of 0 clamped to 1");
            1
        } else {
            vnodes_per_node
        };
        Self {
            partitioner: Arc::new(partitioner),
            vnodes_per_node,
            state: RwLock::new(RingState::default()),
        }
    }

    /// Add a node and all of its virtual nodes.
    ///
    /// Adding a node that is already present re-inserts the same tokens, so it
    /// has no effect (unless another node has since taken one of them by
    /// collision, in which case this node takes it back).
    pub fn add_node(&self, node: impl Into<NodeId>) {
        let node_id = node.into();
        let vnodes = self.vnodes_for(&node_id);

        let mut state = self.state.write();
        for vnode in vnodes {
            if let Some(previous) = state.tokens.insert(vnode.token, vnode.node_id) {
                if previous != node_id {
                    debug!(
                        token = %vnode.token,
                        %previous,
                        winner = %node_id,
                        "token collision, last write wins"
                    );
                }
            }
        }
        state.members.insert(node_id.clone());
        debug!(node = %node_id, vnodes = self.vnodes_per_node, "added node to ring");
    }

    /// Remove a node and every token it currently owns.
    ///
    /// Returns `false` if the node was not a member.
    pub fn remove_node(&self, node: &str) -> bool {
        let node_id = NodeId::from(node);
        let vnodes = self.vnodes_for(&node_id);

        let mut state = self.state.write();
        if !state.members.remove(node) {
            return false;
        }
        for vnode in vnodes {
            if state.tokens.get(&vnode.token) == Some(&node_id) {
                state.tokens.remove(&vnode.token);
            }
        }
        debug!(node = %node_id, "removed node from ring");
        true
    }

    /// The node responsible for `key`.
    ///
    /// Walks clockwise from `hash(key)` to the first token at or after it,
    /// wrapping past the end of the ring.
    pub fn assign(&self, key: &str) -> Result<NodeId> {
        let state = self.state.read();
        self.assign_locked(&state, key)
    }

    /// Count of keys per node, for every key in `keys`.
    ///
    /// The whole batch is resolved under one read lock, so it sees a single
    /// membership. Duplicate keys are counted each time.
    pub fn distribution<I, S>(&self, keys: I) -> Result<Distribution>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let state = self.state.read();
        if state.tokens.is_empty() {
            return Err(Self::empty());
        }
        let mut distribution = Distribution::default();
        for key in keys {
            distribution.record(self.assign_locked(&state, key.as_ref())?);
        }
        Ok(distribution)
    }

    /// Fraction of the token space owned by each node.
    ///
    /// Each token owns the arc from the previous token (exclusive) up to
    /// itself (inclusive). Fractions sum to 1.0 for a non-empty ring.
    pub fn ownership(&self) -> BTreeMap<NodeId, f64> {
        let state = self.state.read();
        let mut shares = BTreeMap::new();
        let Some((&last, _)) = state.tokens.iter().next_back() else {
            return shares;
        };
        if state.tokens.len() == 1 {
            if let Some(owner) = state.tokens.values().next() {
                shares.insert(owner.clone(), 1.0);
            }
            return shares;
        }

        let mut previous = last;
        for (&token, owner) in &state.tokens {
            let arc = previous.distance_to(&token) as f64 / TOKEN_SPACE;
            *shares.entry(owner.clone()).or_insert(0.0) += arc;
            previous = token;
        }
        shares
    }

    /// Independent copy of this ring, for what-if membership changes.
    pub fn snapshot(&self) -> Self {
        Self {
            partitioner: Arc::clone(&self.partitioner),
            vnodes_per_node: self.vnodes_per_node,
            state: RwLock::new(self.state.read().clone()),
        }
    }

    /// Number of member nodes.
    pub fn node_count(&self) -> usize {
        self.state.read().members.len()
    }

    /// Number of tokens on the ring.
    pub fn token_count(&self) -> usize {
        self.state.read().tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().tokens.is_empty()
    }

    pub fn vnodes_per_node(&self) -> usize {
        self.vnodes_per_node
    }

    pub fn contains_node(&self, node: &str) -> bool {
        self.state.read().members.contains(node)
    }

    /// Member nodes in identifier order.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.state.read().members.iter().cloned().collect()
    }

    /// All `(token, owner)` pairs in ring order.
    pub fn tokens(&self) -> Vec<(Token, NodeId)> {
        self.state
            .read()
            .tokens
            .iter()
            .map(|(token, node_id)| (*token, node_id.clone()))
            .collect()
    }

    pub fn partitioner(&self) -> &P {
        &self.partitioner
    }

    pub fn partitioner_name(&self) -> &'static str {
        self.partitioner.name()
    }

    fn assign_locked(&self, state: &RingState, key: &str) -> Result<NodeId> {
        if state.tokens.is_empty() {
            return Err(Self::empty());
        }
        let token = self.partitioner.token(key);
        state.owner_for(token).cloned().ok_or_else(Self::empty)
    }

    fn vnodes_for(&self, node_id: &NodeId) -> Vec<VirtualNode> {
        (0..self.vnodes_per_node)
            .map(|i| VirtualNode::from_index(self.partitioner.as_ref(), node_id, i))
            .collect()
    }

    fn empty() -> Error {
        Error::EmptyTopology {
            scheme: Scheme::ConsistentHash,
        }
    }
}

//! Consistent hash ring implementation.
//!
//! The ring manages token positions and provides lookup of the node
//! responsible for a key.

pub mod builder;
#[allow(clippy::module_inception)]
pub mod ring;

pub use builder::RingBuilder;
pub use ring::{HashRing, DEFAULT_VNODES_PER_NODE};

/// A ring using the default partitioner.
pub type Ring = HashRing;

//! Core library for consistent hashing implementation.
//!
//! This crate provides the key-space partitioning engine:
//! - Partitioners (the hash function) and ring tokens
//! - Node and virtual node abstractions
//! - The consistent hash ring and its builder
//! - A naive modulo sharder kept as a comparison baseline
//! - Distribution and churn analysis over both schemes
//! - The shard router a pipeline uses to place records

pub mod distribution;
pub mod error;
pub mod modulo;
pub mod node;
pub mod partitioner;
pub mod ring;
pub mod router;
pub mod token;
pub mod vnode;

pub use distribution::{
    BalanceStats, ChurnReport, Distribution, DistributionAnalyzer, KeyAssigner, Scheme,
    ShardingComparison,
};
pub use error::{Error, Result};
pub use modulo::ModuloSharder;
pub use node::NodeId;
pub use partitioner::{HashAlgorithm, Partitioner, SipPartitioner, Xxh3Partitioner};
pub use ring::{HashRing, Ring, RingBuilder};
pub use router::{ChurnComparison, MembershipChange, ShardRouter};
pub use token::Token;
pub use vnode::VirtualNode;

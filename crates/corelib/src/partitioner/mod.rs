//! Partitioner abstraction for consistent hashing.
//!
//! Partitioners are the ring's hash function: they turn keys (and virtual
//! node labels) into tokens. Both the ring and the modulo baseline take one,
//! so the two schemes always agree on `hash(key)`.

pub mod algorithm;
pub mod sip;
pub mod traits;
pub mod xxh3;

pub use algorithm::HashAlgorithm;
pub use sip::SipPartitioner;
pub use traits::Partitioner;
pub use xxh3::Xxh3Partitioner;

//! Core partitioner trait definitions.

use crate::token::Token;

/// A partitioner converts keys into tokens for placement on the hash ring.
///
/// Implementations must be pure: the same key yields the same token in every
/// call and every process, and no input (including `""`) may fail. Output
/// should be spread evenly over the `u64` space for short identifiers and
/// UUIDs; cryptographic strength is not required.
pub trait Partitioner: Send + Sync + 'static {
    /// Converts a key into a token.
    fn token(&self, key: &str) -> Token;

    /// Returns the name of this partitioner.
    fn name(&self) -> &'static str;
}

impl<P: Partitioner + ?Sized> Partitioner for Box<P> {
    fn token(&self, key: &str) -> Token {
        (**self).token(key)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

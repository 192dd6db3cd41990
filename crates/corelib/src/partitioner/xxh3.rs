//! XXH3 partitioner.

use xxhash_rust::xxh3::xxh3_64;

use crate::partitioner::traits::Partitioner;
use crate::token::Token;

/// XXH3-64 with the default seed. Faster than SipHash on long keys.
#[derive(Clone, Copy, Debug, Default)]
pub struct Xxh3Partitioner;

impl Partitioner for Xxh3Partitioner {
    fn token(&self, key: &str) -> Token {
        Token(xxh3_64(key.as_bytes()))
    }

    fn name(&self) -> &'static str {
        "Xxh3Partitioner"
    }
}

//! SipHash-2-4 partitioner (the default).

use std::hash::Hasher;

use siphasher::sip::SipHasher24;

use crate::partitioner::traits::Partitioner;
use crate::token::Token;

/// SipHash-2-4 with fixed all-zero keys.
///
/// The keys are fixed so tokens are stable across processes; only the raw key
/// bytes are fed to the hasher, with no length prefix, so tokens do not depend
/// on the platform's pointer width either.
#[derive(Clone, Copy, Debug, Default)]
pub struct SipPartitioner;

impl Partitioner for SipPartitioner {
    fn token(&self, key: &str) -> Token {
        let mut hasher = SipHasher24::new();
        hasher.write(key.as_bytes());
        Token(hasher.finish())
    }

    fn name(&self) -> &'static str {
        "SipPartitioner"
    }
}

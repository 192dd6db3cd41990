//! Positions on the hash ring.
//!
//! The ring is the full `u64` space bent into a circle: the successor of
//! `u64::MAX` is `0`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the token space, as a float, for ownership fractions.
pub(crate) const TOKEN_SPACE: f64 = 18_446_744_073_709_551_616.0;

/// A position on the ring, produced by a [`Partitioner`](crate::Partitioner).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(pub u64);

impl Token {
    /// Start of the ring.
    pub const ZERO: Token = Token(0);
    /// End of the ring.
    pub const MAX: Token = Token(u64::MAX);

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_max(&self) -> bool {
        self.0 == u64::MAX
    }

    /// Clockwise distance from `self` to `other`.
    pub fn distance_to(&self, other: &Self) -> u64 {
        other.0.wrapping_sub(self.0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

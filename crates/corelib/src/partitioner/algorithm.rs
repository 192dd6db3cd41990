//! Runtime selection of the hash function.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::partitioner::{Partitioner, SipPartitioner, Xxh3Partitioner};
use crate::token::Token;

/// Hash function chosen by configuration (`"sip"` or `"xxh3"`).
///
/// Implements [`Partitioner`] itself so a ring can be built over a choice
/// made at startup without boxing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sip,
    Xxh3,
}

impl Partitioner for HashAlgorithm {
    fn token(&self, key: &str) -> Token {
        match self {
            HashAlgorithm::Sip => SipPartitioner.token(key),
            HashAlgorithm::Xxh3 => Xxh3Partitioner.token(key),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sip => SipPartitioner.name(),
            HashAlgorithm::Xxh3 => Xxh3Partitioner.name(),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sip" | "siphash" => Ok(HashAlgorithm::Sip),
            "xxh3" | "xxhash" => Ok(HashAlgorithm::Xxh3),
            other => Err(Error::InvalidConfiguration(format!(
                "unknown hash algorithm '{other}' (expected 'sip' or 'xxh3')"
            ))),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sip => f.write_str("sip"),
            HashAlgorithm::Xxh3 => f.write_str("xxh3"),
        }
    }
}

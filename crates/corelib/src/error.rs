//! Error types for the core library.

use crate::distribution::Scheme;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
///
/// None of these are transient: the core performs no I/O, so a caller that
/// sees one of them should not retry the same call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A key was resolved against a scheme with no nodes.
    #[error("{scheme} has no nodes to assign keys to")]
    EmptyTopology {
        /// The scheme that was asked.
        scheme: Scheme,
    },

    /// A configuration value could not be interpreted.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A comparison was requested over zero keys.
    #[error("no keys provided")]
    EmptyBatch,
}

impl Error {
    /// True for the empty-topology condition, regardless of scheme.
    pub fn is_empty_topology(&self) -> bool {
        matches!(self, Error::EmptyTopology { .. })
    }
}

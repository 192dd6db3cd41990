//! Error types for warehouse backends.

use std::path::PathBuf;

/// Result type alias for warehouse operations.
pub type Result<T> = std::result::Result<T, WarehouseError>;

/// Errors that can occur while loading or reading the warehouse.
#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be encoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be decoded.
    #[error("corrupt row at {}:{line}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// Some tables of a batch were written and others were not.
    #[error("load reached {written:?} but failed on {failed:?}: {source}")]
    PartialLoad {
        written: Vec<String>,
        failed: Vec<String>,
        /// First failure encountered.
        #[source]
        source: std::io::Error,
    },

    /// The configured backend name is not recognised.
    #[error("unknown warehouse backend '{0}' (expected 'memory' or 'file')")]
    UnknownBackend(String),
}

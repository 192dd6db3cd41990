//! Error types for record sources.

/// Errors raised by the source registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// No source is registered under this name.
    #[error("unknown source '{0}'")]
    UnknownSource(String),
}

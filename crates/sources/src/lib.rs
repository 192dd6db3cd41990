//! Mock upstream databases for the ETL pipeline.
//!
//! Each [`MockDatabase`] holds raw records with a free-form key/value payload.
//! The [`SourceRegistry`] groups them and answers "everything since this
//! watermark" across all sources.

pub mod database;
pub mod error;
pub mod record;
pub mod registry;

pub use database::MockDatabase;
pub use error::SourceError;
pub use record::{Payload, SourceRecord};
pub use registry::SourceRegistry;

//! Core warehouse trait and types.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::record::TransformedRecord;

/// Row counts reported by a warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WarehouseMetrics {
    /// Backend name, `"memory"` or `"file"`.
    pub backend: &'static str,
    pub primary_rows: usize,
    pub replica_count: usize,
    /// Rows in the first replica (all replicas are written identically);
    /// zero when there are no replicas.
    pub replica_rows_each: usize,
}

/// Sink that stores normalized records with a replication fan-out.
///
/// All implementations must be `Send + Sync` so the pipeline can share one
/// behind an `Arc` across tasks.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Store a batch in the primary and every replica.
    ///
    /// Returns the number of records accepted.
    async fn load(&self, records: &[TransformedRecord]) -> Result<usize>;

    /// Up to `limit` recent rows from the primary.
    async fn snapshot(&self, limit: usize) -> Result<Vec<TransformedRecord>>;

    async fn metrics(&self) -> Result<WarehouseMetrics>;

    /// Backend name for logs and metrics.
    fn backend(&self) -> &'static str;
}

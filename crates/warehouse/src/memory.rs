//! In-memory warehouse backend.

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::record::TransformedRecord;
use crate::traits::{Warehouse, WarehouseMetrics};

#[derive(Debug, Default)]
struct Tables {
    primary: Vec<TransformedRecord>,
    replicas: Vec<Vec<TransformedRecord>>,
}

/// Append-only in-memory warehouse with naive replication.
///
/// Loading the same id twice stores it twice; use the file backend for
/// upsert-by-id behaviour.
#[derive(Debug)]
pub struct MemoryWarehouse {
    tables: RwLock<Tables>,
}

impl MemoryWarehouse {
    pub fn new(replica_count: usize) -> Self {
        Self {
            tables: RwLock::new(Tables {
                primary: Vec::new(),
                replicas: vec![Vec::new(); replica_count],
            }),
        }
    }
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    async fn load(&self, records: &[TransformedRecord]) -> Result<usize> {
        let mut tables = self.tables.write();
        tables.primary.extend_from_slice(records);
        for replica in &mut tables.replicas {
            replica.extend_from_slice(records);
        }
        debug!(rows = records.len(), replicas = tables.replicas.len(), "loaded batch into memory");
        Ok(records.len())
    }

    /// The last `limit` rows in load order.
    async fn snapshot(&self, limit: usize) -> Result<Vec<TransformedRecord>> {
        let tables = self.tables.read();
        let start = tables.primary.len().saturating_sub(limit);
        Ok(tables.primary[start..].to_vec())
    }

    async fn metrics(&self) -> Result<WarehouseMetrics> {
        let tables = self.tables.read();
        Ok(WarehouseMetrics {
            backend: self.backend(),
            primary_rows: tables.primary.len(),
            replica_count: tables.replicas.len(),
            replica_rows_each: tables.replicas.first().map_or(0, Vec::len),
        })
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

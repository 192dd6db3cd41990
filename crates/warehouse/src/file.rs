//! File-based warehouse backend.
//!
//! One JSON-lines file per table in a directory:
//! `{dir}/warehouse.jsonl`, `{dir}/warehouse_replica_1.jsonl`, ...
//!
//! Rows are appended on load. On read, later rows win over earlier rows with
//! the same id, which gives upsert-by-id semantics without rewriting files.
//!
//! A load writes every table even if one of them fails, then reports which
//! tables were and were not written. Because of the upsert semantics, loading
//! the same batch again after a partial failure brings the tables back in
//! line without duplicating rows.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::{Result, WarehouseError};
use crate::record::TransformedRecord;
use crate::traits::{Warehouse, WarehouseMetrics};

const PRIMARY_TABLE: &str = "warehouse";

/// Warehouse persisted as JSON-lines table files.
#[derive(Debug)]
pub struct FileWarehouse {
    dir: PathBuf,
    /// Primary first, then replicas in order.
    tables: Vec<String>,
    /// Serializes appends so concurrent loads never interleave lines.
    write_lock: Mutex<()>,
}

impl FileWarehouse {
    /// Open (or create) a warehouse rooted at `dir`.
    pub fn new(dir: impl AsRef<Path>, replica_count: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;

        let tables: Vec<String> = std::iter::once(PRIMARY_TABLE.to_owned())
            .chain((1..=replica_count).map(|i| format!("{PRIMARY_TABLE}_replica_{i}")))
            .collect();
        for table in &tables {
            let path = table_path(&dir, table);
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;
        }
        info!(dir = %dir.display(), tables = tables.len(), "opened file warehouse");

        Ok(Self {
            dir,
            tables,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Current rows of `table`, one per id.
    async fn read_table(&self, table: &str) -> Result<Vec<TransformedRecord>> {
        let path = table_path(&self.dir, table);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut rows: HashMap<String, TransformedRecord> = HashMap::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: TransformedRecord =
                serde_json::from_str(line).map_err(|source| WarehouseError::Corrupt {
                    path: path.clone(),
                    line: index + 1,
                    source,
                })?;
            rows.insert(record.id.clone(), record);
        }
        Ok(rows.into_values().collect())
    }
}

fn table_path(dir: &Path, table: &str) -> PathBuf {
    dir.join(format!("{table}.jsonl"))
}

async fn append_lines(path: &Path, lines: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(lines).await?;
    file.flush().await
}

#[async_trait]
impl Warehouse for FileWarehouse {
    async fn load(&self, records: &[TransformedRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut lines = Vec::new();
        for record in records {
            serde_json::to_writer(&mut lines, record)?;
            lines.push(b'\n');
        }

        let _guard = self.write_lock.lock().await;
        let mut written = Vec::with_capacity(self.tables.len());
        let mut failed = Vec::new();
        let mut first_error = None;
        for table in &self.tables {
            match append_lines(&table_path(&self.dir, table), &lines).await {
                Ok(()) => written.push(table.clone()),
                Err(e) => {
                    warn!(table = %table, error = %e, "append failed");
                    failed.push(table.clone());
                    first_error.get_or_insert(e);
                }
            }
        }

        if let Some(source) = first_error {
            return Err(WarehouseError::PartialLoad {
                written,
                failed,
                source,
            });
        }
        debug!(rows = records.len(), tables = self.tables.len(), "appended batch to files");
        Ok(records.len())
    }

    /// Up to `limit` rows, most recently ingested first.
    async fn snapshot(&self, limit: usize) -> Result<Vec<TransformedRecord>> {
        let mut rows = self.read_table(PRIMARY_TABLE).await?;
        rows.sort_by(|a, b| b.ingested_at.cmp(&a.ingested_at));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn metrics(&self) -> Result<WarehouseMetrics> {
        let primary_rows = self.read_table(PRIMARY_TABLE).await?.len();
        let replica_rows_each = match self.tables.get(1) {
            Some(first_replica) => self.read_table(first_replica).await?.len(),
            None => 0,
        };
        Ok(WarehouseMetrics {
            backend: self.backend(),
            primary_rows,
            replica_count: self.tables.len() - 1,
            replica_rows_each,
        })
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

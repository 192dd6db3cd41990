//! Extract, transform and load across the mock sources and the warehouse.
//!
//! Every transformed record is tagged with the cache node that owns its key on
//! the ring, so the warehouse rows show how the batch was sharded.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use corelib::{Distribution, ShardRouter, ShardingComparison};
use serde::Serialize;
use sources::{SourceRecord, SourceRegistry};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use warehouse::{create_warehouse, TransformedRecord, Warehouse, WarehouseError};

use crate::config::Settings;

/// Errors surfaced by a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("shard assignment failed: {0}")]
    Shard(#[from] corelib::Error),

    #[error("warehouse load failed: {0}")]
    Warehouse(#[from] WarehouseError),
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EtlRunResult {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub records_extracted: usize,
    pub records_loaded: usize,
    /// Cache node → number of this run's records it owns.
    pub cache_distribution: Distribution,
}

#[derive(Debug, Default)]
struct PipelineState {
    /// Rows extracted after this instant are picked up by the next run.
    watermark: Option<DateTime<Utc>>,
    /// Ids already stored from the current extraction window by a run that
    /// failed partway. Cleared when the watermark advances.
    committed: HashSet<String>,
    last_result: Option<EtlRunResult>,
}

pub struct EtlPipeline {
    sources: Arc<SourceRegistry>,
    warehouse: Arc<dyn Warehouse>,
    router: Arc<ShardRouter>,
    batch_size: usize,
    state: Mutex<PipelineState>,
}

impl EtlPipeline {
    pub fn new(
        sources: Arc<SourceRegistry>,
        warehouse: Arc<dyn Warehouse>,
        router: Arc<ShardRouter>,
        batch_size: usize,
    ) -> Self {
        Self {
            sources,
            warehouse,
            router,
            batch_size: batch_size.max(1),
            state: Mutex::new(PipelineState::default()),
        }
    }

    /// Wire sources, warehouse and router from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, PipelineError> {
        let sources = SourceRegistry::new(
            settings.source_names.iter().cloned(),
            settings.default_seed_records,
        );
        let warehouse = create_warehouse(
            settings.warehouse_backend,
            settings.replica_count,
            &settings.warehouse_path,
        )?;
        let router = ShardRouter::new(
            settings.cache_nodes.iter().map(String::as_str),
            settings.vnodes_per_node(),
            settings.hash_algorithm,
        );
        Ok(Self::new(
            Arc::new(sources),
            warehouse,
            Arc::new(router),
            settings.batch_size,
        ))
    }

    pub fn sources(&self) -> &Arc<SourceRegistry> {
        &self.sources
    }

    pub fn warehouse(&self) -> &Arc<dyn Warehouse> {
        &self.warehouse
    }

    pub fn router(&self) -> &Arc<ShardRouter> {
        &self.router
    }

    /// Run one extract/transform/load pass.
    ///
    /// Runs are serialized. The watermark only advances when every batch is
    /// stored. Batches stored before a failure are remembered, so the next
    /// run extracts the same window again but only loads what is missing.
    /// `records_loaded` counts rows stored by this run.
    pub async fn run(&self) -> Result<EtlRunResult, PipelineError> {
        let mut state = self.state.lock().await;
        let started_at = Utc::now();

        let raw = self.sources.fetch_all_since(state.watermark);
        let transformed = raw
            .iter()
            .map(|record| self.transform(record))
            .collect::<Result<Vec<_>, _>>()?;

        let cache_distribution = if transformed.is_empty() {
            Distribution::default()
        } else {
            self.router
                .ring()
                .distribution(transformed.iter().map(|r| r.id.as_str()))?
        };

        let (already_stored, pending): (Vec<_>, Vec<_>) = transformed
            .into_iter()
            .partition(|r| state.committed.contains(&r.id));
        if !already_stored.is_empty() {
            debug!(rows = already_stored.len(), "skipping rows stored by a failed run");
        }

        let mut records_loaded = 0;
        for batch in pending.chunks(self.batch_size) {
            match self.warehouse.load(batch).await {
                Ok(loaded) => {
                    records_loaded += loaded;
                    state.committed.extend(batch.iter().map(|r| r.id.clone()));
                    debug!(rows = batch.len(), "loaded batch");
                }
                Err(e) => {
                    warn!(
                        stored = state.committed.len(),
                        error = %e,
                        "load failed, watermark held"
                    );
                    return Err(e.into());
                }
            }
        }

        let result = EtlRunResult {
            started_at,
            finished_at: Utc::now(),
            records_extracted: raw.len(),
            records_loaded,
            cache_distribution,
        };
        info!(
            extracted = result.records_extracted,
            loaded = result.records_loaded,
            "pipeline run finished"
        );

        state.watermark = Some(started_at);
        state.committed.clear();
        state.last_result = Some(result.clone());
        Ok(result)
    }

    /// Normalize one raw record and tag it with its cache node.
    pub fn transform(&self, record: &SourceRecord) -> Result<TransformedRecord, PipelineError> {
        let shard = self.router.assign(&record.id)?;

        let mut payload = record.payload.clone();
        let title = payload.get("title").map(|t| title_case(t)).unwrap_or_default();
        payload.insert("origin".to_string(), record.source.clone());
        payload.insert("normalized_title".to_string(), title);

        Ok(TransformedRecord::new(record.id.clone(), record.source.clone(), payload)
            .with_shard(shard.to_string()))
    }

    /// Start a run on a detached task. Failures are logged; the handle
    /// yields the outcome to a caller that chooses to wait.
    pub fn schedule(self: &Arc<Self>) -> JoinHandle<Result<EtlRunResult, PipelineError>> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = pipeline.run().await;
            if let Err(e) = &outcome {
                error!(error = %e, "scheduled pipeline run failed");
            }
            outcome
        })
    }

    /// Result of the most recent successful run.
    pub async fn status(&self) -> Option<EtlRunResult> {
        self.state.lock().await.last_result.clone()
    }

    /// Ring and modulo distributions of `keys` under the configured nodes.
    pub fn sharding_comparison<S: AsRef<str>>(
        &self,
        keys: &[S],
    ) -> Result<ShardingComparison, PipelineError> {
        Ok(self.router.comparison(keys)?)
    }
}

/// Upper-case the first letter of each alphabetic run, lower-case the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use corelib::HashAlgorithm;
    use sources::Payload;
    use warehouse::MemoryWarehouse;

    fn pipeline(seed: usize, nodes: &[&str]) -> Arc<EtlPipeline> {
        Arc::new(EtlPipeline::new(
            Arc::new(SourceRegistry::new(["crm", "erp"], seed)),
            Arc::new(MemoryWarehouse::new(2)),
            Arc::new(ShardRouter::new(nodes.iter().copied(), 16, HashAlgorithm::Sip)),
            3,
        ))
    }

    fn payload(pairs: &[(&str, &str)]) -> Payload {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("hello world"), "Hello World");
        assert_eq!(title_case("hELLO"), "Hello");
        assert_eq!(title_case("abc2def x-y"), "Abc2Def X-Y");
        assert_eq!(title_case(""), "");
    }

    #[tokio::test]
    async fn test_run_loads_everything_once() {
        let pipeline = pipeline(4, &["cache-a", "cache-b", "cache-c"]);

        let first = pipeline.run().await.unwrap();
        assert_eq!(first.records_extracted, 8);
        assert_eq!(first.records_loaded, 8);
        assert_eq!(first.cache_distribution.total(), 8);

        let second = pipeline.run().await.unwrap();
        assert_eq!(second.records_extracted, 0);
        assert!(second.cache_distribution.is_empty());

        let metrics = pipeline.warehouse().metrics().await.unwrap();
        assert_eq!(metrics.primary_rows, 8);
        assert_eq!(metrics.replica_count, 2);
        assert_eq!(metrics.replica_rows_each, 8);
    }

    #[tokio::test]
    async fn test_new_rows_picked_up_by_next_run() {
        let pipeline = pipeline(2, &["cache-a", "cache-b"]);
        pipeline.run().await.unwrap();

        pipeline
            .sources()
            .add_to_source("erp", payload(&[("title", "fresh row")]))
            .unwrap();

        let result = pipeline.run().await.unwrap();
        assert_eq!(result.records_extracted, 1);

        let rows = pipeline.warehouse().snapshot(1).await.unwrap();
        assert_eq!(rows[0].payload["normalized_title"], "Fresh Row");
        assert_eq!(rows[0].payload["origin"], "erp");
    }

    #[tokio::test]
    async fn test_transform_tags_ring_owner() {
        let pipeline = pipeline(0, &["cache-a", "cache-b", "cache-c"]);
        let record = pipeline
            .sources()
            .add_to_source("crm", payload(&[("title", "quarterly report")]))
            .unwrap();

        let transformed = pipeline.transform(&record).unwrap();
        let owner = pipeline.router().assign(&record.id).unwrap();
        assert_eq!(transformed.cache_shard.as_deref(), Some(owner.as_str()));
        assert_eq!(transformed.id, record.id);
        assert_eq!(transformed.payload["normalized_title"], "Quarterly Report");
    }

    #[tokio::test]
    async fn test_missing_title_normalizes_to_empty() {
        let pipeline = pipeline(0, &["cache-a"]);
        let record = pipeline
            .sources()
            .add_to_source("crm", payload(&[("category", "beta")]))
            .unwrap();

        let transformed = pipeline.transform(&record).unwrap();
        assert_eq!(transformed.payload["normalized_title"], "");
        assert_eq!(transformed.payload["category"], "beta");
    }

    #[tokio::test]
    async fn test_empty_ring_fails_run_without_advancing() {
        let pipeline = pipeline(1, &[]);

        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, PipelineError::Shard(e) if e.is_empty_topology()));
        assert!(pipeline.status().await.is_none());

        pipeline.router().add_node("cache-a");
        let result = pipeline.run().await.unwrap();
        assert_eq!(result.records_extracted, 2);
    }

    #[tokio::test]
    async fn test_schedule_runs_in_background() {
        let pipeline = pipeline(3, &["cache-a", "cache-b"]);
        let result = pipeline.schedule().await.unwrap().unwrap();
        assert_eq!(result.records_loaded, 6);
        assert_eq!(pipeline.status().await, Some(result));
    }

    #[tokio::test]
    async fn test_scheduled_failure_reaches_the_handle() {
        let pipeline = pipeline(1, &[]);
        let outcome = pipeline.schedule().await.unwrap();
        assert!(matches!(outcome, Err(PipelineError::Shard(_))));
        assert!(pipeline.status().await.is_none());
    }

    /// Memory warehouse whose second `load` call fails.
    struct FailsSecondLoad {
        inner: MemoryWarehouse,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Warehouse for FailsSecondLoad {
        async fn load(&self, records: &[TransformedRecord]) -> warehouse::error::Result<usize> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
            }
            self.inner.load(records).await
        }

        async fn snapshot(&self, limit: usize) -> warehouse::error::Result<Vec<TransformedRecord>> {
            self.inner.snapshot(limit).await
        }

        async fn metrics(&self) -> warehouse::error::Result<warehouse::WarehouseMetrics> {
            self.inner.metrics().await
        }

        fn backend(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_retry_after_failed_batch_does_not_duplicate_rows() {
        let warehouse = Arc::new(FailsSecondLoad {
            inner: MemoryWarehouse::new(1),
            calls: AtomicUsize::new(0),
        });
        let pipeline = EtlPipeline::new(
            Arc::new(SourceRegistry::new(["crm", "erp"], 3)),
            warehouse.clone(),
            Arc::new(ShardRouter::new(["cache-a", "cache-b"], 16, HashAlgorithm::Sip)),
            3,
        );

        let err = pipeline.run().await.unwrap_err();
        assert!(matches!(err, PipelineError::Warehouse(_)), "{err}");
        assert_eq!(warehouse.metrics().await.unwrap().primary_rows, 3);

        let retry = pipeline.run().await.unwrap();
        assert_eq!(retry.records_extracted, 6);
        assert_eq!(retry.records_loaded, 3);
        assert_eq!(retry.cache_distribution.total(), 6);

        let metrics = warehouse.metrics().await.unwrap();
        assert_eq!(metrics.primary_rows, 6);
        assert_eq!(metrics.replica_rows_each, 6);

        let mut ids: Vec<_> = warehouse
            .snapshot(100)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 6);

        let next = pipeline.run().await.unwrap();
        assert_eq!(next.records_extracted, 0);
    }

    #[tokio::test]
    async fn test_sharding_comparison_rejects_empty_batch() {
        let pipeline = pipeline(0, &["cache-a", "cache-b"]);
        let keys: [&str; 0] = [];
        assert!(matches!(
            pipeline.sharding_comparison(&keys),
            Err(PipelineError::Shard(corelib::Error::EmptyBatch))
        ));

        let comparison = pipeline.sharding_comparison(&["k1", "k2", "k3"]).unwrap();
        assert_eq!(comparison.consistent_hash.total(), 3);
        assert_eq!(comparison.modulo.total(), 3);
    }
}

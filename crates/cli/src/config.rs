//! Settings for the `shard-ring` binary.
//!
//! Values come from the built-in defaults, then an optional TOML file, then
//! command-line flags (each flag also reads a `SHARD_RING_*` environment
//! variable).

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser};
use corelib::HashAlgorithm;
use serde::{Deserialize, Serialize};
use warehouse::WarehouseBackend;

use crate::commands::Command;

/// Top-level settings, parsed from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Names of the mock upstream databases.
    pub source_names: Vec<String>,
    /// Cache nodes on the ring, in modulo order.
    pub cache_nodes: Vec<String>,
    /// Virtual nodes per cache node. Values below 1 are treated as 1.
    pub cache_virtual_nodes: i64,
    /// Hash used to place both keys and virtual nodes.
    pub hash_algorithm: HashAlgorithm,
    /// Replica tables written alongside the primary.
    pub replica_count: usize,
    /// Random rows inserted into each source at startup.
    pub default_seed_records: usize,
    /// Records per warehouse load call.
    pub batch_size: usize,
    pub warehouse_backend: WarehouseBackend,
    /// Directory for the file backend.
    pub warehouse_path: PathBuf,
    /// Fallback filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_names: vec!["crm".into(), "erp".into(), "analytics".into()],
            cache_nodes: vec!["cache-a".into(), "cache-b".into(), "cache-c".into()],
            cache_virtual_nodes: 50,
            hash_algorithm: HashAlgorithm::default(),
            replica_count: 2,
            default_seed_records: 5,
            batch_size: 50,
            warehouse_backend: WarehouseBackend::default(),
            warehouse_path: PathBuf::from("data/warehouse"),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, or the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .with_context(|| format!("reading config {}", p.display()))?;
                Self::from_toml(&content).with_context(|| format!("parsing config {}", p.display()))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Virtual nodes as handed to the ring. Negative values become 0, which
    /// the ring raises to 1.
    pub fn vnodes_per_node(&self) -> usize {
        usize::try_from(self.cache_virtual_nodes).unwrap_or(0)
    }

    /// Apply command-line overrides on top of the file values.
    pub fn apply(&mut self, overrides: &Overrides) {
        if !overrides.cache_nodes.is_empty() {
            self.cache_nodes = overrides.cache_nodes.clone();
        }
        if !overrides.source_names.is_empty() {
            self.source_names = overrides.source_names.clone();
        }
        if let Some(v) = overrides.cache_virtual_nodes {
            self.cache_virtual_nodes = v;
        }
        if let Some(algorithm) = overrides.hash_algorithm {
            self.hash_algorithm = algorithm;
        }
        if let Some(n) = overrides.replica_count {
            self.replica_count = n;
        }
        if let Some(n) = overrides.seed_records {
            self.default_seed_records = n;
        }
        if let Some(n) = overrides.batch_size {
            self.batch_size = n;
        }
        if let Some(backend) = overrides.warehouse_backend {
            self.warehouse_backend = backend;
        }
        if let Some(ref path) = overrides.warehouse_path {
            self.warehouse_path = path.clone();
        }
        if let Some(ref level) = overrides.log_level {
            self.log_level = level.clone();
        }
    }
}

/// Flags that override individual settings.
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Comma-separated cache nodes.
    #[arg(long, global = true, value_delimiter = ',', env = "SHARD_RING_CACHE_NODES")]
    pub cache_nodes: Vec<String>,

    /// Comma-separated source names.
    #[arg(long, global = true, value_delimiter = ',', env = "SHARD_RING_SOURCES")]
    pub source_names: Vec<String>,

    #[arg(long, global = true, env = "SHARD_RING_VIRTUAL_NODES", allow_negative_numbers = true)]
    pub cache_virtual_nodes: Option<i64>,

    /// `sip` or `xxh3`.
    #[arg(long, global = true, env = "SHARD_RING_HASH")]
    pub hash_algorithm: Option<HashAlgorithm>,

    #[arg(long, global = true, env = "SHARD_RING_REPLICAS")]
    pub replica_count: Option<usize>,

    /// Random rows per source at startup.
    #[arg(long, global = true, env = "SHARD_RING_SEED_RECORDS")]
    pub seed_records: Option<usize>,

    #[arg(long, global = true, env = "SHARD_RING_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// `memory` or `file`.
    #[arg(long, global = true, env = "SHARD_RING_WAREHOUSE")]
    pub warehouse_backend: Option<WarehouseBackend>,

    #[arg(long, global = true, env = "SHARD_RING_WAREHOUSE_PATH")]
    pub warehouse_path: Option<PathBuf>,

    #[arg(long, global = true, env = "SHARD_RING_LOG")]
    pub log_level: Option<String>,
}

/// Command line of the `shard-ring` binary.
#[derive(Debug, Parser)]
#[command(
    name = "shard-ring",
    version,
    about = "Consistent-hash cache sharding for a small ETL pipeline"
)]
pub struct CliConfig {
    /// Path to TOML config file.
    #[arg(short, long, global = true, env = "SHARD_RING_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// File settings with this command line's overrides applied.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        settings.apply(&self.overrides);
        Ok(settings)
    }
}

//! Normalized record model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A record ready for the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformedRecord {
    pub id: String,
    pub source: String,
    pub payload: BTreeMap<String, String>,
    pub ingested_at: DateTime<Utc>,
    /// Cache node that owns this record's key.
    pub cache_shard: Option<String>,
}

impl TransformedRecord {
    /// A record ingested now, without a shard.
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        payload: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            payload,
            ingested_at: Utc::now(),
            cache_shard: None,
        }
    }

    pub fn with_shard(mut self, shard: impl Into<String>) -> Self {
        self.cache_shard = Some(shard.into());
        self
    }
}

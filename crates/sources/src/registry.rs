//! Collection of mock databases the pipeline extracts from.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::database::MockDatabase;
use crate::error::SourceError;
use crate::record::{Payload, SourceRecord};

/// Named mock databases behind one lock.
///
/// Shared between the pipeline (reads) and whoever seeds new rows (writes).
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: RwLock<BTreeMap<String, MockDatabase>>,
}

impl SourceRegistry {
    /// One database per name, each seeded with `seed_records` random rows.
    pub fn new<I, S>(names: I, seed_records: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sources = names
            .into_iter()
            .map(|name| {
                let mut db = MockDatabase::new(name);
                db.seed(seed_records);
                (db.name().to_owned(), db)
            })
            .collect::<BTreeMap<_, _>>();
        debug!(sources = sources.len(), seed_records, "seeded mock sources");
        Self {
            sources: RwLock::new(sources),
        }
    }

    /// Rows from every source extracted strictly after `since`.
    pub fn fetch_all_since(&self, since: Option<DateTime<Utc>>) -> Vec<SourceRecord> {
        self.sources
            .read()
            .values()
            .flat_map(|db| db.fetch_since(since))
            .collect()
    }

    /// Insert a row with `payload` into the named source.
    pub fn add_to_source(&self, source: &str, payload: Payload) -> Result<SourceRecord, SourceError> {
        let mut sources = self.sources.write();
        let db = sources
            .get_mut(source)
            .ok_or_else(|| SourceError::UnknownSource(source.to_owned()))?;
        let record = db.add(payload);
        debug!(source, id = %record.id, "inserted record");
        Ok(record)
    }

    /// Insert one random row into the named source.
    pub fn insert_random(&self, source: &str) -> Result<SourceRecord, SourceError> {
        let mut sources = self.sources.write();
        let db = sources
            .get_mut(source)
            .ok_or_else(|| SourceError::UnknownSource(source.to_owned()))?;
        Ok(db.insert_random())
    }

    /// Row count per source.
    pub fn stats(&self) -> BTreeMap<String, usize> {
        self.sources
            .read()
            .iter()
            .map(|(name, db)| (name.clone(), db.len()))
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.sources.read().keys().cloned().collect()
    }
}

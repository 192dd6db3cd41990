//! In-memory stand-in for an upstream database.

use chrono::{DateTime, Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::record::{Payload, SourceRecord};

const CATEGORIES: [&str; 3] = ["alpha", "beta", "gamma"];
const TITLE_LEN: usize = 6;
/// Seeded rows are backdated by up to this many seconds.
const MAX_BACKDATE_SECS: i64 = 300;

/// Append-only table of [`SourceRecord`]s.
#[derive(Debug, Clone)]
pub struct MockDatabase {
    name: String,
    rows: Vec<SourceRecord>,
}

impl MockDatabase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert `count` random rows.
    pub fn seed(&mut self, count: usize) {
        for _ in 0..count {
            self.insert_random();
        }
    }

    /// Insert one row with a random title and category, backdated by up to
    /// five minutes.
    pub fn insert_random(&mut self) -> SourceRecord {
        let mut rng = rand::thread_rng();
        let title = random_word(&mut rng, TITLE_LEN);
        let category = CATEGORIES.choose(&mut rng).copied().unwrap_or(CATEGORIES[0]);
        let backdate = Duration::seconds(rng.gen_range(0..=MAX_BACKDATE_SECS));

        let mut payload = Payload::new();
        payload.insert("title".to_owned(), title);
        payload.insert("category".to_owned(), category.to_owned());
        self.push(payload, Utc::now() - backdate)
    }

    /// Insert a row with the given payload, extracted now.
    pub fn add(&mut self, payload: Payload) -> SourceRecord {
        self.push(payload, Utc::now())
    }

    /// Rows extracted strictly after `since`, or every row for `None`.
    pub fn fetch_since(&self, since: Option<DateTime<Utc>>) -> Vec<SourceRecord> {
        match since {
            None => self.rows.clone(),
            Some(since) => self
                .rows
                .iter()
                .filter(|row| row.extracted_at > since)
                .cloned()
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn push(&mut self, payload: Payload, extracted_at: DateTime<Utc>) -> SourceRecord {
        let record = SourceRecord {
            id: Uuid::new_v4().to_string(),
            source: self.name.clone(),
            payload,
            extracted_at,
        };
        self.rows.push(record.clone());
        record
    }
}

fn random_word<R: Rng>(rng: &mut R, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .map(char::from)
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .take(len)
        .collect()
}

//! Raw records as extracted from an upstream database.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form record payload.
pub type Payload = BTreeMap<String, String>;

/// Raw record from a mock upstream database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Record key, a UUIDv4 string.
    pub id: String,
    /// Name of the database the record came from.
    pub source: String,
    pub payload: Payload,
    pub extracted_at: DateTime<Utc>,
}

//! Record store collaborator.
//!
//! The hosted backend behind the site is consumed as plain table-scoped record collections.
//! Anything that can insert, select, update and delete JSON-shaped records satisfies
//! [`RecordStore`]; the wizards only ever call [`RecordStore::insert`].

mod memory;

pub use memory::MemoryRecordStore;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier assigned by the store when a record is created.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Field set of a record, keyed by column name.
pub type Fields = Map<String, Value>;

/// A stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub fields: Fields,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }
}

/// Conjunction of equality conditions. An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    conditions: Vec<(String, Value)>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| record.fields.get(field) == Some(expected))
    }
}

/// Storage abstraction over the hosted backend so wizards and the catalog can be exercised in
/// isolation.
pub trait RecordStore: Send + Sync {
    fn insert(&self, table: &str, fields: Fields) -> Result<Record, StoreError>;
    fn get(&self, table: &str, id: &RecordId) -> Result<Option<Record>, StoreError>;
    fn select(&self, table: &str, filter: &RecordFilter) -> Result<Vec<Record>, StoreError>;
    fn update(&self, table: &str, id: &RecordId, patch: Fields) -> Result<Record, StoreError>;
    fn delete(&self, table: &str, id: &RecordId) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record rejected: {0}")]
    Rejected(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_requires_every_condition() {
        let mut fields = Fields::new();
        fields.insert("listing_type".to_string(), json!("rent"));
        fields.insert("featured".to_string(), json!(true));
        let record = Record {
            id: RecordId("prop-1".to_string()),
            fields,
        };

        assert!(RecordFilter::all().matches(&record));
        assert!(RecordFilter::all().eq("listing_type", "rent").matches(&record));
        assert!(!RecordFilter::all()
            .eq("listing_type", "rent")
            .eq("featured", false)
            .matches(&record));
        assert!(!RecordFilter::all().eq("missing", "rent").matches(&record));
    }
}

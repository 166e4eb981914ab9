use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::{Fields, Record, RecordFilter, RecordId, RecordStore, StoreError};

/// Process-local store used by the demo CLI, the HTTP service and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecordStore {
    tables: Arc<Mutex<HashMap<String, Vec<Record>>>>,
    sequence: Arc<AtomicU64>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record in `table`, in insertion order.
    pub fn records(&self, table: &str) -> Vec<Record> {
        self.select(table, &RecordFilter::all()).unwrap_or_default()
    }

    fn next_id(&self, table: &str) -> RecordId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        RecordId(format!("{table}-{id:06}"))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<Record>>>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store mutex poisoned".to_string()))
    }
}

impl RecordStore for MemoryRecordStore {
    fn insert(&self, table: &str, mut fields: Fields) -> Result<Record, StoreError> {
        let id = self.next_id(table);
        fields.remove("id");
        let record = Record { id, fields };

        let mut guard = self.lock()?;
        guard.entry(table.to_string()).or_default().push(record.clone());
        debug!(table, id = %record.id, "record inserted");
        Ok(record)
    }

    fn get(&self, table: &str, id: &RecordId) -> Result<Option<Record>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .get(table)
            .and_then(|rows| rows.iter().find(|row| &row.id == id))
            .cloned())
    }

    fn select(&self, table: &str, filter: &RecordFilter) -> Result<Vec<Record>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .get(table)
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default())
    }

    fn update(&self, table: &str, id: &RecordId, patch: Fields) -> Result<Record, StoreError> {
        let mut guard = self.lock()?;
        let row = guard
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| &row.id == id))
            .ok_or(StoreError::NotFound)?;

        for (key, value) in patch {
            if key != "id" {
                row.fields.insert(key, value);
            }
        }
        Ok(row.clone())
    }

    fn delete(&self, table: &str, id: &RecordId) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let rows = guard.get_mut(table).ok_or(StoreError::NotFound)?;
        let before = rows.len();
        rows.retain(|row| &row.id != id);
        if rows.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

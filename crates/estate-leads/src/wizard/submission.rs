//! Submission adapter: turns a finished session into one record-store insert.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::values::{FieldValue, FieldValues};
use crate::listings::ListingType;
use crate::store::{Fields, RecordId, RecordStore, StoreError};

/// Fixed facts about why a wizard was opened. Immutable for the life of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listing_type: Option<ListingType>,
}

impl SessionContext {
    pub fn general() -> Self {
        Self::default()
    }

    pub fn for_property(
        property_id: impl Into<String>,
        property_title: impl Into<String>,
        listing_type: ListingType,
    ) -> Self {
        Self {
            property_id: Some(property_id.into()),
            property_title: Some(property_title.into()),
            listing_type: Some(listing_type),
        }
    }

    pub fn is_rental(&self) -> bool {
        self.listing_type == Some(ListingType::Rent)
    }
}

/// Flattened payload written to the record store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SubmissionRecord(Fields);

impl SubmissionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, column: &str, value: impl Into<Value>) {
        self.0.insert(column.to_string(), value.into());
    }

    /// Copies a collected value verbatim; absent or blank values are written as `null`.
    pub fn copy(&mut self, column: &str, values: &FieldValues, field: &str) {
        let value = match values.get(field) {
            Some(value) if !value.is_blank() => match value {
                FieldValue::Text(text) => Value::from(text.trim()),
                FieldValue::Choices(choices) => Value::from(choices.clone()),
            },
            _ => Value::Null,
        };
        self.0.insert(column.to_string(), value);
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn fields(&self) -> &Fields {
        &self.0
    }

    pub fn into_fields(self) -> Fields {
        self.0
    }
}

/// Maps collected values plus session context to the stored shape of one wizard.
pub type RecordMapping = fn(&FieldValues, &SessionContext) -> SubmissionRecord;

/// Boundary between a finished wizard and the external record store.
pub trait SubmissionAdapter: Send + Sync {
    /// Performs exactly one create. Each call that succeeds is a new record.
    fn submit(
        &self,
        values: &FieldValues,
        context: &SessionContext,
    ) -> Result<RecordId, SubmissionError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("we could not send your enquiry right now, please try again ({0})")]
    Unavailable(String),
    #[error("your enquiry was rejected: {0}")]
    Rejected(String),
}

impl From<StoreError> for SubmissionError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Rejected(reason) => Self::Rejected(reason),
            StoreError::NotFound => Self::Rejected("target collection missing".to_string()),
            StoreError::Unavailable(reason) => Self::Unavailable(reason),
        }
    }
}

/// Adapter writing one record into `table` of any [`RecordStore`].
pub struct StoreSubmissionAdapter<S> {
    store: Arc<S>,
    table: String,
    mapping: RecordMapping,
}

impl<S> StoreSubmissionAdapter<S>
where
    S: RecordStore,
{
    pub fn new(store: Arc<S>, table: impl Into<String>, mapping: RecordMapping) -> Self {
        Self {
            store,
            table: table.into(),
            mapping,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// The record [`SubmissionAdapter::submit`] would write, without writing it.
    pub fn preview(&self, values: &FieldValues, context: &SessionContext) -> SubmissionRecord {
        (self.mapping)(values, context)
    }
}

impl<S> SubmissionAdapter for StoreSubmissionAdapter<S>
where
    S: RecordStore,
{
    fn submit(
        &self,
        values: &FieldValues,
        context: &SessionContext,
    ) -> Result<RecordId, SubmissionError> {
        let record = self.preview(values, context);
        match self.store.insert(&self.table, record.into_fields()) {
            Ok(stored) => {
                info!(table = %self.table, id = %stored.id, "enquiry stored");
                Ok(stored.id)
            }
            Err(err) => {
                warn!(table = %self.table, error = %err, "enquiry insert failed");
                Err(err.into())
            }
        }
    }
}

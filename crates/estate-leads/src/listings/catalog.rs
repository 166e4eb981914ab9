use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use super::{ListingType, Property};
use crate::store::{Fields, Record, RecordFilter, RecordId, RecordStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("property not found")]
    NotFound,
    #[error("slug '{0}' is already used by another property")]
    SlugTaken(String),
    #[error("invalid property: {0}")]
    Invalid(String),
    #[error("stored property could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for CatalogError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound => Self::NotFound,
            other => Self::Store(other),
        }
    }
}

/// Lowercase ASCII words joined by single dashes: `"12 Canal St. Loft"` -> `"12-canal-st-loft"`.
pub fn slugify(title: &str) -> String {
    title
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

/// Read/write access to listings held in a [`RecordStore`] table.
pub struct PropertyCatalog<S> {
    store: Arc<S>,
    table: String,
}

impl<S> PropertyCatalog<S>
where
    S: RecordStore,
{
    pub fn new(store: Arc<S>, table: impl Into<String>) -> Self {
        Self {
            store,
            table: table.into(),
        }
    }

    pub fn get_all(&self) -> Result<Vec<Property>, CatalogError> {
        self.select(&RecordFilter::all())
    }

    pub fn get_by_type(&self, listing_type: ListingType) -> Result<Vec<Property>, CatalogError> {
        self.select(&RecordFilter::all().eq("listing_type", listing_type.as_str()))
    }

    pub fn get_by_id(&self, id: &RecordId) -> Result<Option<Property>, CatalogError> {
        self.store.get(&self.table, id)?.map(decode).transpose()
    }

    pub fn get_by_slug(&self, slug: &str) -> Result<Option<Property>, CatalogError> {
        let mut matches = self.select(&RecordFilter::all().eq("slug", slug))?;
        Ok(if matches.is_empty() {
            None
        } else {
            Some(matches.swap_remove(0))
        })
    }

    pub fn create(&self, mut property: Property) -> Result<Property, CatalogError> {
        self.prepare(&mut property, None)?;
        let record = self.store.insert(&self.table, encode(&property)?)?;
        info!(id = %record.id, slug = %property.slug, "property created");
        decode(record)
    }

    pub fn update(&self, id: &RecordId, mut property: Property) -> Result<Property, CatalogError> {
        self.prepare(&mut property, Some(id))?;
        let record = self.store.update(&self.table, id, encode(&property)?)?;
        info!(id = %record.id, "property updated");
        decode(record)
    }

    pub fn delete(&self, id: &RecordId) -> Result<(), CatalogError> {
        self.store.delete(&self.table, id)?;
        info!(id = %id, "property deleted");
        Ok(())
    }

    fn select(&self, filter: &RecordFilter) -> Result<Vec<Property>, CatalogError> {
        self.store
            .select(&self.table, filter)?
            .into_iter()
            .map(decode)
            .collect()
    }

    fn prepare(&self, property: &mut Property, existing: Option<&RecordId>) -> Result<(), CatalogError> {
        property.title = property.title.trim().to_string();
        if property.title.is_empty() {
            return Err(CatalogError::Invalid("title is required".to_string()));
        }

        property.slug = if property.slug.trim().is_empty() {
            slugify(&property.title)
        } else {
            slugify(&property.slug)
        };
        if property.slug.is_empty() {
            return Err(CatalogError::Invalid(
                "title must contain letters or digits".to_string(),
            ));
        }

        if let Some(other) = self.get_by_slug(&property.slug)? {
            if other.id.as_ref() != existing {
                return Err(CatalogError::SlugTaken(property.slug.clone()));
            }
        }
        property.id = None;
        Ok(())
    }
}

fn encode(property: &Property) -> Result<Fields, CatalogError> {
    match serde_json::to_value(property)? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        _ => Err(CatalogError::Invalid("property must encode as an object".to_string())),
    }
}

fn decode(record: Record) -> Result<Property, CatalogError> {
    let Record { id, fields } = record;
    let mut property: Property = serde_json::from_value(Value::Object(fields))?;
    property.id = Some(id);
    Ok(property)
}

//! Listing data collaborator backing the public property pages and the admin panel.

mod catalog;

pub use catalog::{slugify, CatalogError, PropertyCatalog};

use serde::{Deserialize, Serialize};

use crate::store::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingType {
    Sale,
    Rent,
}

impl ListingType {
    pub const fn as_str(self) -> &'static str {
        match self {
            ListingType::Sale => "sale",
            ListingType::Rent => "rent",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sale" | "buy" => Some(Self::Sale),
            "rent" | "rental" | "let" => Some(Self::Rent),
            _ => None,
        }
    }
}

/// A listed property as stored in the `properties` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub title: String,
    /// URL segment of the public page; derived from the title when left empty.
    #[serde(default)]
    pub slug: String,
    pub listing_type: ListingType,
    /// Asking price in pounds, or monthly rent for lettings.
    pub price: u32,
    pub address: String,
    pub postcode: String,
    pub bedrooms: u8,
    pub bathrooms: u8,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub featured: bool,
}

//! Catalog product model.
//!
//! Mirrors the `products` table. The cart treats all of this as read-only;
//! nothing in the storefront ever writes catalog rows.

use chrono::{DateTime, Utc};
use medimart_core::{CategoryId, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// A catalog entry: medicine, health product, or lab test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub discount: Option<Decimal>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    /// Units on hand; `None` means inventory is untracked.
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub requires_prescription: Option<bool>,
    #[serde(default)]
    pub bestseller: Option<bool>,
    #[serde(default)]
    pub rating: Option<Decimal>,
    #[serde(default)]
    pub dosage: Option<String>,
    #[serde(default)]
    pub side_effects: Option<String>,
    /// Customer reviews stored as a JSON column; parsed leniently.
    #[serde(default, deserialize_with = "lenient_reviews")]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Whether the product can be added to a cart.
    ///
    /// Untracked inventory (`stock` null) is treated as available.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock.is_none_or(|s| s > 0)
    }

    /// Whether a prescription must be collected at checkout.
    #[must_use]
    pub fn needs_prescription(&self) -> bool {
        self.requires_prescription.unwrap_or(false)
    }
}

/// One customer review attached to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub author: String,
    pub comment: String,
    pub stars: u8,
}

/// Deserialize the `reviews` JSON column, salvaging what parses.
///
/// The column is free-form JSON in the store: it may be null, missing, not an
/// array at all, or an array with malformed entries. Anything that is not a
/// well-formed review is dropped rather than failing the whole row.
fn lenient_reviews<'de, D>(deserializer: D) -> Result<Vec<Review>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let Some(serde_json::Value::Array(entries)) = value else {
        return Ok(Vec::new());
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

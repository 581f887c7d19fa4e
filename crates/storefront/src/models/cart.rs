//! Cart row models.

use chrono::{DateTime, Utc};
use medimart_core::{CartLineId, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of a user's cart, as stored in the `cart_items` table.
///
/// The product snapshot is an embedded join fetched for display; it may be
/// absent if the join fails, in which case the line contributes zero to
/// price aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Row ID assigned by the store on insert.
    pub id: CartLineId,
    /// Catalog entry this line refers to; unique within a user's cart.
    pub product_id: ProductId,
    /// Always >= 1; a line that would drop to zero is deleted instead.
    pub quantity: u32,
    /// Denormalized catalog attributes, read-only projection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductSnapshot>,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
}

impl CartLine {
    /// Price contribution of this line.
    ///
    /// A missing product snapshot contributes zero, not an error.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        let unit = self
            .product
            .as_ref()
            .map_or(Decimal::ZERO, |p| p.price);
        Decimal::from(self.quantity) * unit
    }
}

/// Product attributes fetched alongside a cart line for display.
///
/// Never the source of truth for catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_row_with_snapshot() {
        let json = r#"{
            "id": "c1",
            "user_id": "u1",
            "product_id": "p1",
            "quantity": 2,
            "created_at": "2025-11-03T10:15:00Z",
            "product": {
                "id": "p1",
                "name": "Paracetamol 500mg",
                "price": 25.5,
                "image_url": null,
                "brand": "Crocin"
            }
        }"#;

        let line: CartLine = serde_json::from_str(json).unwrap();
        assert_eq!(line.quantity, 2);
        let snapshot = line.product.as_ref().unwrap();
        assert_eq!(snapshot.brand.as_deref(), Some("Crocin"));
        assert_eq!(line.line_total(), "51".parse().unwrap());
    }

    #[test]
    fn test_deserialize_row_without_snapshot() {
        let json = r#"{
            "id": "c2",
            "product_id": "p2",
            "quantity": 3,
            "created_at": "2025-11-03T10:15:00Z",
            "product": null
        }"#;

        let line: CartLine = serde_json::from_str(json).unwrap();
        assert!(line.product.is_none());
        assert_eq!(line.line_total(), Decimal::ZERO);
    }
}

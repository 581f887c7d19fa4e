//! Cache types for catalog API responses.
//!
//! Only catalog reads are cached; cart rows are mutable state and always hit
//! the store.

use crate::models::Product;

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
}

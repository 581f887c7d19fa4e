//! Hosted table store access.
//!
//! The store is a remote table API (PostgREST dialect) reached over HTTPS.
//! It is the sole source of truth for cart contents across sessions; the
//! cart synchronizer only ever holds a reconciled view of it.
//!
//! [`CartStore`] is the seam the synchronizer depends on. Production uses
//! [`TableStoreClient`]; tests inject in-memory fakes.

mod cache;
mod client;

pub use client::TableStoreClient;

use async_trait::async_trait;
use thiserror::Error;

use medimart_core::{ProductId, UserId};

use crate::models::CartLine;

/// Errors that can occur when talking to the table store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API rejected the request.
    #[error("store API error (status {status}): {message}")]
    Api {
        /// HTTP status code returned.
        status: u16,
        /// Message from the API error body, or the raw body if unparseable.
        message: String,
    },

    /// Response body was not valid JSON for the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limited by the store.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

/// Persistence operations the cart synchronizer requires.
///
/// Every operation is scoped to a user; implementations must never let one
/// user's rows leak into another's result. Deleting rows that do not exist
/// is a success, not an error.
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Fetch all cart lines for a user, each joined to its product snapshot.
    async fn fetch_lines(&self, user: &UserId) -> Result<Vec<CartLine>, StoreError>;

    /// Insert a new line and return the canonical row the store created.
    async fn insert_line(
        &self,
        user: &UserId,
        product: &ProductId,
        quantity: u32,
    ) -> Result<CartLine, StoreError>;

    /// Set the quantity of the line matching (user, product).
    async fn update_quantity(
        &self,
        user: &UserId,
        product: &ProductId,
        quantity: u32,
    ) -> Result<(), StoreError>;

    /// Delete the line matching (user, product). Zero matching rows is fine.
    async fn delete_line(&self, user: &UserId, product: &ProductId) -> Result<(), StoreError>;

    /// Delete every line belonging to the user.
    async fn clear_lines(&self, user: &UserId) -> Result<(), StoreError>;
}

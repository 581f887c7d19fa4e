//! Table store client implementation.
//!
//! Speaks the PostgREST dialect with `reqwest`: equality filters in the
//! query string, embedded joins through `select`, representation returns on
//! insert. Catalog reads are cached using `moka` (5-minute TTL).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use medimart_core::{CategoryId, ProductId, UserId};

use crate::config::TableStoreConfig;
use crate::models::{CartLine, Product};

use super::cache::CacheValue;
use super::{CartStore, StoreError};

/// Embedded join used whenever cart lines are read back.
const CART_LINE_SELECT: &str = "*,product:products(id,name,price,image_url,brand)";

/// Client for the hosted table store API.
///
/// Cart rows are never cached (mutable state); catalog rows are cached for
/// 5 minutes.
#[derive(Clone)]
pub struct TableStoreClient {
    inner: Arc<TableStoreClientInner>,
}

struct TableStoreClientInner {
    client: reqwest::Client,
    endpoint: String,
    service_key: String,
    schema: String,
    cache: Cache<String, CacheValue>,
}

impl TableStoreClient {
    /// Create a new table store client.
    #[must_use]
    pub fn new(config: &TableStoreConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        let endpoint = format!("{}/rest/v1", config.base_url.trim_end_matches('/'));

        Self {
            inner: Arc::new(TableStoreClientInner {
                client: reqwest::Client::new(),
                endpoint,
                service_key: config.service_key.expose_secret().to_string(),
                schema: config.schema.clone(),
                cache,
            }),
        }
    }

    /// Build a request against a table with auth and schema headers set.
    fn request(&self, method: Method, table: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{table}", self.inner.endpoint);
        self.inner
            .client
            .request(method, url)
            .header("apikey", &self.inner.service_key)
            .bearer_auth(&self.inner.service_key)
            .header("Accept-Profile", &self.inner.schema)
            .header("Content-Profile", &self.inner.schema)
    }

    /// Execute a request expecting a JSON body.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, StoreError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(StoreError::RateLimited(retry_after_secs(&response)));
        }

        // Read the body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        match serde_json::from_str(&body) {
            Ok(value) => Ok(value),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %truncate(&body, 500),
                    "failed to parse table store response"
                );
                Err(StoreError::Parse(e))
            }
        }
    }

    /// Execute a request where only the status matters (update/delete).
    async fn send_no_content(&self, request: reqwest::RequestBuilder) -> Result<(), StoreError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(StoreError::RateLimited(retry_after_secs(&response)));
        }

        if !status.is_success() {
            let body = response.text().await?;
            return Err(api_error(status, &body));
        }

        Ok(())
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// Get a catalog product by its ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self), fields(product = %id))]
    pub async fn get_product(&self, id: &ProductId) -> Result<Product, StoreError> {
        let cache_key = format!("product:{id}");

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("cache hit for product");
            return Ok(*product);
        }

        let id_filter = eq_filter(id.as_str());
        let rows: Vec<Product> = self
            .send(
                self.request(Method::GET, "products")
                    .query(&[("select", "*"), ("id", id_filter.as_str())]),
            )
            .await?;

        let product = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("product not found: {id}")))?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// List catalog products, optionally filtered by category.
    ///
    /// Only the unfiltered listing is cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        category: Option<&CategoryId>,
    ) -> Result<Vec<Product>, StoreError> {
        let cache_key = "products:all".to_string();

        if category.is_none()
            && let Some(CacheValue::Products(products)) = self.inner.cache.get(&cache_key).await
        {
            debug!("cache hit for products");
            return Ok(products);
        }

        let mut request = self
            .request(Method::GET, "products")
            .query(&[("select", "*"), ("order", "name.asc")]);
        if let Some(category) = category {
            request = request.query(&[("category_id", eq_filter(category.as_str()))]);
        }

        let products: Vec<Product> = self.send(request).await?;

        if category.is_none() {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Products(products.clone()))
                .await;
        }

        Ok(products)
    }

    /// Invalidate all cached catalog data.
    pub fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
    }
}

// =============================================================================
// Cart Methods (not cached - mutable state)
// =============================================================================

#[async_trait]
impl CartStore for TableStoreClient {
    #[instrument(skip(self), fields(user = %user))]
    async fn fetch_lines(&self, user: &UserId) -> Result<Vec<CartLine>, StoreError> {
        let user_filter = eq_filter(user.as_str());
        self.send(
            self.request(Method::GET, "cart_items").query(&[
                ("select", CART_LINE_SELECT),
                ("user_id", user_filter.as_str()),
            ]),
        )
        .await
    }

    #[instrument(skip(self), fields(user = %user, product = %product))]
    async fn insert_line(
        &self,
        user: &UserId,
        product: &ProductId,
        quantity: u32,
    ) -> Result<CartLine, StoreError> {
        let rows: Vec<CartLine> = self
            .send(
                self.request(Method::POST, "cart_items")
                    .header("Prefer", "return=representation")
                    .query(&[("select", CART_LINE_SELECT)])
                    .json(&json!({
                        "user_id": user,
                        "product_id": product,
                        "quantity": quantity,
                    })),
            )
            .await?;

        rows.into_iter().next().ok_or_else(|| StoreError::Api {
            status: 200,
            message: "insert returned no representation".to_string(),
        })
    }

    #[instrument(skip(self), fields(user = %user, product = %product, quantity))]
    async fn update_quantity(
        &self,
        user: &UserId,
        product: &ProductId,
        quantity: u32,
    ) -> Result<(), StoreError> {
        self.send_no_content(
            self.request(Method::PATCH, "cart_items")
                .query(&[
                    ("user_id", &eq_filter(user.as_str())),
                    ("product_id", &eq_filter(product.as_str())),
                ])
                .json(&json!({ "quantity": quantity })),
        )
        .await
    }

    #[instrument(skip(self), fields(user = %user, product = %product))]
    async fn delete_line(&self, user: &UserId, product: &ProductId) -> Result<(), StoreError> {
        // Deleting zero matching rows still returns success, which is
        // exactly the idempotence the cart contract wants.
        self.send_no_content(self.request(Method::DELETE, "cart_items").query(&[
            ("user_id", &eq_filter(user.as_str())),
            ("product_id", &eq_filter(product.as_str())),
        ]))
        .await
    }

    #[instrument(skip(self), fields(user = %user))]
    async fn clear_lines(&self, user: &UserId) -> Result<(), StoreError> {
        self.send_no_content(
            self.request(Method::DELETE, "cart_items")
                .query(&[("user_id", &eq_filter(user.as_str()))]),
        )
        .await
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// PostgREST equality filter for a query-string value.
fn eq_filter(value: &str) -> String {
    format!("eq.{value}")
}

/// Seconds to wait from a 429 response's Retry-After header.
fn retry_after_secs(response: &reqwest::Response) -> u64 {
    response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(1)
}

/// Map a non-success response to a `StoreError`, pulling the message out of
/// the API's JSON error body when it has one.
fn api_error(status: StatusCode, body: &str) -> StoreError {
    #[derive(serde::Deserialize)]
    struct ApiErrorBody {
        message: String,
    }

    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map_or_else(|_| truncate(body, 200).to_string(), |b| b.message);

    tracing::error!(
        status = %status,
        body = %truncate(body, 500),
        "table store returned non-success status"
    );

    StoreError::Api {
        status: status.as_u16(),
        message,
    }
}

/// Truncate on a char boundary for log output.
fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s.get(..idx).unwrap_or(s),
        None => s,
    }
}

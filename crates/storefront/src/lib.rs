//! MediMart Storefront library.
//!
//! Provides the storefront's server-side building blocks: the cart
//! synchronizer, the hosted table-store client, and the identity and
//! notification seams display surfaces plug into.
//!
//! # Architecture
//!
//! - The hosted table store is the source of truth for cart contents; the
//!   [`cart::CartService`] owns an in-memory view and reconciles it with a
//!   write-then-refetch discipline (no optimistic local patches).
//! - Catalog data is read-only here and cached via `moka` (5-minute TTL).
//! - Display surfaces consume the public cart contract and render
//!   [`notify::Notification`]s; they never mutate cart state directly.
//!
//! # Example
//!
//! ```rust,ignore
//! use medimart_storefront::cart::CartService;
//! use medimart_storefront::config::StorefrontConfig;
//! use medimart_storefront::identity::WatchIdentity;
//! use medimart_storefront::notify::TracingNotifier;
//! use medimart_storefront::store::TableStoreClient;
//!
//! let config = StorefrontConfig::from_env()?;
//! let store = TableStoreClient::new(&config.table_store);
//! let (identity, sender) = WatchIdentity::channel();
//! let cart = CartService::new(store, identity, TracingNotifier);
//!
//! cart.refresh().await;
//! cart.add_item(&product_id, 1).await;
//! println!("{} items, {}", cart.total_item_count(), cart.total_price());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod config;
pub mod identity;
pub mod models;
pub mod notify;
pub mod store;

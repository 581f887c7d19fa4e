//! End-to-end cart synchronization lifecycle through the public API.
//!
//! Drives a [`CartService`] the way a host application would: identity
//! changes arrive over the watch channel, mutations go through the service,
//! and the store is an in-memory stand-in with the table API's semantics.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;

use medimart_core::{CartLineId, Email, ProductId, UserId};
use medimart_storefront::cart::CartService;
use medimart_storefront::identity::{Identity, WatchIdentity};
use medimart_storefront::models::{CartLine, ProductSnapshot};
use medimart_storefront::notify::{Notification, NotificationKind, NotificationSink};
use medimart_storefront::store::{CartStore, StoreError};

/// In-memory store with a fixed price book.
#[derive(Clone, Default)]
struct MemoryStore {
    rows: Arc<Mutex<HashMap<UserId, Vec<CartLine>>>>,
    prices: Arc<Mutex<HashMap<ProductId, Decimal>>>,
}

impl MemoryStore {
    fn with_prices(prices: &[(&str, &str)]) -> Self {
        let store = Self::default();
        {
            let mut book = store.prices.lock().unwrap();
            for (id, price) in prices {
                book.insert(ProductId::new(*id), price.parse().unwrap());
            }
        }
        store
    }

    fn snapshot(&self, product: &ProductId) -> Option<ProductSnapshot> {
        self.prices
            .lock()
            .unwrap()
            .get(product)
            .map(|price| ProductSnapshot {
                id: product.clone(),
                name: format!("product {product}"),
                price: *price,
                image_url: None,
                brand: None,
            })
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn fetch_lines(&self, user: &UserId) -> Result<Vec<CartLine>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(user)
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_line(
        &self,
        user: &UserId,
        product: &ProductId,
        quantity: u32,
    ) -> Result<CartLine, StoreError> {
        let line = CartLine {
            id: CartLineId::random(),
            product_id: product.clone(),
            quantity,
            product: self.snapshot(product),
            created_at: Utc::now(),
        };
        self.rows
            .lock()
            .unwrap()
            .entry(user.clone())
            .or_default()
            .push(line.clone());
        Ok(line)
    }

    async fn update_quantity(
        &self,
        user: &UserId,
        product: &ProductId,
        quantity: u32,
    ) -> Result<(), StoreError> {
        if let Some(lines) = self.rows.lock().unwrap().get_mut(user)
            && let Some(line) = lines.iter_mut().find(|l| &l.product_id == product)
        {
            line.quantity = quantity;
        }
        Ok(())
    }

    async fn delete_line(&self, user: &UserId, product: &ProductId) -> Result<(), StoreError> {
        if let Some(lines) = self.rows.lock().unwrap().get_mut(user) {
            lines.retain(|l| &l.product_id != product);
        }
        Ok(())
    }

    async fn clear_lines(&self, user: &UserId) -> Result<(), StoreError> {
        self.rows.lock().unwrap().remove(user);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct CollectingSink(Arc<Mutex<Vec<Notification>>>);

impl CollectingSink {
    fn kinds(&self) -> Vec<NotificationKind> {
        self.0.lock().unwrap().iter().map(|n| n.kind).collect()
    }
}

impl NotificationSink for CollectingSink {
    fn notify(&self, notification: Notification) {
        self.0.lock().unwrap().push(notification);
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medimart_storefront=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn identity(id: &str) -> Identity {
    Identity {
        id: UserId::new(id),
        email: Email::parse(&format!("{id}@example.com")).unwrap(),
    }
}

#[tokio::test]
async fn cart_lifecycle_across_sign_in_and_out() {
    init_tracing();
    let store = MemoryStore::with_prices(&[("paracetamol", "30"), ("vitamin-d3", "180")]);
    let sink = CollectingSink::default();
    let (provider, tx) = WatchIdentity::channel();
    let changes = provider.changes();

    let service = CartService::new(store.clone(), provider, sink.clone());
    let watcher = service.clone();
    let watch_task = tokio::spawn(async move { watcher.run_identity_watch(changes).await });

    // Anonymous adds are refused with a warning and never reach the store
    service.add_item(&ProductId::new("paracetamol"), 1).await;
    assert!(service.lines().is_empty());
    assert_eq!(sink.kinds(), vec![NotificationKind::Warning]);

    // Sign in; the watcher refreshes the (empty) cart
    tx.send(Some(identity("asha"))).unwrap();
    tokio::task::yield_now().await;
    assert_eq!(service.total_item_count(), 0);

    // Build up a cart; adds merge, totals derive from joined snapshots
    service.add_item(&ProductId::new("paracetamol"), 2).await;
    service.add_item(&ProductId::new("vitamin-d3"), 1).await;
    service.add_item(&ProductId::new("paracetamol"), 1).await;

    assert_eq!(service.lines().len(), 2);
    assert_eq!(service.total_item_count(), 4);
    assert_eq!(service.total_price().amount, "270".parse::<Decimal>().unwrap());
    assert_eq!(service.total_price().to_string(), "₹270.00");

    // Dropping a quantity to zero removes the line
    service.set_quantity(&ProductId::new("paracetamol"), 0).await;
    assert_eq!(service.lines().len(), 1);
    assert_eq!(service.total_price().amount, "180".parse::<Decimal>().unwrap());

    // Sign out clears the view but leaves the rows server-side
    tx.send(None).unwrap();
    tokio::task::yield_now().await;
    assert!(service.lines().is_empty());

    // The surviving row comes back on the next sign-in
    tx.send(Some(identity("asha"))).unwrap();
    tokio::task::yield_now().await;
    assert_eq!(service.total_item_count(), 1);
    assert_eq!(
        service.lines()[0].product_id,
        ProductId::new("vitamin-d3")
    );

    // Clear empties both sides
    service.clear().await;
    assert!(service.lines().is_empty());
    assert!(store.fetch_lines(&UserId::new("asha")).await.unwrap().is_empty());

    drop(tx);
    watch_task.await.unwrap();
}

#[tokio::test]
async fn carts_are_scoped_per_identity() {
    init_tracing();
    let store = MemoryStore::with_prices(&[("ibuprofen", "55")]);
    let (provider, tx) = WatchIdentity::channel();
    let service = CartService::new(store, provider, CollectingSink::default());

    tx.send(Some(identity("asha"))).unwrap();
    service.identity_changed().await;
    service.add_item(&ProductId::new("ibuprofen"), 3).await;
    assert_eq!(service.total_item_count(), 3);

    // Switching identities swaps in the other user's (empty) cart
    tx.send(Some(identity("ravi"))).unwrap();
    service.identity_changed().await;
    assert!(service.lines().is_empty());

    service.add_item(&ProductId::new("ibuprofen"), 1).await;
    assert_eq!(service.total_item_count(), 1);

    // And switching back restores the first cart untouched
    tx.send(Some(identity("asha"))).unwrap();
    service.identity_changed().await;
    assert_eq!(service.total_item_count(), 3);
}

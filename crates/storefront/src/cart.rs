//! Cart synchronizer.
//!
//! Owns the authoritative in-memory view of the signed-in user's cart and
//! reconciles it against the table store. Every mutation is write-then-
//! refetch: the write goes to the store first, then the full line set is
//! pulled back, so local state never runs ahead of confirmed server state.
//! That trades a little latency for the absence of optimistic-rollback bugs.
//!
//! Failures are terminal at this boundary: they are logged, surfaced as a
//! user-visible notification, and absorbed. Callers never see an error and
//! can simply retry the action. No retries or backoff here by design.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{debug, instrument};

use medimart_core::{CurrencyCode, Price, ProductId};

use crate::identity::{Identity, IdentityProvider};
use crate::models::CartLine;
use crate::notify::{Notification, NotificationSink};
use crate::store::CartStore;

/// The synchronizer's owned aggregate.
struct CartState {
    /// Product IDs are unique across lines; adds merge instead of duplicating.
    lines: Vec<CartLine>,
    /// Whether a round trip to the store is outstanding.
    syncing: bool,
}

/// Synchronizes a user's cart between memory and the table store.
///
/// Cheaply cloneable; every clone shares the same state, so any number of
/// display surfaces can read the derived aggregates while mutations go
/// through the operations below. Surfaces never write `lines` directly.
///
/// Mutating operations issued concurrently are not ordered against each
/// other; the final `refresh` to complete wins. Callers that need strict
/// ordering must await each call before issuing the next.
pub struct CartService<S, I, N> {
    inner: Arc<CartServiceInner<S, I, N>>,
}

struct CartServiceInner<S, I, N> {
    store: S,
    identity: I,
    notifier: N,
    state: Mutex<CartState>,
}

impl<S, I, N> Clone for CartService<S, I, N> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, I, N> CartService<S, I, N>
where
    S: CartStore,
    I: IdentityProvider,
    N: NotificationSink,
{
    /// Create a cart service with injected collaborators.
    ///
    /// Starts empty; call [`refresh`](Self::refresh) (or drive
    /// [`run_identity_watch`](Self::run_identity_watch)) to populate it.
    pub fn new(store: S, identity: I, notifier: N) -> Self {
        Self {
            inner: Arc::new(CartServiceInner {
                store,
                identity,
                notifier,
                state: Mutex::new(CartState {
                    lines: Vec::new(),
                    syncing: false,
                }),
            }),
        }
    }

    /// Lock the shared state, recovering from a poisoned lock.
    ///
    /// Never held across an await point.
    fn state(&self) -> MutexGuard<'_, CartState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn current_identity(&self) -> Option<Identity> {
        self.inner.identity.current()
    }

    fn notify(&self, notification: Notification) {
        self.inner.notifier.notify(notification);
    }

    // =========================================================================
    // Synchronization
    // =========================================================================

    /// Replace the local view with the store's rows for the current identity.
    ///
    /// With no identity present the local view is cleared without a network
    /// call. On store failure the prior lines are kept and an error
    /// notification is emitted.
    #[instrument(skip(self))]
    pub async fn refresh(&self) {
        let Some(who) = self.current_identity() else {
            let mut state = self.state();
            state.lines.clear();
            state.syncing = false;
            return;
        };

        self.state().syncing = true;
        let result = self.inner.store.fetch_lines(&who.id).await;

        let mut state = self.state();
        state.syncing = false;
        match result {
            Ok(lines) => {
                // A slow fetch can outlive the identity it was issued for;
                // committing it then would leak rows across scopes.
                if self.current_identity().is_some_and(|now| now.id == who.id) {
                    state.lines = lines;
                } else {
                    debug!(user = %who.id, "discarding cart fetch for superseded identity");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, user = %who.id, "failed to fetch cart lines");
                self.notify(Notification::error("Failed to load cart items"));
            }
        }
    }

    /// React to a sign-in, sign-out, or identity switch.
    ///
    /// Sign-in (or switch) refreshes under the new scope; sign-out clears
    /// the local view only - the rows stay server-side for when the identity
    /// returns.
    pub async fn identity_changed(&self) {
        if self.current_identity().is_some() {
            self.refresh().await;
        } else {
            self.state().lines.clear();
        }
    }

    /// Drive [`identity_changed`](Self::identity_changed) from a watch
    /// channel until the sender is dropped.
    pub async fn run_identity_watch(&self, mut changes: watch::Receiver<Option<Identity>>) {
        while changes.changed().await.is_ok() {
            self.identity_changed().await;
        }
    }

    // =========================================================================
    // Mutating Operations
    // =========================================================================

    /// Add a product to the cart.
    ///
    /// Adding a product already in the cart increases its quantity instead
    /// of creating a duplicate line. Requires a signed-in identity;
    /// otherwise a warning notification is emitted and nothing is written.
    #[instrument(skip(self), fields(product = %product, quantity))]
    pub async fn add_item(&self, product: &ProductId, quantity: u32) {
        let Some(who) = self.current_identity() else {
            self.notify(Notification::warning(
                "Please sign in to add items to your cart",
            ));
            return;
        };
        let quantity = quantity.max(1);

        let existing = self
            .state()
            .lines
            .iter()
            .find(|line| &line.product_id == product)
            .map(|line| line.quantity);

        if let Some(current) = existing {
            self.set_quantity(product, i64::from(current) + i64::from(quantity))
                .await;
            return;
        }

        match self.inner.store.insert_line(&who.id, product, quantity).await {
            Ok(_) => {
                self.notify(Notification::success("Item added to cart"));
                // Pull the canonical row (generated id, product snapshot)
                self.refresh().await;
            }
            Err(e) => {
                tracing::error!(error = %e, product = %product, "failed to add item to cart");
                self.notify(Notification::error("Failed to add item to cart"));
            }
        }
    }

    /// Set the quantity of a product's line.
    ///
    /// A quantity of zero or less removes the line entirely; quantities in
    /// stored state are always positive.
    #[instrument(skip(self), fields(product = %product, quantity))]
    pub async fn set_quantity(&self, product: &ProductId, quantity: i64) {
        let Some(who) = self.current_identity() else {
            return;
        };

        if quantity <= 0 {
            self.remove_item(product).await;
            return;
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);

        match self
            .inner
            .store
            .update_quantity(&who.id, product, quantity)
            .await
        {
            Ok(()) => self.refresh().await,
            Err(e) => {
                tracing::error!(error = %e, product = %product, "failed to update quantity");
                self.notify(Notification::error("Failed to update quantity"));
            }
        }
    }

    /// Remove a product's line from the cart.
    ///
    /// Removing a product that is not in the cart is a no-op, not an error.
    #[instrument(skip(self), fields(product = %product))]
    pub async fn remove_item(&self, product: &ProductId) {
        let Some(who) = self.current_identity() else {
            return;
        };

        match self.inner.store.delete_line(&who.id, product).await {
            Ok(()) => {
                self.notify(Notification::success("Item removed from cart"));
                self.refresh().await;
            }
            Err(e) => {
                tracing::error!(error = %e, product = %product, "failed to remove item from cart");
                self.notify(Notification::error("Failed to remove item from cart"));
            }
        }
    }

    /// Remove every line in the cart.
    ///
    /// On success the local view is emptied directly; the target state is
    /// known, so no refetch round trip is needed.
    #[instrument(skip(self))]
    pub async fn clear(&self) {
        let Some(who) = self.current_identity() else {
            return;
        };

        match self.inner.store.clear_lines(&who.id).await {
            Ok(()) => {
                self.state().lines.clear();
                self.notify(Notification::success("Cart cleared"));
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to clear cart");
                self.notify(Notification::error("Failed to clear cart"));
            }
        }
    }

    // =========================================================================
    // Derived Reads (pure functions of current lines)
    // =========================================================================

    /// Snapshot of the current lines.
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        self.state().lines.clone()
    }

    /// Whether a store round trip is outstanding.
    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.state().syncing
    }

    /// Total units across all lines.
    #[must_use]
    pub fn total_item_count(&self) -> u64 {
        self.state()
            .lines
            .iter()
            .map(|line| u64::from(line.quantity))
            .sum()
    }

    /// Total price across all lines.
    ///
    /// Lines missing their product snapshot contribute zero.
    #[must_use]
    pub fn total_price(&self) -> Price {
        let amount: Decimal = self.state().lines.iter().map(CartLine::line_total).sum();
        Price::new(amount, CurrencyCode::default())
    }
}

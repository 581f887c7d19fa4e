//! Current-user identity seam.
//!
//! The cart synchronizer never owns authentication; it observes the signed-in
//! identity through [`IdentityProvider`]. The host application decides where
//! identities come from (session cookies, OAuth, a test fixture) and pushes
//! changes through a [`tokio::sync::watch`] channel.

use medimart_core::{Email, UserId};
use tokio::sync::watch;

/// The signed-in user, or absent when signed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Stable user reference, scopes all cart rows.
    pub id: UserId,
    /// Contact address supplied by the identity provider.
    pub email: Email,
}

/// Read access to the ambient identity.
pub trait IdentityProvider: Send + Sync {
    /// The currently signed-in identity, if any.
    fn current(&self) -> Option<Identity>;
}

/// [`IdentityProvider`] backed by a `watch` channel.
///
/// The sender half lives with whatever performs sign-in/sign-out; every
/// change wakes subscribers so the cart can run its identity state machine.
#[derive(Debug, Clone)]
pub struct WatchIdentity {
    rx: watch::Receiver<Option<Identity>>,
}

impl WatchIdentity {
    /// Create a provider plus the sender used to publish identity changes.
    ///
    /// Starts signed out.
    #[must_use]
    pub fn channel() -> (Self, watch::Sender<Option<Identity>>) {
        let (tx, rx) = watch::channel(None);
        (Self { rx }, tx)
    }

    /// Subscribe to identity changes.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<Option<Identity>> {
        self.rx.clone()
    }
}

impl IdentityProvider for WatchIdentity {
    fn current(&self) -> Option<Identity> {
        self.rx.borrow().clone()
    }
}

//! Subscription handles returned by [`ActionHandle::subscribe`](crate::ActionHandle::subscribe)
//!
//! The subscribing component owns its [`Subscription`] and is responsible for
//! cancelling it during teardown. Dropping a `Subscription` leaves the
//! listener registered; convert it into a [`SubscriptionGuard`] for
//! cancel-on-drop behaviour.

use std::cell::Cell;
use std::rc::{Rc, Weak};

/// Removal side of an action's listener list, erased over the argument type.
pub(crate) trait Detach {
    fn detach(&self, id: u64);
}

/// An active listener registration on one action.
#[must_use = "dropping a Subscription keeps the listener registered; call cancel() during teardown"]
pub struct Subscription {
    action: Rc<str>,
    id: u64,
    live: Rc<Cell<bool>>,
    owner: Weak<dyn Detach>,
}

impl Subscription {
    pub(crate) fn new(action: Rc<str>, id: u64, live: Rc<Cell<bool>>, owner: Weak<dyn Detach>) -> Self {
        Self {
            action,
            id,
            live,
            owner,
        }
    }

    /// Remove the listener.
    ///
    /// Takes effect immediately, including for a dispatch that is in progress
    /// and has not reached this listener yet.
    pub fn cancel(self) {
        self.detach();
    }

    /// Whether the listener is still registered
    pub fn is_active(&self) -> bool {
        self.live.get()
    }

    /// Name of the action this subscription listens to
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Registration id, unique per action
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Convert into a guard that cancels when dropped
    pub fn guard(self) -> SubscriptionGuard {
        SubscriptionGuard { inner: Some(self) }
    }

    fn detach(&self) {
        if !self.live.replace(false) {
            return;
        }
        if let Some(owner) = self.owner.upgrade() {
            owner.detach(self.id);
        }
        tracing::trace!(action = %self.action, subscription = self.id, "listener cancelled");
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("action", &self.action)
            .field("id", &self.id)
            .field("active", &self.live.get())
            .finish()
    }
}

/// A [`Subscription`] that is cancelled when dropped.
#[must_use = "dropping a SubscriptionGuard immediately cancels the listener"]
#[derive(Debug)]
pub struct SubscriptionGuard {
    inner: Option<Subscription>,
}

impl SubscriptionGuard {
    /// Cancel now instead of at drop
    pub fn cancel(mut self) {
        if let Some(sub) = self.inner.take() {
            sub.cancel();
        }
    }

    /// Give up cancel-on-drop and return the plain subscription
    pub fn release(mut self) -> Option<Subscription> {
        self.inner.take()
    }

    pub fn is_active(&self) -> bool {
        self.inner.as_ref().is_some_and(Subscription::is_active)
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(sub) = self.inner.take() {
            sub.cancel();
        }
    }
}

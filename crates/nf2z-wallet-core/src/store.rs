use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::domain::WalletSession;

pub type SnapshotHandler = Rc<dyn Fn(&WalletSession)>;

/// Token returned by [`SessionStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreSubscription {
    id: u64,
}

/// Owner of the canonical [`WalletSession`].
///
/// Clones share the same session. Subscribers are notified synchronously in
/// registration order; a `set` issued from inside a notification is queued
/// and published once the current round has reached every subscriber.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Rc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    state: RefCell<StoreState>,
    publishing: Cell<bool>,
}

#[derive(Default)]
struct StoreState {
    snapshot: WalletSession,
    revision: u64,
    next_subscriber_id: u64,
    subscribers: Vec<(u64, SnapshotHandler)>,
    queued: VecDeque<WalletSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> WalletSession {
        self.inner.state.borrow().snapshot.clone()
    }

    /// Number of snapshots published so far.
    pub fn revision(&self) -> u64 {
        self.inner.state.borrow().revision
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.state.borrow().subscribers.len()
    }

    pub fn set(&self, next: WalletSession) {
        if self.inner.publishing.get() {
            tracing::debug!(status = ?next.status(), "session publish queued behind active round");
            self.inner.state.borrow_mut().queued.push_back(next);
            return;
        }

        let mut pending = Some(next);
        while let Some(snapshot) = pending.take() {
            let (revision, handlers) = {
                let mut g = self.inner.state.borrow_mut();
                g.snapshot = snapshot.clone();
                g.revision = g.revision.saturating_add(1);
                (g.revision, g.subscribers.clone())
            };
            tracing::debug!(revision, status = ?snapshot.status(), "session snapshot published");

            self.inner.publishing.set(true);
            for (id, handler) in handlers {
                if !self.is_subscribed(id) {
                    continue;
                }
                handler(&snapshot);
            }
            self.inner.publishing.set(false);

            pending = self.inner.state.borrow_mut().queued.pop_front();
        }
    }

    pub fn subscribe(&self, handler: impl Fn(&WalletSession) + 'static) -> StoreSubscription {
        let handler: SnapshotHandler = Rc::new(handler);
        let mut g = self.inner.state.borrow_mut();
        g.next_subscriber_id = g.next_subscriber_id.saturating_add(1);
        let id = g.next_subscriber_id;
        g.subscribers.push((id, handler));
        StoreSubscription { id }
    }

    /// Returns `false` if the subscription was already removed.
    pub fn unsubscribe(&self, subscription: StoreSubscription) -> bool {
        let mut g = self.inner.state.borrow_mut();
        let before = g.subscribers.len();
        g.subscribers.retain(|(id, _)| *id != subscription.id);
        g.subscribers.len() != before
    }

    fn is_subscribed(&self, id: u64) -> bool {
        self.inner
            .state
            .borrow()
            .subscribers
            .iter()
            .any(|(x, _)| *x == id)
    }
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let g = self.inner.state.borrow();
        f.debug_struct("SessionStore")
            .field("snapshot", &g.snapshot)
            .field("revision", &g.revision)
            .field("subscribers", &g.subscribers.len())
            .finish()
    }
}

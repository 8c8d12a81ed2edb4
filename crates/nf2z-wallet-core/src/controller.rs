use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use alloy::primitives::Address;
use futures::future::{FutureExt, LocalBoxFuture, Shared};

use crate::domain::{ChainId, ProviderEvent, WalletSession};
use crate::ports::{EventHandler, ProviderError, ProviderPort, SessionError};
use crate::state_machine::{session_transition, SessionAction, SubscriberState};
use crate::store::SessionStore;
use crate::subscriber::ChangeSubscriber;

pub type ConnectOutcome = Result<WalletSession, SessionError>;

type SharedConnect = Shared<LocalBoxFuture<'static, ConnectOutcome>>;

/// In-flight attempt tagged with the generation that started it.
struct PendingConnect {
    generation: u64,
    attempt: SharedConnect,
}

/// Drives connect/disconnect against the provider and is the only writer of
/// the [`SessionStore`] besides provider events it routes itself.
///
/// Clones share one controller. Every connect attempt and every disconnect
/// advances the session generation; outcomes and provider events tagged with
/// an older generation are discarded.
pub struct ConnectionController<P: ProviderPort + 'static> {
    inner: Rc<ControllerInner<P>>,
}

struct ControllerInner<P: ProviderPort + 'static> {
    provider: P,
    store: SessionStore,
    subscriber: RefCell<ChangeSubscriber>,
    generation: Cell<u64>,
    pending: RefCell<Option<PendingConnect>>,
}

impl<P: ProviderPort + 'static> Clone for ConnectionController<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<P: ProviderPort + 'static> ConnectionController<P> {
    pub fn new(provider: P) -> Self {
        Self::with_store(provider, SessionStore::new())
    }

    pub fn with_store(provider: P, store: SessionStore) -> Self {
        Self {
            inner: Rc::new(ControllerInner {
                provider,
                store,
                subscriber: RefCell::new(ChangeSubscriber::new()),
                generation: Cell::new(0),
                pending: RefCell::new(None),
            }),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.inner.store
    }

    pub fn session(&self) -> WalletSession {
        self.inner.store.get()
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.get()
    }

    pub fn subscriber_state(&self) -> SubscriberState {
        self.inner.subscriber.borrow().state()
    }

    pub fn has_pending_connect(&self) -> bool {
        self.inner.pending.borrow().is_some()
    }

    pub async fn connect(&self) -> ConnectOutcome {
        let current = self.inner.store.get();
        if current.is_connected() {
            tracing::debug!("connect ignored: session already connected");
            return Ok(current);
        }

        let in_flight = self
            .inner
            .pending
            .borrow()
            .as_ref()
            .map(|p| p.attempt.clone());
        if let Some(attempt) = in_flight {
            tracing::debug!("joining in-flight connect attempt");
            return attempt.await;
        }

        if !self.inner.provider.is_available() {
            tracing::warn!("connect failed: no wallet provider available");
            self.inner
                .apply(SessionAction::Fail(ProviderError::NotInstalled))?;
            return Err(ProviderError::NotInstalled.into());
        }

        let generation = self.inner.advance_generation();
        let inner = Rc::clone(&self.inner);
        let attempt = async move { inner.run_connect(generation).await }
            .boxed_local()
            .shared();
        // Must be visible before `Connecting` is published; subscribers may
        // disconnect from inside that notification.
        *self.inner.pending.borrow_mut() = Some(PendingConnect {
            generation,
            attempt: attempt.clone(),
        });
        if let Err(e) = self.inner.apply(SessionAction::BeginConnect) {
            self.inner.clear_pending(generation);
            return Err(e);
        }
        tracing::info!(generation, "wallet connect started");
        attempt.await
    }

    /// Always succeeds; a no-op when nothing is connected.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }
}

impl<P: ProviderPort + 'static> ControllerInner<P> {
    fn advance_generation(&self) -> u64 {
        let next = self.generation.get().saturating_add(1);
        self.generation.set(next);
        next
    }

    fn apply(&self, action: SessionAction) -> ConnectOutcome {
        let current = self.store.get();
        let (next, transition) = session_transition(&current, action).inspect_err(|e| {
            tracing::warn!(error = %e, "session transition rejected");
        })?;
        tracing::debug!(
            from = ?transition.from,
            to = ?transition.to,
            reason = transition.reason,
            "session transition"
        );
        if next != current {
            self.store.set(next.clone());
        }
        Ok(next)
    }

    /// Drops the pending attempt if it is still the one `generation` started.
    fn clear_pending(&self, generation: u64) {
        let mut pending = self.pending.borrow_mut();
        if pending.as_ref().is_some_and(|p| p.generation == generation) {
            pending.take();
        }
    }

    fn superseded(&self, generation: u64) -> ConnectOutcome {
        self.clear_pending(generation);
        tracing::warn!(
            generation,
            current = self.generation.get(),
            "discarding superseded connect outcome"
        );
        Err(SessionError::Superseded)
    }

    async fn run_connect(self: Rc<Self>, generation: u64) -> ConnectOutcome {
        if self.generation.get() != generation {
            return self.superseded(generation);
        }
        let outcome = self.establish().await;
        if self.generation.get() != generation {
            return self.superseded(generation);
        }
        self.clear_pending(generation);

        let (account, chain_id) = match outcome {
            Ok(established) => established,
            Err(e) => {
                tracing::warn!(error = %e, "wallet connect failed");
                self.apply(SessionAction::Fail(e.clone()))?;
                return Err(e.into());
            }
        };

        if let Err(e) = self.arm(generation) {
            self.apply(SessionAction::Fail(e.clone()))?;
            return Err(e.into());
        }
        let session = self.apply(SessionAction::Established { account, chain_id })?;
        tracing::info!(%account, %chain_id, generation, "wallet connected");
        Ok(session)
    }

    async fn establish(&self) -> Result<(Address, ChainId), ProviderError> {
        let accounts = self.provider.request_accounts().await?;
        let account = accounts
            .first()
            .copied()
            .ok_or_else(ProviderError::no_accounts)?;
        if accounts.len() > 1 {
            tracing::debug!(count = accounts.len(), "provider returned several accounts; using the first");
        }
        let chain_id = self.provider.chain_id().await?;
        Ok((account, chain_id))
    }

    fn arm(self: &Rc<Self>, generation: u64) -> Result<(), ProviderError> {
        let weak = Rc::downgrade(self);
        let sink: EventHandler = Rc::new(move |event: &ProviderEvent| {
            if let Some(inner) = weak.upgrade() {
                inner.on_provider_event(generation, event);
            }
        });
        let mut subscriber = self.subscriber.borrow_mut();
        subscriber.disarm(&self.provider);
        subscriber.arm(&self.provider, sink)
    }

    fn on_provider_event(&self, armed_generation: u64, event: &ProviderEvent) {
        if self.generation.get() != armed_generation {
            tracing::debug!(
                event = event.kind().as_str(),
                armed_generation,
                "ignoring event from a previous session"
            );
            return;
        }
        tracing::debug!(event = event.kind().as_str(), "provider event");

        if ChangeSubscriber::ends_session(event) {
            self.disconnect();
            return;
        }
        // Rejections are already logged by `apply`.
        let _ = self.apply(ChangeSubscriber::reaction(event));
    }

    fn disconnect(&self) {
        let generation = self.advance_generation();
        let dropped_pending = self.pending.borrow_mut().take().is_some();
        let removed = self.subscriber.borrow_mut().disarm(&self.provider);
        let was = self.store.get().status();
        // Disconnect is legal from every state.
        let _ = self.apply(SessionAction::Disconnect);
        tracing::info!(
            generation,
            from = ?was,
            listeners_removed = removed,
            dropped_pending,
            "wallet disconnected"
        );
    }
}

impl<P: ProviderPort + 'static> fmt::Debug for ConnectionController<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionController")
            .field("session", &self.inner.store.get())
            .field("generation", &self.inner.generation.get())
            .field("subscriber", &self.inner.subscriber.borrow().state())
            .field("pending", &self.inner.pending.borrow().is_some())
            .finish()
    }
}

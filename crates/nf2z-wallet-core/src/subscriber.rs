use std::rc::Rc;

use crate::domain::{ProviderEvent, ProviderEventKind};
use crate::ports::{EventHandler, ProviderError, ProviderPort, Subscription};
use crate::state_machine::{SessionAction, SubscriberState};

/// Holds the provider listeners for the lifetime of one connected session.
#[derive(Debug, Default)]
pub struct ChangeSubscriber {
    state: SubscriberState,
    subscriptions: Vec<Subscription>,
}

impl ChangeSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SubscriberState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == SubscriberState::Armed
    }

    /// Registers `sink` for every provider event kind. A failed registration
    /// rolls back the ones already made and leaves the subscriber idle.
    pub fn arm<P: ProviderPort>(
        &mut self,
        provider: &P,
        sink: EventHandler,
    ) -> Result<(), ProviderError> {
        if self.is_armed() {
            return Ok(());
        }
        for kind in ProviderEventKind::ALL {
            match provider.subscribe(kind, Rc::clone(&sink)) {
                Ok(subscription) => self.subscriptions.push(subscription),
                Err(e) => {
                    tracing::warn!(event = kind.as_str(), error = %e, "provider listener registration failed");
                    self.disarm(provider);
                    return Err(e);
                }
            }
        }
        self.state = SubscriberState::Armed;
        tracing::debug!(listeners = self.subscriptions.len(), "change subscriber armed");
        Ok(())
    }

    /// Removes every listener this subscriber registered. Returns how many
    /// were still live at the provider.
    pub fn disarm<P: ProviderPort>(&mut self, provider: &P) -> usize {
        let removed = self
            .subscriptions
            .drain(..)
            .filter(|subscription| provider.unsubscribe(subscription))
            .count();
        if self.state == SubscriberState::Armed {
            tracing::debug!(removed, "change subscriber disarmed");
        }
        self.state = SubscriberState::Idle;
        removed
    }

    /// Session action a provider-originated event asks for.
    pub fn reaction(event: &ProviderEvent) -> SessionAction {
        match event {
            ProviderEvent::AccountsChanged(accounts) => SessionAction::AccountsChanged(accounts.clone()),
            ProviderEvent::ChainChanged(chain_id) => SessionAction::ChainChanged(*chain_id),
            ProviderEvent::Disconnect { .. } => SessionAction::Disconnect,
        }
    }

    /// True when the event ends the session rather than updating it.
    pub fn ends_session(event: &ProviderEvent) -> bool {
        match event {
            ProviderEvent::AccountsChanged(accounts) => accounts.is_empty(),
            ProviderEvent::ChainChanged(_) => false,
            ProviderEvent::Disconnect { .. } => true,
        }
    }
}

//! Read-only session view handed to UI code.

use alloy::primitives::Address;

use crate::controller::{ConnectOutcome, ConnectionController};
use crate::domain::WalletSession;
use crate::ports::ProviderPort;
use crate::store::StoreSubscription;

pub const CONNECT_LABEL: &str = "Connect Wallet";
pub const CONNECTING_LABEL: &str = "Connecting...";

/// UI-facing projection of the wallet session: snapshot reads, change
/// subscription, and the two user entry points. Consumers cannot write the
/// session directly.
pub struct SessionContext<P: ProviderPort + 'static> {
    controller: ConnectionController<P>,
}

impl<P: ProviderPort + 'static> Clone for SessionContext<P> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
        }
    }
}

impl<P: ProviderPort + 'static> SessionContext<P> {
    pub fn new(controller: ConnectionController<P>) -> Self {
        Self { controller }
    }

    pub fn snapshot(&self) -> WalletSession {
        self.controller.session()
    }

    pub fn subscribe(&self, handler: impl Fn(&WalletSession) + 'static) -> StoreSubscription {
        self.controller.store().subscribe(handler)
    }

    pub fn unsubscribe(&self, subscription: StoreSubscription) -> bool {
        self.controller.store().unsubscribe(subscription)
    }

    pub async fn connect(&self) -> ConnectOutcome {
        self.controller.connect().await
    }

    pub fn disconnect(&self) {
        self.controller.disconnect();
    }

    /// Navbar button text for the current session.
    pub fn wallet_button_label(&self) -> String {
        wallet_button_label(&self.snapshot())
    }
}

pub fn wallet_button_label(session: &WalletSession) -> String {
    match session {
        WalletSession::Connected { account, .. } => {
            format!("Disconnect ({})", short_address(account))
        }
        WalletSession::Connecting => CONNECTING_LABEL.to_owned(),
        WalletSession::Disconnected | WalletSession::Error { .. } => CONNECT_LABEL.to_owned(),
    }
}

/// `0x1234...abcd`: the first six and last four characters of the checksummed
/// address.
pub fn short_address(address: &Address) -> String {
    let full = address.to_string();
    format!("{}...{}", &full[..6], &full[full.len() - 4..])
}

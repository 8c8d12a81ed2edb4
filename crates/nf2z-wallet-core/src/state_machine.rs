use alloy::primitives::Address;

use crate::domain::{ChainId, SessionStatus, WalletSession};
use crate::ports::{ProviderError, SessionError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    BeginConnect,
    Established { account: Address, chain_id: ChainId },
    Fail(ProviderError),
    AccountsChanged(Vec<Address>),
    ChainChanged(ChainId),
    Disconnect,
}

impl SessionAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BeginConnect => "begin_connect",
            Self::Established { .. } => "established",
            Self::Fail(_) => "fail",
            Self::AccountsChanged(_) => "accounts_changed",
            Self::ChainChanged(_) => "chain_changed",
            Self::Disconnect => "disconnect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: SessionStatus,
    pub to: SessionStatus,
    pub reason: &'static str,
}

/// Lifecycle of the provider listeners owned by a `ChangeSubscriber`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubscriberState {
    #[default]
    Idle,
    Armed,
}

pub fn session_transition(
    current: &WalletSession,
    action: SessionAction,
) -> Result<(WalletSession, StateTransition), SessionError> {
    let from = current.status();
    let reason = action.name();
    let next = match (current, action) {
        (WalletSession::Disconnected | WalletSession::Error { .. }, SessionAction::BeginConnect) => {
            WalletSession::Connecting
        }
        (WalletSession::Connecting, SessionAction::Established { account, chain_id }) => {
            WalletSession::Connected { account, chain_id }
        }
        (WalletSession::Connecting, SessionAction::Fail(last_error)) => {
            WalletSession::Error { last_error }
        }
        // A rejected connect can also short-circuit before leaving the idle states.
        (WalletSession::Disconnected | WalletSession::Error { .. }, SessionAction::Fail(last_error)) => {
            WalletSession::Error { last_error }
        }
        (WalletSession::Connected { chain_id, .. }, SessionAction::AccountsChanged(accounts)) => {
            match accounts.first() {
                Some(account) => WalletSession::Connected {
                    account: *account,
                    chain_id: *chain_id,
                },
                None => WalletSession::Disconnected,
            }
        }
        (WalletSession::Connected { account, .. }, SessionAction::ChainChanged(chain_id)) => {
            WalletSession::Connected {
                account: *account,
                chain_id,
            }
        }
        (_, SessionAction::Disconnect) => WalletSession::Disconnected,
        (_, action) => {
            return Err(SessionError::IllegalTransition {
                from,
                action: action.name(),
            })
        }
    };
    let to = next.status();
    Ok((next, StateTransition { from, to, reason }))
}

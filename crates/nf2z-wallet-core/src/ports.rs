use std::rc::Rc;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{parse_accounts, ChainId, ProviderEvent, ProviderEventKind, SessionStatus};

pub const METHOD_REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
pub const METHOD_CHAIN_ID: &str = "eth_chainId";

/// EIP-1193 `4001 User Rejected Request`.
pub const CODE_USER_REJECTED: i64 = 4001;
/// EIP-1193 `4100 Unauthorized`.
pub const CODE_UNAUTHORIZED: i64 = 4100;
/// EIP-1193 `4900 Disconnected`.
pub const CODE_DISCONNECTED: i64 = 4900;
/// JSON-RPC internal error, used for responses we cannot decode.
pub const CODE_INTERNAL: i64 = -32603;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ProviderError {
    #[error("no wallet provider installed")]
    NotInstalled,
    #[error("user rejected the wallet request")]
    UserRejected,
    #[error("wallet provider timed out")]
    Timeout,
    #[error("wallet provider error {code}: {message}")]
    Unknown { code: i64, message: String },
}

impl ProviderError {
    /// Maps an EIP-1193 / JSON-RPC error object onto the taxonomy.
    pub fn from_rpc(code: i64, message: impl Into<String>) -> Self {
        match code {
            CODE_USER_REJECTED => Self::UserRejected,
            _ => Self::Unknown {
                code,
                message: message.into(),
            },
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Unknown {
            code: CODE_INTERNAL,
            message: message.into(),
        }
    }

    pub fn no_accounts() -> Self {
        Self::Unknown {
            code: CODE_UNAUTHORIZED,
            message: "provider returned no accounts; unlock or connect the wallet".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("illegal session transition from {from:?} via {action}")]
    IllegalTransition {
        from: SessionStatus,
        action: &'static str,
    },
    #[error("connect attempt superseded by disconnect")]
    Superseded,
}

pub type EventHandler = Rc<dyn Fn(&ProviderEvent)>;

/// Token returned by [`ProviderPort::subscribe`]; removes exactly the handler
/// it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub kind: ProviderEventKind,
    pub id: u64,
}

/// Boundary over the injected wallet provider.
///
/// Implementations run on a single cooperative thread; `request` is the only
/// suspending call.
#[allow(async_fn_in_trait)]
pub trait ProviderPort {
    fn is_available(&self) -> bool;

    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    fn subscribe(
        &self,
        kind: ProviderEventKind,
        handler: EventHandler,
    ) -> Result<Subscription, ProviderError>;

    /// Returns `false` if the subscription was already removed.
    fn unsubscribe(&self, subscription: &Subscription) -> bool;

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let result = self
            .request(METHOD_REQUEST_ACCOUNTS, serde_json::json!([]))
            .await?;
        parse_accounts(&result)
    }

    async fn chain_id(&self) -> Result<ChainId, ProviderError> {
        let result = self.request(METHOD_CHAIN_ID, serde_json::json!([])).await?;
        ChainId::from_json(&result)
    }
}

use std::fmt;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ports::{ProviderError, CODE_DISCONNECTED};

/// Network identifier as reported by `eth_chainId` / `chainChanged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    /// Accepts a JSON number, a decimal string, or a `0x` hex string.
    pub fn from_json(value: &Value) -> Result<Self, ProviderError> {
        if let Some(n) = value.as_u64() {
            return Ok(Self(n));
        }
        let raw = value.as_str().ok_or_else(|| {
            ProviderError::malformed(format!("chain id must be string or number, got {value}"))
        })?;
        raw.parse()
    }

    pub fn to_hex(self) -> String {
        format!("{:#x}", self.0)
    }
}

impl std::str::FromStr for ChainId {
    type Err = ProviderError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parsed = if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
            u64::from_str_radix(hex, 16)
                .map_err(|e| ProviderError::malformed(format!("invalid hex chain id {raw}: {e}")))?
        } else {
            raw.parse()
                .map_err(|e| ProviderError::malformed(format!("invalid chain id {raw}: {e}")))?
        };
        Ok(Self(parsed))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// The single process-wide wallet session.
///
/// Account and chain only exist together inside `Connected`, and the last
/// error only inside `Error`, so a partially populated session cannot be
/// represented.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum WalletSession {
    #[default]
    Disconnected,
    Connecting,
    Connected {
        account: Address,
        chain_id: ChainId,
    },
    Error {
        last_error: ProviderError,
    },
}

impl WalletSession {
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Disconnected => SessionStatus::Disconnected,
            Self::Connecting => SessionStatus::Connecting,
            Self::Connected { .. } => SessionStatus::Connected,
            Self::Error { .. } => SessionStatus::Error,
        }
    }

    pub fn account(&self) -> Option<Address> {
        match self {
            Self::Connected { account, .. } => Some(*account),
            _ => None,
        }
    }

    pub fn chain_id(&self) -> Option<ChainId> {
        match self {
            Self::Connected { chain_id, .. } => Some(*chain_id),
            _ => None,
        }
    }

    pub fn last_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Error { last_error } => Some(last_error),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderEventKind {
    AccountsChanged,
    ChainChanged,
    Disconnect,
}

impl ProviderEventKind {
    pub const ALL: [ProviderEventKind; 3] = [
        ProviderEventKind::AccountsChanged,
        ProviderEventKind::ChainChanged,
        ProviderEventKind::Disconnect,
    ];

    /// EIP-1193 event name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AccountsChanged => "accountsChanged",
            Self::ChainChanged => "chainChanged",
            Self::Disconnect => "disconnect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderEvent {
    AccountsChanged(Vec<Address>),
    ChainChanged(ChainId),
    Disconnect { code: i64, message: String },
}

impl ProviderEvent {
    pub fn kind(&self) -> ProviderEventKind {
        match self {
            Self::AccountsChanged(_) => ProviderEventKind::AccountsChanged,
            Self::ChainChanged(_) => ProviderEventKind::ChainChanged,
            Self::Disconnect { .. } => ProviderEventKind::Disconnect,
        }
    }

    /// Decodes a raw listener payload. Payloads that do not decode cleanly
    /// yield `None` and must be dropped rather than acted on.
    pub fn decode(kind: ProviderEventKind, payload: &Value) -> Option<Self> {
        match kind {
            ProviderEventKind::AccountsChanged => {
                parse_accounts(payload).ok().map(Self::AccountsChanged)
            }
            ProviderEventKind::ChainChanged => {
                ChainId::from_json(payload).ok().map(Self::ChainChanged)
            }
            ProviderEventKind::Disconnect => Some(Self::Disconnect {
                code: payload
                    .get("code")
                    .and_then(Value::as_i64)
                    .unwrap_or(CODE_DISCONNECTED),
                message: payload
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
            }),
        }
    }
}

/// Decodes an account array as returned by `eth_requestAccounts` or carried
/// by `accountsChanged`.
pub fn parse_accounts(value: &Value) -> Result<Vec<Address>, ProviderError> {
    let arr = value
        .as_array()
        .ok_or_else(|| ProviderError::malformed("accounts: array expected"))?;
    let mut accounts = Vec::with_capacity(arr.len());
    for item in arr {
        let raw = item
            .as_str()
            .ok_or_else(|| ProviderError::malformed("accounts: string expected"))?;
        let parsed: Address = raw
            .parse()
            .map_err(|e| ProviderError::malformed(format!("invalid account address {raw}: {e}")))?;
        accounts.push(parsed);
    }
    Ok(accounts)
}

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_RUNTIME_PROFILE: &str = "NF2Z_RUNTIME_PROFILE";
pub const ENV_EIP1193_PROXY_URL: &str = "NF2Z_EIP1193_PROXY_URL";
pub const ENV_PROVIDER_TIMEOUT_MS: &str = "NF2Z_PROVIDER_TIMEOUT_MS";
pub const ENV_DETERMINISTIC_CHAIN_ID: &str = "NF2Z_DETERMINISTIC_CHAIN_ID";
pub const ENV_DETERMINISTIC_WALLET: &str = "NF2Z_DETERMINISTIC_WALLET";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeProfile {
    #[default]
    Development,
    Production,
}

impl FromStr for RuntimeProfile {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown runtime profile {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletAdapterConfig {
    pub runtime_profile: RuntimeProfile,
    pub eip1193_proxy_url: Option<String>,
    /// Request timeout for the proxy runtime. Browser requests wait as long
    /// as the injected wallet does and never report `Timeout`.
    pub provider_timeout_ms: u64,
    /// Stand in a scripted wallet when no real provider is reachable.
    /// Ignored under the production profile.
    pub deterministic_wallet: bool,
    pub deterministic_chain_id: u64,
}

impl Default for WalletAdapterConfig {
    fn default() -> Self {
        Self {
            runtime_profile: RuntimeProfile::Development,
            eip1193_proxy_url: None,
            provider_timeout_ms: 30_000,
            deterministic_wallet: false,
            deterministic_chain_id: 1,
        }
    }
}

impl WalletAdapterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] but falls back to defaults on a bad value.
    pub fn from_env_or_default() -> Self {
        Self::from_env().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring invalid wallet adapter environment");
            Self::default()
        })
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_RUNTIME_PROFILE) {
            config.runtime_profile = raw.parse().map_err(|reason| ConfigError::InvalidValue {
                var: ENV_RUNTIME_PROFILE,
                value: raw.clone(),
                reason,
            })?;
        }
        if let Some(raw) = lookup(ENV_EIP1193_PROXY_URL) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                config.eip1193_proxy_url = Some(trimmed.to_owned());
            }
        }
        if let Some(raw) = lookup(ENV_PROVIDER_TIMEOUT_MS) {
            config.provider_timeout_ms = parse_u64(ENV_PROVIDER_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DETERMINISTIC_WALLET) {
            config.deterministic_wallet = parse_flag(ENV_DETERMINISTIC_WALLET, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DETERMINISTIC_CHAIN_ID) {
            config.deterministic_chain_id = parse_u64(ENV_DETERMINISTIC_CHAIN_ID, &raw)?;
        }
        Ok(config)
    }

    /// Production builds never fall back to the deterministic wallet.
    pub fn strict_runtime_required(&self) -> bool {
        self.runtime_profile == RuntimeProfile::Production
    }

    pub fn deterministic_wallet_enabled(&self) -> bool {
        self.deterministic_wallet && !self.strict_runtime_required()
    }
}

fn parse_u64(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
        var,
        value: raw.to_owned(),
        reason: e.to_string(),
    })
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: raw.to_owned(),
            reason: "expected true or false".to_owned(),
        }),
    }
}

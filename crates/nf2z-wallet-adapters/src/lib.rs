pub mod config;
pub mod eip1193;
pub mod telemetry;

pub use config::{ConfigError, RuntimeProfile, WalletAdapterConfig};
pub use eip1193::Eip1193Adapter;
pub use telemetry::{init_tracing, TelemetryError};

use thiserror::Error;

#[derive(Debug, Error)]
#[error("tracing subscriber not installed: {0}")]
pub struct TelemetryError(String);

/// Installs the global tracing subscriber for the host application.
///
/// Native hosts get a fmt subscriber filtered by `RUST_LOG` (default `info`);
/// browser hosts log to the devtools console.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_tracing() -> Result<(), TelemetryError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .try_init()
        .map_err(|e| TelemetryError(e.to_string()))?;
    tracing::info!("Starting NF2Z wallet session");
    Ok(())
}

#[cfg(target_arch = "wasm32")]
pub fn init_tracing() -> Result<(), TelemetryError> {
    tracing_wasm::try_set_as_global_default().map_err(|e| TelemetryError(e.to_string()))?;
    tracing::info!("Starting NF2Z wallet session");
    Ok(())
}

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Default filter directives, `RUST_LOG` takes precedence when set
#[must_use]
pub fn default_directives(dev: bool) -> String {
    let level = if dev { "debug" } else { "info" };
    format!("info,{}={level}", env!("CARGO_CRATE_NAME"))
}

/// Install the global `tracing` subscriber
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already set
pub fn init(dev: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(dev)))
        .map_err(|e| anyhow!("invalid log filter: {e}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))
}

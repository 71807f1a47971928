//! Tracing subscriber setup for binaries embedding the runtime.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Installs a stderr fmt layer filtered by `RUST_LOG`.
///
/// Defaults to `info` when `RUST_LOG` is unset. Libraries never call this;
/// it belongs to the composition root. Returns an error if a global
/// subscriber is already installed.
pub fn setup_logging() -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!(target: "combat::runtime", "logging initialized");
    Ok(())
}

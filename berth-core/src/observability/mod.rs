//! Observability infrastructure: structured logging and metrics.
//!
//! The library only emits `tracing` events and `metrics` samples. Binaries call
//! [`init`] once to install a subscriber; exporting metrics is left to them.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod metrics;

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `default_level` (e.g. `"info"`,
/// `"berth_core=debug"`) is used. Also registers metric descriptions.
pub fn init(default_level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .try_init()?;

    metrics::register_core_metrics();

    tracing::debug!("Observability initialized");
    Ok(())
}

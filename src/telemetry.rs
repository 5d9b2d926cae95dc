//! Telemetry logic.
//!
//! The core only emits `tracing` events; host binaries call [`init`] once
//! to install a subscriber.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Install the global log subscriber, filtered by `RUST_LOG`.
pub fn init() -> Result<(), TryInitError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish()
        .try_init()
}

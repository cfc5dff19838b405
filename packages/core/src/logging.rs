//! Tracing subscriber setup for binaries and tools embedding the engine

use tracing_subscriber::EnvFilter;

/// Install a formatting subscriber
///
/// `RUST_LOG` wins over `default_directive` when set. Calling this more than
/// once is harmless; later calls leave the first subscriber in place.
pub fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_err()
    {
        tracing::debug!("Tracing subscriber already installed");
    }
}

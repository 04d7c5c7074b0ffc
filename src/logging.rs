//! Tracing subscriber setup

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Install a fmt subscriber filtered by `RUST_LOG`
///
/// Falls back to `default_directive` (e.g. `"info,fuelrats=debug"`) when
/// `RUST_LOG` is unset or invalid. Returns `false` if a global subscriber was
/// already installed, which makes repeated calls harmless.
pub fn init(default_directive: &str) -> bool {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

//! Tracing subscriber setup.
//!
//! Filter directives come from `RUST_LOG`; when it is unset or invalid the
//! supplied default applies to this crate and `tower_http`.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "tasklane=info,tower_http=info";

/// Build the filter from `RUST_LOG`, falling back to `default`.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global fmt subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing(default: &str) {
    let result = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default))
        .with_target(true)
        .try_init();
    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

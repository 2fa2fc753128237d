//! Logging setup for the binary.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "summon_bot=debug,info";

/// Installs the global subscriber: an `fmt` layer filtered by `RUST_LOG`,
/// falling back to [`DEFAULT_FILTER`].
pub fn init() -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}

fn env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

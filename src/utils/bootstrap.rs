//! Process bootstrap helpers for binaries embedding the router.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LOG_ENV_VAR;

/// Initialize tracing with the SVCDISPATCH_LOG environment variable.
///
/// Defaults to "info" level if SVCDISPATCH_LOG is not set. Safe to call more
/// than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

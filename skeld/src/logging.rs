//! Developer diagnostics.
//!
//! Tracing output goes to stderr and is filtered by `RUST_LOG`. It is separate
//! from the game's event log (`core::events`), which is the narrative shown to
//! players and spectators and is always recorded.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset; keeps oracle failures visible.
pub const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. A second call is a no-op.
///
/// ```bash
/// RUST_LOG=skeld=debug skeld play --seed 7
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_names(true)
                .compact(),
        )
        .try_init();
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

//! Logging initialization.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info,meshview=debug,meshview_renderer=debug,meshview_rhi=info";

/// Initialize the global tracing subscriber.
///
/// Honors `RUST_LOG` when present, otherwise falls back to [`DEFAULT_FILTER`].
/// Calling this twice is harmless: the second registration is ignored.
///
/// # Example
/// ```
/// meshview_core::init_logging();
/// tracing::info!("Viewer starting");
/// ```
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .try_init();
}

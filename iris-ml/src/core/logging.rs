//! Logging setup shared by the binaries.
//!
//! Diagnostics go to stderr through `tracing`; results the user asked for are
//! printed to stdout by the binaries themselves.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info";

static INIT: OnceLock<()> = OnceLock::new();

/// Install the global subscriber. `RUST_LOG` overrides the default `info` level.
///
/// Subsequent calls are no-ops.
pub fn init() {
    INIT.get_or_init(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        // Another subscriber may already be installed by an embedding application.
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init();
    });
}

//! Test logging
//!
//! Installs a `tracing` subscriber once per test binary. The filter is read
//! from `RUST_LOG` and defaults to warnings only.

use once_cell::sync::Lazy;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_target(true).with_test_writer())
        .try_init();
});

/// Enables log output for the current test binary
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

//! Shared test harness: tracing/error-report bootstrap used by every other
//! crate's test suite.

use std::sync::Once;

pub use color_eyre::eyre::Result;

static INIT: Once = Once::new();

/// Install a tracing subscriber and color-eyre's panic/error hooks, once
/// per process. Call this at the top of any `#[test]` that wants readable
/// spans and backtraces; it is safe to call repeatedly.
pub fn init() {
    INIT.call_once(|| {
        let _ = color_eyre::install();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(
                std::env::var("MVS_LOG").unwrap_or_else(|_| "mvs=debug,warn".to_string()),
            )
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

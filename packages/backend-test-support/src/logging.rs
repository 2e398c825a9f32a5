//! Test logging shared by every test binary in the workspace.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Install a test subscriber once per binary. Safe to call repeatedly.
///
/// The filter comes from `TEST_LOG`, then `RUST_LOG`, then `warn`.
/// Setting `TEST_LOG_JSON=1` switches to the JSON layout the backend
/// uses in production, handy when checking structured fields.
pub fn init() {
    INITIALIZED.get_or_init(|| {
        let filter = std::env::var("TEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .map(EnvFilter::new)
            .unwrap_or_else(|_| EnvFilter::new("warn"));

        let json = std::env::var("TEST_LOG_JSON").is_ok_and(|v| v == "1" || v == "true");

        let builder = fmt().with_env_filter(filter).with_test_writer();
        // try_init: another harness may already own the global subscriber
        if json {
            builder.json().without_time().try_init().ok();
        } else {
            builder.without_time().try_init().ok();
        }
    });
}

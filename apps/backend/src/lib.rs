#![deny(clippy::wildcard_imports)]
#![cfg_attr(test, allow(clippy::wildcard_imports))]

pub mod config;
pub mod error;
pub mod infra;
pub mod startup;
pub mod state;


// Re-exports for public API
pub use config::app::AppConfig;
pub use config::loader::{load_configuration, load_from_source, ConfigSource};
pub use config::secret::{resolve_signing_secret, SecretSource, SigningSecret};
pub use error::AppError;
pub use infra::state::build_state;
pub use startup::{startup, startup_from};
pub use state::app_state::AppState;
pub use state::security_config::SecurityConfig;

// Auto-initialize logging for unit tests
#[cfg(test)]
#[ctor::ctor]
fn init_test_logging() {
    test_bootstrap::logging::init();
}

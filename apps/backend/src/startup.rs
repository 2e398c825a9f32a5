//! Startup sequence: configuration, signing secret, storage.
//!
//! Errors are returned, never acted on here; `main` decides to exit.

use std::env;

use tracing::warn;

use crate::config::app::AppConfig;
use crate::config::loader::{load_configuration, load_from_source, ConfigSource};
use crate::config::secret::{resolve_signing_secret_from, SecretSource, JWT_SECRET_ENV};
use crate::error::AppError;
use crate::infra::state::build_state;
use crate::state::app_state::AppState;
use crate::state::security_config::SecurityConfig;

/// Run the whole bootstrap against the process environment.
pub async fn startup() -> Result<AppState, AppError> {
    let config = load_configuration()?;
    assemble(config, env::var(JWT_SECRET_ENV).ok()).await
}

/// Same sequence with the two environment inputs supplied by the caller.
pub async fn startup_from(
    source: &ConfigSource,
    jwt_secret: Option<String>,
) -> Result<AppState, AppError> {
    let config = load_from_source(source)?;
    assemble(config, jwt_secret).await
}

async fn assemble(config: AppConfig, jwt_secret: Option<String>) -> Result<AppState, AppError> {
    let secret = resolve_signing_secret_from(jwt_secret)?;
    if secret.source() == SecretSource::Generated {
        warn!("{JWT_SECRET_ENV} not set, generated a signing secret; tokens will not survive a restart");
    }
    let security = SecurityConfig::new(secret, &config.auth.jwt);

    build_state()
        .with_config(config)
        .with_security(security)
        .build()
        .await
}

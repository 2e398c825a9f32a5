use db_infra::bootstrap_storage;
use tracing::info;

use crate::config::app::AppConfig;
use crate::error::AppError;
use crate::state::app_state::AppState;
use crate::state::security_config::SecurityConfig;

pub const ERR_MISSING_CONFIG: &str = "state builder needs a configuration (call with_config)";
pub const ERR_MISSING_SECURITY: &str = "state builder needs a security config (call with_security)";

/// Builder for creating AppState instances (used in both tests and main)
pub struct StateBuilder {
    config: Option<AppConfig>,
    security_config: Option<SecurityConfig>,
}

impl StateBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            security_config: None,
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_security(mut self, security_config: SecurityConfig) -> Self {
        self.security_config = Some(security_config);
        self
    }

    pub async fn build(self) -> Result<AppState, AppError> {
        let config = self.config.ok_or_else(|| AppError::config(ERR_MISSING_CONFIG))?;
        let security = self
            .security_config
            .ok_or_else(|| AppError::config(ERR_MISSING_SECURITY))?;

        // single entrypoint: directory + connect + migrate
        let conn = bootstrap_storage(&config.database).await?;
        info!(db_kind = %config.database.kind, "database ready");

        Ok(AppState::new(config, conn, security))
    }
}

impl Default for StateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_state() -> StateBuilder {
    StateBuilder::new()
}

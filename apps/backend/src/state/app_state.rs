use std::sync::Arc;

use sea_orm::DatabaseConnection;

use super::security_config::SecurityConfig;
use crate::config::app::AppConfig;

/// Application context handed to every subsystem after startup.
/// Cloning is cheap: the config is shared and the connection is a pool handle.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Read-only configuration tree
    pub config: Arc<AppConfig>,
    /// Migrated database pool
    pub db: DatabaseConnection,
    /// Security configuration including JWT settings
    pub security: SecurityConfig,
}

impl AppState {
    pub fn new(config: AppConfig, db: DatabaseConnection, security: SecurityConfig) -> Self {
        Self {
            config: Arc::new(config),
            db,
            security,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

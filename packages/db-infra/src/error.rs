use std::path::PathBuf;

use thiserror::Error;

/// Failures of the storage bootstrap. Each message starts with a fixed
/// category prefix so operators can tell the failure class from logs alone.
#[derive(Debug, Error)]
pub enum DbInfraError {
    #[error("Configuration error: {message}")]
    Config { message: String },
    #[error("unsupported database backend {kind:?}: expected \"sqlite\" or \"mysql\"")]
    UnsupportedBackend { kind: String },
    #[error("create database directory failed: {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("init database failed: {message}")]
    Connection { message: String },
    #[error("migrate database failed: {message}")]
    Migration { message: String },
}

impl DbInfraError {
    pub(crate) fn migration(message: impl Into<String>) -> Self {
        Self::Migration {
            message: message.into(),
        }
    }
}

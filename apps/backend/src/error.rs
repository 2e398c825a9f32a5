use std::path::PathBuf;

use db_infra::DbInfraError;
use thiserror::Error;

/// Everything that can stop the backend from starting. Each message starts
/// with a fixed prefix naming the failure class.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("read config failed: {detail}")]
    Config { detail: String },
    #[error("unsupported database backend {kind:?}: expected \"sqlite\" or \"mysql\"")]
    UnsupportedBackend { kind: String },
    #[error("create database directory failed: {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("init database failed: {detail}")]
    Connection { detail: String },
    #[error("migrate database failed: {detail}")]
    Migration { detail: String },
    #[error("generate signing secret failed: {detail}")]
    Randomness { detail: String },
}

impl AppError {
    pub fn config(detail: impl Into<String>) -> Self {
        Self::Config {
            detail: detail.into(),
        }
    }

    /// Stable code for structured logs
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config { .. } => "CONFIG_ERROR",
            AppError::UnsupportedBackend { .. } => "UNSUPPORTED_BACKEND",
            AppError::Filesystem { .. } => "FILESYSTEM_ERROR",
            AppError::Connection { .. } => "DB_CONNECTION_ERROR",
            AppError::Migration { .. } => "DB_MIGRATION_ERROR",
            AppError::Randomness { .. } => "RANDOMNESS_ERROR",
        }
    }
}

impl From<DbInfraError> for AppError {
    fn from(e: DbInfraError) -> Self {
        match e {
            DbInfraError::Config { message } => AppError::Config { detail: message },
            DbInfraError::UnsupportedBackend { kind } => AppError::UnsupportedBackend { kind },
            DbInfraError::Filesystem { path, source } => AppError::Filesystem { path, source },
            DbInfraError::Connection { message } => AppError::Connection { detail: message },
            DbInfraError::Migration { message } => AppError::Migration { detail: message },
        }
    }
}

// Standard library imports
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

// External crate imports
use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_64;

// Internal crate imports
use crate::error::DbInfraError;

/// MySQL lock names are limited to 64 characters, so keys are hashed.
pub fn mysql_lock_name(key: &str) -> String {
    format!("ech0_bootstrap_{:016x}", xxh3_64(key.as_bytes()))
}

// ============================================================================
// BootstrapLock Trait and Implementations
// ============================================================================

/// Guard struct that represents a held lock.
/// For MySQL holds the single-session admin pool and the lock name.
/// For SQLite file locks, holds the OS file handle directly.
pub struct Guard {
    admin_pool: Option<DatabaseConnection>,
    lock_name: String,
    sqlite_file: Option<File>,
    sqlite_lock_path: Option<PathBuf>,
    released: bool,
}

impl Guard {
    fn mysql(admin_pool: DatabaseConnection, lock_name: String) -> Self {
        Self {
            admin_pool: Some(admin_pool),
            lock_name,
            sqlite_file: None,
            sqlite_lock_path: None,
            released: false,
        }
    }

    fn sqlite(file: File, lock_path: PathBuf) -> Self {
        Self {
            admin_pool: None,
            lock_name: lock_path.display().to_string(),
            sqlite_file: Some(file),
            sqlite_lock_path: Some(lock_path),
            released: false,
        }
    }

    pub fn lock_name(&self) -> &str {
        &self.lock_name
    }

    /// Release the lock. Unlock failures are logged, never returned: the lock
    /// also goes away when the file handle or session is dropped.
    pub async fn release(mut self) -> Result<(), DbInfraError> {
        if self.released {
            return Ok(());
        }

        if let Some(file) = self.sqlite_file.take() {
            let lock_path_display = self
                .sqlite_lock_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "unknown".to_string());

            match fs4::fs_std::FileExt::unlock(&file) {
                Ok(()) => {
                    debug!(lock_path = lock_path_display, "SQLite file lock released");
                }
                Err(e) => {
                    debug!(
                        error = %e,
                        lock_path = lock_path_display,
                        "SQLite file unlock returned error (may be benign)"
                    );
                }
            }
            self.released = true;
            return Ok(());
        }

        let Some(admin_pool) = &self.admin_pool else {
            self.released = true;
            return Ok(());
        };

        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::MySql,
            "SELECT RELEASE_LOCK(?) AS released",
            vec![self.lock_name.clone().into()],
        );

        match admin_pool.query_one(stmt).await {
            Ok(Some(row)) => {
                let released: Option<i64> =
                    row.try_get("", "released")
                        .map_err(|e| DbInfraError::Migration {
                            message: format!("failed to read unlock result: {e}"),
                        })?;

                if released != Some(1) {
                    warn!(
                        code = "MYSQL_RELEASE_LOCK_NOT_HELD",
                        lock_name = %self.lock_name,
                        "Named lock release did not report success"
                    );
                }
            }
            Ok(None) => {
                warn!(lock_name = %self.lock_name, "No result from RELEASE_LOCK");
            }
            Err(e) => {
                warn!(
                    error = %e,
                    lock_name = %self.lock_name,
                    "Failed to release named lock"
                );
            }
        }

        self.released = true;
        Ok(())
    }
}

/// Trait for bootstrap/migration lock acquisition and release.
/// Abstracts over MySQL named locks and SQLite file locks.
#[async_trait]
pub trait BootstrapLock {
    /// Try to acquire the lock (non-blocking).
    /// Returns Some(Guard) if acquired, None if already held by another process.
    async fn try_acquire(&mut self) -> Result<Option<Guard>, DbInfraError>;
}

/// MySQL `GET_LOCK` named lock.
///
/// INVARIANT: the admin pool must be configured with **min=max=1** so the
/// release runs on the same session that took the lock.
pub struct MySqlNamedLock {
    admin_pool: DatabaseConnection,
    lock_name: String,
}

impl MySqlNamedLock {
    pub fn new(admin_pool: DatabaseConnection, key: &str) -> Self {
        Self {
            admin_pool,
            lock_name: mysql_lock_name(key),
        }
    }
}

#[async_trait]
impl BootstrapLock for MySqlNamedLock {
    async fn try_acquire(&mut self) -> Result<Option<Guard>, DbInfraError> {
        // timeout 0: return immediately, the caller owns the backoff loop
        let lock_stmt = Statement::from_sql_and_values(
            DatabaseBackend::MySql,
            "SELECT GET_LOCK(?, 0) AS locked",
            vec![self.lock_name.clone().into()],
        );

        let row = self
            .admin_pool
            .query_one(lock_stmt)
            .await
            .map_err(|e| DbInfraError::Migration {
                message: format!("failed to acquire named lock: {e}"),
            })?
            .ok_or_else(|| DbInfraError::Migration {
                message: "GET_LOCK returned no row".to_string(),
            })?;

        let locked: Option<i64> = row.try_get("", "locked").map_err(|e| DbInfraError::Migration {
            message: format!("failed to read lock result: {e}"),
        })?;

        match locked {
            Some(1) => Ok(Some(Guard::mysql(
                self.admin_pool.clone(),
                self.lock_name.clone(),
            ))),
            Some(_) => Ok(None),
            None => Err(DbInfraError::Migration {
                message: format!("GET_LOCK({}) returned NULL", self.lock_name),
            }),
        }
    }
}

/// SQLite file lock implementation using OS-level exclusive file locks.
/// Uses an exclusive lock on `<db>.migrate.lock` for mutual exclusion across processes.
/// Non-blocking `try_lock_exclusive()` integrates with the backoff/timeout loop.
pub struct SqliteFileLock {
    lock_path: PathBuf,
}

impl SqliteFileLock {
    /// Takes the lock file path; all processes must resolve the same on-disk file.
    pub fn new(lock_path: &Path) -> Self {
        Self {
            lock_path: lock_path.to_path_buf(),
        }
    }
}

#[async_trait]
impl BootstrapLock for SqliteFileLock {
    async fn try_acquire(&mut self) -> Result<Option<Guard>, DbInfraError> {
        use fs4::fs_std::FileExt;

        if let Some(parent) = self.lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| DbInfraError::Filesystem {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        // Lock files are ephemeral - truncate on create to ensure clean state
        let file = OpenOptions::new()
            .create(true)
            .truncate(true)
            .read(true)
            .write(true)
            .open(&self.lock_path)
            .map_err(|e| DbInfraError::Migration {
                message: format!("failed to open lock file: {e}"),
            })?;

        // Ok(true) = acquired, Ok(false) = would block, Err = I/O error
        match file.try_lock_exclusive() {
            Ok(true) => {
                debug!(
                    lock_path = %self.lock_path.display(),
                    "SQLite file lock acquired"
                );
                Ok(Some(Guard::sqlite(file, self.lock_path.clone())))
            }
            Ok(false) => {
                debug!(
                    lock_path = %self.lock_path.display(),
                    "SQLite file lock contended (would block)"
                );
                Ok(None)
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(DbInfraError::Migration {
                message: format!("failed to acquire SQLite file lock: {e}"),
            }),
        }
    }
}

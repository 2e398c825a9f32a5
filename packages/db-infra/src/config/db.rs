use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use sea_orm::{ConnectOptions, DatabaseBackend};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DbInfraError;

/// The `database` section of the application configuration.
///
/// `type` selects the backend. For SQLite `path` is the database file; for
/// MySQL it is the full connection URL and is passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
}

/// Closed set of supported storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    /// Embedded single-file database
    Sqlite,
    /// Networked MySQL server
    MySql,
}

impl DbKind {
    pub fn parse(raw: &str) -> Result<Self, DbInfraError> {
        match raw {
            "sqlite" => Ok(DbKind::Sqlite),
            "mysql" => Ok(DbKind::MySql),
            other => Err(DbInfraError::UnsupportedBackend {
                kind: other.to_string(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DbKind::Sqlite => "sqlite",
            DbKind::MySql => "mysql",
        }
    }
}

impl FromStr for DbKind {
    type Err = DbInfraError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DbKind::parse(s)
    }
}

impl fmt::Display for DbKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DbKind> for DatabaseBackend {
    fn from(kind: DbKind) -> Self {
        match kind {
            DbKind::Sqlite => DatabaseBackend::Sqlite,
            DbKind::MySql => DatabaseBackend::MySql,
        }
    }
}

/// Pool purpose enum for different connection use cases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolPurpose {
    /// Shared pool handed to the rest of the application
    Runtime,
    /// Single-session pool that holds the MySQL bootstrap lock
    Admin,
}

/// Resolved, validated view of [`DatabaseSettings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSpec {
    kind: DbKind,
    path: String,
    url: String,
}

impl StorageSpec {
    pub fn resolve(settings: &DatabaseSettings) -> Result<Self, DbInfraError> {
        let kind = DbKind::parse(&settings.kind)?;
        if settings.path.trim().is_empty() {
            return Err(DbInfraError::Config {
                message: format!("database.path must not be empty for {kind}"),
            });
        }

        let url = match kind {
            DbKind::Sqlite => sqlite_url(&settings.path),
            DbKind::MySql => settings.path.clone(),
        };

        Ok(Self {
            kind,
            path: settings.path.clone(),
            url,
        })
    }

    pub fn kind(&self) -> DbKind {
        self.kind
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Directory that must exist before the SQLite file can be opened.
    /// `None` for MySQL and for bare file names.
    pub fn storage_dir(&self) -> Option<&Path> {
        match self.kind {
            DbKind::Sqlite => Path::new(&self.path)
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty()),
            DbKind::MySql => None,
        }
    }

    /// Lock file next to the SQLite database (`<db>.migrate.lock`).
    pub fn sqlite_lock_path(&self) -> Option<PathBuf> {
        match self.kind {
            DbKind::Sqlite => Some(Path::new(&self.path).with_extension("migrate.lock")),
            DbKind::MySql => None,
        }
    }

    pub fn connect_options(&self, purpose: PoolPurpose) -> ConnectOptions {
        let mut opt = ConnectOptions::new(self.url.clone());
        match (self.kind, purpose) {
            (_, PoolPurpose::Admin) => {
                opt.min_connections(1).max_connections(1);
            }
            (DbKind::Sqlite, PoolPurpose::Runtime) => {
                opt.min_connections(1).max_connections(4);
            }
            (DbKind::MySql, PoolPurpose::Runtime) => {
                opt.min_connections(1).max_connections(16);
            }
        }
        opt.acquire_timeout(Duration::from_secs(5)).sqlx_logging(true);
        opt
    }
}

/// Characters sqlx would read as URL syntax inside the filename.
const SQLITE_PATH: &AsciiSet = &CONTROLS.add(b'%').add(b'?').add(b'#');

/// SQLite URL that creates the file on first open.
pub fn sqlite_url(path: &str) -> String {
    let path = utf8_percent_encode(path, SQLITE_PATH);
    format!("sqlite://{path}?mode=rwc")
}

/// Make sure the SQLite file's directory exists, creating intermediate
/// directories with mode 0755. Returns the directory when one was needed.
pub fn prepare_storage_dir(spec: &StorageSpec) -> Result<Option<PathBuf>, DbInfraError> {
    let Some(dir) = spec.storage_dir() else {
        return Ok(None);
    };

    create_dir_all(dir).map_err(|source| DbInfraError::Filesystem {
        path: dir.to_path_buf(),
        source,
    })?;
    debug!(dir = %dir.display(), "storage directory ready");

    Ok(Some(dir.to_path_buf()))
}

#[cfg(unix)]
fn create_dir_all(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(dir)
}

#[cfg(not(unix))]
fn create_dir_all(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

/// Statements applied once to a SQLite file before migrating.
/// Both settings persist in the database file.
pub fn sqlite_file_prerequisites() -> Vec<&'static str> {
    vec!["PRAGMA journal_mode = WAL;", "PRAGMA synchronous = NORMAL;"]
}

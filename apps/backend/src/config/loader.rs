use std::env;
use std::fmt;
use std::path::PathBuf;

use config::{Config, File, FileFormat};
use tracing::info;

use crate::config::app::AppConfig;
use crate::error::AppError;

/// Config file read when not running on Kubernetes, relative to the working directory.
pub const CONFIG_FILE_PATH: &str = "config/config.yaml";
/// Deployment flag; the value [`KUBERNETES`] switches to inline content.
pub const RUN_ON_ENV: &str = "RUN_ON";
pub const KUBERNETES: &str = "kubernetes";
/// Holds the whole YAML document in inline mode.
pub const CONFIG_CONTENT_ENV: &str = "CONFIG_FILE_CONTENT";

/// Where the configuration document comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Inline(String),
}

impl ConfigSource {
    pub fn from_env() -> Result<Self, AppError> {
        Self::select(
            env::var(RUN_ON_ENV).ok().as_deref(),
            env::var(CONFIG_CONTENT_ENV).ok(),
        )
    }

    pub fn select(run_on: Option<&str>, inline: Option<String>) -> Result<Self, AppError> {
        if run_on != Some(KUBERNETES) {
            return Ok(ConfigSource::File(PathBuf::from(CONFIG_FILE_PATH)));
        }

        match inline {
            Some(content) if !content.is_empty() => Ok(ConfigSource::Inline(content)),
            _ => Err(AppError::config(format!("{CONFIG_CONTENT_ENV} is empty"))),
        }
    }
}

// Inline content usually carries credentials, so only its size is printed.
impl fmt::Debug for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "File({})", path.display()),
            ConfigSource::Inline(content) => write!(f, "Inline({} bytes)", content.len()),
        }
    }
}

/// Parse and decode one YAML document into the configuration tree.
pub fn load_from_source(source: &ConfigSource) -> Result<AppConfig, AppError> {
    let builder = match source {
        ConfigSource::File(path) => Config::builder()
            .add_source(File::from(path.as_path()).format(FileFormat::Yaml).required(true)),
        ConfigSource::Inline(content) => {
            Config::builder().add_source(File::from_str(content, FileFormat::Yaml))
        }
    };

    let settings = builder
        .build()
        .map_err(|e| AppError::config(e.to_string()))?;

    settings
        .try_deserialize::<AppConfig>()
        .map_err(|e| AppError::config(e.to_string()))
}

/// Resolve the source from the environment and load it. Runs once at startup.
pub fn load_configuration() -> Result<AppConfig, AppError> {
    let source = ConfigSource::from_env()?;
    let cfg = load_from_source(&source)?;

    info!(
        source = ?source,
        db_kind = %cfg.database.kind,
        mode = %cfg.server.mode,
        "configuration loaded"
    );
    Ok(cfg)
}

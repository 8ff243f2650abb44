//! On-disk application configuration (`config.toml`).

use std::path::{Path, PathBuf};

use common::index::{DEFAULT_CODE_LENGTH, DEFAULT_MAX_WRITE_ATTEMPTS};
use common::shelf::DEFAULT_MAX_UPLOAD_BYTES;
use object_store::ObjectStoreConfig;
use serde::{Deserialize, Serialize};
use url::Url;

pub const APP_NAME: &str = "apkshelf";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const CONFIG_ENV_VAR: &str = "APKSHELF_CONFIG";
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub listen_addr: String,
    /// Base URL files are served from. Defaults to this daemon's `/blobs`.
    pub public_base_url: Option<Url>,
    pub blob_store: ObjectStoreConfig,
    pub upload: UploadSection,
    pub metadata: MetadataSection,
    pub log: LogSection,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            public_base_url: None,
            blob_store: ObjectStoreConfig::default(),
            upload: UploadSection::default(),
            metadata: MetadataSection::default(),
            log: LogSection::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    pub max_bytes: u64,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataSection {
    pub code_length: usize,
    pub max_write_attempts: u32,
    pub prune_download_counts: bool,
}

impl Default for MetadataSection {
    fn default() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
            prune_download_counts: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSection {
    pub level: String,
    /// Write daily-rotated log files here in addition to stderr.
    pub dir: Option<PathBuf>,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

/// Loaded configuration and where it came from.
#[derive(Debug, Clone)]
pub struct AppState {
    /// `None` when no file was found and defaults are in use.
    pub config_path: Option<PathBuf>,
    pub config: AppConfig,
}

impl AppState {
    /// Load the configuration.
    ///
    /// An explicit path (flag or `APKSHELF_CONFIG`) must exist. Otherwise
    /// `<config dir>/apkshelf/config.toml` is used if present, and defaults
    /// if not.
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, StateError> {
        let explicit = explicit.or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

        if let Some(path) = explicit {
            if !path.exists() {
                return Err(StateError::ConfigNotFound(path));
            }
            return Self::load_from(&path);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                tracing::debug!("no config file found, using defaults");
                Ok(Self {
                    config_path: None,
                    config: AppConfig::default(),
                })
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, StateError> {
        let raw = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&raw)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(Self {
            config_path: Some(path.to_path_buf()),
            config,
        })
    }
}

/// `<platform config dir>/apkshelf/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE_NAME))
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

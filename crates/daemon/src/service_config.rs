use std::net::SocketAddr;
use std::path::PathBuf;

use common::index::IndexConfig;
use common::shelf::ShelfConfig;
use object_store::ObjectStoreConfig;
use url::Url;

use crate::state::AppConfig;

/// Resolved runtime configuration of the service.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    /// Explicit base URL. When unset it is derived from the bound address.
    pub public_base_url: Option<Url>,
    pub blob_store: ObjectStoreConfig,
    pub shelf: ShelfConfig,
    pub log_level: tracing::Level,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_app_config(app: &AppConfig) -> Result<Self, ConfigError> {
        let listen_addr: SocketAddr = app
            .listen_addr
            .parse()
            .map_err(|_| ConfigError::InvalidListenAddr(app.listen_addr.clone()))?;

        let log_level = app
            .log
            .level
            .parse()
            .map_err(|_| ConfigError::InvalidLogLevel(app.log.level.clone()))?;

        Ok(Self {
            listen_addr,
            public_base_url: app.public_base_url.clone(),
            blob_store: app.blob_store.clone(),
            shelf: ShelfConfig {
                max_upload_bytes: app.upload.max_bytes,
                prune_download_counts: app.metadata.prune_download_counts,
                index: IndexConfig {
                    code_length: app.metadata.code_length,
                    max_write_attempts: app.metadata.max_write_attempts,
                },
            },
            log_level,
            log_dir: app.log.dir.clone(),
        })
    }

    /// Base URL blobs are served from, given the address the listener
    /// actually bound (which differs from `listen_addr` for port 0).
    pub fn resolve_public_base_url(&self, bound: SocketAddr) -> Result<Url, ConfigError> {
        match &self.public_base_url {
            Some(url) => Ok(url.clone()),
            None => default_public_base_url(bound),
        }
    }
}

/// `http://<listen addr>/blobs`, with unspecified addresses shown as `localhost`.
pub fn default_public_base_url(listen_addr: SocketAddr) -> Result<Url, ConfigError> {
    let host = if listen_addr.ip().is_unspecified() {
        "localhost".to_string()
    } else {
        match listen_addr {
            SocketAddr::V4(addr) => addr.ip().to_string(),
            SocketAddr::V6(addr) => format!("[{}]", addr.ip()),
        }
    };
    let raw = format!("http://{}:{}/blobs", host, listen_addr.port());
    Url::parse(&raw).map_err(|_| ConfigError::InvalidPublicBaseUrl(raw))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid listen address: {0}")]
    InvalidListenAddr(String),
    #[error("invalid public base url: {0}")]
    InvalidPublicBaseUrl(String),
    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),
}

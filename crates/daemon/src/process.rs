//! Process lifecycle: logging setup, binding the listener, graceful shutdown.

use std::net::SocketAddr;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::http_server;
use crate::service_config::{Config, ConfigError};
use crate::service_state::{State, StateSetupError};

const LOG_FILE_PREFIX: &str = "apkshelf.log";

/// Install the global subscriber: stderr, plus a daily-rotated file when
/// `log_dir` is set. `RUST_LOG` overrides `level`.
///
/// Keep the returned guard alive for as long as file logging is needed.
pub fn init_tracing(
    level: tracing::Level,
    log_dir: Option<&std::path::Path>,
) -> Option<WorkerGuard> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::default().add_directive(LevelFilter::from_level(level).into())
        })
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter());

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("logger was already initialized, continuing: {e}");
    }
    guard
}

/// Handle on a running service.
#[derive(Debug)]
pub struct ShutdownHandle {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    server: JoinHandle<Result<(), std::io::Error>>,
}

impl ShutdownHandle {
    /// Address the server actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(self) -> Result<(), ServiceError> {
        let _ = self.shutdown_tx.send(true);
        self.wait().await
    }

    /// Wait for the server to exit.
    pub async fn wait(self) -> Result<(), ServiceError> {
        self.server.await??;
        Ok(())
    }
}

/// Bind the listener, build the state and serve in a background task.
pub async fn spawn_service(config: &Config) -> Result<ShutdownHandle, ServiceError> {
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    let local_addr = listener.local_addr()?;

    let public_base_url = config.resolve_public_base_url(local_addr)?;
    let state = State::from_config(config, public_base_url).await?;
    let app = http_server::router(state);
    tracing::info!(addr = %local_addr, "listening");

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            })
            .await
    });

    Ok(ShutdownHandle {
        local_addr,
        shutdown_tx,
        server,
    })
}

/// Run the service until ctrl-c.
pub async fn start_service(config: &Config) -> Result<(), ServiceError> {
    let handle = spawn_service(config).await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
    handle.shutdown().await
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("state setup failed: {0}")]
    State(#[from] StateSetupError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

use clap::Args;

use apkshelf_daemon::service_config::ConfigError;
use apkshelf_daemon::state::{AppState, StateError};
use apkshelf_daemon::{start_service, ServiceConfig};

#[derive(Args, Debug, Clone)]
pub struct Serve {
    /// Address to listen on (overrides `listen_addr`)
    #[arg(long, env = "APKSHELF_LISTEN_ADDR")]
    pub listen_addr: Option<String>,

    /// Base URL files are served from (overrides `public_base_url`)
    #[arg(long, env = "APKSHELF_PUBLIC_BASE_URL")]
    pub public_base_url: Option<url::Url>,

    /// Log level (overrides `log.level`; `RUST_LOG` wins over both)
    #[arg(long, env = "APKSHELF_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("config error: {0}")]
    State(#[from] StateError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("daemon failed: {0}")]
    Service(#[from] apkshelf_daemon::process::ServiceError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Serve {
    type Error = ServeError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;

        let mut app = state.config;
        if let Some(addr) = &self.listen_addr {
            app.listen_addr = addr.clone();
        }
        if let Some(url) = &self.public_base_url {
            app.public_base_url = Some(url.clone());
        }
        if let Some(level) = &self.log_level {
            app.log.level = level.clone();
        }

        let config = ServiceConfig::from_app_config(&app)?;
        let _guard =
            apkshelf_daemon::process::init_tracing(config.log_level, config.log_dir.as_deref());

        match &state.config_path {
            Some(path) => tracing::info!(path = %path.display(), "using config file"),
            None => tracing::info!("no config file, using defaults"),
        }

        start_service(&config).await?;
        Ok("daemon stopped".to_string())
    }
}

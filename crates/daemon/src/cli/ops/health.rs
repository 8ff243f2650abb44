use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use apkshelf_daemon::state::AppState;

/// Check the local config and the daemon's health probes
#[derive(Args, Debug, Clone)]
pub struct Health;

#[derive(Debug)]
pub struct ConfigInfo {
    pub path: Option<PathBuf>,
    pub listen_addr: String,
    pub blob_store: String,
}

#[derive(Debug)]
pub enum EndpointStatus {
    Ok,
    Unhealthy(String),
    NotReachable,
}

#[derive(Debug)]
pub struct DaemonInfo {
    pub url: String,
    pub livez: EndpointStatus,
    pub readyz: EndpointStatus,
}

#[derive(Debug)]
pub struct HealthOutput {
    pub config: Result<ConfigInfo, String>,
    pub daemon: DaemonInfo,
}

impl fmt::Display for HealthOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", "Config".bold())?;
        match &self.config {
            Ok(info) => {
                let path = info
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(defaults)".to_string());
                writeln!(f, "  {} {}", "file:".dimmed(), path)?;
                writeln!(f, "  {} {}", "listen_addr:".dimmed(), info.listen_addr)?;
                writeln!(f, "  {} {}", "blob_store:".dimmed(), info.blob_store)?;
            }
            Err(err) => writeln!(f, "  {} {}", "error:".red(), err)?,
        }

        writeln!(f)?;
        writeln!(f, "{} ({}):", "Daemon".bold(), self.daemon.url)?;

        let status_str = |s: &EndpointStatus| -> String {
            match s {
                EndpointStatus::Ok => "OK".green().to_string(),
                EndpointStatus::Unhealthy(code) => format!("{} ({})", "UNHEALTHY".red(), code),
                EndpointStatus::NotReachable => "NOT REACHABLE".red().to_string(),
            }
        };

        writeln!(f, "  {} {}", "livez:".dimmed(), status_str(&self.daemon.livez))?;
        write!(f, "  {} {}", "readyz:".dimmed(), status_str(&self.daemon.readyz))
    }
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    type Error = std::convert::Infallible;
    type Output = HealthOutput;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppState::load(ctx.config_path.clone())
            .map(|state| ConfigInfo {
                path: state.config_path,
                listen_addr: state.config.listen_addr,
                blob_store: state.config.blob_store.kind().to_string(),
            })
            .map_err(|e| e.to_string());

        let base = ctx.client.base_url();
        let client = ctx.client.http_client();

        let probe = |path: &'static str| async move {
            let url = match base.join(path) {
                Ok(url) => url,
                Err(_) => return EndpointStatus::NotReachable,
            };
            match client.get(url).send().await {
                Ok(resp) if resp.status().is_success() => EndpointStatus::Ok,
                Ok(resp) => EndpointStatus::Unhealthy(resp.status().to_string()),
                Err(_) => EndpointStatus::NotReachable,
            }
        };
        let (livez, readyz) = futures::join!(probe("/_status/livez"), probe("/_status/readyz"));

        Ok(HealthOutput {
            config,
            daemon: DaemonInfo {
                url: base.to_string(),
                livez,
                readyz,
            },
        })
    }
}

use std::fmt;
use std::path::PathBuf;

use clap::Args;
use owo_colors::OwoColorize;

use apkshelf_daemon::http_server::api::client::ApiError;
use apkshelf_daemon::http_server::api::upload::{UploadRequest, UploadResponse};

use crate::cli::op::{Op, OpContext};

#[derive(Args, Debug, Clone)]
pub struct Upload {
    /// APK file to upload
    pub path: PathBuf,
}

#[derive(Debug)]
pub struct UploadOutput {
    pub file: UploadResponse,
    pub short_link: Option<String>,
}

impl fmt::Display for UploadOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {}", "Uploaded".green().bold(), self.file.filename)?;
        writeln!(f, "  {} {}", "url:".dimmed(), self.file.url)?;
        writeln!(f, "  {} {} bytes", "size:".dimmed(), self.file.size)?;
        match &self.short_link {
            Some(link) => write!(f, "  {} {}", "short link:".dimmed(), link.cyan()),
            None => write!(f, "  {} {}", "short link:".dimmed(), "none".yellow()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("failed to read {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("not a file name: {0}")]
    FileName(PathBuf),
    #[error("upload failed: {}", .0.message())]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl Op for Upload {
    type Error = UploadError;
    type Output = UploadOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let filename = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploadError::FileName(self.path.clone()))?
            .to_string();
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|e| UploadError::Read(self.path.clone(), e))?;

        let mut client = ctx.client.clone();
        let file = client.call(UploadRequest { filename, data }).await?;

        let short_link = file.short_code.as_ref().and_then(|code| {
            client
                .base_url()
                .join(&format!("/d/{code}"))
                .ok()
                .map(|url| url.to_string())
        });

        Ok(UploadOutput { file, short_link })
    }
}

use clap::Args;
use owo_colors::OwoColorize;

use apkshelf_daemon::http_server::api::client::ApiError;
use apkshelf_daemon::http_server::api::DeleteRequest;

use crate::cli::op::{Op, OpContext};

#[derive(Args, Debug, Clone)]
pub struct Rm {
    /// Public URL of the file (as shown by `apkshelf ls`)
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RmError {
    #[error("delete failed: {}", .0.message())]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl Op for Rm {
    type Error = RmError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        client
            .call(DeleteRequest {
                url: Some(self.url.clone()),
            })
            .await?;
        Ok(format!("{} {}", "Deleted".green().bold(), self.url))
    }
}

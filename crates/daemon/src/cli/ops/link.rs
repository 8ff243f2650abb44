use clap::Args;

use apkshelf_daemon::http_server::api::client::ApiError;
use apkshelf_daemon::http_server::api::ShortLinkRequest;

use crate::cli::op::{Op, OpContext};

/// Create an extra short link for an existing file
#[derive(Args, Debug, Clone)]
pub struct Link {
    /// Public URL of the file
    pub url: String,
    /// Name shown for the link
    pub filename: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("failed to create link: {}", .0.message())]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl Op for Link {
    type Error = LinkError;
    type Output = String;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response = client
            .call(ShortLinkRequest {
                url: Some(self.url.clone()),
                filename: Some(self.filename.clone()),
            })
            .await?;

        let link = client
            .base_url()
            .join(&format!("/d/{}", response.short_code))
            .map(|u| u.to_string())
            .unwrap_or(response.short_code);
        Ok(link)
    }
}

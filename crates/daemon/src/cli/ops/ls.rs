use std::fmt;

use clap::Args;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Table};

use apkshelf_daemon::http_server::api::client::ApiError;
use apkshelf_daemon::http_server::api::{ListRequest, ListResponse};

use crate::cli::op::{Op, OpContext};

#[derive(Args, Debug, Clone)]
pub struct Ls {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug)]
pub enum LsOutput {
    Json(String),
    Table(ListResponse),
}

impl fmt::Display for LsOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let response = match self {
            LsOutput::Json(json) => return write!(f, "{json}"),
            LsOutput::Table(response) => response,
        };

        if response.files.is_empty() {
            return write!(f, "No files uploaded");
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_header(vec!["FILE", "CODE", "SIZE", "UPLOADED", "URL"]);
        for file in &response.files {
            table.add_row(vec![
                file.filename.clone(),
                file.short_code.clone().unwrap_or_else(|| "-".to_string()),
                human_size(file.size),
                file.uploaded_at.format("%Y-%m-%d %H:%M").to_string(),
                file.url.clone(),
            ]);
        }
        write!(f, "{table}")
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl Op for Ls {
    type Error = LsError;
    type Output = LsOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response = client.call(ListRequest {}).await?;

        if self.json {
            return Ok(LsOutput::Json(serde_json::to_string_pretty(&response)?));
        }
        Ok(LsOutput::Table(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(10 * 1024), "10.0 KiB");
        assert_eq!(human_size(20 * 1024 * 1024), "20.0 MiB");
    }
}

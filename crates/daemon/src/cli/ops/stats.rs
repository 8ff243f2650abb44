use std::fmt;

use clap::Args;
use comfy_table::{presets::UTF8_FULL_CONDENSED, CellAlignment, Table};

use apkshelf_daemon::http_server::api::client::ApiError;
use apkshelf_daemon::http_server::api::{DownloadStatsRequest, DownloadStatsResponse};

use crate::cli::op::{Op, OpContext};

#[derive(Args, Debug, Clone)]
pub struct Stats;

#[derive(Debug)]
pub struct StatsOutput(pub DownloadStatsResponse);

impl fmt::Display for StatsOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.stats.is_empty() {
            return write!(f, "No downloads recorded");
        }

        let mut rows: Vec<_> = self.0.stats.iter().collect();
        rows.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL_CONDENSED)
            .set_header(vec!["DOWNLOADS", "URL"]);
        for (url, count) in rows {
            table.add_row(vec![count.to_string(), url.clone()]);
        }
        if let Some(column) = table.column_mut(0) {
            column.set_cell_alignment(CellAlignment::Right);
        }
        write!(f, "{table}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl Op for Stats {
    type Error = StatsError;
    type Output = StatsOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        Ok(StatsOutput(client.call(DownloadStatsRequest {}).await?))
    }
}

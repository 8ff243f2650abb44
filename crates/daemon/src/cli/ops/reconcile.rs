use std::fmt;

use clap::Args;
use owo_colors::OwoColorize;

use apkshelf_daemon::http_server::api::client::ApiError;
use apkshelf_daemon::http_server::api::ReconcileRequest;
use common::shelf::{ReconcileOptions, ReconcileReport};

use crate::cli::op::{Op, OpContext};

/// Compare stored files with the metadata index and repair drift
#[derive(Args, Debug, Clone)]
pub struct Reconcile {
    /// Only report, change nothing
    #[arg(long)]
    pub dry_run: bool,
    /// Create short links for files that have none
    #[arg(long)]
    pub relink: bool,
    /// Remove download counters of deleted files
    #[arg(long)]
    pub prune_download_counts: bool,
}

#[derive(Debug)]
pub struct ReconcileOutput(pub ReconcileReport);

impl fmt::Display for ReconcileOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = &self.0;
        let title = if report.dry_run {
            "Reconcile (dry run)"
        } else {
            "Reconcile"
        };
        writeln!(f, "{}:", title.bold())?;

        writeln!(f, "  {} {}", "orphaned links:".dimmed(), report.orphaned_links.len())?;
        for link in &report.orphaned_links {
            writeln!(f, "    {} -> {}", link.code.yellow(), link.url)?;
        }
        writeln!(f, "  {} {}", "unlinked files:".dimmed(), report.unlinked_files.len())?;
        for url in &report.unlinked_files {
            writeln!(f, "    {url}")?;
        }
        writeln!(f, "  {} {}", "stale counters:".dimmed(), report.stale_counts.len())?;
        for url in &report.stale_counts {
            writeln!(f, "    {url}")?;
        }

        if report.dry_run {
            return Ok(());
        }
        writeln!(f, "  {} {}", "removed links:".dimmed(), report.removed_links.green())?;
        writeln!(f, "  {} {}", "created links:".dimmed(), report.created_links.len().green())?;
        for link in &report.created_links {
            writeln!(f, "    {} -> {}", link.code.cyan(), link.url)?;
        }
        write!(f, "  {} {}", "pruned counters:".dimmed(), report.pruned_counts.green())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("reconcile failed: {}", .0.message())]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl Op for Reconcile {
    type Error = ReconcileError;
    type Output = ReconcileOutput;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let report = client
            .call(ReconcileRequest(ReconcileOptions {
                dry_run: self.dry_run,
                relink: self.relink,
                prune_download_counts: self.prune_download_counts,
            }))
            .await?;
        Ok(ReconcileOutput(report))
    }
}

pub mod op;
pub mod ops;

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use ops::Command;

#[derive(Parser, Debug)]
#[command(name = "apkshelf", version, about = "Host APKs behind short download links")]
pub struct Args {
    /// Daemon to talk to
    #[arg(long, global = true, env = "APKSHELF_REMOTE", default_value = "http://localhost:3000")]
    pub remote: Url,

    /// Path to config.toml
    #[arg(long, global = true, env = "APKSHELF_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

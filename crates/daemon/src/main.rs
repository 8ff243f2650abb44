use clap::Parser;

mod cli;

use cli::op::{Op, OpContext};
use cli::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let ctx = OpContext::new(&args.remote, args.config.clone())?;

    let output = args.command.execute(&ctx).await?.to_string();
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

//! `shard-ring` entry point.

use clap::Parser;
use cli::CliConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    config.run().await
}

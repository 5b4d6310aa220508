mod config;

use clap::Parser;
use config::Config;
use graph_shard::Cluster;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = Config::parse();
    let shard_count = config.shard_count()?;
    tracing::info!(shard_count, "starting shard cluster");

    let cluster = Cluster::spawn(shard_count);

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, draining shard actors");

    cluster.shutdown();
    Ok(())
}

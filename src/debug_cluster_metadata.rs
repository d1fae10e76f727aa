use anyhow::{Context, Result};
use clap::Parser;

use kafka_snapshot::config::{init_tracing, ConnectionArgs};
use kafka_snapshot::kafka::RdKafkaClient;
use kafka_snapshot::snapshot::build_snapshot;

/// Prints the cluster snapshot without writing any files
#[derive(Parser)]
#[command(name = "cluster", version)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.connection.log_level);

    let settings = cli.connection.settings()?;
    let client = RdKafkaClient::new(settings.clone()).context("Failed to create Kafka client")?;

    let snapshot = build_snapshot(&client, &settings.brokers).await?;
    println!("{:#?}", snapshot);

    Ok(())
}

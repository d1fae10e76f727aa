use anyhow::{Context, Result};
use clap::Parser;
use std::time::Instant;

use kafka_snapshot::config::{init_tracing, ConnectionArgs};
use kafka_snapshot::kafka::consumer_offsets::snapshot_offsets;
use kafka_snapshot::kafka::RdKafkaClient;
use kafka_snapshot::snapshot::collect_consumer_groups;

/// Prints the committed offsets of every active consumer group
#[derive(Parser)]
#[command(name = "offsets", version)]
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

    let time_start = Instant::now();

    let groups = collect_consumer_groups(&client).await?;
    let backup = snapshot_offsets(&client, &groups, &settings.bootstrap_servers()).await;

    let processing_duration = time_start.elapsed();

    println!("Done reading offsets!");
    println!("Time to process: {:?}", processing_duration);
    println!("Offsets: {:#?}", backup);

    Ok(())
}

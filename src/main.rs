use anyhow::{Context, Result};
use clap::{Args, Parser};
use std::path::PathBuf;
use tracing::{error, info, warn};

use kafka_snapshot::config::{init_tracing, parse_list, ConnectionArgs};
use kafka_snapshot::kafka::consumer_offsets::{load_offsets, save_offsets, snapshot_offsets};
use kafka_snapshot::kafka::RdKafkaClient;
use kafka_snapshot::report::{dot, html, json, recreate, restore, table};
use kafka_snapshot::sizes::{collect_topic_sizes, SizeMethod, SizeRequest};
use kafka_snapshot::snapshot::{build_snapshot, ClusterSnapshot};

/// Captures a point-in-time snapshot of a Kafka cluster
#[derive(Parser)]
#[command(name = "kafka-snapshot")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(flatten)]
    outputs: OutputArgs,

    #[command(flatten)]
    sizes: SizeArgs,
}

#[derive(Args)]
struct OutputArgs {
    /// Cluster snapshot JSON file
    #[arg(long, default_value = "kafka-cluster-info.json")]
    output: PathBuf,

    /// HTML report file
    #[arg(long, default_value = "kafka-cluster-report.html")]
    html: PathBuf,

    /// Graphviz DOT file of topic to consumer group edges
    #[arg(long)]
    dot: Option<PathBuf>,

    /// Script that recreates the topics on another cluster
    #[arg(long)]
    recreate_script: Option<PathBuf>,

    /// Save committed consumer group offsets as JSON
    #[arg(long)]
    save_offsets: Option<PathBuf>,

    /// Script that restores the captured consumer group offsets
    #[arg(long)]
    restore_offsets_script: Option<PathBuf>,

    /// Build the restore script from a saved offsets file instead of the live cluster
    #[arg(long, requires = "restore_offsets_script")]
    restore_from: Option<PathBuf>,
}

#[derive(Args)]
struct SizeArgs {
    /// Save topic sizes as JSON
    #[arg(long)]
    topic_sizes: Option<PathBuf>,

    /// Print topic sizes as a table
    #[arg(long)]
    topic_sizes_table: bool,

    /// How topic sizes are collected
    #[arg(long, value_enum, default_value_t = SizeMethod::Auto)]
    topic_sizes_method: SizeMethod,

    /// Comma-separated topics to size (default: all)
    #[arg(long)]
    topic_list: Option<String>,

    /// Directory containing kafka-log-dirs
    #[arg(long, env = "KAFKA_BIN_DIR")]
    kafka_bin_dir: Option<PathBuf>,
}

impl SizeArgs {
    fn requested(&self) -> bool {
        self.topic_sizes.is_some() || self.topic_sizes_table
    }

    fn request(&self) -> SizeRequest {
        SizeRequest {
            method: self.topic_sizes_method,
            topic_filter: self.topic_list.as_deref().map(parse_list).unwrap_or_default(),
            kafka_bin_dir: self.kafka_bin_dir.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.connection.log_level);

    let settings = cli
        .connection
        .settings()
        .context("Invalid connection settings")?;

    info!("Connecting to Kafka cluster at {}", settings.bootstrap_servers());
    let client =
        RdKafkaClient::new(settings.clone()).context("Failed to create Kafka client")?;

    let snapshot = build_snapshot(&client, &settings.brokers)
        .await
        .context("Failed to collect cluster information")?;

    write_reports(&snapshot, &cli.outputs)?;

    if cli.sizes.requested() {
        info!("Collecting topic sizes...");
        match collect_topic_sizes(&client, &settings, &cli.sizes.request()).await {
            Ok(report) => {
                if cli.sizes.topic_sizes_table {
                    table::print_topic_sizes_table(&report);
                }
                if let Some(path) = &cli.sizes.topic_sizes {
                    json::save_topic_sizes(&report, path)
                        .context("Failed to write topic sizes report")?;
                    info!("Topic sizes saved to {}", path.display());
                }
            }
            Err(e) => error!("Failed to get topic sizes: {}", e),
        }
    }

    write_offsets(&client, &snapshot, &cli.outputs, &settings.bootstrap_servers()).await?;

    log_summary(&snapshot);

    Ok(())
}

fn write_reports(snapshot: &ClusterSnapshot, outputs: &OutputArgs) -> Result<()> {
    json::save_snapshot(snapshot, &outputs.output).context("Failed to write snapshot")?;
    info!("Cluster information saved to {}", outputs.output.display());

    html::save_html(snapshot, &outputs.html).context("Failed to write HTML report")?;
    info!("HTML report saved to {}", outputs.html.display());

    if let Some(path) = &outputs.dot {
        dot::save_dot(snapshot, path).context("Failed to write DOT file")?;
        info!("DOT graph saved to {}", path.display());
    }

    if let Some(path) = &outputs.recreate_script {
        recreate::save_recreate_script(snapshot, path)
            .context("Failed to write topic recreation script")?;
        info!(
            "Topic recreation script saved to {} ({} internal topics skipped)",
            path.display(),
            snapshot.internal_topic_count()
        );
    }

    Ok(())
}

async fn write_offsets(
    client: &RdKafkaClient,
    snapshot: &ClusterSnapshot,
    outputs: &OutputArgs,
    cluster: &str,
) -> Result<()> {
    if outputs.save_offsets.is_none() && outputs.restore_offsets_script.is_none() {
        return Ok(());
    }

    let backup = match &outputs.restore_from {
        Some(path) => {
            info!("Loading consumer offsets from {}", path.display());
            load_offsets(path).context("Failed to load saved consumer offsets")?
        }
        None => {
            info!("Fetching consumer group offsets...");
            snapshot_offsets(client, &snapshot.consumer_groups, cluster).await
        }
    };

    if let Some(path) = &outputs.save_offsets {
        save_offsets(&backup, path).context("Failed to save consumer offsets")?;
        info!("Consumer offsets saved to {}", path.display());
    }

    if let Some(path) = &outputs.restore_offsets_script {
        restore::save_restore_script(&backup, path)
            .context("Failed to write offset restore script")?;
        info!("Offset restore script saved to {}", path.display());
    }

    Ok(())
}

fn log_summary(snapshot: &ClusterSnapshot) {
    info!("Brokers: {}", snapshot.brokers.len());
    info!("Topics: {}", snapshot.total_topics);
    info!("Partitions: {}", snapshot.total_partitions);
    info!("Messages: {}", snapshot.total_messages);
    info!("Consumer groups: {}", snapshot.total_consumer_groups);

    if snapshot.total_under_replicated_partitions > 0 {
        warn!(
            "Under-replicated partitions: {}",
            snapshot.total_under_replicated_partitions
        );
    }
}

//! Topic storage sizes, from the brokers' log directories.

use async_trait::async_trait;
use clap::ValueEnum;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::ClientSettings;
use crate::error::SizeError;
use crate::kafka::ClusterClient;

pub mod cli;
pub mod native;
pub mod partition_id;
pub mod reconcile;

pub use reconcile::{PartitionSize, SizeSource, TopicSize, TopicSizeAccumulator, TopicSizesReport};

/// Anything that can list per-replica partition sizes.
#[async_trait]
pub trait PartitionSizeSource {
    fn source(&self) -> SizeSource;

    async fn partition_sizes(&self) -> Result<Vec<PartitionSize>, SizeError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SizeMethod {
    /// Query brokers directly, falling back to kafka-log-dirs when unsupported
    #[default]
    Auto,
    /// Only query brokers directly
    Native,
    /// Only use the kafka-log-dirs command
    Cli,
}

#[derive(Debug, Clone, Default)]
pub struct SizeRequest {
    pub method: SizeMethod,
    /// Empty means every topic.
    pub topic_filter: Vec<String>,
    pub kafka_bin_dir: Option<PathBuf>,
}

pub(crate) fn is_selected(topic_filter: &[String], topic: &str) -> bool {
    topic_filter.is_empty() || topic_filter.iter().any(|selected| selected == topic)
}

pub async fn collect_from<S>(source: &S, cluster: &str) -> Result<TopicSizesReport, SizeError>
where
    S: PartitionSizeSource + Sync + ?Sized,
{
    let mut accumulator = TopicSizeAccumulator::new();
    accumulator.extend(source.partition_sizes().await?);

    let report = accumulator.into_report(cluster, source.source())?;
    info!(
        "Successfully retrieved size information for {} topics",
        report.total_topics
    );
    Ok(report)
}

/// Builds the topic size report using the requested method.
pub async fn collect_topic_sizes<C>(
    client: &C,
    settings: &ClientSettings,
    request: &SizeRequest,
) -> Result<TopicSizesReport, SizeError>
where
    C: ClusterClient + ?Sized,
{
    let cluster = settings.bootstrap_servers();
    let native = native::BrokerLogDirs::new(client, &request.topic_filter);
    let cli = cli::LogDirsCommand::new(
        settings,
        &request.topic_filter,
        request.kafka_bin_dir.as_deref(),
    );

    match request.method {
        SizeMethod::Native => collect_from(&native, &cluster).await,
        SizeMethod::Cli => collect_from(&cli, &cluster).await,
        SizeMethod::Auto => match collect_from(&native, &cluster).await {
            Err(SizeError::Unsupported) => {
                warn!("Broker log directory queries unavailable, using kafka-log-dirs");
                collect_from(&cli, &cluster).await
            }
            result => result,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kafka::testing::FakeCluster;

    struct FixedSizes(Vec<PartitionSize>);

    #[async_trait]
    impl PartitionSizeSource for FixedSizes {
        fn source(&self) -> SizeSource {
            SizeSource::Cli
        }

        async fn partition_sizes(&self) -> Result<Vec<PartitionSize>, SizeError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_is_selected() {
        assert!(is_selected(&[], "anything"));
        assert!(is_selected(&["a".to_string()], "a"));
        assert!(!is_selected(&["a".to_string()], "b"));
    }

    #[tokio::test]
    async fn test_collect_from_any_source() {
        let source = FixedSizes(vec![PartitionSize {
            topic: "t".to_string(),
            partition: 0,
            size: 2048,
        }]);

        let report = collect_from(&source, "c").await.unwrap();

        assert_eq!(report.source, SizeSource::Cli);
        assert_eq!(report.topics[0].total_size_human, "2.00 KiB");
    }

    #[tokio::test]
    async fn test_native_method_surfaces_unsupported() {
        let cluster = FakeCluster::with_brokers(2);
        let settings = ClientSettings {
            brokers: vec!["broker-1:9092".to_string()],
            security: Default::default(),
            timeout: std::time::Duration::from_secs(1),
            metadata_timeout: std::time::Duration::from_secs(1),
        };
        let request = SizeRequest {
            method: SizeMethod::Native,
            ..SizeRequest::default()
        };

        let result = collect_topic_sizes(&cluster, &settings, &request).await;

        assert!(matches!(result, Err(SizeError::Unsupported)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_auto_method_falls_back_to_kafka_log_dirs() {
        let dir = tempfile::tempdir().unwrap();
        cli::install_fake_tool(
            dir.path(),
            r#"echo 'Querying brokers for log directories information'
cat <<'JSON'
{"version":1,"brokers":[{"broker":1,"logDirs":[{"logDir":"/data/1","error":null,"partitions":[{"partition":"orders-0","size":1024},{"partition":"orders-1","size":512}]}]},{"broker":2,"logDirs":[{"logDir":"/data/2","error":null,"partitions":[{"partition":"orders-0","size":1024},{"partition":"audit-0","size":10}]}]}]}
JSON"#,
        );
        // No log-dir support, so the native query reports unsupported.
        let cluster = FakeCluster::with_brokers(2);
        let settings = ClientSettings {
            brokers: vec!["broker-1:9092".to_string()],
            security: Default::default(),
            timeout: std::time::Duration::from_secs(1),
            metadata_timeout: std::time::Duration::from_secs(1),
        };
        let request = SizeRequest {
            method: SizeMethod::Auto,
            kafka_bin_dir: Some(dir.path().to_path_buf()),
            ..SizeRequest::default()
        };

        let report = collect_topic_sizes(&cluster, &settings, &request).await.unwrap();

        assert_eq!(report.source, SizeSource::Cli);
        assert_eq!(report.cluster, "broker-1:9092");
        assert_eq!(report.total_topics, 2);
        assert_eq!(report.total_size_bytes, 2570);
        assert_eq!(report.topics[0].topic, "orders");
        assert_eq!(report.topics[0].total_size_bytes, 2560);
        assert_eq!(report.topics[0].partitions, 2);
        assert_eq!(report.topics[1].topic, "audit");
        // Plaintext connections pass no properties file.
        let args = std::fs::read_to_string(dir.path().join("args")).unwrap();
        assert!(!args.contains("--command-config"));
    }
}

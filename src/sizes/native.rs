use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use super::{is_selected, PartitionSize, PartitionSizeSource, SizeSource};
use crate::error::{ClientError, SizeError};
use crate::kafka::{BrokerMetadata, ClusterClient, LogDirDescription};

/// Asks every broker in the metadata view for its log directories.
pub struct BrokerLogDirs<'a, C: ?Sized> {
    client: &'a C,
    topic_filter: &'a [String],
}

impl<'a, C> BrokerLogDirs<'a, C>
where
    C: ClusterClient + ?Sized,
{
    pub fn new(client: &'a C, topic_filter: &'a [String]) -> Self {
        Self {
            client,
            topic_filter,
        }
    }

    async fn query<'b>(
        &self,
        broker: &'b BrokerMetadata,
    ) -> (&'b BrokerMetadata, Result<Vec<LogDirDescription>, ClientError>) {
        debug!("Querying broker {} at {}...", broker.id, broker.address());
        (broker, self.client.describe_log_dirs(broker.id).await)
    }
}

#[async_trait]
impl<'a, C> PartitionSizeSource for BrokerLogDirs<'a, C>
where
    C: ClusterClient + ?Sized,
{
    fn source(&self) -> SizeSource {
        SizeSource::Native
    }

    async fn partition_sizes(&self) -> Result<Vec<PartitionSize>, SizeError> {
        info!("Querying brokers for log directory information...");
        let brokers = self
            .client
            .list_brokers()
            .await
            .map_err(SizeError::Brokers)?;
        info!("Found {} brokers", brokers.len());

        // Brokers are independent; a failure stays with its broker.
        let responses = join_all(brokers.iter().map(|broker| self.query(broker))).await;

        let mut records = Vec::new();
        let mut unsupported = 0;

        for (broker, response) in responses {
            let log_dirs = match response {
                Ok(log_dirs) => log_dirs,
                Err(ClientError::Unsupported(_)) => {
                    unsupported += 1;
                    continue;
                }
                Err(e) => {
                    warn!(
                        "Error querying log dirs from broker {} at {}: {}",
                        broker.id,
                        broker.address(),
                        e
                    );
                    continue;
                }
            };

            if log_dirs.is_empty() {
                warn!("No log directories returned from broker {}", broker.id);
                continue;
            }

            for log_dir in log_dirs {
                if let Some(error) = &log_dir.error {
                    warn!(
                        "Log directory {} on broker {} reported an error: {}",
                        log_dir.path, broker.id, error
                    );
                    continue;
                }

                records.extend(
                    log_dir
                        .partitions
                        .into_iter()
                        .filter(|partition| is_selected(self.topic_filter, &partition.topic))
                        .map(|partition| PartitionSize {
                            topic: partition.topic,
                            partition: partition.partition,
                            size: partition.size,
                        }),
                );
            }
        }

        if !brokers.is_empty() && unsupported == brokers.len() {
            return Err(SizeError::Unsupported);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kafka::testing::FakeCluster;
    use crate::sizes::collect_from;

    fn three_broker_cluster() -> FakeCluster {
        FakeCluster::with_brokers(3)
            .log_dir(1, "/data/1", &[("events", 0, 100), ("events", 1, 200), ("audit", 0, 5)])
            .log_dir(2, "/data/2", &[("events", 0, 100), ("events", 1, 200)])
            .log_dir(3, "/data/3", &[("events", 0, 100)])
    }

    #[tokio::test]
    async fn test_sizes_are_replica_inclusive() {
        let cluster = three_broker_cluster();

        let report = collect_from(&BrokerLogDirs::new(&cluster, &[]), "c")
            .await
            .unwrap();

        assert_eq!(report.source, SizeSource::Native);
        assert_eq!(report.topics[0].topic, "events");
        assert_eq!(report.topics[0].total_size_bytes, 700);
        assert_eq!(report.topics[0].partitions, 2);
        assert_eq!(report.total_size_bytes, 705);
        assert_eq!(report.total_partitions, 3);
    }

    #[tokio::test]
    async fn test_failing_broker_is_skipped() {
        let mut cluster = three_broker_cluster();
        cluster.failing_brokers.insert(1);

        let report = collect_from(&BrokerLogDirs::new(&cluster, &[]), "c")
            .await
            .unwrap();

        assert_eq!(report.total_topics, 1);
        assert_eq!(report.topics[0].total_size_bytes, 400);
    }

    #[tokio::test]
    async fn test_log_dir_errors_and_empty_brokers_are_skipped() {
        let mut cluster = three_broker_cluster();
        if let Some(log_dirs) = cluster.log_dirs.as_mut() {
            log_dirs.insert(2, Vec::new());
            log_dirs.get_mut(&3).unwrap()[0].error = Some("KafkaStorageException".to_string());
        }

        let report = collect_from(&BrokerLogDirs::new(&cluster, &[]), "c")
            .await
            .unwrap();

        assert_eq!(report.topics[0].total_size_bytes, 300);
    }

    #[tokio::test]
    async fn test_topic_filter() {
        let cluster = three_broker_cluster();
        let filter = vec!["audit".to_string()];

        let report = collect_from(&BrokerLogDirs::new(&cluster, &filter), "c")
            .await
            .unwrap();

        assert_eq!(report.total_topics, 1);
        assert_eq!(report.topics[0].topic, "audit");
    }

    #[tokio::test]
    async fn test_no_data_is_an_error() {
        let mut cluster = three_broker_cluster();
        cluster.failing_brokers.extend([1, 2, 3]);

        let result = collect_from(&BrokerLogDirs::new(&cluster, &[]), "c").await;

        assert!(matches!(result, Err(SizeError::NoData)));
    }

    #[tokio::test]
    async fn test_unsupported_everywhere() {
        let cluster = FakeCluster::with_brokers(2);

        let result = BrokerLogDirs::new(&cluster, &[]).partition_sizes().await;

        assert!(matches!(result, Err(SizeError::Unsupported)));
    }
}

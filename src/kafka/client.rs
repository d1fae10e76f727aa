use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, ResourceSpecifier};
use rdkafka::client::DefaultClientContext;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::error::KafkaError;
use rdkafka::metadata::Metadata;
use rdkafka::{Offset, TopicPartitionList};
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tracing::{debug, warn};

use super::{
    BrokerMetadata, ClusterClient, ConfigEntry, GroupDescription, GroupMember, LogDirDescription,
    PartitionMetadata, TopicMetadata,
};
use crate::config::ClientSettings;
use crate::error::ClientError;

const METADATA_RETRIES: u32 = 3;
const METADATA_RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// `ClusterClient` backed by librdkafka.
///
/// librdkafka's consumer API is blocking, so every consumer call runs on the
/// blocking pool against a shared `BaseConsumer`.
pub struct RdKafkaClient {
    consumer: Arc<BaseConsumer>,
    admin: AdminClient<DefaultClientContext>,
    settings: ClientSettings,
}

impl RdKafkaClient {
    pub fn new(settings: ClientSettings) -> Result<Self, ClientError> {
        let config = settings.client_config();

        let consumer: BaseConsumer = config.create()?;
        let admin: AdminClient<DefaultClientContext> = config.create()?;

        Ok(Self {
            consumer: Arc::new(consumer),
            admin,
            settings,
        })
    }

    async fn fetch_metadata<T, F>(&self, topic: Option<&str>, convert: F) -> Result<T, ClientError>
    where
        F: Fn(&Metadata) -> T + Clone + Send + 'static,
        T: Send + 'static,
    {
        let mut attempt = 0;
        loop {
            let consumer = Arc::clone(&self.consumer);
            let topic_name = topic.map(str::to_string);
            let timeout = self.settings.metadata_timeout;
            let convert = convert.clone();

            let result = task::spawn_blocking(move || {
                consumer
                    .fetch_metadata(topic_name.as_deref(), timeout)
                    .map(|metadata| convert(&metadata))
            })
            .await?;

            match result {
                Ok(value) => return Ok(value),
                Err(e) if attempt < METADATA_RETRIES => {
                    attempt += 1;
                    warn!(
                        "Metadata request failed (attempt {}/{}): {}",
                        attempt,
                        METADATA_RETRIES + 1,
                        e
                    );
                    tokio::time::sleep(METADATA_RETRY_BACKOFF).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn convert_topics(metadata: &Metadata) -> Vec<TopicMetadata> {
    metadata
        .topics()
        .iter()
        .filter(|topic| {
            if let Some(error) = topic.error() {
                warn!("Skipping topic {} with metadata error {:?}", topic.name(), error);
                false
            } else {
                true
            }
        })
        .map(|topic| TopicMetadata {
            name: topic.name().to_string(),
            partitions: topic
                .partitions()
                .iter()
                .map(|partition| PartitionMetadata {
                    id: partition.id(),
                    leader: partition.leader(),
                    replicas: partition.replicas().to_vec(),
                    isr: partition.isr().to_vec(),
                })
                .collect(),
        })
        .collect()
}

#[async_trait]
impl ClusterClient for RdKafkaClient {
    async fn list_brokers(&self) -> Result<Vec<BrokerMetadata>, ClientError> {
        self.fetch_metadata(None, |metadata| {
            metadata
                .brokers()
                .iter()
                .map(|broker| BrokerMetadata {
                    id: broker.id(),
                    host: broker.host().to_string(),
                    port: broker.port(),
                })
                .collect()
        })
        .await
    }

    async fn list_topics(&self) -> Result<Vec<TopicMetadata>, ClientError> {
        self.fetch_metadata(None, convert_topics).await
    }

    async fn describe_topic(&self, topic: &str) -> Result<TopicMetadata, ClientError> {
        let topics = self.fetch_metadata(Some(topic), convert_topics).await?;

        topics
            .into_iter()
            .find(|candidate| candidate.name == topic)
            .ok_or_else(|| ClientError::TopicNotFound(topic.to_string()))
    }

    async fn topic_configs(&self, topic: &str) -> Result<Vec<ConfigEntry>, ClientError> {
        let options = AdminOptions::new().request_timeout(Some(self.settings.timeout));
        let results = self
            .admin
            .describe_configs(&[ResourceSpecifier::Topic(topic)], &options)
            .await?;

        let mut entries = Vec::new();
        for result in results {
            let resource = result.map_err(|code| ClientError::Kafka(KafkaError::AdminOp(code)))?;
            entries.extend(resource.entries.into_iter().map(|entry| ConfigEntry {
                name: entry.name,
                value: entry.value,
                is_default: entry.is_default,
            }));
        }

        Ok(entries)
    }

    async fn high_watermark(&self, topic: &str, partition: i32) -> Result<i64, ClientError> {
        let consumer = Arc::clone(&self.consumer);
        let topic = topic.to_string();
        let timeout = self.settings.timeout;

        let (_low_watermark, high_watermark) =
            task::spawn_blocking(move || consumer.fetch_watermarks(&topic, partition, timeout))
                .await??;

        Ok(high_watermark)
    }

    async fn list_consumer_groups(&self) -> Result<Vec<GroupDescription>, ClientError> {
        let consumer = Arc::clone(&self.consumer);
        let timeout = self.settings.metadata_timeout;

        let groups = task::spawn_blocking(move || {
            consumer.fetch_group_list(None, timeout).map(|group_list| {
                group_list
                    .groups()
                    .iter()
                    .map(|group| GroupDescription {
                        name: group.name().to_string(),
                        state: group.state().to_string(),
                        protocol_type: group.protocol_type().to_string(),
                        members: group
                            .members()
                            .iter()
                            .map(|member| GroupMember {
                                id: member.id().to_string(),
                                assignment: member.assignment().map(<[u8]>::to_vec),
                            })
                            .collect(),
                    })
                    .collect::<Vec<_>>()
            })
        })
        .await??;

        Ok(groups)
    }

    async fn committed_offsets(
        &self,
        group: &str,
        topic: &str,
    ) -> Result<Vec<(i32, i64)>, ClientError> {
        let partitions: Vec<i32> = self
            .describe_topic(topic)
            .await?
            .partitions
            .iter()
            .map(|partition| partition.id)
            .collect();

        let mut config = self.settings.client_config();
        config
            .set("group.id", group)
            .set("enable.auto.commit", "false");
        let topic = topic.to_string();
        let timeout = self.settings.timeout;

        let offsets = task::spawn_blocking(move || -> Result<Vec<(i32, i64)>, KafkaError> {
            let consumer: BaseConsumer = config.create()?;

            let mut topic_partitions = TopicPartitionList::new();
            for partition in &partitions {
                topic_partitions.add_partition(&topic, *partition);
            }

            let committed = consumer.committed_offsets(topic_partitions, timeout)?;

            Ok(committed
                .elements()
                .iter()
                .filter_map(|element| match element.offset() {
                    Offset::Offset(offset) => Some((element.partition(), offset)),
                    _ => None,
                })
                .collect())
        })
        .await??;

        debug!("Fetched {} committed offsets for group {}", offsets.len(), group);

        Ok(offsets)
    }

    async fn describe_log_dirs(
        &self,
        _broker_id: i32,
    ) -> Result<Vec<LogDirDescription>, ClientError> {
        Err(ClientError::Unsupported("DescribeLogDirs"))
    }

    async fn broker_version(&self, _broker_id: i32) -> Option<String> {
        None
    }
}

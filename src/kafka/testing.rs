use async_trait::async_trait;
use rdkafka::error::KafkaError;
use rdkafka::types::RDKafkaErrorCode;
use std::collections::{HashMap, HashSet};

use super::{
    assignment::encode_member_assignment, BrokerMetadata, ClusterClient, ConfigEntry,
    GroupDescription, GroupMember, LogDirDescription, LogDirPartition, PartitionMetadata,
    TopicMetadata,
};
use crate::error::ClientError;

/// In-memory cluster used by unit tests.
#[derive(Debug, Default, Clone)]
pub struct FakeCluster {
    pub brokers: Vec<BrokerMetadata>,
    pub topics: Vec<TopicMetadata>,
    pub configs: HashMap<String, Vec<ConfigEntry>>,
    pub watermarks: HashMap<(String, i32), i64>,
    pub groups: Vec<GroupDescription>,
    pub offsets: HashMap<(String, String), Vec<(i32, i64)>>,
    /// `None` behaves like a client without DescribeLogDirs support.
    pub log_dirs: Option<HashMap<i32, Vec<LogDirDescription>>>,
    pub failing_topics: HashSet<String>,
    pub failing_offsets: HashSet<(String, String)>,
    pub failing_brokers: HashSet<i32>,
    pub fail_list_topics: bool,
}

impl FakeCluster {
    pub fn with_brokers(count: i32) -> Self {
        Self {
            brokers: (1..=count)
                .map(|id| BrokerMetadata {
                    id,
                    host: format!("broker-{}", id),
                    port: 9092,
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn topic(mut self, name: &str, partitions: Vec<PartitionMetadata>) -> Self {
        self.topics.push(TopicMetadata {
            name: name.to_string(),
            partitions,
        });
        self
    }

    pub fn watermark(mut self, topic: &str, partition: i32, offset: i64) -> Self {
        self.watermarks.insert((topic.to_string(), partition), offset);
        self
    }

    pub fn config(mut self, topic: &str, name: &str, value: &str, is_default: bool) -> Self {
        self.configs
            .entry(topic.to_string())
            .or_default()
            .push(ConfigEntry {
                name: name.to_string(),
                value: Some(value.to_string()),
                is_default,
            });
        self
    }

    /// Each member is a list of `(topic, partitions)` assignments.
    pub fn group(mut self, name: &str, state: &str, members: Vec<Vec<(&str, Vec<i32>)>>) -> Self {
        self.groups.push(GroupDescription {
            name: name.to_string(),
            state: state.to_string(),
            protocol_type: "consumer".to_string(),
            members: members
                .iter()
                .enumerate()
                .map(|(i, topics)| {
                    let topics: Vec<(&str, &[i32])> = topics
                        .iter()
                        .map(|(topic, partitions)| (*topic, partitions.as_slice()))
                        .collect();
                    GroupMember {
                        id: format!("{}-member-{}", name, i),
                        assignment: Some(encode_member_assignment(&topics)),
                    }
                })
                .collect(),
        });
        self
    }

    pub fn committed(mut self, group: &str, topic: &str, offsets: &[(i32, i64)]) -> Self {
        self.offsets
            .insert((group.to_string(), topic.to_string()), offsets.to_vec());
        self
    }

    pub fn log_dir(mut self, broker: i32, path: &str, partitions: &[(&str, i32, i64)]) -> Self {
        self.log_dirs
            .get_or_insert_with(HashMap::new)
            .entry(broker)
            .or_default()
            .push(LogDirDescription {
                path: path.to_string(),
                error: None,
                partitions: partitions
                    .iter()
                    .map(|(topic, partition, size)| LogDirPartition {
                        topic: topic.to_string(),
                        partition: *partition,
                        size: *size,
                    })
                    .collect(),
            });
        self
    }
}

pub fn partition(id: i32, leader: i32, replicas: &[i32], isr: &[i32]) -> PartitionMetadata {
    PartitionMetadata {
        id,
        leader,
        replicas: replicas.to_vec(),
        isr: isr.to_vec(),
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn list_brokers(&self) -> Result<Vec<BrokerMetadata>, ClientError> {
        Ok(self.brokers.clone())
    }

    async fn list_topics(&self) -> Result<Vec<TopicMetadata>, ClientError> {
        if self.fail_list_topics {
            return Err(ClientError::Unsupported("ListTopics"));
        }
        Ok(self.topics.clone())
    }

    async fn describe_topic(&self, topic: &str) -> Result<TopicMetadata, ClientError> {
        if self.failing_topics.contains(topic) {
            return Err(ClientError::TopicNotFound(topic.to_string()));
        }
        self.topics
            .iter()
            .find(|candidate| candidate.name == topic)
            .cloned()
            .ok_or_else(|| ClientError::TopicNotFound(topic.to_string()))
    }

    async fn topic_configs(&self, topic: &str) -> Result<Vec<ConfigEntry>, ClientError> {
        if self.failing_topics.contains(topic) {
            return Err(ClientError::TopicNotFound(topic.to_string()));
        }
        Ok(self.configs.get(topic).cloned().unwrap_or_default())
    }

    async fn high_watermark(&self, topic: &str, partition: i32) -> Result<i64, ClientError> {
        self.watermarks
            .get(&(topic.to_string(), partition))
            .copied()
            .ok_or_else(|| ClientError::TopicNotFound(topic.to_string()))
    }

    async fn list_consumer_groups(&self) -> Result<Vec<GroupDescription>, ClientError> {
        Ok(self.groups.clone())
    }

    async fn committed_offsets(
        &self,
        group: &str,
        topic: &str,
    ) -> Result<Vec<(i32, i64)>, ClientError> {
        let key = (group.to_string(), topic.to_string());
        if self.failing_offsets.contains(&key) {
            return Err(ClientError::TopicNotFound(topic.to_string()));
        }
        Ok(self.offsets.get(&key).cloned().unwrap_or_default())
    }

    async fn describe_log_dirs(
        &self,
        broker_id: i32,
    ) -> Result<Vec<LogDirDescription>, ClientError> {
        let log_dirs = self
            .log_dirs
            .as_ref()
            .ok_or(ClientError::Unsupported("DescribeLogDirs"))?;
        if self.failing_brokers.contains(&broker_id) {
            return Err(ClientError::Kafka(KafkaError::MetadataFetch(
                RDKafkaErrorCode::BrokerTransportFailure,
            )));
        }
        Ok(log_dirs.get(&broker_id).cloned().unwrap_or_default())
    }

    async fn broker_version(&self, _broker_id: i32) -> Option<String> {
        None
    }
}

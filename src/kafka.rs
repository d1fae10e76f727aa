use async_trait::async_trait;

use crate::error::ClientError;

pub mod assignment;
pub mod client;
pub mod consumer_offsets;
#[cfg(test)]
pub mod testing;

pub use client::RdKafkaClient;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMetadata {
    pub id: i32,
    pub host: String,
    pub port: i32,
}

impl BrokerMetadata {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMetadata {
    pub name: String,
    pub partitions: Vec<PartitionMetadata>,
}

impl TopicMetadata {
    pub fn replication_factor(&self) -> usize {
        self.partitions
            .iter()
            .map(|partition| partition.replicas.len())
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionMetadata {
    pub id: i32,
    /// Negative when no leader is elected.
    pub leader: i32,
    pub replicas: Vec<i32>,
    pub isr: Vec<i32>,
}

impl PartitionMetadata {
    pub fn is_under_replicated(&self) -> bool {
        self.isr.len() < self.replicas.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub name: String,
    pub value: Option<String>,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDescription {
    pub name: String,
    pub state: String,
    /// Embedded protocol; member assignments follow the consumer layout only for `consumer`.
    pub protocol_type: String,
    pub members: Vec<GroupMember>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub id: String,
    /// Raw consumer-protocol assignment, if the member has one.
    pub assignment: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDirDescription {
    pub path: String,
    pub error: Option<String>,
    pub partitions: Vec<LogDirPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDirPartition {
    pub topic: String,
    pub partition: i32,
    pub size: i64,
}

/// The cluster operations the snapshot needs. Every call is read-only.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn list_brokers(&self) -> Result<Vec<BrokerMetadata>, ClientError>;

    async fn list_topics(&self) -> Result<Vec<TopicMetadata>, ClientError>;

    async fn describe_topic(&self, topic: &str) -> Result<TopicMetadata, ClientError>;

    async fn topic_configs(&self, topic: &str) -> Result<Vec<ConfigEntry>, ClientError>;

    async fn high_watermark(&self, topic: &str, partition: i32) -> Result<i64, ClientError>;

    async fn list_consumer_groups(&self) -> Result<Vec<GroupDescription>, ClientError>;

    /// Committed `(partition, offset)` pairs for one group and topic, in any order.
    async fn committed_offsets(
        &self,
        group: &str,
        topic: &str,
    ) -> Result<Vec<(i32, i64)>, ClientError>;

    async fn describe_log_dirs(
        &self,
        broker_id: i32,
    ) -> Result<Vec<LogDirDescription>, ClientError>;

    async fn broker_version(&self, broker_id: i32) -> Option<String>;
}

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

use crate::error::SnapshotError;
use crate::kafka::assignment::decode_member_assignment;
use crate::kafka::{ClusterClient, ConfigEntry, GroupDescription, TopicMetadata};
use crate::topology::Topology;

/// Protocol type of groups whose assignments use the consumer layout.
pub const CONSUMER_PROTOCOL_TYPE: &str = "consumer";

/// Names starting with this belong to the cluster itself.
pub const INTERNAL_TOPIC_PREFIX: &str = "__";

pub const UNKNOWN_VERSION: &str = "unknown";

pub fn is_internal_topic(name: &str) -> bool {
    name.starts_with(INTERNAL_TOPIC_PREFIX)
}

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerInfo {
    pub id: i32,
    pub address: String,
    pub version: String,
    pub partitions: usize,
    pub leaders: usize,
    pub under_replicated_partitions: usize,
}

impl BrokerInfo {
    pub fn new(id: i32, address: &str) -> Self {
        Self {
            id,
            address: address.to_string(),
            version: UNKNOWN_VERSION.to_string(),
            partitions: 0,
            leaders: 0,
            under_replicated_partitions: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicInfo {
    pub name: String,
    pub partitions: usize,
    pub replication_factor: usize,
    pub total_messages: i64,
    /// Only entries that differ from the broker defaults.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerGroupInfo {
    pub name: String,
    pub topics: Vec<String>,
    pub members: usize,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    pub timestamp: String,
    pub broker_addresses: Vec<String>,
    pub brokers: Vec<BrokerInfo>,
    pub topics: Vec<TopicInfo>,
    pub consumer_groups: Vec<ConsumerGroupInfo>,
    pub total_topics: usize,
    pub total_consumer_groups: usize,
    pub total_partitions: usize,
    pub total_messages: i64,
    pub total_under_replicated_partitions: usize,
}

impl ClusterSnapshot {
    pub fn internal_topic_count(&self) -> usize {
        self.topics
            .iter()
            .filter(|topic| is_internal_topic(&topic.name))
            .count()
    }
}

/// Queries the whole cluster and assembles the snapshot.
pub async fn build_snapshot<C>(
    client: &C,
    broker_addresses: &[String],
) -> Result<ClusterSnapshot, SnapshotError>
where
    C: ClusterClient + ?Sized,
{
    let timestamp = now_rfc3339();

    info!("Fetching broker information...");
    let mut brokers: Vec<BrokerInfo> = match client.list_brokers().await {
        Ok(brokers) => brokers
            .iter()
            .map(|broker| BrokerInfo::new(broker.id, &broker.address()))
            .collect(),
        Err(e) => {
            warn!("Could not fetch broker metadata: {}", e);
            Vec::new()
        }
    };
    brokers.sort_by_key(|broker| broker.id);

    info!("Fetching topics...");
    let topic_metadata = client.list_topics().await.map_err(SnapshotError::Topics)?;

    let mut topics = Vec::with_capacity(topic_metadata.len());
    for metadata in &topic_metadata {
        topics.push(describe_topic_info(client, metadata).await);
    }
    topics.sort_by(|a, b| a.name.cmp(&b.name));

    let mut total_under_replicated_partitions = 0;
    if !brokers.is_empty() {
        info!("Calculating broker metrics...");
        let topic_names: Vec<String> = topics.iter().map(|topic| topic.name.clone()).collect();
        let topology = Topology::aggregate(client, &topic_names).await;
        if !topology.skipped_topics().is_empty() {
            warn!(
                "Broker metrics exclude {} topics that could not be described: {}",
                topology.skipped_topics().len(),
                topology.skipped_topics().join(", ")
            );
        }
        topology.apply_to(&mut brokers);
        total_under_replicated_partitions = topology.under_replicated_partitions();

        for broker in brokers.iter_mut() {
            if let Some(version) = client.broker_version(broker.id).await {
                broker.version = version;
            }
        }
    }

    info!("Fetching consumer groups...");
    let consumer_groups = collect_consumer_groups(client).await?;

    Ok(ClusterSnapshot {
        timestamp,
        broker_addresses: broker_addresses.to_vec(),
        brokers,
        total_topics: topics.len(),
        total_consumer_groups: consumer_groups.len(),
        total_partitions: topics.iter().map(|topic| topic.partitions).sum(),
        total_messages: topics.iter().map(|topic| topic.total_messages).sum(),
        total_under_replicated_partitions,
        topics,
        consumer_groups,
    })
}

async fn describe_topic_info<C>(client: &C, metadata: &TopicMetadata) -> TopicInfo
where
    C: ClusterClient + ?Sized,
{
    let configs = match client.topic_configs(&metadata.name).await {
        Ok(entries) => non_default_configs(entries),
        Err(e) => {
            warn!("Could not describe configs for topic {}: {}", metadata.name, e);
            BTreeMap::new()
        }
    };

    let mut total_messages = 0;
    for partition in &metadata.partitions {
        match client.high_watermark(&metadata.name, partition.id).await {
            Ok(offset) => total_messages += offset,
            Err(e) => warn!(
                "Could not get offset for topic {} partition {}: {}",
                metadata.name, partition.id, e
            ),
        }
    }

    TopicInfo {
        name: metadata.name.clone(),
        partitions: metadata.partitions.len(),
        replication_factor: metadata.replication_factor(),
        total_messages,
        configs,
    }
}

fn non_default_configs(entries: Vec<ConfigEntry>) -> BTreeMap<String, String> {
    entries
        .into_iter()
        .filter(|entry| !entry.is_default)
        .filter_map(|entry| match entry.value {
            Some(value) if !value.is_empty() => Some((entry.name, value)),
            _ => None,
        })
        .collect()
}

/// Lists consumer groups, sorted by name, with the union of their members'
/// assigned topics.
pub async fn collect_consumer_groups<C>(client: &C) -> Result<Vec<ConsumerGroupInfo>, SnapshotError>
where
    C: ClusterClient + ?Sized,
{
    let groups = client
        .list_consumer_groups()
        .await
        .map_err(SnapshotError::ConsumerGroups)?;

    let mut consumer_groups: Vec<ConsumerGroupInfo> =
        groups.iter().map(consumer_group_info).collect();
    consumer_groups.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(consumer_groups)
}

fn consumer_group_info(group: &GroupDescription) -> ConsumerGroupInfo {
    let mut topics = BTreeSet::new();

    let members = if group.protocol_type == CONSUMER_PROTOCOL_TYPE {
        group.members.as_slice()
    } else {
        debug!(
            "Group {} uses protocol type {:?}, not decoding assignments",
            group.name, group.protocol_type
        );
        &[]
    };

    for member in members {
        let assignment = match &member.assignment {
            Some(bytes) => bytes,
            None => continue,
        };

        match decode_member_assignment(assignment) {
            Ok(assigned) => topics.extend(assigned.into_keys()),
            Err(e) => warn!(
                "Could not decode assignment of member {} in group {}: {}",
                member.id, group.name, e
            ),
        }
    }

    debug!("Group {} consumes {} topics", group.name, topics.len());

    ConsumerGroupInfo {
        name: group.name.clone(),
        topics: topics.into_iter().collect(),
        members: group.members.len(),
        state: group.state.clone(),
    }
}

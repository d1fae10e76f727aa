use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use super::ClusterClient;
use crate::error::ReportError;
use crate::report::json::save_json;
use crate::snapshot::{now_rfc3339, ConsumerGroupInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionOffset {
    pub partition: i32,
    pub offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerGroupOffsets {
    pub group: String,
    /// Partition lists are sorted ascending by partition.
    pub topics: BTreeMap<String, Vec<PartitionOffset>>,
    pub captured_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerOffsetsBackup {
    pub timestamp: String,
    pub cluster: String,
    pub consumer_groups: Vec<ConsumerGroupOffsets>,
}

/// Committed offsets of one topic, keyed by partition.
#[derive(Debug, Clone, Default)]
pub struct OffsetMap {
    partition_offsets: BTreeMap<i32, i64>,
}

impl OffsetMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, partition_id: i32, offset: i64) {
        self.partition_offsets.insert(partition_id, offset);
    }

    pub fn is_empty(&self) -> bool {
        self.partition_offsets.is_empty()
    }

    pub fn into_partition_offsets(self) -> Vec<PartitionOffset> {
        self.partition_offsets
            .into_iter()
            .map(|(partition, offset)| PartitionOffset { partition, offset })
            .collect()
    }
}

impl FromIterator<(i32, i64)> for OffsetMap {
    fn from_iter<I: IntoIterator<Item = (i32, i64)>>(iter: I) -> Self {
        let mut offset_map = OffsetMap::new();
        for (partition_id, offset) in iter {
            offset_map.set(partition_id, offset);
        }
        offset_map
    }
}

/// Captures the committed offsets of every group that consumes at least one
/// topic. Groups and topics with nothing committed are left out.
pub async fn snapshot_offsets<C>(
    client: &C,
    groups: &[ConsumerGroupInfo],
    cluster: &str,
) -> ConsumerOffsetsBackup
where
    C: ClusterClient + ?Sized,
{
    let mut backup = ConsumerOffsetsBackup {
        timestamp: now_rfc3339(),
        cluster: cluster.to_string(),
        consumer_groups: Vec::new(),
    };

    for group in groups {
        if group.topics.is_empty() {
            debug!("Skipping group {} with no assigned topics", group.name);
            continue;
        }

        let mut group_offsets = ConsumerGroupOffsets {
            group: group.name.clone(),
            topics: BTreeMap::new(),
            captured_at: now_rfc3339(),
        };

        for topic in &group.topics {
            let offsets: OffsetMap = match client.committed_offsets(&group.name, topic).await {
                Ok(offsets) => offsets.into_iter().collect(),
                Err(e) => {
                    warn!(
                        "Could not fetch offsets for group {}, topic {}: {}",
                        group.name, topic, e
                    );
                    continue;
                }
            };

            if !offsets.is_empty() {
                group_offsets
                    .topics
                    .insert(topic.clone(), offsets.into_partition_offsets());
            }
        }

        if !group_offsets.topics.is_empty() {
            backup.consumer_groups.push(group_offsets);
        }
    }

    info!(
        "Captured offsets for {} consumer groups",
        backup.consumer_groups.len()
    );

    backup
}

pub fn save_offsets(backup: &ConsumerOffsetsBackup, path: &Path) -> Result<(), ReportError> {
    save_json(backup, path, "consumer offsets")
}

pub fn load_offsets(path: &Path) -> Result<ConsumerOffsetsBackup, ReportError> {
    let data = fs::read_to_string(path).map_err(|source| ReportError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&data).map_err(|source| ReportError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kafka::testing::{partition, FakeCluster};

    fn group(name: &str, topics: &[&str]) -> ConsumerGroupInfo {
        ConsumerGroupInfo {
            name: name.to_string(),
            topics: topics.iter().map(|topic| topic.to_string()).collect(),
            members: 1,
            state: "Stable".to_string(),
        }
    }

    fn svc_cluster() -> FakeCluster {
        FakeCluster::with_brokers(3)
            .topic("events", vec![partition(0, 1, &[1, 2, 3], &[1, 2, 3])])
            .committed("svc", "events", &[(2, 75), (0, 100), (3, 0), (1, 50)])
    }

    #[tokio::test]
    async fn test_snapshot_sorts_by_partition() {
        let cluster = svc_cluster();

        let backup = snapshot_offsets(&cluster, &[group("svc", &["events"])], "broker-1:9092").await;

        assert_eq!(backup.cluster, "broker-1:9092");
        assert_eq!(backup.consumer_groups.len(), 1);
        let svc = &backup.consumer_groups[0];
        assert_eq!(svc.group, "svc");
        assert_eq!(
            svc.topics["events"],
            vec![
                PartitionOffset { partition: 0, offset: 100 },
                PartitionOffset { partition: 1, offset: 50 },
                PartitionOffset { partition: 2, offset: 75 },
                PartitionOffset { partition: 3, offset: 0 },
            ]
        );
    }

    #[tokio::test]
    async fn test_snapshot_is_repeatable() {
        let cluster = svc_cluster();
        let groups = [group("svc", &["events"])];

        let first = snapshot_offsets(&cluster, &groups, "c").await;
        let second = snapshot_offsets(&cluster, &groups, "c").await;

        let topics = |backup: &ConsumerOffsetsBackup| {
            backup
                .consumer_groups
                .iter()
                .map(|group| serde_json::to_string(&group.topics).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(topics(&first), topics(&second));
    }

    #[tokio::test]
    async fn test_snapshot_skips_idle_groups_and_empty_topics() {
        let cluster = svc_cluster().committed("svc", "audit", &[]);

        let backup = snapshot_offsets(
            &cluster,
            &[group("idle", &[]), group("svc", &["audit", "events"])],
            "c",
        )
        .await;

        assert_eq!(backup.consumer_groups.len(), 1);
        let topics: Vec<&String> = backup.consumer_groups[0].topics.keys().collect();
        assert_eq!(topics, vec!["events"]);
    }

    #[tokio::test]
    async fn test_snapshot_keeps_group_when_one_topic_fails() {
        let mut cluster = svc_cluster().committed("svc", "orders", &[(0, 5)]);
        cluster
            .failing_offsets
            .insert(("svc".to_string(), "events".to_string()));

        let backup = snapshot_offsets(&cluster, &[group("svc", &["events", "orders"])], "c").await;

        let svc = &backup.consumer_groups[0];
        assert!(!svc.topics.contains_key("events"));
        assert_eq!(svc.topics["orders"], vec![PartitionOffset { partition: 0, offset: 5 }]);
    }

    #[tokio::test]
    async fn test_snapshot_drops_group_when_every_topic_fails() {
        let mut cluster = svc_cluster();
        cluster
            .failing_offsets
            .insert(("svc".to_string(), "events".to_string()));

        let backup = snapshot_offsets(&cluster, &[group("svc", &["events"])], "c").await;

        assert!(backup.consumer_groups.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offsets.json");
        let backup = snapshot_offsets(&svc_cluster(), &[group("svc", &["events"])], "c").await;

        save_offsets(&backup, &path).unwrap();
        let loaded = load_offsets(&path).unwrap();

        assert_eq!(loaded, backup);
    }

    #[test]
    fn test_load_offsets_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load_offsets(&path), Err(ReportError::Parse { .. })));
    }
}

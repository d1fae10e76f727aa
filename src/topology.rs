//! Per-broker partition, leader and under-replication rollups.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::kafka::{ClusterClient, PartitionMetadata, TopicMetadata};
use crate::snapshot::BrokerInfo;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrokerRollup {
    pub partitions: usize,
    pub leaders: usize,
    pub under_replicated: usize,
}

/// Rollups for one run, keyed by broker id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    brokers: BTreeMap<i32, BrokerRollup>,
    under_replicated_partitions: usize,
    skipped_topics: Vec<String>,
}

impl Topology {
    /// Describes every topic one at a time. A topic whose describe call fails
    /// contributes nothing.
    pub async fn aggregate<C>(client: &C, topics: &[String]) -> Self
    where
        C: ClusterClient + ?Sized,
    {
        let mut topology = Topology::default();

        for topic in topics {
            match client.describe_topic(topic).await {
                Ok(metadata) => topology.observe_topic(&metadata),
                Err(e) => {
                    warn!("Could not describe topic {}: {}", topic, e);
                    topology.skipped_topics.push(topic.clone());
                }
            }
        }

        debug!(
            "Aggregated topology for {} brokers, {} under-replicated partitions",
            topology.brokers.len(),
            topology.under_replicated_partitions
        );

        topology
    }

    pub fn observe_topic(&mut self, topic: &TopicMetadata) {
        for partition in &topic.partitions {
            self.observe(partition);
        }
    }

    pub fn observe(&mut self, partition: &PartitionMetadata) {
        for replica in &partition.replicas {
            self.brokers.entry(*replica).or_default().partitions += 1;
        }

        if partition.leader >= 0 {
            self.brokers.entry(partition.leader).or_default().leaders += 1;
        }

        if partition.is_under_replicated() {
            for replica in &partition.replicas {
                self.brokers.entry(*replica).or_default().under_replicated += 1;
            }
            self.under_replicated_partitions += 1;
        }
    }

    pub fn rollup(&self, broker_id: i32) -> BrokerRollup {
        self.brokers.get(&broker_id).copied().unwrap_or_default()
    }

    /// Cluster-wide count, once per partition regardless of replica count.
    pub fn under_replicated_partitions(&self) -> usize {
        self.under_replicated_partitions
    }

    pub fn skipped_topics(&self) -> &[String] {
        &self.skipped_topics
    }

    pub fn apply_to(&self, brokers: &mut [BrokerInfo]) {
        for broker in brokers {
            let rollup = self.rollup(broker.id);
            broker.partitions = rollup.partitions;
            broker.leaders = rollup.leaders;
            broker.under_replicated_partitions = rollup.under_replicated;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kafka::testing::{partition, FakeCluster};

    fn topics(cluster: &FakeCluster) -> Vec<String> {
        cluster.topics.iter().map(|topic| topic.name.clone()).collect()
    }

    #[test]
    fn test_observe_counts_replicas_and_leaders() {
        let mut topology = Topology::default();
        topology.observe(&partition(0, 1, &[1, 2, 3], &[1, 2, 3]));
        topology.observe(&partition(1, 2, &[2, 3, 1], &[2, 3, 1]));

        assert_eq!(
            topology.rollup(1),
            BrokerRollup {
                partitions: 2,
                leaders: 1,
                under_replicated: 0
            }
        );
        assert_eq!(topology.rollup(3).leaders, 0);
        assert_eq!(topology.under_replicated_partitions(), 0);
    }

    #[test]
    fn test_observe_ignores_missing_leader() {
        let mut topology = Topology::default();
        topology.observe(&partition(0, -1, &[1, 2], &[]));

        assert_eq!(topology.rollup(1).leaders, 0);
        assert_eq!(topology.rollup(2).leaders, 0);
        assert_eq!(topology.rollup(1).under_replicated, 1);
        assert_eq!(topology.under_replicated_partitions(), 1);
    }

    #[test]
    fn test_under_replicated_counted_once_per_partition() {
        let mut topology = Topology::default();
        let partitions = vec![
            partition(0, 1, &[1, 2, 3], &[1, 2]),
            partition(1, 2, &[2, 3, 1], &[2]),
            partition(2, 3, &[3, 1, 2], &[3, 1, 2]),
        ];
        for p in &partitions {
            topology.observe(p);
        }

        let expected = partitions
            .iter()
            .filter(|p| p.isr.len() < p.replicas.len())
            .count();
        assert_eq!(topology.under_replicated_partitions(), expected);

        let broker_total: usize = (1..=3).map(|id| topology.rollup(id).under_replicated).sum();
        assert_eq!(broker_total, 6);
    }

    #[tokio::test]
    async fn test_aggregate_skips_failing_topics() {
        let mut cluster = FakeCluster::with_brokers(2)
            .topic("good", vec![partition(0, 1, &[1, 2], &[1, 2])])
            .topic("broken", vec![partition(0, 2, &[1, 2], &[2])]);
        cluster.failing_topics.insert("broken".to_string());

        let topology = Topology::aggregate(&cluster, &topics(&cluster)).await;

        assert_eq!(topology.rollup(1).partitions, 1);
        assert_eq!(topology.rollup(2).partitions, 1);
        assert_eq!(topology.under_replicated_partitions(), 0);
        assert_eq!(topology.skipped_topics(), &["broken".to_string()]);
    }

    #[test]
    fn test_apply_to_zeroes_unknown_brokers() {
        let mut topology = Topology::default();
        topology.observe(&partition(0, 1, &[1], &[1]));

        let mut brokers = vec![BrokerInfo::new(1, "a:9092"), BrokerInfo::new(9, "b:9092")];
        topology.apply_to(&mut brokers);

        assert_eq!(brokers[0].partitions, 1);
        assert_eq!(brokers[0].leaders, 1);
        assert_eq!(brokers[1].partitions, 0);
    }
}

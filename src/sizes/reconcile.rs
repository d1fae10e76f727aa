use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::SizeError;
use crate::formatting::format_bytes;
use crate::snapshot::now_rfc3339;

/// Bytes held by one replica of one partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSize {
    pub topic: String,
    pub partition: i32,
    pub size: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeSource {
    Native,
    Cli,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSize {
    pub topic: String,
    /// Sum over every replica.
    pub total_size_bytes: i64,
    pub total_size_human: String,
    /// Distinct partition numbers seen.
    pub partitions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSizesReport {
    pub timestamp: String,
    pub cluster: String,
    pub source: SizeSource,
    pub topics: Vec<TopicSize>,
    pub total_size_bytes: i64,
    pub total_size_human: String,
    pub total_topics: usize,
    pub total_partitions: usize,
}

#[derive(Debug, Default)]
struct TopicTotals {
    size: i64,
    partitions: BTreeSet<i32>,
}

#[derive(Debug, Default)]
pub struct TopicSizeAccumulator {
    topics: BTreeMap<String, TopicTotals>,
}

impl TopicSizeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: PartitionSize) {
        let totals = self.topics.entry(record.topic).or_default();
        totals.size += record.size;
        totals.partitions.insert(record.partition);
    }

    pub fn into_report(self, cluster: &str, source: SizeSource) -> Result<TopicSizesReport, SizeError> {
        if self.topics.is_empty() {
            return Err(SizeError::NoData);
        }

        let mut topics: Vec<TopicSize> = self
            .topics
            .into_iter()
            .map(|(topic, totals)| TopicSize {
                topic,
                total_size_bytes: totals.size,
                total_size_human: format_bytes(totals.size),
                partitions: totals.partitions.len(),
            })
            .collect();

        // Stable, so equal sizes stay in name order.
        topics.sort_by(|a, b| b.total_size_bytes.cmp(&a.total_size_bytes));

        let total_size_bytes = topics.iter().map(|topic| topic.total_size_bytes).sum();
        let total_partitions = topics.iter().map(|topic| topic.partitions).sum();

        Ok(TopicSizesReport {
            timestamp: now_rfc3339(),
            cluster: cluster.to_string(),
            source,
            total_topics: topics.len(),
            topics,
            total_size_bytes,
            total_size_human: format_bytes(total_size_bytes),
            total_partitions,
        })
    }
}

impl Extend<PartitionSize> for TopicSizeAccumulator {
    fn extend<I: IntoIterator<Item = PartitionSize>>(&mut self, iter: I) {
        for record in iter {
            self.add(record);
        }
    }
}

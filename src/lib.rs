//! Point-in-time diagnostic snapshots of a Kafka cluster.

pub mod config;
pub mod error;
pub mod formatting;
pub mod kafka;
pub mod report;
pub mod sizes;
pub mod snapshot;
pub mod topology;

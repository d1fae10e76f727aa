use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by a `ClusterClient` implementation.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    #[error("{0} is not supported by this client")]
    Unsupported(&'static str),

    #[error("topic {0} not found in cluster metadata")]
    TopicNotFound(String),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PartitionIdError {
    #[error("no trailing -<partition> suffix in {0:?}")]
    MissingSuffix(String),

    #[error("empty topic name in {0:?}")]
    EmptyTopic(String),

    #[error("partition number in {0:?} has a leading zero")]
    LeadingZero(String),

    #[error("partition number in {0:?} is out of range")]
    OutOfRange(String),
}

#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("assignment truncated: {0}")]
    Truncated(#[from] io::Error),

    #[error("negative length {0} in assignment")]
    NegativeLength(i32),

    #[error("topic name is not valid UTF-8")]
    InvalidTopicName(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Error)]
pub enum SizeError {
    #[error("no topic size data retrieved")]
    NoData,

    #[error("log directory queries are not supported by this client")]
    Unsupported,

    #[error("could not list brokers: {0}")]
    Brokers(#[source] ClientError),

    #[error("kafka-log-dirs not found in PATH or common locations")]
    ToolNotFound,

    #[error("failed to create command config file: {0}")]
    CommandConfig(#[source] io::Error),

    #[error("failed to run {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("kafka-log-dirs failed ({status}): {stderr}")]
    ToolFailed { status: String, stderr: String },

    #[error("no JSON found in kafka-log-dirs output: {0}")]
    MissingJson(String),

    #[error("failed to parse kafka-log-dirs output: {source}; JSON: {excerpt}")]
    Parse {
        excerpt: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to serialize {what}: {source}")]
    Serialize {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("SASL username and password are required when using SASL authentication")]
    MissingSaslCredentials,

    #[error("both --tls-client-cert and --tls-client-key must be provided for mTLS")]
    IncompleteClientCertificate,

    #[error("no broker addresses given")]
    NoBrokers,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("error listing topics: {0}")]
    Topics(#[source] ClientError),

    #[error("error listing consumer groups: {0}")]
    ConsumerGroups(#[source] ClientError),
}

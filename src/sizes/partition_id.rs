//! `<topic>-<partition>` identifiers as printed by `kafka-log-dirs`.
//!
//! The split is made at the last hyphen, which must be followed by a
//! partition number. Topic names that themselves end in `-<digits>` are
//! ambiguous: `events-5-3` always decodes as topic `events-5`, partition 3,
//! and there is no way to tell it apart from a hypothetical topic `events`
//! with some other numbering. This matches what the broker prints for every
//! real partition, but it is a convention, not something the format proves.

use crate::error::PartitionIdError;

pub fn format_partition_id(topic: &str, partition: i32) -> String {
    format!("{}-{}", topic, partition)
}

pub fn parse_partition_id(id: &str) -> Result<(String, i32), PartitionIdError> {
    let (topic, digits) = id
        .rsplit_once('-')
        .ok_or_else(|| PartitionIdError::MissingSuffix(id.to_string()))?;

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PartitionIdError::MissingSuffix(id.to_string()));
    }
    if topic.is_empty() {
        return Err(PartitionIdError::EmptyTopic(id.to_string()));
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return Err(PartitionIdError::LeadingZero(id.to_string()));
    }

    let partition = digits
        .parse::<i32>()
        .map_err(|_| PartitionIdError::OutOfRange(id.to_string()))?;

    Ok((topic.to_string(), partition))
}

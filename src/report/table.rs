use crate::formatting::{format_number, format_padded};
use crate::sizes::{TopicSize, TopicSizesReport};

const CHARS_TOPIC_NAME: usize = 40;
const CHARS_PARTITIONS: usize = 10;
const CHARS_TOTAL_SIZE: usize = 12;
const CHARS_SIZE_BYTES: usize = 24;
const RULE_WIDTH: usize = 80;

pub fn format_topic_sizes_table(report: &TopicSizesReport) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![
        rule.clone(),
        "Kafka Topic Sizes Report".to_string(),
        format!("Generated: {}", report.timestamp),
        format!("Cluster: {}", report.cluster),
        rule.clone(),
        String::new(),
        format_headers(),
        format_separator(),
    ];

    lines.extend(report.topics.iter().map(format_topic_size));

    lines.push(String::new());
    lines.push(rule.clone());
    lines.push("Summary:".to_string());
    lines.push(format!("  Total Topics: {}", report.total_topics));
    lines.push(format!("  Total Partitions: {}", report.total_partitions));
    lines.push(format!(
        "  Total Size: {} ({} bytes)",
        report.total_size_human,
        format_number(report.total_size_bytes)
    ));
    lines.push(rule);

    lines.join("\n")
}

pub fn print_topic_sizes_table(report: &TopicSizesReport) {
    println!("\n{}\n", format_topic_sizes_table(report));
}

fn format_headers() -> String {
    format!(
        "{} {} {} {}",
        format_padded("TOPIC", CHARS_TOPIC_NAME),
        format_padded("PARTITIONS", CHARS_PARTITIONS),
        format_padded("TOTAL SIZE", CHARS_TOTAL_SIZE),
        format_padded("SIZE (BYTES)", CHARS_SIZE_BYTES)
    )
}

fn format_separator() -> String {
    [
        CHARS_TOPIC_NAME,
        CHARS_PARTITIONS,
        CHARS_TOTAL_SIZE,
        CHARS_SIZE_BYTES,
    ]
    .iter()
    .map(|width| "-".repeat(*width))
    .collect::<Vec<_>>()
    .join(" ")
}

fn format_topic_size(topic: &TopicSize) -> String {
    format!(
        "{} {} {} {}",
        format_padded(&topic.topic, CHARS_TOPIC_NAME),
        format_padded(&topic.partitions.to_string(), CHARS_PARTITIONS),
        format_padded(&topic.total_size_human, CHARS_TOTAL_SIZE),
        format_padded(&format_number(topic.total_size_bytes), CHARS_SIZE_BYTES)
    )
}

use std::fmt::Write;
use std::path::Path;

use super::{config_pairs, shell_quote, write_script};
use crate::error::ReportError;
use crate::snapshot::{is_internal_topic, ClusterSnapshot, INTERNAL_TOPIC_PREFIX};

/// Bash script that creates every non-internal topic of the snapshot on
/// another cluster, with the same partitions, replication and overrides.
pub fn render_recreate_script(snapshot: &ClusterSnapshot, script_name: &str) -> String {
    let mut script = String::new();
    // Writing into a String cannot fail.
    let _ = write_recreate_script(&mut script, snapshot, script_name);
    script
}

pub fn save_recreate_script(snapshot: &ClusterSnapshot, path: &Path) -> Result<(), ReportError> {
    let script_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    write_script(path, &render_recreate_script(snapshot, &script_name))
}

fn write_recreate_script(
    out: &mut String,
    snapshot: &ClusterSnapshot,
    script_name: &str,
) -> std::fmt::Result {
    let skipped = snapshot.internal_topic_count();

    writeln!(out, "#!/bin/bash")?;
    writeln!(out, "# Kafka Topic Recreation Script")?;
    writeln!(out, "# Generated: {}", snapshot.timestamp)?;
    writeln!(out, "# Source Cluster: {}", snapshot.broker_addresses.join(", "))?;
    writeln!(out, "# Total Topics: {}", snapshot.total_topics)?;
    writeln!(out, "#")?;
    writeln!(out, "# Usage:")?;
    writeln!(out, "#   1. Edit BOOTSTRAP_SERVERS to point to your target cluster")?;
    writeln!(out, "#   2. Set COMMAND_CONFIG if the target needs authentication")?;
    writeln!(out, "#   3. Run: ./{}", script_name)?;
    writeln!(out, "#")?;
    writeln!(out)?;
    writeln!(out, "set -e")?;
    writeln!(out)?;
    writeln!(out, "BOOTSTRAP_SERVERS=\"localhost:9092\"  # CHANGE THIS")?;
    writeln!(out, "# COMMAND_CONFIG=\"--command-config client.properties\"")?;
    writeln!(out, "COMMAND_CONFIG=\"\"")?;
    writeln!(out, "KAFKA_TOPICS=\"kafka-topics.sh\"")?;
    writeln!(out)?;
    writeln!(out, "echo \"========================================\"")?;
    writeln!(out, "echo \"Recreating topics from source cluster\"")?;
    writeln!(
        out,
        "echo \"Note: Skipping {} internal topics (starting with {})\"",
        skipped, INTERNAL_TOPIC_PREFIX
    )?;
    writeln!(out, "echo \"Target: $BOOTSTRAP_SERVERS\"")?;
    writeln!(out, "echo \"========================================\"")?;
    writeln!(out)?;
    writeln!(out, "CREATED=0")?;
    writeln!(out, "FAILED=0")?;
    writeln!(out, "FAILED_TOPICS=()")?;
    writeln!(out)?;

    let topics = snapshot
        .topics
        .iter()
        .filter(|topic| !is_internal_topic(&topic.name));

    for (index, topic) in topics.enumerate() {
        let number = index + 1;
        let name = shell_quote(&topic.name);

        writeln!(out, "# Topic {}: {}", number, topic.name)?;
        writeln!(out, "echo \"[{}] Creating topic:\" {}", number, name)?;
        writeln!(
            out,
            "if $KAFKA_TOPICS --bootstrap-server \"$BOOTSTRAP_SERVERS\" $COMMAND_CONFIG \\"
        )?;
        writeln!(out, "  --create \\")?;
        writeln!(out, "  --topic {} \\", name)?;
        writeln!(out, "  --partitions {} \\", topic.partitions)?;
        write!(out, "  --replication-factor {}", topic.replication_factor)?;
        for pair in config_pairs(&topic.configs) {
            write!(out, " \\\n  --config {}", shell_quote(&pair))?;
        }
        writeln!(out, "; then")?;
        writeln!(out, "  echo \"  Created successfully\"")?;
        writeln!(out, "  CREATED=$((CREATED + 1))")?;
        writeln!(out, "else")?;
        writeln!(out, "  echo \"  Failed to create (may already exist)\"")?;
        writeln!(out, "  FAILED_TOPICS+=({})", name)?;
        writeln!(out, "  FAILED=$((FAILED + 1))")?;
        writeln!(out, "fi")?;
        writeln!(out)?;
    }

    writeln!(out, "echo \"========================================\"")?;
    writeln!(out, "echo \"Topic Recreation Summary:\"")?;
    writeln!(out, "echo \"  Successfully created: $CREATED\"")?;
    writeln!(out, "echo \"  Failed: $FAILED\"")?;
    writeln!(out, "echo \"  Internal topics skipped: {}\"", skipped)?;
    writeln!(out, "if [ \"$FAILED\" -gt 0 ]; then")?;
    writeln!(out, "  echo \"Failed topics:\"")?;
    writeln!(out, "  printf '  - %s\\n' \"${{FAILED_TOPICS[@]}}\"")?;
    writeln!(out, "fi")?;
    writeln!(out, "echo \"========================================\"")
}

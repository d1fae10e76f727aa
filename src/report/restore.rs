use std::fmt::Write;
use std::path::Path;

use super::{shell_quote, write_script};
use crate::error::ReportError;
use crate::kafka::consumer_offsets::{ConsumerOffsetsBackup, PartitionOffset};

const PAYLOAD_DELIMITER: &str = "OFFSETS_EOF";

/// Bash script that resets every captured group back to its saved offsets.
///
/// The output depends only on `backup` and `script_name`.
pub fn render_restore_script(backup: &ConsumerOffsetsBackup, script_name: &str) -> String {
    let mut script = String::new();
    // Writing into a String cannot fail.
    let _ = write_restore_script(&mut script, backup, script_name);
    script
}

pub fn save_restore_script(backup: &ConsumerOffsetsBackup, path: &Path) -> Result<(), ReportError> {
    let script_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());
    write_script(path, &render_restore_script(backup, &script_name))
}

/// `topic,partition,offset` lines as read by `--from-file`.
fn csv_payload(topic: &str, partitions: &[PartitionOffset]) -> String {
    partitions
        .iter()
        .map(|p| format!("{},{},{}\n", topic, p.partition, p.offset))
        .collect()
}

fn write_restore_script(
    out: &mut String,
    backup: &ConsumerOffsetsBackup,
    script_name: &str,
) -> std::fmt::Result {
    let group_count = backup.consumer_groups.len();

    writeln!(out, "#!/bin/bash")?;
    writeln!(out, "# Consumer Group Offsets Restore Script")?;
    writeln!(out, "# Generated: {}", backup.timestamp)?;
    writeln!(out, "# Source Cluster: {}", backup.cluster)?;
    writeln!(out, "# Total Consumer Groups: {}", group_count)?;
    writeln!(out, "#")?;
    writeln!(out, "# Usage:")?;
    writeln!(out, "#   1. Edit BOOTSTRAP_SERVERS to point to your target cluster")?;
    writeln!(out, "#   2. Set COMMAND_CONFIG if the target needs authentication")?;
    writeln!(out, "#   3. Stop the consumers of each group (offsets can only be reset on inactive groups)")?;
    writeln!(out, "#   4. Run: ./{}", script_name)?;
    writeln!(out, "#")?;
    writeln!(out)?;
    writeln!(out, "set -e")?;
    writeln!(out)?;
    writeln!(out, "BOOTSTRAP_SERVERS=\"localhost:9092\"  # CHANGE THIS")?;
    writeln!(out, "# COMMAND_CONFIG=\"--command-config client.properties\"")?;
    writeln!(out, "COMMAND_CONFIG=\"\"")?;
    writeln!(out, "KAFKA_CONSUMER_GROUPS=\"kafka-consumer-groups.sh\"")?;
    writeln!(out)?;
    writeln!(out, "OFFSETS_FILE=\"\"")?;
    writeln!(out, "trap 'rm -f \"$OFFSETS_FILE\"' EXIT")?;
    writeln!(out)?;
    writeln!(out, "echo \"========================================\"")?;
    writeln!(out, "echo \"Restoring offsets for {} consumer groups\"", group_count)?;
    writeln!(out, "echo \"Target: $BOOTSTRAP_SERVERS\"")?;
    writeln!(out, "echo \"========================================\"")?;
    writeln!(out)?;
    writeln!(out, "RESTORED=0")?;
    writeln!(out, "FAILED=0")?;
    writeln!(out)?;

    for (index, group) in backup.consumer_groups.iter().enumerate() {
        let number = index + 1;
        let group_name = shell_quote(&group.group);

        writeln!(out, "# Consumer group {}/{}", number, group_count)?;
        writeln!(
            out,
            "echo \"[{}/{}] Restoring offsets for consumer group:\" {}",
            number, group_count, group_name
        )?;

        for (topic, partitions) in &group.topics {
            let topic_name = shell_quote(topic);

            writeln!(
                out,
                "echo \"  Topic:\" {} \"({} partitions)\"",
                topic_name,
                partitions.len()
            )?;
            writeln!(out, "OFFSETS_FILE=$(mktemp)")?;
            writeln!(out, "cat > \"$OFFSETS_FILE\" << '{}'", PAYLOAD_DELIMITER)?;
            write!(out, "{}", csv_payload(topic, partitions))?;
            writeln!(out, "{}", PAYLOAD_DELIMITER)?;
            writeln!(
                out,
                "if $KAFKA_CONSUMER_GROUPS --bootstrap-server \"$BOOTSTRAP_SERVERS\" $COMMAND_CONFIG \\"
            )?;
            writeln!(out, "  --group {} \\", group_name)?;
            writeln!(out, "  --topic {} \\", topic_name)?;
            writeln!(out, "  --reset-offsets \\")?;
            writeln!(out, "  --from-file \"$OFFSETS_FILE\" \\")?;
            writeln!(out, "  --execute; then")?;
            writeln!(out, "  echo \"    Restored {} partitions\"", partitions.len())?;
            writeln!(out, "  RESTORED=$((RESTORED + 1))")?;
            writeln!(out, "else")?;
            writeln!(out, "  echo \"    Failed to restore offsets\"")?;
            writeln!(out, "  FAILED=$((FAILED + 1))")?;
            writeln!(out, "fi")?;
            writeln!(out, "rm -f \"$OFFSETS_FILE\"")?;
            writeln!(out)?;
        }
    }

    writeln!(out, "echo \"========================================\"")?;
    writeln!(out, "echo \"Offset Restore Summary:\"")?;
    writeln!(out, "echo \"  Successfully restored: $RESTORED topics\"")?;
    writeln!(out, "echo \"  Failed: $FAILED topics\"")?;
    writeln!(out, "echo \"========================================\"")?;
    writeln!(out, "echo \"Verify with:\"")?;
    writeln!(
        out,
        "echo \"  $KAFKA_CONSUMER_GROUPS --bootstrap-server $BOOTSTRAP_SERVERS $COMMAND_CONFIG --group <group-name> --describe\""
    )
}

//! Fallback size collection through the `kafka-log-dirs` command.

use async_trait::async_trait;
use serde::Deserialize;
use std::env;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::partition_id::parse_partition_id;
use super::{is_selected, PartitionSize, PartitionSizeSource, SizeSource};
use crate::config::{ClientSettings, SecuritySettings};
use crate::error::SizeError;

const TOOL_NAMES: [&str; 2] = ["kafka-log-dirs.sh", "kafka-log-dirs"];
const COMMON_BIN_DIRS: [&str; 4] = [
    "/usr/local/kafka/bin",
    "/opt/kafka/bin",
    "/usr/local/bin",
    "/opt/homebrew/bin",
];
const EXCERPT_CHARS: usize = 500;

#[derive(Debug, Clone, Deserialize)]
pub struct LogDirsOutput {
    #[serde(default)]
    pub version: i32,
    #[serde(default)]
    pub brokers: Vec<BrokerEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerEntry {
    pub broker: i32,
    #[serde(default)]
    pub log_dirs: Vec<LogDirEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogDirEntry {
    pub log_dir: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub partitions: Vec<PartitionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionEntry {
    /// `<topic>-<partition>`
    pub partition: String,
    pub size: i64,
    #[serde(default)]
    pub offset_lag: i64,
    #[serde(default)]
    pub is_future: bool,
}

pub struct LogDirsCommand<'a> {
    settings: &'a ClientSettings,
    topic_filter: &'a [String],
    bin_dir: Option<&'a Path>,
}

impl<'a> LogDirsCommand<'a> {
    pub fn new(
        settings: &'a ClientSettings,
        topic_filter: &'a [String],
        bin_dir: Option<&'a Path>,
    ) -> Self {
        Self {
            settings,
            topic_filter,
            bin_dir,
        }
    }

    fn arguments(&self, command_config: Option<&Path>) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--bootstrap-server".into(),
            self.settings.bootstrap_servers().into(),
            "--describe".into(),
        ];

        if !self.topic_filter.is_empty() {
            args.push("--topic-list".into());
            args.push(self.topic_filter.join(",").into());
        }

        if let Some(path) = command_config {
            args.push("--command-config".into());
            args.push(path.as_os_str().to_owned());
        }

        args
    }
}

#[async_trait]
impl<'a> PartitionSizeSource for LogDirsCommand<'a> {
    fn source(&self) -> SizeSource {
        SizeSource::Cli
    }

    async fn partition_sizes(&self) -> Result<Vec<PartitionSize>, SizeError> {
        let tool = find_kafka_log_dirs(self.bin_dir).ok_or(SizeError::ToolNotFound)?;
        info!("Using {}", tool.display());

        // Removed from disk when dropped, whichever way this returns.
        let command_config = write_command_config(&self.settings.security)?;

        let output = Command::new(&tool)
            .args(self.arguments(command_config.as_ref().map(NamedTempFile::path)))
            .output()
            .await
            .map_err(|source| SizeError::Spawn {
                path: tool.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(SizeError::ToolFailed {
                status: output.status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }

        let response = parse_log_dirs_output(&stdout, &stderr)?;
        debug!(
            "kafka-log-dirs reported {} brokers (format version {})",
            response.brokers.len(),
            response.version
        );

        Ok(partition_sizes(response, self.topic_filter))
    }
}

/// First line that looks like a JSON object, from stdout and then stderr.
pub fn extract_json_line<'a>(stdout: &'a str, stderr: &'a str) -> Option<&'a str> {
    stdout
        .lines()
        .chain(stderr.lines())
        .map(str::trim)
        .find(|line| line.starts_with('{'))
}

pub fn parse_log_dirs_output(stdout: &str, stderr: &str) -> Result<LogDirsOutput, SizeError> {
    let json = extract_json_line(stdout, stderr).ok_or_else(|| {
        let combined = if stdout.trim().is_empty() { stderr } else { stdout };
        SizeError::MissingJson(excerpt(combined))
    })?;

    serde_json::from_str(json).map_err(|source| SizeError::Parse {
        excerpt: excerpt(json),
        source,
    })
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let mut shortened: String = trimmed.chars().take(EXCERPT_CHARS).collect();
    shortened.push_str("...");
    shortened
}

/// Flattens the response into one record per replica.
pub fn partition_sizes(response: LogDirsOutput, topic_filter: &[String]) -> Vec<PartitionSize> {
    let mut records = Vec::new();

    for broker in response.brokers {
        for log_dir in broker.log_dirs {
            if let Some(error) = log_dir.error.as_deref().filter(|e| !e.is_empty()) {
                warn!(
                    "Log directory {} on broker {} reported an error: {}",
                    log_dir.log_dir, broker.broker, error
                );
                continue;
            }

            for entry in log_dir.partitions {
                let (topic, partition) = match parse_partition_id(&entry.partition) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        warn!("Skipping partition on broker {}: {}", broker.broker, e);
                        continue;
                    }
                };

                if is_selected(topic_filter, &topic) {
                    records.push(PartitionSize {
                        topic,
                        partition,
                        size: entry.size,
                    });
                }
            }
        }
    }

    records
}

/// Locations searched for the tool, in order.
fn search_dirs(bin_dir: Option<&Path>) -> Vec<PathBuf> {
    let mut dirs = Vec::new();

    if let Some(bin_dir) = bin_dir {
        dirs.push(bin_dir.to_path_buf());
    }
    if let Some(path) = env::var_os("PATH") {
        dirs.extend(env::split_paths(&path));
    }
    if let Some(kafka_home) = env::var_os("KAFKA_HOME") {
        dirs.push(PathBuf::from(kafka_home).join("bin"));
    }
    dirs.extend(COMMON_BIN_DIRS.iter().map(PathBuf::from));
    if let Some(home) = env::var_os("HOME") {
        dirs.push(PathBuf::from(home).join("kafka").join("bin"));
    }

    dirs
}

fn find_in(dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .flat_map(|dir| TOOL_NAMES.iter().map(move |name| dir.join(name)))
        .find(|candidate| candidate.is_file())
}

pub fn find_kafka_log_dirs(bin_dir: Option<&Path>) -> Option<PathBuf> {
    find_in(&search_dirs(bin_dir))
}

/// Writes the `--command-config` properties when the connection is secured.
pub fn write_command_config(
    security: &SecuritySettings,
) -> Result<Option<NamedTempFile>, SizeError> {
    let lines = match security.command_config_lines() {
        Some(lines) => lines,
        None => return Ok(None),
    };

    let mut file = tempfile::Builder::new()
        .prefix("kafka-config-")
        .suffix(".properties")
        .tempfile()
        .map_err(SizeError::CommandConfig)?;

    for line in &lines {
        writeln!(file, "{}", line).map_err(SizeError::CommandConfig)?;
    }
    file.flush().map_err(SizeError::CommandConfig)?;

    Ok(Some(file))
}

/// Installs a stand-in `kafka-log-dirs.sh` in `dir` that saves its arguments
/// to `args` and a copy of any `--command-config` file to `command-config`
/// before running `body`.
#[cfg(all(test, unix))]
pub(crate) fn install_fake_tool(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let script = format!(
        "#!/bin/sh\n\
         printf '%s\\n' \"$@\" > '{dir}/args'\n\
         while [ $# -gt 0 ]; do\n\
         \x20 if [ \"$1\" = --command-config ]; then cp \"$2\" '{dir}/command-config'; fi\n\
         \x20 shift\n\
         done\n\
         {body}\n",
        dir = dir.display(),
        body = body
    );

    let path = dir.join(TOOL_NAMES[0]);
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

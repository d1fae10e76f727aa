use serde::Serialize;
use std::path::Path;

use super::write_file;
use crate::error::ReportError;
use crate::sizes::TopicSizesReport;
use crate::snapshot::ClusterSnapshot;

pub fn to_pretty_json<T>(value: &T, what: &'static str) -> Result<String, ReportError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_string_pretty(value).map_err(|source| ReportError::Serialize { what, source })
}

pub fn save_json<T>(value: &T, path: &Path, what: &'static str) -> Result<(), ReportError>
where
    T: Serialize + ?Sized,
{
    write_file(path, &to_pretty_json(value, what)?)
}

pub fn save_snapshot(snapshot: &ClusterSnapshot, path: &Path) -> Result<(), ReportError> {
    save_json(snapshot, path, "cluster snapshot")
}

pub fn save_topic_sizes(report: &TopicSizesReport, path: &Path) -> Result<(), ReportError> {
    save_json(report, path, "topic sizes report")
}

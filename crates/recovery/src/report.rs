//! Recovery report written to `logs/recovery-report-<epoch-ms>.json`

use crate::journal::{LogEntry, RecoveryLog};
use crate::pipeline::RecoveryOutcome;
use crate::retention::CleanupSummary;
use crate::snapshot::{iso_millis, Snapshot};
use crate::store::BackupStore;
use apkforge_core::error::{Error, Result};
use apkforge_core::fs_tree;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryReport {
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub backup_directory: PathBuf,
    pub available_backups: usize,
    pub backups: Vec<Snapshot>,
    pub recovery_log: Vec<LogEntry>,
    /// Bytes under the backup root
    pub disk_usage: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<RecoveryOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<CleanupSummary>,
}

impl RecoveryReport {
    /// Gather the current snapshot listing, disk usage and the log so far
    pub fn collect(store: &BackupStore, log: &mut RecoveryLog, now: DateTime<Utc>) -> Result<Self> {
        let backups = store.list(log)?;
        let disk_usage = fs_tree::disk_usage(&store.layout().backup_root)?;

        Ok(Self {
            timestamp: now,
            session_id: apkforge_telemetry::session_id().to_string(),
            backup_directory: store.layout().backup_root.clone(),
            available_backups: backups.len(),
            backups,
            recovery_log: log.entries().to_vec(),
            disk_usage,
            outcome: None,
            cleanup: None,
        })
    }

    pub fn with_outcome(mut self, outcome: RecoveryOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_cleanup(mut self, cleanup: CleanupSummary) -> Self {
        self.cleanup = Some(cleanup);
        self
    }

    pub fn file_name(&self) -> String {
        format!("recovery-report-{}.json", self.timestamp.timestamp_millis())
    }

    /// Write the report as pretty JSON into `logs_dir`, creating it if needed
    pub fn write(&self, logs_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(logs_dir).map_err(|e| Error::io_at(logs_dir, e))?;
        let path = logs_dir.join(self.file_name());
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).map_err(|e| Error::io_at(&path, e))?;
        Ok(path)
    }
}

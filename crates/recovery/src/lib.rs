//! Build backup and recovery for the APK pipeline
//!
//! This crate provides:
//! - Snapshots of the client build output and dependency manifests
//! - Restoring a snapshot over the live project
//! - The four-step emergency recovery pipeline
//! - Retention of the most recent snapshots
//! - JSON recovery reports

pub mod journal;
pub mod layout;
pub mod pipeline;
pub mod report;
pub mod restore;
pub mod retention;
pub mod snapshot;
pub mod store;

#[cfg(test)]
mod testing;

pub use journal::{LogEntry, LogKind, RecoveryLog};
pub use layout::ProjectLayout;
pub use pipeline::{EmergencyRecovery, PipelineState, RecoveryOutcome, StepStatus};
pub use report::RecoveryReport;
pub use retention::CleanupSummary;
pub use snapshot::{Artifact, Snapshot};
pub use store::BackupStore;

use apkforge_core::config::CommandsConfig;
use apkforge_core::error::Result;
use apkforge_core::process::{CommandRunner, SystemRunner};
use chrono::Utc;
use std::path::PathBuf;

/// One recovery session: a store, the commands to run and the session log
pub struct BuildRecovery<R: CommandRunner = SystemRunner> {
    store: BackupStore,
    commands: CommandsConfig,
    runner: R,
    log: RecoveryLog,
}

impl<R: CommandRunner> BuildRecovery<R> {
    pub fn new(layout: ProjectLayout, commands: CommandsConfig, runner: R) -> Self {
        Self {
            store: BackupStore::new(layout),
            commands,
            runner,
            log: RecoveryLog::new(),
        }
    }

    pub fn store(&self) -> &BackupStore {
        &self.store
    }

    pub fn layout(&self) -> &ProjectLayout {
        self.store.layout()
    }

    pub fn log(&self) -> &RecoveryLog {
        &self.log
    }

    pub fn create_backup(&mut self, label: Option<&str>) -> Result<Snapshot> {
        self.store.create(label, &mut self.log)
    }

    pub fn list_backups(&mut self) -> Result<Vec<Snapshot>> {
        self.store.list(&mut self.log)
    }

    pub fn restore_backup(&mut self, id: &str) -> Result<Vec<Artifact>> {
        restore::restore(&self.store, id, &mut self.log)
    }

    pub fn emergency_recovery(&mut self) -> RecoveryOutcome {
        EmergencyRecovery::new(&self.store, &self.commands, &self.runner).run(&mut self.log)
    }

    pub fn cleanup_old_backups(&mut self, max_backups: usize) -> Result<CleanupSummary> {
        retention::cleanup(&self.store, max_backups, &mut self.log)
    }

    /// Snapshot listing, disk usage and the log so far
    pub fn generate_report(&mut self) -> Result<RecoveryReport> {
        RecoveryReport::collect(&self.store, &mut self.log, Utc::now())
    }

    /// Write `report` into the logs directory and note where it went
    pub fn save_report(&mut self, report: &RecoveryReport) -> Result<PathBuf> {
        let path = report.write(&self.store.layout().logs_dir)?;
        self.log
            .info(format!("Recovery report saved to: {}", path.display()));
        Ok(path)
    }
}

//! Snapshot creation and listing
//!
//! Layout under the backup root:
//!
//! ```text
//! .build-backups/
//!   v1/
//!     build/...
//!     package.json
//!     client-package.json
//!     package-lock.json
//!     client-package-lock.json
//!     backup-metadata.json     <- written last; marks the snapshot complete
//! ```

use crate::journal::RecoveryLog;
use crate::layout::ProjectLayout;
use crate::snapshot::{Artifact, EnvironmentInfo, Snapshot, SnapshotPaths, METADATA_FILE};
use apkforge_core::error::{Error, Result};
use apkforge_core::fs_tree;
use apkforge_telemetry::Timer;
use chrono::{DateTime, SubsecRound, Utc};
use std::fs;
use std::path::PathBuf;

/// Creates and enumerates snapshots under the backup root
#[derive(Debug, Clone)]
pub struct BackupStore {
    layout: ProjectLayout,
}

impl BackupStore {
    pub fn new(layout: ProjectLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Directory holding a snapshot's copies
    pub fn snapshot_dir(&self, id: &str) -> PathBuf {
        self.layout.backup_root.join(id)
    }

    /// Path of a snapshot's metadata document
    pub fn metadata_path(&self, id: &str) -> PathBuf {
        self.snapshot_dir(id).join(METADATA_FILE)
    }

    fn ensure_backup_root(&self, log: &mut RecoveryLog) -> Result<()> {
        let root = &self.layout.backup_root;
        if !root.exists() {
            fs::create_dir_all(root).map_err(|e| Error::io_at(root, e))?;
            log.backup("Created backup directory");
        }
        Ok(())
    }

    /// Snapshot the current build output and manifests.
    ///
    /// Without a label the id is `backup-<epoch-ms>`. An existing snapshot
    /// with the same id is overwritten.
    pub fn create(&self, label: Option<&str>, log: &mut RecoveryLog) -> Result<Snapshot> {
        self.create_at(label, Utc::now(), log)
    }

    /// [`create`](Self::create) with an explicit capture time.
    ///
    /// The metadata document stores milliseconds, so the timestamp is
    /// truncated to match what [`load`](Self::load) will return.
    pub fn create_at(
        &self,
        label: Option<&str>,
        timestamp: DateTime<Utc>,
        log: &mut RecoveryLog,
    ) -> Result<Snapshot> {
        let timer = Timer::start("backup.create");
        let timestamp = timestamp.trunc_subsecs(3);
        self.ensure_backup_root(log)?;

        let id = match label {
            Some(label) => validate_label(label)?.to_string(),
            None => Snapshot::generated_id(timestamp),
        };
        let dir = self.snapshot_dir(&id);

        log.backup(format!("Creating backup: {}", id));

        let result = self.capture(&id, timestamp, log);
        match result {
            Ok(snapshot) => {
                log.success(format!("Backup created successfully: {}", id));
                tracing::debug!(snapshot = %id, elapsed_ms = timer.stop().as_millis() as u64, "backup timing");
                Ok(snapshot)
            }
            Err(e) => {
                log.error(format!("Backup creation failed: {}", e.message));
                tracing::debug!(snapshot = %id, dir = %dir.display(), "partial snapshot left without metadata");
                Err(e)
            }
        }
    }

    fn capture(&self, id: &str, timestamp: DateTime<Utc>, log: &mut RecoveryLog) -> Result<Snapshot> {
        let dir = self.snapshot_dir(id);
        if fs_tree::remove_tree(&dir)? {
            tracing::debug!(snapshot = %id, "replacing existing snapshot");
        }
        fs::create_dir_all(&dir).map_err(|e| Error::io_at(&dir, e))?;

        let mut paths = SnapshotPaths::default();
        for artifact in Artifact::ALL {
            let source = self.layout.live_path(artifact);
            if !source.exists() {
                tracing::debug!(artifact = artifact.label(), path = %source.display(), "not present, skipped");
                continue;
            }

            let copy = dir.join(artifact.file_name());
            if artifact.is_tree() {
                let files = fs_tree::copy_tree(&source, &copy)?;
                log.backup(format!("Backed up {} ({} files)", artifact.label(), files));
            } else {
                fs_tree::copy_file(&source, &copy)?;
                log.backup(format!("Backed up {}", artifact.label()));
            }
            paths.set(artifact, copy);
        }

        let snapshot = Snapshot {
            id: id.to_string(),
            timestamp,
            paths,
            metadata: EnvironmentInfo::current(),
        };

        let metadata_path = dir.join(METADATA_FILE);
        let json = serde_json::to_string_pretty(&snapshot)?;
        fs::write(&metadata_path, json).map_err(|e| Error::io_at(&metadata_path, e))?;

        Ok(snapshot)
    }

    /// Read one snapshot's metadata; `NotFound` if the document is absent
    pub fn load(&self, id: &str) -> Result<Snapshot> {
        let id = validate_id(id)?;
        let path = self.metadata_path(id);
        if !path.is_file() {
            return Err(Error::snapshot_not_found(id));
        }
        let raw = fs::read_to_string(&path).map_err(|e| Error::io_at(&path, e))?;
        serde_json::from_str(&raw).map_err(|e| Error::metadata_parse(&path, e))
    }

    /// All valid snapshots, most recent first.
    ///
    /// Directories without a readable metadata document are skipped with a
    /// warning, recorded once per session. Equal timestamps keep directory
    /// enumeration order.
    pub fn list(&self, log: &mut RecoveryLog) -> Result<Vec<Snapshot>> {
        self.ensure_backup_root(log)?;

        let root = &self.layout.backup_root;
        let mut snapshots = Vec::new();
        for entry in fs::read_dir(root).map_err(|e| Error::io_at(root, e))? {
            let entry = entry.map_err(|e| Error::io_at(root, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();

            if !entry.path().join(METADATA_FILE).exists() {
                log.warn_once(format!("Ignoring incomplete backup {} (no metadata)", name));
                continue;
            }

            match self.load(&name) {
                Ok(snapshot) if snapshot.id == name => snapshots.push(snapshot),
                Ok(snapshot) => log.warn_once(format!(
                    "Ignoring backup {}: metadata names a different id ({})",
                    name, snapshot.id
                )),
                Err(e) => log.warn_once(format!("Could not read backup metadata for {}: {}", name, e.message)),
            }
        }

        sort_most_recent_first(&mut snapshots);
        Ok(snapshots)
    }
}

/// Stable sort by descending timestamp
pub fn sort_most_recent_first(snapshots: &mut [Snapshot]) {
    snapshots.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Labels become directory names, so they must be a single path component
fn validate_label(label: &str) -> Result<&str> {
    let trimmed = label.trim();
    if !is_single_component(trimmed) {
        return Err(Error::new(
            apkforge_core::ErrorCode::InvalidPath,
            format!("Invalid backup label: {:?}", label),
        )
        .with_suggestion("Use a plain name such as v1 or pre-release-2024"));
    }
    Ok(trimmed)
}

/// Ids are looked up verbatim and must stay inside the backup root
fn validate_id(id: &str) -> Result<&str> {
    if !is_single_component(id) {
        return Err(Error::new(
            apkforge_core::ErrorCode::InvalidPath,
            format!("Invalid backup id: {:?}", id),
        )
        .with_suggestion("Run `apkforge-recovery list` to see valid backup ids"));
    }
    Ok(id)
}

fn is_single_component(name: &str) -> bool {
    !(name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(|c: char| c == '/' || c == '\\')
        || name.chars().any(char::is_control))
}

//! Restoring a snapshot over the live project

use crate::journal::RecoveryLog;
use crate::snapshot::Artifact;
use crate::store::BackupStore;
use apkforge_core::error::Result;
use apkforge_core::fs_tree;
use apkforge_telemetry::Timer;

/// Copy every artifact captured by snapshot `id` back to its live location.
///
/// The build directory is replaced wholesale; manifests are overwritten file
/// by file. Fails with `SnapshotNotFound` before touching anything if the
/// snapshot has no metadata. A copy failure aborts the restore; artifacts
/// already restored stay restored.
pub fn restore(store: &BackupStore, id: &str, log: &mut RecoveryLog) -> Result<Vec<Artifact>> {
    let snapshot = store.load(id)?;
    let timer = Timer::start("backup.restore");

    log.recovery(format!("Restoring from backup: {}", id));

    let mut restored = Vec::new();
    for (artifact, copy) in snapshot.paths.iter() {
        let live = store.layout().live_path(artifact);
        let result = if artifact.is_tree() {
            fs_tree::remove_tree(&live).and_then(|_| fs_tree::copy_tree(copy, &live).map(|_| ()))
        } else {
            fs_tree::copy_file(copy, &live).map(|_| ())
        };

        if let Err(e) = result {
            log.error(format!("Restore failed: {}", e.message));
            return Err(e);
        }

        log.recovery(format!("Restored {}", artifact.label()));
        restored.push(artifact);
    }

    log.success(format!("Successfully restored from backup: {}", id));
    tracing::debug!(snapshot = %id, elapsed_ms = timer.stop().as_millis() as u64, "restore timing");
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{project, snapshot_tree, timestamp};
    use apkforge_core::fs_tree::list_files;
    use apkforge_core::ErrorCode;
    use std::fs;

    #[test]
    fn test_round_trip_build_directory() {
        let (_temp, layout) = project();
        let store = BackupStore::new(layout.clone());
        let mut log = RecoveryLog::new();

        store.create(Some("v1"), &mut log).unwrap();
        fs::remove_file(layout.build.join("a.txt")).unwrap();
        fs::remove_file(layout.build.join("b.txt")).unwrap();

        restore(&store, "v1", &mut log).unwrap();

        assert_eq!(list_files(&layout.build).unwrap(), vec!["a.txt", "b.txt"]);
        assert_eq!(fs::read_to_string(layout.build.join("a.txt")).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(layout.build.join("b.txt")).unwrap(), "beta");
    }

    #[test]
    fn test_build_is_replaced_not_merged() {
        let (_temp, layout) = project();
        let store = BackupStore::new(layout.clone());
        let mut log = RecoveryLog::new();

        store.create(Some("v1"), &mut log).unwrap();
        fs::write(layout.build.join("stale.js"), "old chunk").unwrap();
        fs::write(layout.build.join("a.txt"), "edited").unwrap();

        let restored = restore(&store, "v1", &mut log).unwrap();

        assert_eq!(list_files(&layout.build).unwrap(), vec!["a.txt", "b.txt"]);
        assert_eq!(fs::read_to_string(layout.build.join("a.txt")).unwrap(), "alpha");
        assert_eq!(
            restored,
            vec![Artifact::Build, Artifact::RootPackage, Artifact::ClientPackage, Artifact::RootLock]
        );
    }

    #[test]
    fn test_manifests_overwritten() {
        let (_temp, layout) = project();
        let store = BackupStore::new(layout.clone());
        let mut log = RecoveryLog::new();

        store.create(Some("v1"), &mut log).unwrap();
        let manifest = layout.live_path(Artifact::ClientPackage);
        fs::write(&manifest, r#"{"name":"broken"}"#).unwrap();

        restore(&store, "v1", &mut log).unwrap();

        assert_eq!(fs::read_to_string(manifest).unwrap(), r#"{"name":"client"}"#);
    }

    #[test]
    fn test_absent_artifacts_are_left_alone() {
        let (_temp, layout) = project();
        let store = BackupStore::new(layout.clone());
        let mut log = RecoveryLog::new();

        store.create(Some("v1"), &mut log).unwrap();
        // created after the snapshot, so the snapshot has no clientLock entry
        let lock = layout.live_path(Artifact::ClientLock);
        fs::write(&lock, "{}").unwrap();

        restore(&store, "v1", &mut log).unwrap();
        assert_eq!(fs::read_to_string(lock).unwrap(), "{}");
    }

    #[test]
    fn test_missing_snapshot_mutates_nothing() {
        let (temp, layout) = project();
        let store = BackupStore::new(layout.clone());
        let mut log = RecoveryLog::new();

        let before = snapshot_tree(temp.path());
        let err = restore(&store, "ghost", &mut log).unwrap_err();

        assert_eq!(err.code, ErrorCode::SnapshotNotFound);
        assert!(err.message.contains("ghost"));
        assert_eq!(snapshot_tree(temp.path()), before);
        assert!(!layout.backup_root.exists());
        assert!(log.is_empty());
    }

    #[test]
    fn test_partial_snapshot_is_not_restorable() {
        let (_temp, layout) = project();
        let store = BackupStore::new(layout.clone());
        let mut log = RecoveryLog::new();

        let partial = layout.backup_root.join("half");
        fs::create_dir_all(partial.join("build")).unwrap();
        fs::write(partial.join("build/only.txt"), "x").unwrap();

        let err = restore(&store, "half", &mut log).unwrap_err();
        assert_eq!(err.code, ErrorCode::SnapshotNotFound);
        assert!(!layout.build.join("only.txt").exists());
    }

    #[test]
    fn test_missing_copy_aborts() {
        let (_temp, layout) = project();
        let store = BackupStore::new(layout.clone());
        let mut log = RecoveryLog::new();

        let snapshot = store.create_at(Some("v1"), timestamp(1_000), &mut log).unwrap();
        fs::remove_file(snapshot.paths.root_package.as_ref().unwrap()).unwrap();

        let err = restore(&store, "v1", &mut log).unwrap_err();
        assert_eq!(err.code, ErrorCode::FileNotFound);
        // build was restored before the failing manifest copy
        assert!(layout.build.join("a.txt").is_file());
        assert!(log
            .messages(crate::journal::LogKind::Error)
            .any(|m| m.starts_with("Restore failed")));
    }
}

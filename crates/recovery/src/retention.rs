//! Pruning old snapshots

use crate::journal::RecoveryLog;
use crate::store::BackupStore;
use apkforge_core::error::Result;
use apkforge_core::fs_tree;
use serde::Serialize;
use std::path::Path;

/// What a cleanup pass did
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupSummary {
    pub kept: Vec<String>,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

impl CleanupSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Keep the `max_backups` most recent snapshots and delete the rest.
///
/// Deletions are independent: a snapshot that cannot be removed is logged
/// and recorded in `failed`, and the remaining deletions still run.
pub fn cleanup(store: &BackupStore, max_backups: usize, log: &mut RecoveryLog) -> Result<CleanupSummary> {
    cleanup_with(store, max_backups, log, fs_tree::remove_tree)
}

/// [`cleanup`] with a custom directory remover
pub fn cleanup_with<F>(
    store: &BackupStore,
    max_backups: usize,
    log: &mut RecoveryLog,
    mut remove: F,
) -> Result<CleanupSummary>
where
    F: FnMut(&Path) -> Result<bool>,
{
    let snapshots = store.list(log)?;
    let mut summary = CleanupSummary::default();

    for (index, snapshot) in snapshots.into_iter().enumerate() {
        if index < max_backups {
            summary.kept.push(snapshot.id);
            continue;
        }

        let dir = store.snapshot_dir(&snapshot.id);
        match remove(&dir) {
            Ok(_) => {
                log.backup(format!("Deleted old backup: {}", snapshot.id));
                summary.deleted.push(snapshot.id);
            }
            Err(e) => {
                log.error(format!("Could not delete backup {}: {}", snapshot.id, e.message));
                summary.failed.push(snapshot.id);
            }
        }
    }

    if !summary.deleted.is_empty() || !summary.failed.is_empty() {
        log.success(format!("Cleaned up {} old backups", summary.deleted.len()));
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::LogKind;
    use crate::testing::{project, timestamp};
    use proptest::prelude::*;

    fn seed(store: &BackupStore, count: usize, log: &mut RecoveryLog) {
        for i in 0..count {
            store
                .create_at(Some(&format!("b{}", i)), timestamp(1_000 * (i as i64 + 1)), log)
                .unwrap();
        }
    }

    #[test]
    fn test_cleanup_keeps_two_newest_of_five() {
        let (_temp, layout) = project();
        let store = BackupStore::new(layout.clone());
        let mut log = RecoveryLog::new();
        seed(&store, 5, &mut log);

        let summary = cleanup(&store, 2, &mut log).unwrap();

        assert_eq!(summary.kept, vec!["b4", "b3"]);
        assert_eq!(summary.deleted, vec!["b2", "b1", "b0"]);
        assert!(summary.is_clean());

        let listed: Vec<_> = store.list(&mut log).unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(listed, vec!["b4", "b3"]);
        for gone in ["b0", "b1", "b2"] {
            assert!(!store.snapshot_dir(gone).exists());
        }
    }

    #[test]
    fn test_cleanup_under_limit_is_noop() {
        let (_temp, layout) = project();
        let store = BackupStore::new(layout);
        let mut log = RecoveryLog::new();
        seed(&store, 3, &mut log);

        let summary = cleanup(&store, 10, &mut log).unwrap();
        assert!(summary.deleted.is_empty());
        assert_eq!(summary.kept.len(), 3);
        assert!(!log.entries().iter().any(|e| e.message.starts_with("Cleaned up")));
    }

    #[test]
    fn test_cleanup_zero_removes_everything() {
        let (_temp, layout) = project();
        let store = BackupStore::new(layout);
        let mut log = RecoveryLog::new();
        seed(&store, 2, &mut log);

        let summary = cleanup(&store, 0, &mut log).unwrap();
        assert_eq!(summary.deleted.len(), 2);
        assert!(store.list(&mut log).unwrap().is_empty());
    }

    #[test]
    fn test_cleanup_leaves_invalid_directories() {
        let (_temp, layout) = project();
        let store = BackupStore::new(layout.clone());
        let mut log = RecoveryLog::new();
        seed(&store, 2, &mut log);
        std::fs::create_dir_all(layout.backup_root.join("partial")).unwrap();

        cleanup(&store, 1, &mut log).unwrap();
        assert!(layout.backup_root.join("partial").is_dir());
    }

    #[test]
    fn test_failed_deletion_does_not_stop_the_rest() {
        let (_temp, layout) = project();
        let store = BackupStore::new(layout);
        let mut log = RecoveryLog::new();
        seed(&store, 4, &mut log);

        let stuck = store.snapshot_dir("b1");
        let summary = cleanup_with(&store, 1, &mut log, |dir| {
            if dir == stuck {
                Err(apkforge_core::Error::io("Permission denied"))
            } else {
                fs_tree::remove_tree(dir)
            }
        })
        .unwrap();

        assert_eq!(summary.kept, vec!["b3"]);
        assert_eq!(summary.deleted, vec!["b2", "b0"]);
        assert_eq!(summary.failed, vec!["b1"]);
        assert!(!summary.is_clean());

        assert!(store.snapshot_dir("b1").is_dir());
        assert!(!store.snapshot_dir("b0").exists());
        assert!(log
            .messages(LogKind::Error)
            .any(|m| m == "Could not delete backup b1: Permission denied"));
        assert!(log.messages(LogKind::Success).any(|m| m == "Cleaned up 2 old backups"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_cleanup_keeps_min_n_total(total in 0usize..7, keep in 0usize..9) {
            let (_temp, layout) = project();
            let store = BackupStore::new(layout);
            let mut log = RecoveryLog::new();
            seed(&store, total, &mut log);

            cleanup(&store, keep, &mut log).unwrap();

            let remaining: Vec<_> = store.list(&mut log).unwrap().into_iter().map(|s| s.id).collect();
            let expected: Vec<_> = (0..total).rev().take(keep).map(|i| format!("b{}", i)).collect();
            prop_assert_eq!(remaining, expected);
        }
    }
}

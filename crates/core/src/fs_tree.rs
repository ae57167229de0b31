//! Directory tree utilities
//!
//! Recursive copy, delete and size accounting over plain directory trees.
//! Missing sources are never errors: callers use that to make backup and
//! restore steps optional.

use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Recursively copy `src` into `dest`.
///
/// `dest` and every intermediate directory are created as needed. Existing
/// files under `dest` with the same relative path are overwritten; other
/// files already in `dest` are left alone. Symlinks are followed, so the
/// copy contains regular files only. Returns the number of files copied,
/// which is 0 when `src` does not exist.
pub fn copy_tree(src: &Path, dest: &Path) -> Result<usize> {
    if !src.exists() {
        return Ok(0);
    }

    fs::create_dir_all(dest).map_err(|e| Error::io_at(dest, e))?;

    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(true).min_depth(1) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| Error::io(format!("{} escaped {}", entry.path().display(), src.display())))?;
        let target = dest.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| Error::io_at(&target, e))?;
        } else {
            copy_file(entry.path(), &target)?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Copy a single file, creating the destination's parent directory.
pub fn copy_file(src: &Path, dest: &Path) -> Result<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
    }
    fs::copy(src, dest).map_err(|e| Error::io_at(src, e))
}

/// Delete a directory tree. Returns `false` if there was nothing to delete.
pub fn remove_tree(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_dir_all(path).map_err(|e| Error::io_at(path, e))?;
    Ok(true)
}

/// Total size in bytes of the regular files under `path` (0 if missing).
pub fn disk_usage(path: &Path) -> Result<u64> {
    if !path.exists() {
        return Ok(0);
    }

    let mut total = 0;
    for entry in WalkDir::new(path) {
        let entry = entry?;
        if entry.file_type().is_file() {
            total += entry.metadata()?.len();
        }
    }
    Ok(total)
}

/// Relative paths of every regular file under `root`, sorted.
pub fn list_files(root: &Path) -> Result<Vec<String>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file() {
            if let Ok(rel) = entry.path().strip_prefix(root) {
                files.push(rel.to_string_lossy().replace('\\', "/"));
            }
        }
    }
    files.sort();
    Ok(files)
}

//! Canonical live locations of everything the recovery tooling touches

use crate::snapshot::Artifact;
use apkforge_core::config::{resolve_against, RecoveryConfig};
use apkforge_core::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Absolute paths resolved once from [`RecoveryConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub client: PathBuf,
    pub build: PathBuf,
    pub backup_root: PathBuf,
    pub logs_dir: PathBuf,
}

impl ProjectLayout {
    /// Resolve the layout; `root_override` replaces `project.root_dir`.
    pub fn from_config(config: &RecoveryConfig, root_override: Option<&Path>) -> Result<Self> {
        let root = root_override.unwrap_or(&config.project.root_dir);
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|e| Error::io(format!("Cannot determine working directory: {}", e)))?
                .join(root)
        };
        Ok(Self::new(root, config))
    }

    /// Build a layout under an already absolute root
    pub fn new(root: PathBuf, config: &RecoveryConfig) -> Self {
        let client = root.join(&config.project.client_dir);
        let build = client.join(&config.project.build_dir);
        let backup_root = resolve_against(&root, &config.project.backup_dir);
        let logs_dir = resolve_against(&root, &config.project.logs_dir);

        Self {
            root,
            client,
            build,
            backup_root,
            logs_dir,
        }
    }

    /// Where an artifact lives in the working project
    pub fn live_path(&self, artifact: Artifact) -> PathBuf {
        match artifact {
            Artifact::Build => self.build.clone(),
            Artifact::RootPackage => self.root.join("package.json"),
            Artifact::ClientPackage => self.client.join("package.json"),
            Artifact::RootLock => self.root.join("package-lock.json"),
            Artifact::ClientLock => self.client.join("package-lock.json"),
        }
    }

    /// Dependency install directories wiped by emergency recovery
    pub fn dependency_dirs(&self) -> [PathBuf; 2] {
        [self.root.join("node_modules"), self.client.join("node_modules")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let root = PathBuf::from("/srv/app");
        let layout = ProjectLayout::new(root.clone(), &RecoveryConfig::default());

        assert_eq!(layout.client, root.join("client"));
        assert_eq!(layout.build, root.join("client").join("build"));
        assert_eq!(layout.backup_root, root.join(".build-backups"));
        assert_eq!(layout.logs_dir, root.join("logs"));
        assert_eq!(
            layout.live_path(Artifact::ClientLock),
            root.join("client").join("package-lock.json")
        );
        assert_eq!(
            layout.dependency_dirs()[1],
            root.join("client").join("node_modules")
        );
    }

    #[test]
    fn test_relative_root_is_made_absolute() {
        let layout =
            ProjectLayout::from_config(&RecoveryConfig::default(), Some(Path::new("proj"))).unwrap();
        assert!(layout.root.is_absolute());
        assert!(layout.root.ends_with("proj"));
    }
}

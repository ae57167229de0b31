//! Configuration schema definitions

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RecoveryConfig {
    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub commands: CommandsConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RecoveryConfig {
    /// Check values that would otherwise fail late, mid-recovery
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("project.client_dir", &self.project.client_dir),
            ("project.build_dir", &self.project.build_dir),
        ] {
            if value.as_os_str().is_empty() {
                return Err(Error::invalid_config(format!("{} must not be empty", name)));
            }
            if value.is_absolute() {
                return Err(Error::invalid_config(format!(
                    "{} must be relative, got {}",
                    name,
                    value.display()
                )));
            }
        }

        if self.commands.install.is_empty() {
            return Err(Error::invalid_config("commands.install must name a program"));
        }
        if self.commands.verify.is_empty() {
            return Err(Error::invalid_config("commands.verify must name a program"));
        }
        if self.commands.install_timeout_secs == 0 || self.commands.verify_timeout_secs == 0 {
            return Err(Error::invalid_config("command timeouts must be at least one second"));
        }

        Ok(())
    }
}

/// Project directory layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfig {
    /// Project root; relative values resolve against the working directory
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,

    /// Client (React app) directory, relative to the root
    #[serde(default = "default_client_dir")]
    pub client_dir: PathBuf,

    /// Build output directory, relative to the client directory
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,

    /// Backup root, relative to the project root unless absolute
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Report directory, relative to the project root unless absolute
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            client_dir: default_client_dir(),
            build_dir: default_build_dir(),
            backup_dir: default_backup_dir(),
            logs_dir: default_logs_dir(),
        }
    }
}

fn default_root_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_client_dir() -> PathBuf {
    PathBuf::from("client")
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("build")
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from(".build-backups")
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

/// External commands used during recovery
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandsConfig {
    /// Dependency install command, run in the root and client directories
    #[serde(default = "default_install")]
    pub install: Vec<String>,

    /// Post-recovery verification command, run in the root directory
    #[serde(default = "default_verify")]
    pub verify: Vec<String>,

    #[serde(default = "default_install_timeout")]
    pub install_timeout_secs: u64,

    #[serde(default = "default_verify_timeout")]
    pub verify_timeout_secs: u64,
}

impl CommandsConfig {
    /// Install timeout as a duration
    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }

    /// Verify timeout as a duration
    pub fn verify_timeout(&self) -> Duration {
        Duration::from_secs(self.verify_timeout_secs)
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            install: default_install(),
            verify: default_verify(),
            install_timeout_secs: default_install_timeout(),
            verify_timeout_secs: default_verify_timeout(),
        }
    }
}

fn default_install() -> Vec<String> {
    vec!["npm".to_string(), "install".to_string()]
}

fn default_verify() -> Vec<String> {
    vec!["npm".to_string(), "run".to_string(), "verify:deps".to_string()]
}

fn default_install_timeout() -> u64 {
    300
}

fn default_verify_timeout() -> u64 {
    120
}

/// Backup retention
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetentionConfig {
    /// Snapshots kept by `cleanup` when no count is given
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_backups: default_max_backups(),
        }
    }
}

fn default_max_backups() -> usize {
    10
}

/// Log output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolve `path` against `base` unless it is already absolute
pub fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = RecoveryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retention.max_backups, 10);
        assert_eq!(config.commands.install, vec!["npm", "install"]);
        assert_eq!(config.commands.install_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: RecoveryConfig = toml::from_str(
            r#"
            [project]
            client_dir = "web"

            [retention]
            max_backups = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.project.client_dir, PathBuf::from("web"));
        assert_eq!(config.project.build_dir, PathBuf::from("build"));
        assert_eq!(config.retention.max_backups, 3);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validate_rejects_empty_install() {
        let mut config = RecoveryConfig::default();
        config.commands.install.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = RecoveryConfig::default();
        config.commands.verify_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_validate_rejects_absolute_build_dir() {
        let mut config = RecoveryConfig::default();
        config.project.build_dir = PathBuf::from("/var/build");
        let err = config.validate().unwrap_err();
        assert!(err.message.contains("project.build_dir"));
    }

    #[test]
    fn test_resolve_against() {
        let base = Path::new("/srv/app");
        assert_eq!(resolve_against(base, Path::new("logs")), base.join("logs"));
        #[cfg(unix)]
        assert_eq!(resolve_against(base, Path::new("/tmp/b")), PathBuf::from("/tmp/b"));
    }
}

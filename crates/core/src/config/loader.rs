//! Configuration file loading

use super::schema::RecoveryConfig;
use crate::error::{Error, Result, ResultExt};
use std::path::{Path, PathBuf};

/// Configuration file names probed under the project root, in order
const CANDIDATES: [&str; 3] = [".apkforge.toml", "apkforge.toml", ".config/apkforge.toml"];

/// Configuration wrapper
#[derive(Debug, Clone)]
pub struct Config {
    pub schema: RecoveryConfig,
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from an explicit path, or search `search_root`
    /// for a config file, or fall back to defaults.
    ///
    /// An explicit path that does not exist is an error; a missing
    /// discovered file is not.
    pub fn load(path: Option<&Path>, search_root: &Path) -> Result<Self> {
        let config_path = match path {
            Some(p) if !p.exists() => return Err(Error::config_not_found(p)),
            Some(p) => Some(p.to_path_buf()),
            None => find_config_file(search_root),
        };

        let schema = match &config_path {
            Some(p) => load_config_file(p)?,
            None => RecoveryConfig::default(),
        };

        schema
            .validate()
            .context(match &config_path {
                Some(p) => format!("in {}", p.display()),
                None => "in built-in defaults".to_string(),
            })?;

        Ok(Self {
            schema,
            path: config_path,
        })
    }
}

/// Find configuration file in standard locations
fn find_config_file(root: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|candidate| root.join(candidate))
        .find(|p| p.exists())
}

/// Load and parse a TOML configuration file
fn load_config_file(path: &Path) -> Result<RecoveryConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("Failed to read config file {}: {}", path.display(), e)))?;

    let schema: RecoveryConfig = toml::from_str(&content)
        .map_err(Error::from)
        .context(format!("while parsing {}", path.display()))?;
    Ok(schema)
}

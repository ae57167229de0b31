//! Snapshot records and their on-disk metadata document
//!
//! A snapshot directory is valid only once `backup-metadata.json` exists in
//! it; the metadata file is always the last thing written.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metadata document name inside each snapshot directory
pub const METADATA_FILE: &str = "backup-metadata.json";

/// Artifacts captured by a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Artifact {
    /// Client build output directory
    Build,
    /// Root `package.json`
    RootPackage,
    /// Client `package.json`
    ClientPackage,
    /// Root `package-lock.json`
    RootLock,
    /// Client `package-lock.json`
    ClientLock,
}

impl Artifact {
    /// Capture and restore order
    pub const ALL: [Artifact; 5] = [
        Artifact::Build,
        Artifact::RootPackage,
        Artifact::ClientPackage,
        Artifact::RootLock,
        Artifact::ClientLock,
    ];

    /// Name of the copy inside the snapshot directory
    pub fn file_name(self) -> &'static str {
        match self {
            Artifact::Build => "build",
            Artifact::RootPackage => "package.json",
            Artifact::ClientPackage => "client-package.json",
            Artifact::RootLock => "package-lock.json",
            Artifact::ClientLock => "client-package-lock.json",
        }
    }

    /// Human label for log lines
    pub fn label(self) -> &'static str {
        match self {
            Artifact::Build => "build directory",
            Artifact::RootPackage => "root package.json",
            Artifact::ClientPackage => "client package.json",
            Artifact::RootLock => "root package-lock.json",
            Artifact::ClientLock => "client package-lock.json",
        }
    }

    /// Whether the artifact is a directory tree rather than a single file
    pub fn is_tree(self) -> bool {
        matches!(self, Artifact::Build)
    }
}

/// Absolute paths of captured copies; a field is set only if the source
/// existed at capture time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPaths {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_package: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_package: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_lock: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_lock: Option<PathBuf>,
}

impl SnapshotPaths {
    pub fn get(&self, artifact: Artifact) -> Option<&Path> {
        match artifact {
            Artifact::Build => self.build.as_deref(),
            Artifact::RootPackage => self.root_package.as_deref(),
            Artifact::ClientPackage => self.client_package.as_deref(),
            Artifact::RootLock => self.root_lock.as_deref(),
            Artifact::ClientLock => self.client_lock.as_deref(),
        }
    }

    pub fn set(&mut self, artifact: Artifact, path: PathBuf) {
        let slot = match artifact {
            Artifact::Build => &mut self.build,
            Artifact::RootPackage => &mut self.root_package,
            Artifact::ClientPackage => &mut self.client_package,
            Artifact::RootLock => &mut self.root_lock,
            Artifact::ClientLock => &mut self.client_lock,
        };
        *slot = Some(path);
    }

    /// Captured artifacts with their copy paths, in restore order
    pub fn iter(&self) -> impl Iterator<Item = (Artifact, &Path)> + '_ {
        Artifact::ALL
            .into_iter()
            .filter_map(move |a| self.get(a).map(|p| (a, p)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Environment descriptors recorded for diagnostics only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentInfo {
    #[serde(alias = "nodeVersion")]
    pub runtime_version: String,
    pub platform: String,
    pub cwd: String,
}

impl EnvironmentInfo {
    pub fn current() -> Self {
        Self {
            runtime_version: format!("apkforge-recovery {}", env!("CARGO_PKG_VERSION")),
            platform: std::env::consts::OS.to_string(),
            cwd: std::env::current_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }
}

/// A captured, restorable copy of build outputs and manifests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: String,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub paths: SnapshotPaths,
    #[serde(default)]
    pub metadata: EnvironmentInfo,
}

impl Snapshot {
    /// Identifier used when no label is given
    pub fn generated_id(at: DateTime<Utc>) -> String {
        format!("backup-{}", at.timestamp_millis())
    }
}

/// ISO-8601 timestamps with millisecond precision and a `Z` suffix
pub(crate) mod iso_millis {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generated_id_uses_epoch_millis() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(Snapshot::generated_id(at), "backup-1700000000123");
    }

    #[test]
    fn test_paths_only_serialize_present_keys() {
        let mut paths = SnapshotPaths::default();
        paths.set(Artifact::Build, PathBuf::from("/b/v1/build"));
        paths.set(Artifact::ClientLock, PathBuf::from("/b/v1/client-package-lock.json"));

        let json = serde_json::to_value(&paths).unwrap();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["build", "clientLock"]);

        let captured: Vec<_> = paths.iter().map(|(a, _)| a).collect();
        assert_eq!(captured, vec![Artifact::Build, Artifact::ClientLock]);
    }

    #[test]
    fn test_metadata_document_shape() {
        let snapshot = Snapshot {
            id: "v1".to_string(),
            timestamp: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
            paths: SnapshotPaths::default(),
            metadata: EnvironmentInfo {
                runtime_version: "apkforge-recovery 0.3.0".to_string(),
                platform: "linux".to_string(),
                cwd: "/srv/app".to_string(),
            },
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["timestamp"], "2023-11-14T22:13:20.123Z");
        assert_eq!(json["metadata"]["runtimeVersion"], "apkforge-recovery 0.3.0");

        let back: Snapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_reads_legacy_metadata() {
        let raw = r#"{
            "id": "backup-1700000000000",
            "timestamp": "2023-11-14T22:13:20.000Z",
            "paths": { "rootPackage": "/srv/app/.build-backups/backup-1700000000000/package.json" },
            "metadata": { "nodeVersion": "v18.17.0", "platform": "linux", "cwd": "/srv/app" }
        }"#;

        let snapshot: Snapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snapshot.metadata.runtime_version, "v18.17.0");
        assert!(snapshot.paths.get(Artifact::RootPackage).is_some());
        assert!(snapshot.paths.get(Artifact::Build).is_none());
    }

    #[test]
    fn test_rejects_bad_timestamp() {
        let raw = r#"{ "id": "x", "timestamp": "yesterday", "paths": {} }"#;
        assert!(serde_json::from_str::<Snapshot>(raw).is_err());
    }
}

//! Test fixtures: scratch projects and a scripted command runner

use crate::layout::ProjectLayout;
use apkforge_core::config::RecoveryConfig;
use apkforge_core::error::Result;
use apkforge_core::process::{CommandResult, CommandRunner, CommandSpec};
use chrono::{DateTime, TimeZone, Utc};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// A project with a two-file build, both root manifests and the client
/// `package.json`. There is no client lockfile.
pub fn project() -> (TempDir, ProjectLayout) {
    let temp = TempDir::new().unwrap();
    let layout = ProjectLayout::new(temp.path().to_path_buf(), &RecoveryConfig::default());

    fs::create_dir_all(&layout.build).unwrap();
    fs::write(layout.build.join("a.txt"), "alpha").unwrap();
    fs::write(layout.build.join("b.txt"), "beta").unwrap();
    fs::write(layout.root.join("package.json"), r#"{"name":"root"}"#).unwrap();
    fs::write(layout.root.join("package-lock.json"), r#"{"lockfileVersion":3}"#).unwrap();
    fs::write(layout.client.join("package.json"), r#"{"name":"client"}"#).unwrap();

    (temp, layout)
}

pub fn timestamp(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

/// Relative path -> contents for every file under `root`
pub fn snapshot_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    apkforge_core::fs_tree::list_files(root)
        .unwrap()
        .into_iter()
        .map(|rel| {
            let bytes = fs::read(root.join(&rel)).unwrap();
            (rel, bytes)
        })
        .collect()
}

type Responder = Box<dyn Fn(&CommandSpec) -> Result<CommandResult>>;

/// Records every invocation and answers from a closure (exit 0 by default)
pub struct ScriptedRunner {
    calls: RefCell<Vec<CommandSpec>>,
    responder: Responder,
}

impl ScriptedRunner {
    pub fn succeeding() -> Self {
        Self::with(|_| Ok(CommandResult::with_exit_code(0, "", "")))
    }

    pub fn with(responder: impl Fn(&CommandSpec) -> Result<CommandResult> + 'static) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandResult> {
        self.calls.borrow_mut().push(spec.clone());
        (self.responder)(spec)
    }
}

//! Emergency recovery pipeline
//!
//! Four steps run strictly in order:
//!
//! 1. clean corrupted state (fatal)
//! 2. restore the most recent snapshot (best effort)
//! 3. reinstall dependencies (fatal)
//! 4. verify the recovery (best effort)
//!
//! A fatal step failure stops the pipeline and the remaining steps are
//! reported as skipped. A best-effort failure is logged as a warning.

use crate::journal::RecoveryLog;
use crate::restore::restore;
use crate::store::BackupStore;
use apkforge_core::config::CommandsConfig;
use apkforge_core::error::{Error, ErrorReport, Result};
use apkforge_core::fs_tree;
use apkforge_core::process::{CommandRunner, CommandSpec};
use apkforge_telemetry::Timer;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    CleanCorruptedState,
    RestoreLatestBackup,
    ReinstallDependencies,
    VerifyRecovery,
}

/// One pipeline stage
#[derive(Debug, Clone, Copy)]
pub struct RecoveryStep {
    pub kind: StepKind,
    pub name: &'static str,
    /// Failure aborts the pipeline
    pub fatal: bool,
}

pub const STEPS: [RecoveryStep; 4] = [
    RecoveryStep {
        kind: StepKind::CleanCorruptedState,
        name: "Clean corrupted files",
        fatal: true,
    },
    RecoveryStep {
        kind: StepKind::RestoreLatestBackup,
        name: "Restore from latest backup",
        fatal: false,
    },
    RecoveryStep {
        kind: StepKind::ReinstallDependencies,
        name: "Reinstall dependencies",
        fatal: true,
    },
    RecoveryStep {
        kind: StepKind::VerifyRecovery,
        name: "Verify recovery",
        fatal: false,
    },
];

/// Pipeline state; step numbers are 1-based
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum PipelineState {
    NotStarted,
    Running { step: usize },
    Succeeded,
    Failed { step: usize, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StepStatus {
    Succeeded,
    /// Best-effort step failed; the pipeline carried on
    Degraded,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub step: usize,
    pub name: String,
    pub fatal: bool,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Set on failed and degraded steps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
    pub duration_ms: u64,
}

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryOutcome {
    pub state: PipelineState,
    pub steps: Vec<StepReport>,
}

impl RecoveryOutcome {
    fn new() -> Self {
        Self {
            state: PipelineState::NotStarted,
            steps: Vec::with_capacity(STEPS.len()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == PipelineState::Succeeded
    }

    /// 1-based index of the fatal step that stopped the pipeline
    pub fn failed_step(&self) -> Option<usize> {
        match self.state {
            PipelineState::Failed { step, .. } => Some(step),
            _ => None,
        }
    }

    fn push(&mut self, index: usize, step: &RecoveryStep, status: StepStatus, error: Option<&Error>, duration: Duration) {
        self.steps.push(StepReport {
            step: index + 1,
            name: step.name.to_string(),
            fatal: step.fatal,
            status,
            message: error.map(|e| e.message.clone()),
            error: error.map(Error::to_report),
            duration_ms: duration.as_millis() as u64,
        });
    }
}

/// Runs the emergency recovery pipeline against one project
pub struct EmergencyRecovery<'a> {
    store: &'a BackupStore,
    commands: &'a CommandsConfig,
    runner: &'a dyn CommandRunner,
}

impl<'a> EmergencyRecovery<'a> {
    pub fn new(store: &'a BackupStore, commands: &'a CommandsConfig, runner: &'a dyn CommandRunner) -> Self {
        Self {
            store,
            commands,
            runner,
        }
    }

    /// Run every step in order until completion or a fatal failure
    pub fn run(&self, log: &mut RecoveryLog) -> RecoveryOutcome {
        log.recovery("Starting emergency recovery...");
        let mut outcome = RecoveryOutcome::new();

        for (index, step) in STEPS.iter().enumerate() {
            outcome.state = PipelineState::Running { step: index + 1 };
            log.recovery(format!("Executing recovery step: {}", step.name));

            let timer = Timer::start(step.name);
            let result = self.execute(step.kind, log);
            let elapsed = timer.stop();

            match result {
                Ok(()) => outcome.push(index, step, StepStatus::Succeeded, None, elapsed),
                Err(e) if step.fatal => {
                    let reason = e.message.clone();
                    log.error(Error::step_failed(step.name, &reason).message);
                    outcome.push(index, step, StepStatus::Failed, Some(&e), elapsed);
                    for (skipped, rest) in STEPS.iter().enumerate().skip(index + 1) {
                        outcome.push(skipped, rest, StepStatus::Skipped, None, Duration::ZERO);
                    }
                    outcome.state = PipelineState::Failed {
                        step: index + 1,
                        reason,
                    };
                    log.error("Emergency recovery failed");
                    return outcome;
                }
                Err(e) => {
                    log.warn(format!("Recovery step degraded: {} - {}", step.name, e.message));
                    outcome.push(index, step, StepStatus::Degraded, Some(&e), elapsed);
                }
            }
        }

        outcome.state = PipelineState::Succeeded;
        log.success("Emergency recovery completed successfully");
        outcome
    }

    fn execute(&self, kind: StepKind, log: &mut RecoveryLog) -> Result<()> {
        match kind {
            StepKind::CleanCorruptedState => self.clean(log),
            StepKind::RestoreLatestBackup => self.restore_latest(log),
            StepKind::ReinstallDependencies => self.reinstall(log),
            StepKind::VerifyRecovery => self.verify(log),
        }
    }

    fn clean(&self, log: &mut RecoveryLog) -> Result<()> {
        let layout = self.store.layout();
        let [root_modules, client_modules] = layout.dependency_dirs();

        if fs_tree::remove_tree(&layout.build)? {
            log.recovery("Removed corrupted build directory");
        }
        if fs_tree::remove_tree(&root_modules)? {
            log.recovery("Removed root node_modules");
        }
        if fs_tree::remove_tree(&client_modules)? {
            log.recovery("Removed client node_modules");
        }
        Ok(())
    }

    fn restore_latest(&self, log: &mut RecoveryLog) -> Result<()> {
        let backups = self.store.list(log)?;
        match backups.first() {
            Some(latest) => {
                restore(self.store, &latest.id, log)?;
                log.recovery(format!("Restored from latest backup: {}", latest.id));
            }
            None => log.warn("No backups available for restore"),
        }
        Ok(())
    }

    fn reinstall(&self, log: &mut RecoveryLog) -> Result<()> {
        let layout = self.store.layout();
        for dir in [&layout.root, &layout.client] {
            if let Err(e) = self.run_in(&self.commands.install, dir, self.commands.install_timeout()) {
                log.error("Dependency installation failed");
                return Err(e);
            }
        }
        log.recovery("Dependencies reinstalled");
        Ok(())
    }

    fn verify(&self, log: &mut RecoveryLog) -> Result<()> {
        let root = &self.store.layout().root;
        match self.run_in(&self.commands.verify, root, self.commands.verify_timeout()) {
            Ok(()) => {
                log.success("Recovery verification passed");
                Ok(())
            }
            Err(e) => {
                log.warn("Recovery verification failed");
                Err(e)
            }
        }
    }

    fn run_in(&self, argv: &[String], dir: &Path, timeout: Duration) -> Result<()> {
        if !dir.is_dir() {
            return Err(Error::io(format!("Directory not found: {}", dir.display())));
        }
        let spec = CommandSpec::from_argv(argv)?.in_dir(dir).with_timeout(timeout);
        let command_line = spec.display();
        tracing::info!(command = %command_line, dir = %dir.display(), "running");

        self.runner.run(&spec)?.into_checked(&command_line)?;
        Ok(())
    }
}

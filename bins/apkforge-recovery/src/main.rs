//! APK build recovery CLI
//!
//! Snapshots, restores and emergency recovery for the client build.

mod runner;

use anyhow::Context;
use apkforge_cli::output::{self, format_count, format_duration, format_size, Status};
use apkforge_core::config::Config;
use apkforge_core::error::{exit_codes, Error};
use apkforge_core::process::{which_command, SystemRunner};
use apkforge_recovery::{BuildRecovery, ProjectLayout, RecoveryReport, StepStatus};
use apkforge_telemetry::{level_for_verbosity, TelemetryConfig};
use clap::{Parser, Subcommand};
use runner::SpinnerRunner;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

type Recovery = BuildRecovery<SpinnerRunner<SystemRunner>>;

#[derive(Parser)]
#[command(name = "apkforge-recovery")]
#[command(about = "Backup, restore and emergency recovery for the APK build")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Project root (defaults to project.root_dir from the config)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Increase output verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Don't write a recovery report for this run
    #[arg(long, global = true)]
    no_report: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Snapshot the current build output and manifests
    Backup {
        /// Snapshot id (defaults to backup-<epoch-ms>)
        label: Option<String>,
    },

    /// List valid snapshots, most recent first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Restore a snapshot over the live project
    Restore {
        /// Snapshot id
        id: Option<String>,
    },

    /// Clean, restore the latest snapshot, reinstall and verify
    Emergency,

    /// Delete all but the most recent snapshots
    Cleanup {
        /// Number of snapshots to keep (defaults to retention.max_backups)
        max_backups: Option<usize>,
    },

    /// Write a recovery report
    Report,

    /// Check that the install and verify tools are available
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }
    output::set_quiet(cli.quiet);

    let (config, layout) = match bootstrap(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            Status::error(&format!("{:#}", e));
            let code = match e.downcast_ref::<Error>() {
                Some(err) if err.code.category() == "Configuration" => exit_codes::CONFIG_ERROR,
                _ => exit_codes::FAILURE,
            };
            return exit(code);
        }
    };

    let telemetry = TelemetryConfig {
        log_level: level_for_verbosity(&config.schema.logging.level, cli.verbose, cli.quiet),
        json: cli.json_logs,
        ..TelemetryConfig::default()
    };
    if let Err(e) = apkforge_telemetry::init_with_config(telemetry) {
        Status::warning(&format!("Logging disabled: {}", e));
    }

    if let Some(path) = &config.path {
        tracing::debug!(config = %path.display(), "loaded configuration");
    }
    tracing::debug!(root = %layout.root.display(), backups = %layout.backup_root.display(), "project layout");

    let schema = config.schema;
    let runner = SpinnerRunner::new(SystemRunner, !cli.quiet);
    let mut recovery = BuildRecovery::new(layout, schema.commands.clone(), runner);
    let write_report = !cli.no_report;

    let code = match cli.command {
        Commands::Backup { label } => run_backup(&mut recovery, label.as_deref(), write_report),
        Commands::List { json } => run_list(&mut recovery, json),
        Commands::Restore { id } => run_restore(&mut recovery, id.as_deref(), write_report),
        Commands::Emergency => run_emergency(&mut recovery, write_report),
        Commands::Cleanup { max_backups } => run_cleanup(
            &mut recovery,
            max_backups.unwrap_or(schema.retention.max_backups),
            write_report,
        ),
        Commands::Report => run_report(&mut recovery),
        Commands::Doctor { json } => run_doctor(&schema.commands.install, &schema.commands.verify, json),
    };

    exit(code)
}

fn bootstrap(cli: &Cli) -> anyhow::Result<(Config, ProjectLayout)> {
    let search_root = cli.root.as_deref().unwrap_or(Path::new("."));
    let config = Config::load(cli.config.as_deref(), search_root).context("Failed to load configuration")?;
    let layout = ProjectLayout::from_config(&config.schema, cli.root.as_deref())
        .context("Failed to resolve project layout")?;
    Ok((config, layout))
}

fn exit(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

/// Print an error with its context and suggestion, return the failure code
fn fail(err: &Error) -> i32 {
    Status::error(&err.message);
    if let Some(context) = &err.context {
        eprintln!("  {}", context);
    }
    if let Some(suggestion) = &err.suggestion {
        Status::info(suggestion);
    }
    tracing::debug!(code = err.code.code(), "command failed");
    exit_codes::FAILURE
}

fn save_report(recovery: &mut Recovery, report: RecoveryReport) {
    match recovery.save_report(&report) {
        Ok(path) => Status::info(&format!("Recovery report saved to: {}", path.display())),
        Err(e) => Status::warning(&format!("Could not write recovery report: {}", e.message)),
    }
}

fn report_after(recovery: &mut Recovery, enabled: bool) {
    if !enabled {
        return;
    }
    match recovery.generate_report() {
        Ok(report) => save_report(recovery, report),
        Err(e) => Status::warning(&format!("Could not generate recovery report: {}", e.message)),
    }
}

fn run_backup(recovery: &mut Recovery, label: Option<&str>, write_report: bool) -> i32 {
    let code = match recovery.create_backup(label) {
        Ok(snapshot) => {
            Status::success(&format!(
                "Backup created: {} ({})",
                snapshot.id,
                format_count(snapshot.paths.iter().count(), "artifact", "artifacts")
            ));
            exit_codes::SUCCESS
        }
        Err(e) => fail(&e),
    };
    report_after(recovery, write_report);
    code
}

fn run_list(recovery: &mut Recovery, json: bool) -> i32 {
    let backups = match recovery.list_backups() {
        Ok(backups) => backups,
        Err(e) => return fail(&e),
    };

    if json {
        return match serde_json::to_string_pretty(&backups) {
            Ok(out) => {
                println!("{}", out);
                exit_codes::SUCCESS
            }
            Err(e) => fail(&Error::from(e)),
        };
    }

    if backups.is_empty() {
        Status::info("No backups found");
        return exit_codes::SUCCESS;
    }

    Status::header(&format!("Available backups ({})", backups.len()));
    for snapshot in &backups {
        let captured: Vec<_> = snapshot.paths.iter().map(|(artifact, _)| artifact.label()).collect();
        println!(
            "  {}  {}  {}",
            snapshot.id,
            snapshot.timestamp.format("%Y-%m-%d %H:%M:%S%.3f UTC"),
            captured.join(", ")
        );
    }
    exit_codes::SUCCESS
}

fn run_restore(recovery: &mut Recovery, id: Option<&str>, write_report: bool) -> i32 {
    let Some(id) = id else {
        Status::error("Backup ID required for restore");
        Status::info("Usage: apkforge-recovery restore <id>");
        return exit_codes::FAILURE;
    };

    let code = match recovery.restore_backup(id) {
        Ok(restored) => {
            Status::success(&format!(
                "Restored {} from {}",
                format_count(restored.len(), "artifact", "artifacts"),
                id
            ));
            exit_codes::SUCCESS
        }
        Err(e) => fail(&e),
    };
    report_after(recovery, write_report);
    code
}

fn run_emergency(recovery: &mut Recovery, write_report: bool) -> i32 {
    Status::header("Emergency recovery");
    let outcome = recovery.emergency_recovery();

    let total = outcome.steps.len();
    for step in &outcome.steps {
        let line = match &step.message {
            Some(message) => format!("{} - {}", step.name, message),
            None => step.name.clone(),
        };
        Status::step(step.step, total, &line);
        match step.status {
            StepStatus::Succeeded => {}
            StepStatus::Degraded => Status::warning(&format!("{} did not complete; continuing", step.name)),
            StepStatus::Failed => Status::error(&format!("{} failed", step.name)),
            StepStatus::Skipped => {}
        }
    }

    let elapsed: u64 = outcome.steps.iter().map(|s| s.duration_ms).sum();
    let code = if outcome.is_success() {
        Status::success(&format!(
            "Emergency recovery completed in {}",
            format_duration(Duration::from_millis(elapsed))
        ));
        exit_codes::SUCCESS
    } else {
        Status::error(&format!(
            "Emergency recovery failed at step {}",
            outcome.failed_step().unwrap_or(0)
        ));
        exit_codes::FAILURE
    };

    if write_report {
        match recovery.generate_report() {
            Ok(report) => save_report(recovery, report.with_outcome(outcome)),
            Err(e) => Status::warning(&format!("Could not generate recovery report: {}", e.message)),
        }
    }
    code
}

fn run_cleanup(recovery: &mut Recovery, max_backups: usize, write_report: bool) -> i32 {
    let summary = match recovery.cleanup_old_backups(max_backups) {
        Ok(summary) => summary,
        Err(e) => {
            let code = fail(&e);
            report_after(recovery, write_report);
            return code;
        }
    };

    if summary.deleted.is_empty() && summary.failed.is_empty() {
        Status::info(&format!(
            "Nothing to clean up ({} kept)",
            format_count(summary.kept.len(), "backup", "backups")
        ));
    } else {
        Status::success(&format!(
            "Deleted {}, kept {}",
            format_count(summary.deleted.len(), "backup", "backups"),
            summary.kept.len()
        ));
    }
    for id in &summary.failed {
        Status::warning(&format!("Could not delete {}", id));
    }

    if write_report {
        match recovery.generate_report() {
            Ok(report) => save_report(recovery, report.with_cleanup(summary)),
            Err(e) => Status::warning(&format!("Could not generate recovery report: {}", e.message)),
        }
    }
    exit_codes::SUCCESS
}

fn run_report(recovery: &mut Recovery) -> i32 {
    let report = match recovery.generate_report() {
        Ok(report) => report,
        Err(e) => return fail(&e),
    };

    Status::info(&format!(
        "{} using {} in {}",
        format_count(report.available_backups, "backup", "backups"),
        format_size(report.disk_usage),
        report.backup_directory.display()
    ));

    match recovery.save_report(&report) {
        Ok(path) => {
            Status::success(&format!("Recovery report saved to: {}", path.display()));
            exit_codes::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_doctor(install: &[String], verify: &[String], json: bool) -> i32 {
    let tools = [("install", install), ("verify", verify)];
    let checks: Vec<_> = tools
        .iter()
        .map(|(role, argv)| {
            let program = argv.first().map(String::as_str).unwrap_or_default();
            (*role, program, which_command(program))
        })
        .collect();

    if json {
        let value: Vec<_> = checks
            .iter()
            .map(|(role, program, path)| {
                serde_json::json!({
                    "role": role,
                    "program": program,
                    "found": path.is_some(),
                    "path": path,
                })
            })
            .collect();
        println!("{}", serde_json::Value::Array(value));
    } else {
        Status::header("Environment Check");
        for (role, program, path) in &checks {
            match path {
                Some(path) => Status::success(&format!("{} ({}): {}", program, role, path.display())),
                None if *role == "install" => Status::error(&format!("{} ({}): not found", program, role)),
                None => Status::warning(&format!("{} ({}): not found", program, role)),
            }
        }
    }

    if checks.iter().any(|(role, _, path)| *role == "install" && path.is_none()) {
        exit_codes::FAILURE
    } else {
        exit_codes::SUCCESS
    }
}

//! In-memory recovery log
//!
//! Every action is appended here and mirrored to `tracing`. The log lives for
//! one process invocation and is flushed into the recovery report at the end.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry category; serialized as the entry's `type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Warn,
    Error,
    Success,
    Backup,
    Recovery,
}

/// One journal line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: LogKind,
    pub message: String,
}

/// Append-only journal of a single run
#[derive(Debug, Default, Clone)]
pub struct RecoveryLog {
    entries: Vec<LogEntry>,
}

impl RecoveryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and emit it as a tracing event
    pub fn record(&mut self, kind: LogKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            LogKind::Error => tracing::error!(kind = ?kind, "{}", message),
            LogKind::Warn => tracing::warn!(kind = ?kind, "{}", message),
            _ => tracing::info!(kind = ?kind, "{}", message),
        }
        self.entries.push(LogEntry {
            timestamp: Utc::now(),
            kind,
            message,
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.record(LogKind::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.record(LogKind::Warn, message);
    }

    /// Like [`warn`](Self::warn), but skipped if the same warning is already logged
    pub fn warn_once(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.messages(LogKind::Warn).any(|m| m == message) {
            self.record(LogKind::Warn, message);
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.record(LogKind::Error, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.record(LogKind::Success, message);
    }

    pub fn backup(&mut self, message: impl Into<String>) {
        self.record(LogKind::Backup, message);
    }

    pub fn recovery(&mut self, message: impl Into<String>) {
        self.record(LogKind::Recovery, message);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Messages of a given kind, oldest first
    pub fn messages(&self, kind: LogKind) -> impl Iterator<Item = &str> + '_ {
        self.entries
            .iter()
            .filter(move |e| e.kind == kind)
            .map(|e| e.message.as_str())
    }
}

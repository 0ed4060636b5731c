//! Session transcript.
//!
//! Append-only record of every external action a session runs, kept in
//! memory for the final summary and mirrored to a persistent JSONL file
//! for post-mortem diagnosis. One writer (the ActionExecutor), records
//! are never mutated after creation.
//!
//! Storage: /var/log/bastion/session_<id>.jsonl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default log directory.
pub const LOG_DIR: &str = "/var/log/bastion";

/// Terminal outcome of one external action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Success,
    Failure,
}

/// One executed external action. Owned by the SessionLog, append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Short human name for the action ("restart sshd").
    pub name: String,
    /// The command string that was handed to the shell.
    pub command: String,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    /// Exit status; -1 when the process was killed by a signal.
    pub exit_status: i32,
    /// Whether the caller marked this action allow-failure.
    pub allowed_to_fail: bool,
    pub outcome: ActionOutcome,
    /// Combined stdout+stderr, possibly truncated for the in-memory copy.
    pub output: String,
    pub output_truncated: bool,
}

impl ActionRecord {
    pub fn succeeded(&self) -> bool {
        self.outcome == ActionOutcome::Success
    }
}

/// Counts rendered at the end of a wizard.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub actions_run: usize,
    pub tolerated_failures: usize,
    pub log_file: Option<PathBuf>,
}

/// Explicit transcript handle, created once per session and passed to
/// the executor. No process-wide log state.
pub struct SessionLog {
    session_id: String,
    file: Option<PathBuf>,
    records: Vec<ActionRecord>,
}

impl SessionLog {
    /// Open a transcript under `dir`, creating the directory if needed.
    /// Falls back to in-memory only if the directory is unwritable:
    /// losing the transcript must not abort a half-finished mutation.
    pub fn open(dir: &Path) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        let file = match fs::create_dir_all(dir) {
            Ok(()) => Some(dir.join(format!("session_{}.jsonl", session_id))),
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "transcript directory unavailable, logging in memory only");
                None
            }
        };
        Self {
            session_id,
            file,
            records: Vec::new(),
        }
    }

    /// Open under the default log directory.
    pub fn open_default() -> Self {
        Self::open(Path::new(LOG_DIR))
    }

    /// In-memory transcript, used by tests.
    pub fn in_memory() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            file: None,
            records: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Append a record. The persistent mirror is best-effort; a write
    /// failure downgrades to a warning.
    pub fn append(&mut self, record: ActionRecord) {
        if let Some(path) = &self.file {
            if let Err(e) = append_jsonl(path, &record) {
                tracing::warn!(file = %path.display(), error = %e, "failed to persist transcript entry");
            }
        }
        self.records.push(record);
    }

    pub fn records(&self) -> &[ActionRecord] {
        &self.records
    }

    /// Tolerated (allow-failure) actions that failed.
    pub fn tolerated_failures(&self) -> Vec<&ActionRecord> {
        self.records
            .iter()
            .filter(|r| r.allowed_to_fail && !r.succeeded())
            .collect()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            actions_run: self.records.len(),
            tolerated_failures: self.tolerated_failures().len(),
            log_file: self.file.clone(),
        }
    }
}

fn append_jsonl(path: &Path, record: &ActionRecord) -> std::io::Result<()> {
    let json = serde_json::to_string(record)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", json)?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, exit_status: i32, allowed_to_fail: bool) -> ActionRecord {
        let now = Utc::now();
        ActionRecord {
            name: name.to_string(),
            command: format!("true # {}", name),
            started: now,
            finished: now,
            exit_status,
            allowed_to_fail,
            outcome: if exit_status == 0 {
                ActionOutcome::Success
            } else {
                ActionOutcome::Failure
            },
            output: String::new(),
            output_truncated: false,
        }
    }

    #[test]
    fn appends_are_ordered() {
        let mut log = SessionLog::in_memory();
        log.append(record("first", 0, false));
        log.append(record("second", 1, true));

        let names: Vec<&str> = log.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn tolerated_failures_counted() {
        let mut log = SessionLog::in_memory();
        log.append(record("ok", 0, false));
        log.append(record("soft-fail", 1, true));
        log.append(record("soft-ok", 0, true));

        assert_eq!(log.tolerated_failures().len(), 1);
        assert_eq!(log.summary().tolerated_failures, 1);
        assert_eq!(log.summary().actions_run, 3);
    }

    #[test]
    fn persists_jsonl_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = SessionLog::open(dir.path());
        log.append(record("persisted", 0, false));

        let path = log.file_path().unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert_eq!(content.lines().count(), 1);

        let parsed: ActionRecord = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(parsed.name, "persisted");
        assert_eq!(parsed.outcome, ActionOutcome::Success);
    }

    #[test]
    fn unwritable_dir_falls_back_to_memory() {
        let log = SessionLog::open(Path::new("/proc/definitely/not/writable"));
        assert!(log.file_path().is_none());
    }
}

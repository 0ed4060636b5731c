//! External action execution.
//!
//! Runs named, opaque shell actions and records every invocation in the
//! session transcript. This layer does not interpret command output; it
//! captures exit status and combined output exactly as received.
//!
//! Error policy (uniform for the whole core): a strict action that exits
//! non-zero is fatal and unwinds the session; an allow-failure action
//! returns its record so the caller can branch.

use crate::error::{Error, Result};
use crate::session_log::{ActionOutcome, ActionRecord, SessionLog};
use chrono::Utc;
use std::process::Command;

/// Maximum output kept on the in-memory record. The persistent
/// transcript line is written from the same truncated copy; command
/// output beyond this cap is diagnostic noise, not state.
const MAX_OUTPUT_BYTES: usize = 64 * 1024;

/// Executes opaque external actions against the host.
pub struct ActionExecutor {
    log: SessionLog,
}

impl ActionExecutor {
    /// Create an executor writing to the given transcript handle.
    pub fn new(log: SessionLog) -> Self {
        Self { log }
    }

    /// Run a strict action. Non-zero exit is fatal: the record is
    /// logged, then the error unwinds to the top level, which
    /// terminates the process with the action's exit status.
    pub fn run(&mut self, name: &str, command: &str) -> Result<ActionRecord> {
        let record = self.execute(name, command, false)?;
        if !record.succeeded() {
            return Err(Error::FatalAction {
                name: name.to_string(),
                exit_status: record.exit_status,
            });
        }
        Ok(record)
    }

    /// Run an allow-failure action. The failure is logged and returned;
    /// execution continues.
    pub fn run_allowed(&mut self, name: &str, command: &str) -> Result<ActionRecord> {
        self.execute(name, command, true)
    }

    fn execute(&mut self, name: &str, command: &str, allowed_to_fail: bool) -> Result<ActionRecord> {
        tracing::debug!(action = name, command, allowed_to_fail, "executing");
        let started = Utc::now();

        let output = Command::new("sh").arg("-c").arg(command).output();
        let finished = Utc::now();

        let output = match output {
            Ok(o) => o,
            Err(e) => {
                // Failing to spawn the shell at all is always fatal;
                // there is no exit status to tolerate.
                return Err(Error::ActionSpawn {
                    name: name.to_string(),
                    source: e,
                });
            }
        };

        let mut combined = Vec::with_capacity(output.stdout.len() + output.stderr.len());
        combined.extend_from_slice(&output.stdout);
        combined.extend_from_slice(&output.stderr);
        let (text, truncated) = truncate_output(&combined);

        let exit_status = output.status.code().unwrap_or(-1);
        let outcome = if output.status.success() {
            ActionOutcome::Success
        } else {
            ActionOutcome::Failure
        };

        let record = ActionRecord {
            name: name.to_string(),
            command: command.to_string(),
            started,
            finished,
            exit_status,
            allowed_to_fail,
            outcome,
            output: text,
            output_truncated: truncated,
        };

        if outcome == ActionOutcome::Failure {
            tracing::debug!(action = name, exit_status, "action failed");
        }

        self.log.append(record.clone());
        Ok(record)
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    /// Hand the transcript back at the end of the session.
    pub fn into_log(self) -> SessionLog {
        self.log
    }
}

fn truncate_output(bytes: &[u8]) -> (String, bool) {
    let truncated = bytes.len() > MAX_OUTPUT_BYTES;
    let slice = if truncated {
        &bytes[..MAX_OUTPUT_BYTES]
    } else {
        bytes
    };
    (String::from_utf8_lossy(slice).to_string(), truncated)
}

// =============================================================================
// Tests
// =============================================================================

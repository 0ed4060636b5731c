//! Wizard implementations, one module per subcommand.

pub mod node;
pub mod php;
pub mod ssh;

use bastion_common::display;
use bastion_common::session_log::SessionLog;
use bastion_common::staged_install::{InstallOutcome, UnitResult};

/// Default backup directory for pre-mutation config copies.
pub(crate) const BACKUP_BASE: &str = "/var/lib/bastion/backups";

/// Print per-unit results and the failed-unit summary. Failures are
/// surfaced, never silently dropped.
pub(crate) fn report_outcomes(outcomes: &[InstallOutcome]) {
    for outcome in outcomes {
        match outcome.result {
            UnitResult::Installed => {
                display::success(&format!("{} installed", outcome.unit.identifier));
            }
            UnitResult::Skipped => {
                display::info(&format!("{} skipped", outcome.unit.identifier));
            }
            UnitResult::Failed => {
                display::warning(&format!(
                    "{} failed after {} attempts",
                    outcome.unit.identifier,
                    outcome.attempts.len()
                ));
            }
        }
    }

    let failed = bastion_common::staged_install::failed_units(outcomes);
    if !failed.is_empty() {
        let names: Vec<&str> = failed.iter().map(|u| u.identifier.as_str()).collect();
        display::warning(&format!(
            "{} optional unit(s) could not be installed: {}",
            failed.len(),
            names.join(", ")
        ));
    }
}

/// End-of-session summary rendered from the transcript.
pub(crate) fn finish(log: SessionLog) {
    let summary = log.summary();
    println!();
    display::info(&format!(
        "Session {}: {} actions run, {} tolerated failure(s)",
        summary.session_id, summary.actions_run, summary.tolerated_failures
    ));
    if let Some(path) = summary.log_file {
        display::info(&format!("Full transcript: {}", path.display()));
    }
}

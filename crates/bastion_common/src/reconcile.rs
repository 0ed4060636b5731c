//! Version reconciliation.
//!
//! The pure decision step turns an (installed, available) pair into a
//! plan via the comparator; the interactive resolution step walks the
//! operator through the plan's offers to exactly one terminal action.
//! The two steps are separate so the decision table stays testable
//! without a terminal.

use crate::prompt::Prompter;
use crate::version::{compare, Version};
use std::cmp::Ordering;

/// Plan produced once per session by the decision step. The first three
/// variants are offers awaiting resolution; the rest are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationPlan {
    /// A newer version exists; default offer is the upgrade.
    Upgrade(Version),
    /// Installed equals the latest available; offer switch or reinstall.
    AlreadyLatest,
    /// Installed exceeds the known-available set (pre-release or
    /// manually newer); offer switch only.
    AlreadyNewer,
    /// Terminal: switch to an explicitly chosen version.
    SwitchTo(Version),
    /// Terminal: forced reinstall of the current version.
    Reinstall(Version),
    /// Terminal: leave the host untouched.
    NoOp,
}

impl ReconciliationPlan {
    /// Version this plan installs, if it installs anything.
    pub fn target(&self) -> Option<&Version> {
        match self {
            ReconciliationPlan::Upgrade(v)
            | ReconciliationPlan::SwitchTo(v)
            | ReconciliationPlan::Reinstall(v) => Some(v),
            _ => None,
        }
    }
}

/// Pure decision step over the comparator's tri-state result.
pub fn decide(installed: &Version, available: &Version) -> ReconciliationPlan {
    match compare(installed, available) {
        Ordering::Less => ReconciliationPlan::Upgrade(available.clone()),
        Ordering::Equal => ReconciliationPlan::AlreadyLatest,
        Ordering::Greater => ReconciliationPlan::AlreadyNewer,
    }
}

/// Interactively resolve a plan to a terminal variant.
///
/// `known` is the ordered (ascending) set of versions the environment
/// offers; the switch sub-flow enumerates it minus the installed
/// version and re-confirms naming source and destination. An in-flow
/// answer always resolves to exactly one terminal variant; the plan is
/// never re-derived mid-flow.
pub fn resolve(
    plan: ReconciliationPlan,
    installed: &Version,
    known: &[Version],
    prompter: &mut dyn Prompter,
) -> ReconciliationPlan {
    match plan {
        ReconciliationPlan::Upgrade(target) => {
            if prompter.confirm(&format!(
                "Version {} is available (installed: {}). Upgrade?",
                target, installed
            )) {
                ReconciliationPlan::Upgrade(target)
            } else if prompter.confirm("Switch to a different version instead?") {
                switch_flow(installed, known, prompter)
            } else {
                ReconciliationPlan::NoOp
            }
        }
        ReconciliationPlan::AlreadyLatest => {
            if prompter.confirm(&format!(
                "Version {} is already the latest. Switch to another version?",
                installed
            )) {
                switch_flow(installed, known, prompter)
            } else if prompter.confirm(&format!("Force a reinstall of {}?", installed)) {
                ReconciliationPlan::Reinstall(installed.clone())
            } else {
                ReconciliationPlan::NoOp
            }
        }
        ReconciliationPlan::AlreadyNewer => {
            if prompter.confirm(&format!(
                "Installed version {} is newer than any known release. Switch to a known version?",
                installed
            )) {
                switch_flow(installed, known, prompter)
            } else {
                ReconciliationPlan::NoOp
            }
        }
        terminal => terminal,
    }
}

/// Switch sub-flow: enumerate known versions excluding the installed
/// one, then require explicit re-confirmation naming both ends.
fn switch_flow(
    installed: &Version,
    known: &[Version],
    prompter: &mut dyn Prompter,
) -> ReconciliationPlan {
    let candidates: Vec<&Version> = known.iter().filter(|v| *v != installed).collect();
    if candidates.is_empty() {
        return ReconciliationPlan::NoOp;
    }

    let mut options: Vec<String> = candidates.iter().map(|v| v.to_string()).collect();
    options.push("Cancel".to_string());

    let choice = prompter.select("Available versions:", &options);
    if choice >= candidates.len() {
        return ReconciliationPlan::NoOp;
    }

    let destination = candidates[choice].clone();
    if prompter.confirm(&format!(
        "Switch from {} to {}? This removes {} after the new version is live.",
        installed, destination, installed
    )) {
        ReconciliationPlan::SwitchTo(destination)
    } else {
        ReconciliationPlan::NoOp
    }
}

/// Minimum number of failed extension units before the one-time
/// alternate-source offer.
pub const ALTERNATE_SOURCE_THRESHOLD: usize = 3;

/// One-time escape hatch: when the chosen version loses three or more
/// extension units to distribution packaging constraints, offer a
/// single alternate package source switch before giving up. Never
/// offered twice in a session, never recursive.
pub fn offer_alternate_source(
    failed_extensions: usize,
    already_used: bool,
    prompter: &mut dyn Prompter,
) -> bool {
    if already_used || failed_extensions < ALTERNATE_SOURCE_THRESHOLD {
        return false;
    }
    prompter.confirm(&format!(
        "{} extension units failed every install attempt. Add the alternate package source and retry once?",
        failed_extensions
    ))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::ScriptedPrompter;

    fn v(s: &str) -> Version {
        Version::parse(s)
    }

    #[test]
    fn older_installed_offers_upgrade() {
        assert_eq!(
            decide(&v("8.1"), &v("8.3")),
            ReconciliationPlan::Upgrade(v("8.3"))
        );
    }

    #[test]
    fn equal_versions_are_already_latest() {
        assert_eq!(decide(&v("8.3"), &v("8.3")), ReconciliationPlan::AlreadyLatest);
    }

    #[test]
    fn newer_installed_is_already_newer() {
        assert_eq!(decide(&v("8.4"), &v("8.3")), ReconciliationPlan::AlreadyNewer);
    }

    #[test]
    fn accepted_upgrade_resolves_to_upgrade() {
        let mut p = ScriptedPrompter::new(vec![true]);
        let plan = resolve(decide(&v("8.1"), &v("8.3")), &v("8.1"), &[v("8.1"), v("8.3")], &mut p);
        assert_eq!(plan, ReconciliationPlan::Upgrade(v("8.3")));
    }

    #[test]
    fn declined_upgrade_then_declined_switch_is_noop() {
        let mut p = ScriptedPrompter::new(vec![false, false]);
        let plan = resolve(decide(&v("8.1"), &v("8.3")), &v("8.1"), &[v("8.1"), v("8.3")], &mut p);
        assert_eq!(plan, ReconciliationPlan::NoOp);
    }

    #[test]
    fn declined_upgrade_can_switch_instead() {
        // decline upgrade, accept switch offer, pick first candidate, re-confirm
        let mut p = ScriptedPrompter::new(vec![false, true, true]).with_selections(vec![0]);
        let known = vec![v("7.4"), v("8.1"), v("8.3")];
        let plan = resolve(decide(&v("8.1"), &v("8.3")), &v("8.1"), &known, &mut p);
        assert_eq!(plan, ReconciliationPlan::SwitchTo(v("7.4")));
    }

    #[test]
    fn switch_excludes_installed_version() {
        let mut p = ScriptedPrompter::new(vec![true, true]).with_selections(vec![0]);
        let known = vec![v("8.1"), v("8.3")];
        // Installed 8.3 == latest; switch list must contain only 8.1.
        let plan = resolve(ReconciliationPlan::AlreadyLatest, &v("8.3"), &known, &mut p);
        assert_eq!(plan, ReconciliationPlan::SwitchTo(v("8.1")));
    }

    #[test]
    fn already_latest_can_force_reinstall() {
        // decline switch, accept reinstall
        let mut p = ScriptedPrompter::new(vec![false, true]);
        let plan = resolve(ReconciliationPlan::AlreadyLatest, &v("8.3"), &[v("8.3")], &mut p);
        assert_eq!(plan, ReconciliationPlan::Reinstall(v("8.3")));
    }

    #[test]
    fn already_newer_offers_switch_only() {
        // decline the one offer: straight to no-op, reinstall never offered
        let mut p = ScriptedPrompter::new(vec![false]);
        let plan = resolve(ReconciliationPlan::AlreadyNewer, &v("8.4"), &[v("8.3")], &mut p);
        assert_eq!(plan, ReconciliationPlan::NoOp);
        assert!(p.confirms.is_empty());
    }

    #[test]
    fn switch_cancel_entry_is_noop() {
        let mut p = ScriptedPrompter::new(vec![true]).with_selections(vec![1]);
        // One candidate (8.1) + Cancel; selection 1 is Cancel.
        let plan = resolve(ReconciliationPlan::AlreadyLatest, &v("8.3"), &[v("8.1"), v("8.3")], &mut p);
        assert_eq!(plan, ReconciliationPlan::NoOp);
    }

    #[test]
    fn unconfirmed_switch_is_noop() {
        let mut p = ScriptedPrompter::new(vec![true, false]).with_selections(vec![0]);
        let plan = resolve(ReconciliationPlan::AlreadyLatest, &v("8.3"), &[v("8.1"), v("8.3")], &mut p);
        assert_eq!(plan, ReconciliationPlan::NoOp);
    }

    #[test]
    fn alternate_source_needs_threshold() {
        let mut p = ScriptedPrompter::new(vec![true]);
        assert!(!offer_alternate_source(2, false, &mut p));
        assert!(offer_alternate_source(3, false, &mut p));
    }

    #[test]
    fn alternate_source_is_one_shot() {
        let mut p = ScriptedPrompter::new(vec![true]);
        assert!(!offer_alternate_source(5, true, &mut p));
        // The prompt was never consumed.
        assert_eq!(p.confirms.len(), 1);
    }
}

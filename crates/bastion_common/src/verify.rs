//! Post-mutation verification with one bounded remediation round.
//!
//! Probe the live state; on failure run the remediation once, wait a
//! fixed settle interval, and probe again. A second failure terminates
//! in `Unrecovered` with the literal manual-recovery commands.
//! Unbounded retry against an external daemon is rejected: it would
//! mask a fatal misconfiguration instead of surfacing it.

use std::thread;
use std::time::Duration;

/// Settle interval between remediation and the re-probe.
pub const SETTLE_DELAY: Duration = Duration::from_secs(3);

/// Terminal state of a verification cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    Verified,
    /// Both probes failed; the operator gets an exact command list.
    Unrecovered { manual_steps: Vec<String> },
}

impl Verification {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verification::Verified)
    }
}

/// Probe, remediate at most once, re-probe.
///
/// Probe and remediation both borrow the caller's context (typically
/// the action executor) so they can run tolerated actions. `settle` is
/// injected; tests pass `Duration::ZERO`.
pub fn verify_and_fix<C>(
    what: &str,
    ctx: &mut C,
    probe: impl Fn(&mut C) -> bool,
    remediate: impl Fn(&mut C),
    manual_steps: &[String],
    settle: Duration,
) -> Verification {
    if probe(ctx) {
        tracing::debug!(what, "verified on first probe");
        return Verification::Verified;
    }

    tracing::debug!(what, "probe failed, running the remediation round");
    remediate(ctx);
    thread::sleep(settle);

    if probe(ctx) {
        tracing::debug!(what, "verified after remediation");
        return Verification::Verified;
    }

    tracing::warn!(what, "unrecovered after one remediation round");
    Verification::Unrecovered {
        manual_steps: manual_steps.to_vec(),
    }
}

// =============================================================================
// Tests
// =============================================================================

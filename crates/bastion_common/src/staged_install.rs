//! Tiered, partial-failure-tolerant installation.
//!
//! A target is exactly one Core unit plus zero or more Extension units.
//! The Core unit installs in strict mode; each Extension unit walks an
//! ordered fallback ladder of increasingly permissive attempts and is
//! marked Failed only after exhausting every rung, without aborting the
//! batch. Missing optional extensions must not block a usable core
//! runtime. After the batch, the Core unit's service (when it owns one)
//! is restarted and enabled in strict mode.

use crate::error::Result;
use crate::executor::ActionExecutor;
use crate::session_log::ActionRecord;
use serde::Serialize;

/// Role of a unit inside a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Core,
    Extension,
}

/// One installable package/unit.
#[derive(Debug, Clone, Serialize)]
pub struct InstallUnit {
    pub identifier: String,
    pub kind: UnitKind,
    pub optional: bool,
}

impl InstallUnit {
    pub fn core(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            kind: UnitKind::Core,
            optional: false,
        }
    }

    pub fn extension(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            kind: UnitKind::Extension,
            optional: true,
        }
    }
}

/// Terminal state of one unit after the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitResult {
    Installed,
    Skipped,
    Failed,
}

/// Result of one unit, with every attempt that was made for it.
#[derive(Debug)]
pub struct InstallOutcome {
    pub unit: InstallUnit,
    pub result: UnitResult,
    pub attempts: Vec<ActionRecord>,
}

impl InstallOutcome {
    /// Unit deliberately not attempted (operator declined it).
    pub fn skipped(unit: InstallUnit) -> Self {
        Self {
            unit,
            result: UnitResult::Skipped,
            attempts: Vec::new(),
        }
    }
}

/// One rung of a fallback ladder: a labelled allow-failure attempt.
#[derive(Debug, Clone)]
pub struct LadderRung {
    pub label: String,
    pub command: String,
}

impl LadderRung {
    pub fn new(label: &str, command: String) -> Self {
        Self {
            label: label.to_string(),
            command,
        }
    }
}

/// An extension unit plus its ordered fallback ladder.
#[derive(Debug)]
pub struct ExtensionInstall {
    pub unit: InstallUnit,
    pub rungs: Vec<LadderRung>,
}

/// Service owned by the Core unit, restarted after the batch.
#[derive(Debug, Clone)]
pub struct ServiceHandle {
    pub name: String,
    pub restart_command: String,
    pub enable_command: String,
}

/// A complete install target. One Core unit by construction.
#[derive(Debug)]
pub struct InstallTarget {
    pub core: InstallUnit,
    pub core_command: String,
    pub extensions: Vec<ExtensionInstall>,
    /// None for runtimes that own no daemon (the service step is
    /// skipped, not faked).
    pub service: Option<ServiceHandle>,
}

/// Runs install targets through an executor.
pub struct StagedInstaller<'a> {
    executor: &'a mut ActionExecutor,
}

impl<'a> StagedInstaller<'a> {
    pub fn new(executor: &'a mut ActionExecutor) -> Self {
        Self { executor }
    }

    /// Install the target. Core failure and service-restart failure are
    /// fatal; extension failures are tolerated and reported.
    pub fn install(&mut self, target: &InstallTarget) -> Result<Vec<InstallOutcome>> {
        let mut outcomes = Vec::with_capacity(1 + target.extensions.len());

        // Core first, strict: there is nothing to build extensions on
        // top of if this fails.
        let core_record = self.executor.run(
            &format!("install {}", target.core.identifier),
            &target.core_command,
        )?;
        outcomes.push(InstallOutcome {
            unit: target.core.clone(),
            result: UnitResult::Installed,
            attempts: vec![core_record],
        });

        for extension in &target.extensions {
            outcomes.push(self.install_extension(extension)?);
        }

        if let Some(service) = &target.service {
            self.executor
                .run(&format!("restart {}", service.name), &service.restart_command)?;
            self.executor
                .run(&format!("enable {}", service.name), &service.enable_command)?;
        }

        Ok(outcomes)
    }

    fn install_extension(&mut self, extension: &ExtensionInstall) -> Result<InstallOutcome> {
        if extension.rungs.is_empty() {
            return Ok(InstallOutcome::skipped(extension.unit.clone()));
        }

        let mut attempts = Vec::new();
        for rung in &extension.rungs {
            let record = self.executor.run_allowed(
                &format!("install {} ({})", extension.unit.identifier, rung.label),
                &rung.command,
            )?;
            let succeeded = record.succeeded();
            attempts.push(record);
            if succeeded {
                return Ok(InstallOutcome {
                    unit: extension.unit.clone(),
                    result: UnitResult::Installed,
                    attempts,
                });
            }
        }

        tracing::debug!(unit = %extension.unit.identifier, "all fallback rungs exhausted");
        Ok(InstallOutcome {
            unit: extension.unit.clone(),
            result: UnitResult::Failed,
            attempts,
        })
    }
}

/// Units that exhausted their ladder, for the caller's failure summary.
pub fn failed_units(outcomes: &[InstallOutcome]) -> Vec<&InstallUnit> {
    outcomes
        .iter()
        .filter(|o| o.result == UnitResult::Failed)
        .map(|o| &o.unit)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::session_log::SessionLog;

    fn executor() -> ActionExecutor {
        ActionExecutor::new(SessionLog::in_memory())
    }

    fn ladder_ok(id: &str) -> ExtensionInstall {
        ExtensionInstall {
            unit: InstallUnit::extension(id),
            rungs: vec![LadderRung::new("minimal", "true".to_string())],
        }
    }

    fn ladder_all_fail(id: &str) -> ExtensionInstall {
        ExtensionInstall {
            unit: InstallUnit::extension(id),
            rungs: vec![
                LadderRung::new("minimal", "exit 1".to_string()),
                LadderRung::new("full", "exit 1".to_string()),
                LadderRung::new("repair and retry", "exit 1".to_string()),
            ],
        }
    }

    #[test]
    fn extension_failure_does_not_abort_batch() {
        let mut exec = executor();
        let target = InstallTarget {
            core: InstallUnit::core("runtime-core"),
            core_command: "true".to_string(),
            extensions: vec![ladder_ok("ext1"), ladder_all_fail("ext2"), ladder_ok("ext3")],
            service: None,
        };

        let outcomes = StagedInstaller::new(&mut exec).install(&target).unwrap();
        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[0].result, UnitResult::Installed);
        assert_eq!(outcomes[1].result, UnitResult::Installed);
        assert_eq!(outcomes[2].result, UnitResult::Failed);
        assert_eq!(outcomes[3].result, UnitResult::Installed);

        let failed = failed_units(&outcomes);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].identifier, "ext2");
    }

    #[test]
    fn core_failure_is_fatal() {
        let mut exec = executor();
        let target = InstallTarget {
            core: InstallUnit::core("runtime-core"),
            core_command: "exit 2".to_string(),
            extensions: vec![ladder_ok("ext1")],
            service: None,
        };

        let err = StagedInstaller::new(&mut exec).install(&target).unwrap_err();
        assert!(matches!(err, Error::FatalAction { exit_status: 2, .. }));
        // The extension was never attempted.
        assert_eq!(exec.log().records().len(), 1);
    }

    #[test]
    fn ladder_stops_at_first_success() {
        let mut exec = executor();
        let target = InstallTarget {
            core: InstallUnit::core("runtime-core"),
            core_command: "true".to_string(),
            extensions: vec![ExtensionInstall {
                unit: InstallUnit::extension("ext"),
                rungs: vec![
                    LadderRung::new("minimal", "exit 1".to_string()),
                    LadderRung::new("full", "true".to_string()),
                    LadderRung::new("repair and retry", "true".to_string()),
                ],
            }],
            service: None,
        };

        let outcomes = StagedInstaller::new(&mut exec).install(&target).unwrap();
        assert_eq!(outcomes[1].result, UnitResult::Installed);
        // Two attempts: the failed first rung plus the successful second.
        assert_eq!(outcomes[1].attempts.len(), 2);
    }

    #[test]
    fn service_restart_failure_is_fatal() {
        let mut exec = executor();
        let target = InstallTarget {
            core: InstallUnit::core("runtime-core"),
            core_command: "true".to_string(),
            extensions: vec![],
            service: Some(ServiceHandle {
                name: "runtime".to_string(),
                restart_command: "exit 5".to_string(),
                enable_command: "true".to_string(),
            }),
        };

        let err = StagedInstaller::new(&mut exec).install(&target).unwrap_err();
        assert!(matches!(err, Error::FatalAction { exit_status: 5, .. }));
    }

    #[test]
    fn empty_ladder_is_skipped() {
        let mut exec = executor();
        let target = InstallTarget {
            core: InstallUnit::core("runtime-core"),
            core_command: "true".to_string(),
            extensions: vec![ExtensionInstall {
                unit: InstallUnit::extension("declined"),
                rungs: vec![],
            }],
            service: None,
        };

        let outcomes = StagedInstaller::new(&mut exec).install(&target).unwrap();
        assert_eq!(outcomes[1].result, UnitResult::Skipped);
        assert!(outcomes[1].attempts.is_empty());
    }
}

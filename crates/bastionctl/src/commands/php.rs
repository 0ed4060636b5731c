//! `install-php`: PHP runtime install / upgrade / switch wizard.
//!
//! Versions come from line-oriented greps of the package index; the
//! runtime installs as one core unit (`phpX.Y-fpm`) plus a curated
//! extension set through the fallback ladder. When three or more
//! extensions fail every rung, the one-time alternate package source
//! is offered before giving up on the chosen version.

use anyhow::Result;
use bastion_common::display;
use bastion_common::executor::ActionExecutor;
use bastion_common::prompt::{Prompter, StdinPrompter};
use bastion_common::reconcile::{self, ReconciliationPlan};
use bastion_common::session_log::SessionLog;
use bastion_common::staged_install::{
    failed_units, ExtensionInstall, InstallOutcome, InstallTarget, InstallUnit, LadderRung,
    ServiceHandle, StagedInstaller,
};
use bastion_common::verify::{verify_and_fix, Verification, SETTLE_DELAY};
use bastion_common::version::{extract_versions, Version};

/// Curated extension set installed alongside the core runtime.
const EXTENSIONS: &[&str] = &[
    "cli", "mysql", "xml", "mbstring", "curl", "zip", "gd", "intl", "opcache",
];

pub fn run() -> Result<()> {
    run_with(&mut StdinPrompter)
}

fn run_with(prompter: &mut dyn Prompter) -> Result<()> {
    display::banner("PHP runtime provisioning");

    let log = SessionLog::open_default();
    let mut executor = ActionExecutor::new(log);

    executor.run("refresh package index", "apt-get update")?;

    let installed = probe_installed(&mut executor);
    let available = list_available(&mut executor);
    let latest = match available.last() {
        Some(latest) => latest.clone(),
        None => {
            display::warning("No PHP packages found in the package index; nothing to do.");
            super::finish(executor.into_log());
            return Ok(());
        }
    };

    let resolved = match &installed {
        Some(current) => {
            display::info(&format!(
                "Installed PHP: {} / latest available: {}",
                current, latest
            ));
            let plan = reconcile::decide(current, &latest);
            reconcile::resolve(plan, current, &available, prompter)
        }
        None => {
            display::info("PHP is not installed.");
            if prompter.confirm(&format!("Install PHP {} now?", latest)) {
                ReconciliationPlan::Upgrade(latest.clone())
            } else {
                ReconciliationPlan::NoOp
            }
        }
    };

    let target = match resolved.target() {
        Some(target) => target.clone(),
        None => {
            display::info("No changes requested.");
            super::finish(executor.into_log());
            return Ok(());
        }
    };

    let with_extensions =
        prompter.confirm(&format!("Install the standard extension set for PHP {}?", target));

    let mut outcomes = install_runtime(&mut executor, &target, with_extensions)?;
    let failed = failed_units(&outcomes).len();
    if reconcile::offer_alternate_source(failed, false, prompter) {
        add_alternate_source(&mut executor)?;
        // One retry of the same target; the escape hatch is never
        // offered again this session.
        outcomes = install_runtime(&mut executor, &target, with_extensions)?;
    }
    super::report_outcomes(&outcomes);

    // The new runtime is live; removing the previous one is cleanup.
    if let Some(prior) = &installed {
        if *prior != target {
            let record = executor.run_allowed(
                &format!("remove php {} units", prior),
                &format!("apt-get purge -y 'php{}*'", prior),
            )?;
            if !record.succeeded() {
                display::warning(&format!(
                    "PHP {} could not be removed; the new runtime is functional regardless.",
                    prior
                ));
            }
        }
    }

    executor.run(
        "select php interpreter",
        &format!("update-alternatives --set php /usr/bin/php{}", target),
    )?;

    let manual_steps = vec![
        format!("sudo update-alternatives --set php /usr/bin/php{}", target),
        "php -v".to_string(),
        format!("sudo systemctl status php{}-fpm", target),
    ];
    let marker = format!("PHP {}", target);
    let verification = verify_and_fix(
        "php cli version",
        &mut executor,
        |exec| {
            exec.run_allowed("probe php version", "php -v")
                .map(|r| r.succeeded() && r.output.contains(&marker))
                .unwrap_or(false)
        },
        |exec| {
            let _ = exec.run_allowed(
                "re-select php interpreter",
                &format!("update-alternatives --set php /usr/bin/php{}", target),
            );
        },
        &manual_steps,
        SETTLE_DELAY,
    );

    match verification {
        Verification::Verified => {
            display::success(&format!("PHP {} is live.", target));
        }
        Verification::Unrecovered { manual_steps } => {
            display::manual_commands(
                "The php binary does not report the expected version. Fix manually:",
                &manual_steps,
            );
        }
    }

    super::finish(executor.into_log());
    Ok(())
}

/// Version of the live `php` binary, if any.
fn probe_installed(executor: &mut ActionExecutor) -> Option<Version> {
    let record = executor.run_allowed("query installed php", "php -v").ok()?;
    if !record.succeeded() {
        return None;
    }
    parse_php_version(&record.output)
}

/// Parse "PHP X.Y.Z (cli) ..." from `php -v` output.
fn parse_php_version(output: &str) -> Option<Version> {
    let first = output.lines().next()?;
    let rest = first.strip_prefix("PHP ")?;
    let token = rest.split_whitespace().next()?;
    // Reconciliation works on major.minor; the patch level is package
    // churn, not a decision input.
    let version = Version::parse(token);
    let components = version.components();
    Some(Version::from_components(
        components.iter().take(2).copied().collect(),
    ))
}

/// Ascending `X.Y` versions present in the package index.
fn list_available(executor: &mut ActionExecutor) -> Vec<Version> {
    match executor.run_allowed("list available php versions", "apt-cache pkgnames php") {
        Ok(record) if record.succeeded() => extract_versions(&record.output, "php"),
        _ => Vec::new(),
    }
}

fn install_runtime(
    executor: &mut ActionExecutor,
    version: &Version,
    with_extensions: bool,
) -> bastion_common::Result<Vec<InstallOutcome>> {
    let target = build_target(version, with_extensions);
    StagedInstaller::new(executor).install(&target)
}

fn build_target(version: &Version, with_extensions: bool) -> InstallTarget {
    let core_pkg = format!("php{}-fpm", version);
    let extensions = if with_extensions {
        EXTENSIONS
            .iter()
            .map(|ext| {
                let pkg = format!("php{}-{}", version, ext);
                ExtensionInstall {
                    unit: InstallUnit::extension(&pkg),
                    rungs: vec![
                        LadderRung::new(
                            "minimal",
                            format!("apt-get install -y --no-install-recommends {}", pkg),
                        ),
                        LadderRung::new("full", format!("apt-get install -y {}", pkg)),
                        LadderRung::new(
                            "repair and retry",
                            format!("apt-get install -f -y && apt-get install -y {}", pkg),
                        ),
                    ],
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    InstallTarget {
        core: InstallUnit::core(&core_pkg),
        core_command: format!("apt-get install -y {}", core_pkg),
        extensions,
        service: Some(ServiceHandle {
            name: core_pkg.clone(),
            restart_command: format!("systemctl restart {}", core_pkg),
            enable_command: format!("systemctl enable {}", core_pkg),
        }),
    }
}

/// Add the community packaging repository and refresh the index.
/// Primitive operations: strict mode.
fn add_alternate_source(executor: &mut ActionExecutor) -> bastion_common::Result<()> {
    display::info("Adding the alternate PHP package source.");
    executor.run(
        "install repository tooling",
        "apt-get install -y software-properties-common",
    )?;
    executor.run("add alternate php source", "add-apt-repository -y ppa:ondrej/php")?;
    executor.run("refresh package index", "apt-get update")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_php_version_line() {
        let output = "PHP 8.3.12 (cli) (built: Oct 25 2024) (NTS)\nCopyright (c) The PHP Group\n";
        let version = parse_php_version(output).unwrap();
        assert_eq!(version.to_string(), "8.3");
    }

    #[test]
    fn rejects_non_php_output() {
        assert!(parse_php_version("command not found: php").is_none());
        assert!(parse_php_version("").is_none());
    }

    #[test]
    fn target_has_one_core_and_curated_extensions() {
        let target = build_target(&Version::parse("8.3"), true);
        assert_eq!(target.core.identifier, "php8.3-fpm");
        assert_eq!(target.extensions.len(), EXTENSIONS.len());
        assert!(target.service.is_some());

        // Ladder order: minimal footprint first, repair pass last.
        let ladder = &target.extensions[0].rungs;
        assert_eq!(ladder.len(), 3);
        assert!(ladder[0].command.contains("--no-install-recommends"));
        assert!(ladder[2].command.contains("apt-get install -f"));
    }

    #[test]
    fn declined_extension_set_yields_core_only_target() {
        let target = build_target(&Version::parse("8.3"), false);
        assert!(target.extensions.is_empty());
    }
}

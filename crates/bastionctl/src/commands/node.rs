//! `install-node`: Node.js runtime wizard via the version manager.
//!
//! The version manager is a shell function, so every action wraps its
//! invocation in a login shell that sources it first. Reconciliation
//! runs over LTS majors (one candidate per major, the newest release of
//! each). The runtime owns no daemon, so the install target carries no
//! service handle.

use anyhow::Result;
use bastion_common::display;
use bastion_common::executor::ActionExecutor;
use bastion_common::prompt::{Prompter, StdinPrompter};
use bastion_common::reconcile::{self, ReconciliationPlan};
use bastion_common::session_log::SessionLog;
use bastion_common::staged_install::{
    ExtensionInstall, InstallOutcome, InstallTarget, InstallUnit, LadderRung, StagedInstaller,
};
use bastion_common::verify::{verify_and_fix, Verification, SETTLE_DELAY};
use bastion_common::version::{extract_versions, Version};

/// Global tooling installed alongside the runtime.
const GLOBAL_TOOLS: &[&str] = &["corepack", "yarn", "pm2"];

pub fn run() -> Result<()> {
    run_with(&mut StdinPrompter)
}

/// Wrap a version-manager invocation in a shell that sources nvm.
fn nvm(command: &str) -> String {
    format!(
        r#"bash -lc 'export NVM_DIR="$HOME/.nvm"; [ -s "$NVM_DIR/nvm.sh" ] && . "$NVM_DIR/nvm.sh"; {}'"#,
        command
    )
}

fn run_with(prompter: &mut dyn Prompter) -> Result<()> {
    display::banner("Node.js runtime provisioning");

    let log = SessionLog::open_default();
    let mut executor = ActionExecutor::new(log);

    let installed = probe_installed(&mut executor);
    let available = list_available(&mut executor);
    let latest = match available.last() {
        Some(latest) => latest.clone(),
        None => {
            display::warning("The version manager returned no LTS releases; nothing to do.");
            super::finish(executor.into_log());
            return Ok(());
        }
    };

    let resolved = match &installed {
        Some(current) => {
            display::info(&format!(
                "Installed Node.js: {} / latest LTS: {}",
                current, latest
            ));
            let plan = reconcile::decide(current, &latest);
            reconcile::resolve(plan, current, &available, prompter)
        }
        None => {
            display::info("Node.js is not installed.");
            if prompter.confirm(&format!("Install Node.js {} now?", latest)) {
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

    let with_tools = prompter.confirm(&format!(
        "Install global tooling ({}) for Node.js {}?",
        GLOBAL_TOOLS.join(", "),
        target
    ));

    let outcomes = install_runtime(&mut executor, &target, with_tools)?;
    super::report_outcomes(&outcomes);

    executor.run(
        "pin default node version",
        &nvm(&format!("nvm alias default {v} && nvm use {v}", v = target)),
    )?;

    if let Some(prior) = &installed {
        if *prior != target {
            let record = executor.run_allowed(
                &format!("remove node {}", prior),
                &nvm(&format!("nvm uninstall {}", prior)),
            )?;
            if !record.succeeded() {
                display::warning(&format!(
                    "Node.js {} could not be removed; the new runtime is functional regardless.",
                    prior
                ));
            }
        }
    }

    let manual_steps = vec![
        format!("nvm alias default {}", target),
        format!("nvm use {}", target),
        "node --version".to_string(),
    ];
    let marker = format!("v{}", target);
    let verification = verify_and_fix(
        "node runtime version",
        &mut executor,
        |exec| {
            exec.run_allowed("probe node version", &nvm("node --version"))
                .map(|r| r.succeeded() && r.output.trim().starts_with(&marker))
                .unwrap_or(false)
        },
        |exec| {
            let _ = exec.run_allowed(
                "re-pin node version",
                &nvm(&format!("nvm use {}", target)),
            );
        },
        &manual_steps,
        SETTLE_DELAY,
    );

    match verification {
        Verification::Verified => {
            display::success(&format!("Node.js {} is live.", target));
        }
        Verification::Unrecovered { manual_steps } => {
            display::manual_commands(
                "The node binary does not report the expected version. Fix manually:",
                &manual_steps,
            );
        }
    }

    super::finish(executor.into_log());
    Ok(())
}

/// Version of the live `node` binary, if any.
fn probe_installed(executor: &mut ActionExecutor) -> Option<Version> {
    let record = executor
        .run_allowed("query installed node", &nvm("node --version"))
        .ok()?;
    if !record.succeeded() {
        return None;
    }
    let line = record.output.lines().last()?.trim();
    if !line.starts_with('v') {
        return None;
    }
    Some(Version::parse(line))
}

/// Newest release of each LTS major, ascending.
fn list_available(executor: &mut ActionExecutor) -> Vec<Version> {
    let record = match executor.run_allowed(
        "list remote node versions",
        &nvm("nvm ls-remote --lts --no-colors"),
    ) {
        Ok(record) if record.succeeded() => record,
        _ => return Vec::new(),
    };
    latest_per_major(extract_versions(&record.output, "v"))
}

/// Collapse a sorted version list to the newest entry per major.
fn latest_per_major(versions: Vec<Version>) -> Vec<Version> {
    let mut result: Vec<Version> = Vec::new();
    for version in versions {
        match result.last_mut() {
            Some(last) if last.major() == version.major() => *last = version,
            _ => result.push(version),
        }
    }
    result
}

fn install_runtime(
    executor: &mut ActionExecutor,
    version: &Version,
    with_tools: bool,
) -> bastion_common::Result<Vec<InstallOutcome>> {
    let target = build_target(version, with_tools);
    StagedInstaller::new(executor).install(&target)
}

fn build_target(version: &Version, with_tools: bool) -> InstallTarget {
    let extensions = if with_tools {
        GLOBAL_TOOLS
            .iter()
            .map(|&tool| ExtensionInstall {
                unit: InstallUnit::extension(tool),
                rungs: vec![
                    LadderRung::new("plain", nvm(&format!("npm install -g {}", tool))),
                    LadderRung::new(
                        "cache clean",
                        nvm(&format!(
                            "npm cache clean --force && npm install -g {}",
                            tool
                        )),
                    ),
                    LadderRung::new(
                        "registry mirror",
                        nvm(&format!(
                            "npm install -g {} --registry=https://registry.npmjs.org",
                            tool
                        )),
                    ),
                ],
            })
            .collect()
    } else {
        Vec::new()
    };

    InstallTarget {
        core: InstallUnit::core(&format!("node {}", version)),
        core_command: nvm(&format!("nvm install {}", version)),
        extensions,
        // No daemon to restart; the service step is skipped, not faked.
        service: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s)
    }

    #[test]
    fn latest_per_major_keeps_newest() {
        let versions = vec![v("18.19.0"), v("18.20.4"), v("20.10.0"), v("20.11.1")];
        let collapsed = latest_per_major(versions);
        let rendered: Vec<String> = collapsed.iter().map(|x| x.to_string()).collect();
        assert_eq!(rendered, vec!["18.20.4", "20.11.1"]);
    }

    #[test]
    fn nvm_wrapper_sources_the_manager() {
        let command = nvm("nvm install 20");
        assert!(command.starts_with("bash -lc"));
        assert!(command.contains("nvm.sh"));
        assert!(command.contains("nvm install 20"));
    }

    #[test]
    fn target_has_no_service() {
        let target = build_target(&v("20.11.1"), true);
        assert!(target.service.is_none());
        assert_eq!(target.extensions.len(), GLOBAL_TOOLS.len());
        assert_eq!(target.extensions[0].rungs.len(), 3);
    }

    #[test]
    fn declined_tools_yield_core_only_target() {
        let target = build_target(&v("20.11.1"), false);
        assert!(target.extensions.is_empty());
    }
}

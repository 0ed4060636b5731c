//! `harden-ssh`: SSH daemon hardening plus firewall rules.
//!
//! Sequential wizard: each accepted answer becomes one config directive
//! applied through the mutator (backup first), firewall rules go
//! through strict actions, and the final port check runs the bounded
//! verify-and-remediate cycle against the live listener table.

use anyhow::Result;
use bastion_common::config_mutation::{ConfigDirective, ConfigMutator};
use bastion_common::display;
use bastion_common::executor::ActionExecutor;
use bastion_common::prompt::{Prompter, StdinPrompter};
use bastion_common::session_log::SessionLog;
use bastion_common::verify::{verify_and_fix, Verification, SETTLE_DELAY};
use std::fs;
use std::path::{Path, PathBuf};

const SSHD_CONFIG: &str = "/etc/ssh/sshd_config";
const DEFAULT_SSH_PORT: u16 = 22;

pub fn run() -> Result<()> {
    run_with(&mut StdinPrompter)
}

fn run_with(prompter: &mut dyn Prompter) -> Result<()> {
    display::banner("SSH hardening");

    let log = SessionLog::open_default();
    let backup_dir = PathBuf::from(super::BACKUP_BASE).join(log.session_id());
    let mut executor = ActionExecutor::new(log);
    let mut mutator = ConfigMutator::new(backup_dir);

    let current_port = configured_port();
    let mut port = current_port;

    if prompter.confirm(&format!("Change the SSH port (currently {})?", current_port)) {
        port = prompter.read_port("New SSH port:");
        apply(&mut mutator, &ConfigDirective::new("Port", &port.to_string()))?;
    }
    if prompter.confirm("Disable root login?") {
        apply(&mut mutator, &ConfigDirective::new("PermitRootLogin", "no"))?;
    }
    if prompter.confirm("Disable password authentication (key-based login only)?") {
        apply(&mut mutator, &ConfigDirective::new("PasswordAuthentication", "no"))?;
    }
    if prompter.confirm("Limit authentication attempts to 3 per connection?") {
        apply(&mut mutator, &ConfigDirective::new("MaxAuthTries", "3"))?;
    }

    let config_changed = mutator.backup_path(Path::new(SSHD_CONFIG)).is_some();
    let backup = mutator
        .backup_path(Path::new(SSHD_CONFIG))
        .map(|p| p.display().to_string());
    if let Some(backup) = &backup {
        display::info(&format!("Pre-change backup: {}", backup));
    }

    // Firewall rules are primitive operations: strict mode, any failure
    // is fatal. Deleting the old rule is cleanup and tolerated.
    if prompter.confirm(&format!("Allow port {}/tcp through UFW?", port)) {
        executor.run("allow ssh port", &format!("ufw allow {}/tcp", port))?;
        if port != current_port
            && prompter.confirm(&format!("Delete the old allow rule for {}/tcp?", current_port))
        {
            let record = executor.run_allowed(
                "delete old ssh rule",
                &format!("ufw delete allow {}/tcp", current_port),
            )?;
            if !record.succeeded() {
                display::warning("Old rule was not deleted; remove it manually if unwanted.");
            }
        }
        if prompter.confirm(&format!("Enable UFW now (port {} stays allowed)?", port)) {
            executor.run("enable ufw", "ufw --force enable")?;
        }
    }

    if config_changed {
        executor.run("restart sshd", "systemctl restart sshd")?;
        executor.run("enable sshd", "systemctl enable sshd")?;

        let manual_steps = manual_recovery(port, backup.as_deref());
        let verification = verify_and_fix(
            "ssh listener port",
            &mut executor,
            |exec| probe_listener(exec, port),
            |exec| {
                let _ = exec.run_allowed("restart sshd (remediation)", "systemctl restart sshd");
            },
            &manual_steps,
            SETTLE_DELAY,
        );

        match verification {
            Verification::Verified => {
                display::success(&format!("sshd is listening on port {}.", port));
                display::warning("Keep this session open and test a new login before disconnecting.");
            }
            Verification::Unrecovered { manual_steps } => {
                display::manual_commands(
                    "sshd did not come up on the expected port. Recover manually:",
                    &manual_steps,
                );
            }
        }
    } else {
        display::info("sshd_config unchanged; skipping daemon restart.");
    }

    super::finish(executor.into_log());
    Ok(())
}

fn apply(mutator: &mut ConfigMutator, directive: &ConfigDirective) -> Result<()> {
    let result = mutator.apply(Path::new(SSHD_CONFIG), directive)?;
    display::success(&format!(
        "{} {} ({:?})",
        directive.key, directive.value, result
    ));
    Ok(())
}

/// Port currently configured in sshd_config, defaulting to 22.
fn configured_port() -> u16 {
    fs::read_to_string(SSHD_CONFIG)
        .ok()
        .and_then(|content| parse_port(&content))
        .unwrap_or(DEFAULT_SSH_PORT)
}

/// First uncommented `Port` directive in the config text.
fn parse_port(content: &str) -> Option<u16> {
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        if parts.next() == Some("Port") {
            if let Some(value) = parts.next() {
                if let Ok(port) = value.parse::<u16>() {
                    return Some(port);
                }
            }
        }
    }
    None
}

fn probe_listener(executor: &mut ActionExecutor, port: u16) -> bool {
    executor
        .run_allowed(
            "probe ssh listener",
            &format!("ss -tln | grep -q ':{} '", port),
        )
        .map(|r| r.succeeded())
        .unwrap_or(false)
}

fn manual_recovery(port: u16, backup: Option<&str>) -> Vec<String> {
    let mut steps = Vec::new();
    if let Some(backup) = backup {
        steps.push(format!("sudo cp {} {}", backup, SSHD_CONFIG));
    }
    steps.push("sudo sshd -t".to_string());
    steps.push("sudo systemctl restart sshd".to_string());
    steps.push(format!("ss -tln | grep ':{}'", port));
    steps.push("sudo systemctl status sshd".to_string());
    steps
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_port_reads_uncommented_directive() {
        let content = "# sshd_config\n#Port 22\nPort 2222\nUsePAM yes\n";
        assert_eq!(parse_port(content), Some(2222));
    }

    #[test]
    fn parse_port_ignores_comments() {
        let content = "#Port 2200\nUsePAM yes\n";
        assert_eq!(parse_port(content), None);
    }

    #[test]
    fn parse_port_rejects_garbage() {
        let content = "Port not-a-number\n";
        assert_eq!(parse_port(content), None);
    }

    #[test]
    fn manual_recovery_names_backup_first() {
        let steps = manual_recovery(2222, Some("/var/lib/bastion/backups/x/etc_ssh_sshd_config"));
        assert!(steps[0].starts_with("sudo cp /var/lib/bastion"));
        assert!(steps.iter().any(|s| s.contains(":2222")));
    }
}

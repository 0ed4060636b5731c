//! Bastion Control - interactive host hardening and provisioning.
//!
//! One subcommand per wizard. All input is interactive prompts; the
//! only configuration surface is the BASTION_LOG env var, which enables
//! debug tracing on stderr.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "bastionctl")]
#[command(about = "Bastion - host hardening and runtime provisioning wizards", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harden the SSH daemon and apply firewall rules
    HardenSsh,

    /// Install, upgrade or switch the PHP runtime
    InstallPhp,

    /// Install, upgrade or switch the Node.js runtime
    InstallNode,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("BASTION_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::HardenSsh => commands::ssh::run(),
        Commands::InstallPhp => commands::php::run(),
        Commands::InstallNode => commands::node::run(),
    };

    if let Err(err) = result {
        bastion_common::display::fatal(&format!("{:#}", err));
        // Fatal action failures propagate the failing action's exit status.
        let status = err
            .downcast_ref::<bastion_common::Error>()
            .map(|e| e.exit_status())
            .unwrap_or(1);
        std::process::exit(status);
    }
}

//! Terminal output helpers.
//!
//! Every message the wizards show goes through this module so the
//! color/icon language stays consistent: informational, success,
//! warning, fatal.

use owo_colors::OwoColorize;

/// Status level for one-line messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Fatal,
}

impl StatusLevel {
    pub fn label(&self) -> &'static str {
        match self {
            StatusLevel::Info => "INFO",
            StatusLevel::Success => "OK",
            StatusLevel::Warning => "WARN",
            StatusLevel::Fatal => "FATAL",
        }
    }

    fn icon(&self) -> String {
        match self {
            StatusLevel::Info => "ℹ".blue().to_string(),
            StatusLevel::Success => "✓".green().to_string(),
            StatusLevel::Warning => "⚠".yellow().to_string(),
            StatusLevel::Fatal => "✗".red().to_string(),
        }
    }
}

fn use_color() -> bool {
    console::Term::stdout().features().colors_supported()
}

/// Print a one-line status message on the interactive stream.
pub fn status(level: StatusLevel, message: &str) {
    if use_color() {
        println!("{} {}", level.icon(), message);
    } else {
        println!("[{}] {}", level.label(), message);
    }
}

pub fn info(message: &str) {
    status(StatusLevel::Info, message);
}

pub fn success(message: &str) {
    status(StatusLevel::Success, message);
}

pub fn warning(message: &str) {
    status(StatusLevel::Warning, message);
}

pub fn fatal(message: &str) {
    status(StatusLevel::Fatal, message);
}

/// Print a section banner for a wizard phase.
pub fn banner(title: &str) {
    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if use_color() {
        println!("{}", title.bold());
    } else {
        println!("{}", title);
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();
}

/// Print a literal command list the operator can run by hand.
pub fn manual_commands(intro: &str, commands: &[String]) {
    warning(intro);
    for command in commands {
        println!("   $ {}", command);
    }
    println!();
}

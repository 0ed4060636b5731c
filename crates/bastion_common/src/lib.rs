//! Bastion Common - the version-reconciliation and safe-mutation core.
//!
//! One session = one human-supervised, strictly sequential wizard run.
//! Everything external (package manager, service manager, firewall,
//! version manager) is an opaque, fallible action with a name, an exit
//! status and captured output.

pub mod config_mutation;
pub mod display;
pub mod error;
pub mod executor;
pub mod prompt;
pub mod reconcile;
pub mod session_log;
pub mod staged_install;
pub mod verify;
pub mod version;

pub use error::{Error, Result};
pub use executor::ActionExecutor;
pub use session_log::SessionLog;
pub use version::Version;

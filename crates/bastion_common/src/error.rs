//! Error types shared across the bastion core.

use std::path::PathBuf;
use thiserror::Error;

/// Library result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that unwind a session.
///
/// Tolerated failures never appear here; they are reported through
/// `ActionRecord` / `InstallOutcome` values instead.
#[derive(Debug, Error)]
pub enum Error {
    /// A strict (non allow-failure) external action returned non-zero.
    /// The session terminates with this exit status.
    #[error("action '{name}' failed with exit status {exit_status}")]
    FatalAction { name: String, exit_status: i32 },

    /// A strict external action could not be spawned at all.
    #[error("action '{name}' could not be executed: {source}")]
    ActionSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing a config file failed.
    #[error("config file {}: {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Creating the pre-mutation backup failed. Mutation is refused
    /// rather than proceeding without a restore point.
    #[error("backup of {} failed: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A custom directive match pattern did not compile.
    #[error("invalid match pattern for directive '{key}': {source}")]
    Pattern {
        key: String,
        #[source]
        source: regex::Error,
    },
}

impl Error {
    /// Exit status the process should terminate with for this error.
    pub fn exit_status(&self) -> i32 {
        match self {
            Error::FatalAction { exit_status, .. } => *exit_status,
            _ => 1,
        }
    }
}

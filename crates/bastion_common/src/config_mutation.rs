//! Idempotent key/value patching of line-oriented config files.
//!
//! A directive targets one logical line (`key value`). Applying it
//! rewrites the first matching line in place (uncommenting it) or
//! appends a new line when the key is absent. Re-applying a directive
//! to its own output is observationally a no-op. The pre-mutation file
//! content is backed up once per file per session, before the first
//! mutation touches it.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One idempotent edit target. Never partially applied.
#[derive(Debug, Clone)]
pub struct ConfigDirective {
    pub key: String,
    pub value: String,
    pattern: Regex,
}

impl ConfigDirective {
    /// Directive with the default match pattern: the line begins with
    /// the key followed by whitespace, ignoring leading `#` and
    /// surrounding whitespace.
    pub fn new(key: &str, value: &str) -> Self {
        let pattern = Regex::new(&format!(r"^\s*#*\s*{}\s+", regex::escape(key)))
            .expect("escaped key is a valid pattern");
        Self {
            key: key.to_string(),
            value: value.to_string(),
            pattern,
        }
    }

    /// Override the match pattern for keys with aliases or irregular
    /// spelling in the target file.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.pattern = Regex::new(pattern).map_err(|e| Error::Pattern {
            key: self.key.clone(),
            source: e,
        })?;
        Ok(self)
    }

    fn matches(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }

    fn rendered(&self) -> String {
        format!("{} {}", self.key, self.value)
    }
}

/// How a directive landed in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    /// An existing line was rewritten in place (and uncommented).
    Applied,
    /// The key was absent; a new line was appended.
    Appended,
}

/// Applies directives to config files with per-session backups.
pub struct ConfigMutator {
    backup_dir: PathBuf,
    /// Files already backed up this session. One backup per file,
    /// taken before the first mutation.
    backups: HashMap<PathBuf, PathBuf>,
}

impl ConfigMutator {
    pub fn new(backup_dir: PathBuf) -> Self {
        Self {
            backup_dir,
            backups: HashMap::new(),
        }
    }

    /// Apply one directive to `path`.
    pub fn apply(&mut self, path: &Path, directive: &ConfigDirective) -> Result<ApplyResult> {
        self.ensure_backup(path)?;

        let content = fs::read_to_string(path).map_err(|e| Error::ConfigIo {
            path: path.to_path_buf(),
            source: e,
        })?;

        let (patched, result) = patch(&content, directive);

        fs::write(path, patched).map_err(|e| Error::ConfigIo {
            path: path.to_path_buf(),
            source: e,
        })?;

        tracing::debug!(file = %path.display(), key = %directive.key, ?result, "directive applied");
        Ok(result)
    }

    /// Backup path recorded for `path`, if a mutation touched it.
    pub fn backup_path(&self, path: &Path) -> Option<&Path> {
        self.backups.get(path).map(|p| p.as_path())
    }

    fn ensure_backup(&mut self, path: &Path) -> Result<()> {
        if self.backups.contains_key(path) {
            return Ok(());
        }

        fs::create_dir_all(&self.backup_dir).map_err(|e| Error::Backup {
            path: path.to_path_buf(),
            source: e,
        })?;

        // Flatten the path into the backup filename.
        let name = path
            .to_string_lossy()
            .replace('/', "_")
            .trim_start_matches('_')
            .to_string();
        let backup = self.backup_dir.join(name);

        fs::copy(path, &backup).map_err(|e| Error::Backup {
            path: path.to_path_buf(),
            source: e,
        })?;

        self.backups.insert(path.to_path_buf(), backup);
        Ok(())
    }
}

/// Pure line transform: rewrite the first matching line or append.
fn patch(content: &str, directive: &ConfigDirective) -> (String, ApplyResult) {
    let mut lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();

    let hit = lines.iter().position(|line| directive.matches(line));
    let result = match hit {
        Some(index) => {
            lines[index] = directive.rendered();
            ApplyResult::Applied
        }
        None => {
            lines.push(directive.rendered());
            ApplyResult::Appended
        }
    };

    (lines.join("\n") + "\n", result)
}

// =============================================================================
// Tests
// =============================================================================

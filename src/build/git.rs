//! Read-only git queries.

use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

use crate::error::{BuildError, Result};

/// Length of a full hex commit id.
pub const REVISION_LEN: usize = 40;

/// Returns true if `revision` is a full hex commit id.
#[must_use]
pub fn is_valid_revision(revision: &str) -> bool {
    revision.len() == REVISION_LEN && revision.chars().all(|c| c.is_ascii_hexdigit())
}

/// Parses the output of `git rev-parse HEAD`.
///
/// # Errors
///
/// Returns [`BuildError::InvalidRevision`] if the output is not a commit id.
pub fn parse_revision(output: &str) -> Result<String> {
    let revision = output.trim();
    if is_valid_revision(revision) {
        Ok(revision.to_ascii_lowercase())
    } else {
        Err(BuildError::InvalidRevision(revision.to_string()).into())
    }
}

/// Parses the output of `git ls-files --others`.
#[must_use]
pub fn parse_paths(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// A git working tree.
#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
}

impl Repository {
    /// Opens the working tree containing `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the commit id of `HEAD`.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if git fails or prints no commit id.
    pub async fn revision(&self) -> Result<String> {
        parse_revision(&self.git(&["rev-parse", "HEAD"]).await?)
    }

    /// Lists untracked, non-ignored files.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if git fails.
    pub async fn untracked_files(&self) -> Result<Vec<String>> {
        Ok(parse_paths(
            &self
                .git(&["ls-files", "--others", "--exclude-standard"])
                .await?,
        ))
    }

    async fn git(&self, args: &[&str]) -> Result<String> {
        let command = format!("git {}", args.join(" "));
        debug!("Running {command} in {}", self.root.display());

        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .await
            .map_err(|e| BuildError::Spawn {
                command: command.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(BuildError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

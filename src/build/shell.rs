//! Shell-invoked build steps.
//!
//! A step fails when it exits unsuccessfully or writes anything to stderr.
//! A failed step aborts the build before anything is uploaded.

use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{BuildError, Result};

/// Runs one shell command in `cwd` and returns its stdout.
///
/// # Errors
///
/// Returns [`BuildError::Spawn`] if the shell cannot be started and
/// [`BuildError::CommandFailed`] if the command fails or writes to stderr.
pub async fn run_step(command: &str, cwd: &Path) -> Result<String> {
    info!("Running `{command}`");

    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(cwd)
        .output()
        .await
        .map_err(|e| BuildError::Spawn {
            command: command.to_string(),
            message: e.to_string(),
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !output.status.success() || !stderr.is_empty() {
        let stderr = if stderr.is_empty() {
            format!("exited with {}", output.status)
        } else {
            stderr
        };
        return Err(BuildError::CommandFailed {
            command: command.to_string(),
            stderr,
        }
        .into());
    }

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    debug!("`{command}` output: {}", stdout.trim());
    Ok(stdout)
}

/// Runs build steps in order, stopping at the first failure.
///
/// # Errors
///
/// Returns the error of the first failing step.
pub async fn run_steps(steps: &[String], cwd: &Path) -> Result<()> {
    for step in steps {
        run_step(step, cwd).await?;
    }
    Ok(())
}

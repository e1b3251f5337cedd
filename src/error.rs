//! Error types for the Tizona deployment tool.
//!
//! This module provides the error hierarchy for every step of a deployment
//! command: configuration and identity resolution, provider calls, change
//! sets, function updates, builds, and front-end releases.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the Tizona deployment tool.
#[derive(Debug, Error)]
pub enum TizonaError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors returned by a cloud provider API.
    #[error("{0}")]
    Provider(#[from] ProviderError),

    /// Change set errors.
    #[error("Change set error: {0}")]
    ChangeSet(#[from] ChangeSetError),

    /// Function deployment errors.
    #[error("Deploy error: {0}")]
    Deploy(#[from] DeployError),

    /// Build errors.
    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    /// Front-end release errors.
    #[error("Release error: {0}")]
    Release(#[from] ReleaseError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// A required identity parameter could not be resolved from flags,
    /// environment or the project file.
    #[error("Please provide {field} (flag, environment variable or .tizona.yaml)")]
    MissingIdentity {
        /// Name of the missing parameter.
        field: String,
    },

    /// No stack of the project matches the requested service.
    #[error("No stack of project '{project}' matches service '{service}'")]
    StackNotFound {
        /// Project the stacks were listed for.
        project: String,
        /// Service name fragment that was searched.
        service: String,
    },

    /// A stack has no resource of the required type.
    #[error("Stack '{stack}' has no resource of type {resource_type}")]
    ResourceNotFound {
        /// Stack that was searched.
        stack: String,
        /// Resource type that was expected.
        resource_type: String,
    },

    /// The service has no section in the project file.
    #[error("Service '{service}' is not configured in .tizona.yaml")]
    UnknownService {
        /// Name of the service.
        service: String,
    },
}

/// Error returned by a cloud provider call, carried verbatim.
#[derive(Debug, Error)]
#[error("{operation} failed: {message}")]
pub struct ProviderError {
    /// The provider operation that failed (e.g. `ListStacks`).
    pub operation: &'static str,
    /// The provider's own error message.
    pub message: String,
}

/// Change set errors.
#[derive(Debug, Error)]
pub enum ChangeSetError {
    /// The candidate template is identical to the deployed one.
    #[error("No changes to deploy for stack {stack}")]
    NoChanges {
        /// Stack the change set was computed for.
        stack: String,
    },

    /// The change set could not be computed.
    #[error("Change set {name} failed: {reason}")]
    Failed {
        /// Change set name.
        name: String,
        /// Provider status reason.
        reason: String,
    },

    /// The stack update triggered by the change set failed.
    #[error("Stack {stack} ended in {status}: {reason}")]
    ExecutionFailed {
        /// Stack name.
        stack: String,
        /// Final stack status.
        status: String,
        /// Provider status reason.
        reason: String,
    },

    /// The change set is in a state that does not allow the operation.
    #[error("Change set {name} is {state}, expected {expected}")]
    InvalidState {
        /// Change set name.
        name: String,
        /// Current state.
        state: String,
        /// State required by the operation.
        expected: String,
    },

    /// Waiting for the provider exceeded the configured bound.
    #[error("Timed out after {waited_secs}s waiting for {what}")]
    Timeout {
        /// Description of the awaited condition.
        what: String,
        /// Seconds waited before giving up.
        waited_secs: u64,
    },

    /// A template could not be parsed for comparison.
    #[error("Cannot read {which} template: {message}")]
    Template {
        /// Which side of the diff (deployed or candidate).
        which: &'static str,
        /// Parse error description.
        message: String,
    },
}

/// Function deployment errors.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The stack has no function to update.
    #[error("Nothing to deploy: stack {stack} has no functions behind a REST API")]
    NothingToDeploy {
        /// Stack that was searched.
        stack: String,
    },

    /// The requested function is not part of the stack.
    #[error("Function {function} is not part of stack {stack}")]
    FunctionNotFound {
        /// Requested function logical id.
        function: String,
        /// Stack that was searched.
        stack: String,
    },

    /// No package exists for the requested revision.
    #[error("No package for revision {revision} in bucket {bucket}")]
    PackageMissing {
        /// Artifact bucket.
        bucket: String,
        /// Revision that was requested.
        revision: String,
    },

    /// Neither `--local` nor `--commit` was given.
    #[error("You must specify either --local or --commit")]
    NoSource,

    /// Some function updates failed; the others were still applied.
    #[error("{failed} of {total} function updates failed")]
    UpdatesFailed {
        /// Number of failed updates.
        failed: usize,
        /// Number of attempted updates.
        total: usize,
    },
}

/// Build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A build step wrote to stderr or exited unsuccessfully.
    #[error("`{command}` failed: {stderr}")]
    CommandFailed {
        /// The command line that was run.
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// A command could not be spawned.
    #[error("Cannot run `{command}`: {message}")]
    Spawn {
        /// The command line.
        command: String,
        /// Spawn error description.
        message: String,
    },

    /// The repository head is not a valid revision.
    #[error("Invalid revision: {0}")]
    InvalidRevision(String),

    /// The build did not produce the expected package.
    #[error("Build output not found: {path}")]
    OutputMissing {
        /// Expected output path.
        path: PathBuf,
    },
}

/// Front-end release errors.
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// The built asset directory has no entry document.
    #[error("Entry document not found: {path}")]
    EntryDocumentMissing {
        /// Expected path of the entry document.
        path: PathBuf,
    },

    /// The requested release does not exist in the bucket.
    #[error("Release {version} does not exist in bucket {bucket}")]
    UnknownRelease {
        /// Requested release document.
        version: String,
        /// Website bucket.
        bucket: String,
    },

    /// No release has been published yet.
    #[error("No releases published in bucket {bucket}")]
    NoReleases {
        /// Website bucket.
        bucket: String,
    },

    /// The bucket has no website configuration.
    #[error("Bucket {bucket} has no website configuration")]
    NoWebsiteConfig {
        /// Website bucket.
        bucket: String,
    },
}

/// Result type alias for Tizona operations.
pub type Result<T> = std::result::Result<T, TizonaError>;

impl TizonaError {
    /// Returns true if this error means there was nothing to deploy.
    #[must_use]
    pub const fn is_no_changes(&self) -> bool {
        matches!(self, Self::ChangeSet(ChangeSetError::NoChanges { .. }))
    }

    /// Returns true if this is a configuration error (fatal, never retried).
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Deploy(
                    DeployError::NothingToDeploy { .. }
                        | DeployError::FunctionNotFound { .. }
                        | DeployError::NoSource
                )
        )
    }
}

impl ProviderError {
    /// Creates a provider error for the given operation.
    #[must_use]
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a missing identity error.
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingIdentity {
            field: field.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_changes_is_distinguished() {
        let err = TizonaError::from(ChangeSetError::NoChanges {
            stack: String::from("acme-api"),
        });
        assert!(err.is_no_changes());
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_configuration_errors() {
        let err = TizonaError::from(ConfigError::missing("aws region"));
        assert!(err.is_configuration());

        let err = TizonaError::from(DeployError::NothingToDeploy {
            stack: String::from("acme-api"),
        });
        assert!(err.is_configuration());

        let err = TizonaError::from(ProviderError::new("ListStacks", "Throttling"));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_provider_message_is_verbatim() {
        let err = TizonaError::from(ProviderError::new(
            "ListStackResources",
            "Stack with id acme-api does not exist",
        ));
        assert_eq!(
            err.to_string(),
            "ListStackResources failed: Stack with id acme-api does not exist"
        );
    }
}

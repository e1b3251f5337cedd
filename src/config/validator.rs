//! Configuration validation.
//!
//! All problems are collected before failing so a user fixing the project
//! file sees every error at once in the logs; the returned error carries
//! the first one.

use crate::error::{ConfigError, Result, TizonaError};
use tracing::{debug, warn};

use super::identity::Identity;
use super::spec::{TimeoutConfig, TizonaConfig};

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if no errors were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

/// Validator for project files and resolved identities.
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a project file.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any was found.
    pub fn validate(&self, config: &TizonaConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        if let Some(project) = &config.project {
            Self::validate_project(project, &mut result);
        }
        if let Some(region) = &config.aws_region {
            Self::validate_region(region, "aws_region", &mut result);
        }
        Self::validate_services(config, &mut result);
        Self::validate_ui(config, &mut result);
        Self::validate_timeouts(&config.timeouts, &mut result);

        Self::finish(result)
    }

    /// Validates a resolved identity.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any was found.
    pub fn validate_identity(&self, identity: &Identity) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();
        Self::validate_project(&identity.project, &mut result);
        Self::validate_region(&identity.region, "aws_region", &mut result);
        Self::finish(result)
    }

    fn finish(result: ValidationResult) -> Result<ValidationResult> {
        for warning in &result.warnings {
            warn!("{warning}");
        }

        match result.errors.first() {
            None => {
                debug!("Configuration validation passed");
                Ok(result)
            }
            Some(first) => {
                for error in &result.errors {
                    warn!("{}: {}", error.field, error.message);
                }
                Err(TizonaError::Config(ConfigError::ValidationError {
                    message: first.message.clone(),
                    field: Some(first.field.clone()),
                }))
            }
        }
    }

    fn validate_project(project: &str, result: &mut ValidationResult) {
        if project.trim().is_empty() {
            result.error("project", "Project name cannot be empty");
        } else if project.chars().any(char::is_whitespace) {
            result.error(
                "project",
                format!("Project name '{project}' cannot contain whitespace"),
            );
        }
    }

    fn validate_region(region: &str, field: &str, result: &mut ValidationResult) {
        if !is_valid_region(region) {
            result.error(
                field,
                format!("'{region}' is not an AWS region (expected e.g. eu-west-1)"),
            );
        }
    }

    fn validate_services(config: &TizonaConfig, result: &mut ValidationResult) {
        for (name, service) in &config.services {
            if name.trim().is_empty() {
                result.error("services", "Service name cannot be empty");
            }
            if service
                .template
                .as_ref()
                .is_some_and(|t| t.as_os_str().is_empty())
            {
                result.error(format!("services.{name}.template"), "Template path cannot be empty");
            }
            if service.build.iter().any(|step| step.trim().is_empty()) {
                result.error(format!("services.{name}.build"), "Build steps cannot be empty");
            }
            if service.package.is_some() && config.artifact_bucket.is_none() {
                result.warnings.push(format!(
                    "services.{name}.package is set but artifact_bucket is not"
                ));
            }
        }
    }

    fn validate_ui(config: &TizonaConfig, result: &mut ValidationResult) {
        if config.ui.stack.trim().is_empty() {
            result.error("ui.stack", "Website stack fragment cannot be empty");
        }
        if config
            .ui
            .distribution_base
            .as_ref()
            .is_some_and(|base| !base.starts_with("https://") && !base.starts_with("http://"))
        {
            result.error("ui.distribution_base", "Distribution base must be an http(s) URL");
        }
    }

    fn validate_timeouts(timeouts: &TimeoutConfig, result: &mut ValidationResult) {
        for (field, value) in [
            ("timeouts.poll_interval", timeouts.poll_interval),
            ("timeouts.change_set", timeouts.change_set),
            ("timeouts.stack_update", timeouts.stack_update),
            ("timeouts.cdn", timeouts.cdn),
        ] {
            if value == 0 {
                result.error(field, "Timeout must be positive");
            }
        }
    }
}

/// Returns true if `region` looks like an AWS region (`eu-west-1`).
#[must_use]
pub fn is_valid_region(region: &str) -> bool {
    let parts: Vec<&str> = region.split('-').collect();
    let Some((number, rest)) = parts.split_last() else {
        return false;
    };

    rest.len() >= 2
        && !number.is_empty()
        && number.chars().all(|c| c.is_ascii_digit())
        && rest
            .iter()
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;

    #[test]
    fn test_region_shape() {
        assert!(is_valid_region("eu-west-1"));
        assert!(is_valid_region("us-gov-west-1"));
        assert!(!is_valid_region("EU"));
        assert!(!is_valid_region("eu-west"));
        assert!(!is_valid_region("eu--1"));
        assert!(!is_valid_region(""));
    }

    #[test]
    fn test_valid_config() {
        let config = TizonaConfig {
            project: Some(String::from("acme")),
            aws_region: Some(String::from("eu-west-1")),
            ..TizonaConfig::default()
        };
        let result = ConfigValidator::new().validate(&config).expect("valid");
        assert!(result.is_valid());
    }

    #[test]
    fn test_invalid_region() {
        let config = TizonaConfig {
            aws_region: Some(String::from("ireland")),
            ..TizonaConfig::default()
        };
        let err = ConfigValidator::new().validate(&config).expect_err("invalid");
        assert!(err.to_string().contains("ireland"));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut config = TizonaConfig::default();
        config.timeouts.change_set = 0;
        let err = ConfigValidator::new().validate(&config).expect_err("invalid");
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn test_package_without_bucket_is_a_warning() {
        let mut config = TizonaConfig::default();
        config.services.insert(
            String::from("api"),
            ServiceConfig {
                package: Some("dist/package.zip".into()),
                ..ServiceConfig::default()
            },
        );
        let result = ConfigValidator::new().validate(&config).expect("valid");
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn test_identity_with_empty_project() {
        let identity = Identity {
            project: String::from(" "),
            profile: String::from("dev"),
            region: String::from("eu-west-1"),
        };
        assert!(ConfigValidator::new().validate_identity(&identity).is_err());
    }
}

//! Identity resolution.
//!
//! Project, AWS profile and AWS region are taken from the first source that
//! has them: explicit flag, environment variable, then the project file.

use serde::Serialize;
use tracing::debug;

use crate::error::{ConfigError, Result};

use super::spec::TizonaConfig;

/// Environment variable holding the project name.
pub const PROJECT_ENV: &str = "TIZONA_PROJECT";

/// Environment variables holding the AWS profile, in precedence order.
pub const PROFILE_ENV: &[&str] = &["AWS_PROFILE", "AWS_DEFAULT_PROFILE"];

/// Environment variables holding the AWS region, in precedence order.
pub const REGION_ENV: &[&str] = &["AWS_REGION", "AWS_DEFAULT_REGION"];

/// Identity values given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityOverrides {
    /// `--project`.
    pub project: Option<String>,
    /// `--aws-profile`.
    pub profile: Option<String>,
    /// `--aws-region`.
    pub region: Option<String>,
}

/// Resolved identity of one command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    /// Project name.
    pub project: String,
    /// AWS profile.
    pub profile: String,
    /// AWS region.
    pub region: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn first_of<F>(
    field: &str,
    flag: Option<&String>,
    vars: &[&str],
    file: Option<&String>,
    env: &F,
) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = non_empty(flag.cloned()) {
        debug!("{field} from flag");
        return Some(value);
    }
    for var in vars {
        if let Some(value) = non_empty(env(var)) {
            debug!("{field} from ${var}");
            return Some(value);
        }
    }
    non_empty(file.cloned()).inspect(|_| debug!("{field} from project file"))
}

/// Resolves the identity of an invocation.
///
/// `env` looks up environment variables; pass `|k| std::env::var(k).ok()`
/// outside tests.
///
/// # Errors
///
/// Returns [`ConfigError::MissingIdentity`] for the first field that no
/// source provides.
pub fn resolve_identity<F>(
    overrides: &IdentityOverrides,
    file: Option<&TizonaConfig>,
    env: F,
) -> Result<Identity>
where
    F: Fn(&str) -> Option<String>,
{
    let project = first_of(
        "project",
        overrides.project.as_ref(),
        &[PROJECT_ENV],
        file.and_then(|f| f.project.as_ref()),
        &env,
    )
    .ok_or_else(|| ConfigError::missing("project"))?;

    let profile = first_of(
        "aws profile",
        overrides.profile.as_ref(),
        PROFILE_ENV,
        file.and_then(|f| f.aws_profile.as_ref()),
        &env,
    )
    .ok_or_else(|| ConfigError::missing("aws profile"))?;

    let region = first_of(
        "aws region",
        overrides.region.as_ref(),
        REGION_ENV,
        file.and_then(|f| f.aws_region.as_ref()),
        &env,
    )
    .ok_or_else(|| ConfigError::missing("aws region"))?;

    Ok(Identity {
        project,
        profile,
        region,
    })
}

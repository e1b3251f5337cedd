//! Configuration types for the `.tizona.yaml` project file.
//!
//! Every field is optional or defaulted: identity fields may instead come
//! from flags or the environment, and a project without a website or
//! without services simply leaves those sections out.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ConfigError, Result};
use crate::planner::PlannerSettings;

/// The root of a `.tizona.yaml` file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TizonaConfig {
    /// Project name; stacks belong to the project when their name contains it.
    #[serde(default)]
    pub project: Option<String>,
    /// Default AWS profile.
    #[serde(default)]
    pub aws_profile: Option<String>,
    /// Default AWS region.
    #[serde(default)]
    pub aws_region: Option<String>,
    /// Bucket holding function packages, keyed by revision.
    #[serde(default)]
    pub artifact_bucket: Option<String>,
    /// Backend services by name; the name is also the stack fragment.
    #[serde(default)]
    pub services: BTreeMap<String, ServiceConfig>,
    /// Static front-end settings.
    #[serde(default)]
    pub ui: UiConfig,
    /// Polling bounds.
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// A backend service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Candidate template for change sets.
    #[serde(default)]
    pub template: Option<PathBuf>,
    /// Shell steps producing the package.
    #[serde(default)]
    pub build: Vec<String>,
    /// Package produced by the build.
    #[serde(default)]
    pub package: Option<PathBuf>,
    /// Change set parameter overrides.
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// Static front-end settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct UiConfig {
    /// Service fragment of the website stack.
    #[serde(default = "default_ui_stack")]
    pub stack: String,
    /// Shell steps producing the asset directory.
    #[serde(default = "default_ui_build")]
    pub build: Vec<String>,
    /// Asset directory produced by the build.
    #[serde(default = "default_ui_dist")]
    pub dist: PathBuf,
    /// Base URL assets are served from; defaults to the bucket's S3 URL.
    #[serde(default)]
    pub distribution_base: Option<String>,
    /// Wait for the CDN distribution after a release.
    #[serde(default = "default_true")]
    pub wait_for_cdn: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            stack: default_ui_stack(),
            build: default_ui_build(),
            dist: default_ui_dist(),
            distribution_base: None,
            wait_for_cdn: true,
        }
    }
}

/// Polling bounds, in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TimeoutConfig {
    /// Delay between status polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    /// Change set computation bound.
    #[serde(default = "default_change_set_timeout")]
    pub change_set: u64,
    /// Stack update bound.
    #[serde(default = "default_stack_update_timeout")]
    pub stack_update: u64,
    /// CDN deployment bound.
    #[serde(default = "default_cdn_timeout")]
    pub cdn: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            change_set: default_change_set_timeout(),
            stack_update: default_stack_update_timeout(),
            cdn: default_cdn_timeout(),
        }
    }
}

fn default_ui_stack() -> String {
    String::from("s3-website")
}

fn default_ui_build() -> Vec<String> {
    vec![String::from("yarn"), String::from("yarn run build")]
}

fn default_ui_dist() -> PathBuf {
    PathBuf::from("dist")
}

const fn default_true() -> bool {
    true
}

const fn default_poll_interval() -> u64 {
    5
}

const fn default_change_set_timeout() -> u64 {
    600
}

const fn default_stack_update_timeout() -> u64 {
    1800
}

const fn default_cdn_timeout() -> u64 {
    2200
}

impl TizonaConfig {
    /// Returns the section of a service.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownService`] if the service has no section.
    pub fn service(&self, name: &str) -> Result<&ServiceConfig> {
        self.services.get(name).ok_or_else(|| {
            ConfigError::UnknownService {
                service: name.to_string(),
            }
            .into()
        })
    }

    /// Returns the artifact bucket.
    ///
    /// # Errors
    ///
    /// Returns a validation error if no bucket is configured.
    pub fn artifact_bucket(&self) -> Result<&str> {
        self.artifact_bucket.as_deref().ok_or_else(|| {
            ConfigError::validation("artifact_bucket is required for packages", "artifact_bucket")
                .into()
        })
    }
}

impl TimeoutConfig {
    /// Planner polling bounds.
    #[must_use]
    pub const fn planner_settings(&self) -> PlannerSettings {
        PlannerSettings {
            poll_interval: Duration::from_secs(self.poll_interval),
            compute_timeout: Duration::from_secs(self.change_set),
            apply_timeout: Duration::from_secs(self.stack_update),
        }
    }

    /// CDN deployment bound.
    #[must_use]
    pub const fn cdn_timeout(&self) -> Duration {
        Duration::from_secs(self.cdn)
    }
}

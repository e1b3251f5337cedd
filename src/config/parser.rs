//! Configuration parser for loading the project file.
//!
//! This module finds `.tizona.yaml` by walking up from the working
//! directory, loads the sibling `.env` file, and parses the YAML into
//! [`TizonaConfig`].

use crate::error::{ConfigError, Result, TizonaError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::TizonaConfig;

/// Project file names to search for, in order.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[".tizona.yaml", ".tizona.yml"];

/// Configuration parser.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for the `.env` file.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the directory holding the `.env` file.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<TizonaConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(TizonaError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            TizonaError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string. An empty document yields the
    /// default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<TizonaConfig> {
        debug!("Parsing YAML configuration");

        if content.trim().is_empty() {
            return Ok(TizonaConfig::default());
        }

        let config: TizonaConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            TizonaError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed configuration for project {:?} with {} services",
            config.project,
            config.services.len()
        );
        Ok(config)
    }

    /// Loads the `.env` file if present.
    ///
    /// Variables already set in the process environment are kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the `.env` file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                TizonaError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Finds the project file in `start_dir` or one of its parents.
///
/// # Errors
///
/// Returns [`ConfigError::FileNotFound`] if no project file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(TizonaError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal_config() {
        let parser = ConfigParser::new();
        let config = parser.parse_yaml("project: acme\n", None).expect("parse");

        assert_eq!(config.project.as_deref(), Some("acme"));
        assert!(config.services.is_empty());
        assert_eq!(config.ui.stack, "s3-website");
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r"
project: acme
aws_profile: acme-dev
aws_region: eu-west-1
artifact_bucket: acme-artifacts
services:
  api:
    template: infra/api.yaml
    build: [make package]
    package: dist/package.zip
    parameters:
      Stage: prod
ui:
  stack: website
  dist: build
  distribution_base: https://cdn.acme.test
  wait_for_cdn: false
timeouts:
  change_set: 120
";
        let config = ConfigParser::new().parse_yaml(yaml, None).expect("parse");

        assert_eq!(config.aws_profile.as_deref(), Some("acme-dev"));
        let api = config.service("api").expect("api");
        assert_eq!(api.template, Some(PathBuf::from("infra/api.yaml")));
        assert_eq!(api.build, vec!["make package"]);
        assert_eq!(api.parameters.get("Stage").map(String::as_str), Some("prod"));
        assert_eq!(config.ui.stack, "website");
        assert_eq!(config.ui.build, vec!["yarn", "yarn run build"]);
        assert!(!config.ui.wait_for_cdn);
        assert_eq!(config.timeouts.change_set, 120);
        assert_eq!(config.timeouts.stack_update, 1800);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let err = ConfigParser::new()
            .parse_yaml("project: acme\nregion: eu-west-1\n", Some(Path::new(".tizona.yaml")))
            .expect_err("unknown field");
        assert!(err.is_configuration());
        assert!(err.to_string().contains("region"));
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = ConfigParser::new().parse_yaml("\n", None).expect("parse");
        assert_eq!(config, TizonaConfig::default());
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let dir = TempDir::new().expect("tempdir");
        let nested = dir.path().join("web/src");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(dir.path().join(".tizona.yml"), "project: acme\n").expect("write");

        let found = find_config_file(&nested).expect("found");
        assert_eq!(found, dir.path().join(".tizona.yml"));

        let config = ConfigParser::new().load_file(&found).expect("load");
        assert_eq!(config.project.as_deref(), Some("acme"));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().expect("tempdir");
        let err = ConfigParser::new()
            .load_file(dir.path().join(".tizona.yaml"))
            .expect_err("missing");
        assert!(matches!(
            err,
            TizonaError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}

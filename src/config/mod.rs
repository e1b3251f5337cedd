//! Configuration module for the Tizona deployment tool.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `.tizona.yaml`
//! - Resolving the project, profile and region of an invocation
//! - Validation of configuration values

mod identity;
mod parser;
mod spec;
mod validator;

pub use identity::{
    Identity, IdentityOverrides, PROFILE_ENV, PROJECT_ENV, REGION_ENV, resolve_identity,
};
pub use parser::{ConfigParser, DEFAULT_CONFIG_FILES, find_config_file};
pub use spec::{ServiceConfig, TimeoutConfig, TizonaConfig, UiConfig};
pub use validator::{ConfigValidator, ValidationError, ValidationResult, is_valid_region};

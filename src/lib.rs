// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![forbid(unsafe_code)]               // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention
#![warn(dead_code)]                   // Unused code is reported
#![warn(unused_imports)]              // Unused imports are reported
#![warn(unused_variables)]            // Unused variables are reported
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// Test code may unwrap and panic freely
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Tizona
//!
//! A DevOps command-line tool for serverless applications deployed as
//! CloudFormation stacks on AWS.
//!
//! ## Overview
//!
//! Tizona keeps a project's deployed infrastructure, function code and
//! static front end moving forward together:
//!
//! - Resolve the stacks of a project and the resources inside them
//! - Preview a template change as a change set with a canonical diff, then
//!   apply it
//! - Update every function of a service to a package keyed by revision
//! - Publish front-end builds under their revision and switch the served
//!   release (or roll back) by flipping a single pointer
//!
//! ## Architecture
//!
//! Every workflow starts from a **stack identity**: a project name and a
//! service name fragment resolve to exactly one stack. From there:
//!
//! 1. **Stack registry**: lists and resolves stacks, cached per project
//! 2. **Change planner**: creates, awaits, diffs and applies change sets
//! 3. **Function updater**: points functions at a stored package
//! 4. **Release orchestrator**: uploads assets and flips the website pointer
//!
//! All cloud access goes through narrow capability traits in [`aws`], so each
//! component can be exercised against mocks or in-memory fakes.
//!
//! ## Modules
//!
//! - [`config`]: Project file parsing, identity resolution and validation
//! - [`aws`]: Capability traits and their AWS SDK implementations
//! - [`stack`]: Stack registry and resource listing
//! - [`planner`]: Change sets and template diffs
//! - [`deploy`]: Function updates and REST API introspection
//! - [`release`]: Front-end releases
//! - [`build`]: Revisions, build steps and function packages
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! project: acme
//! aws_profile: acme-dev
//! aws_region: eu-west-1
//! artifact_bucket: acme-artifacts
//!
//! services:
//!   api:
//!     template: infra/api.yaml
//!     build: ["make package"]
//!     package: dist/package.zip
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod aws;
pub mod build;
pub mod cli;
pub mod config;
pub mod deploy;
pub mod error;
pub mod planner;
pub mod release;
pub mod stack;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigParser, ConfigValidator, Identity, TizonaConfig};
pub use deploy::{ApiInspector, FunctionUpdater};
pub use error::{Result, TizonaError};
pub use planner::{ChangePlanner, TemplateDiff};
pub use release::ReleaseOrchestrator;
pub use stack::{ResourceLister, StackRegistry};

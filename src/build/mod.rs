//! Builds and packages.
//!
//! This module reads the source revision that addresses every artifact,
//! runs the configured shell build steps, and stores function packages in
//! the artifact bucket.

mod git;
mod package;
mod shell;

pub use git::{REVISION_LEN, Repository, is_valid_revision, parse_paths, parse_revision};
pub use package::{PackageStore, PackageUpload};
pub use shell::{run_step, run_steps};

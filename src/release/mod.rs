//! Front-end releases.
//!
//! This module publishes built static assets to a website bucket, switches
//! the current release pointer, and rolls back to earlier releases.

mod orchestrator;
mod sync;

pub use orchestrator::{
    DEFAULT_CDN_TIMEOUT, ENTRY_DOCUMENT, ReleaseOrchestrator, ReleaseSettings, UploadedRelease,
    default_distribution_base, release_document, rewrite_entry_document, rewrite_static_urls,
};
pub use sync::{DirectorySync, SyncReport, collect_files, content_type, fingerprint};

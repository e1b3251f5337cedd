//! Release orchestrator.
//!
//! A release is a directory of built assets stored under `{hash}/` plus a
//! rewritten entry document stored as `{hash}.html` at the bucket root. The
//! bucket's website index document is the "current release" pointer;
//! flipping it is a single provider-side write, so readers see either the
//! old or the new release. Old releases stay addressable, which makes a
//! rollback just another pointer flip.

use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::aws::{CdnApi, PutObject, StorageApi, StoredObject};
use crate::error::{ReleaseError, Result};

use super::sync::{DirectorySync, SyncReport, fingerprint};

/// Entry document produced by the front-end build.
pub const ENTRY_DOCUMENT: &str = "index.html";

/// Default bound of the distribution-deployed wait (20 s x 110 attempts).
pub const DEFAULT_CDN_TIMEOUT: Duration = Duration::from_secs(20 * 110);

/// Default asset base URL of a website bucket.
#[must_use]
pub fn default_distribution_base(region: &str, bucket: &str) -> String {
    format!("https://s3-{region}.amazonaws.com/{bucket}")
}

/// Name of the entry document of a release.
///
/// Accepts both `abc123` and `abc123.html`.
#[must_use]
pub fn release_document(version: &str) -> String {
    if version.ends_with(".html") {
        version.to_string()
    } else {
        format!("{version}.html")
    }
}

/// Rewrites root-relative references (`=/`) of an entry document to
/// absolute URLs under `{base}/{hash}/`.
#[must_use]
pub fn rewrite_entry_document(html: &str, base: &str, hash: &str) -> String {
    let base = base.trim_end_matches('/');
    html.replace("=/", &format!("={base}/{hash}/"))
}

/// Rewrites `url(/static` references of stylesheets and scripts to absolute
/// URLs under `{base}/{hash}/`, the same prefix the entry document uses.
#[must_use]
pub fn rewrite_static_urls(content: &str, base: &str, hash: &str) -> String {
    let base = base.trim_end_matches('/');
    content.replace("url(/static", &format!("url({base}/{hash}/static"))
}

fn is_static_asset(key: &str) -> bool {
    key.starts_with("static/css/") || key.starts_with("static/js/")
}

/// Where and how releases are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSettings {
    /// Website bucket.
    pub bucket: String,
    /// Base URL assets are served from.
    pub distribution_base: String,
    /// CDN distribution in front of the bucket, if any.
    pub distribution_id: Option<String>,
    /// Whether to wait for the distribution to be deployed.
    pub wait_for_cdn: bool,
    /// Bound of the distribution wait.
    pub cdn_timeout: Duration,
}

impl ReleaseSettings {
    /// Creates settings for a bucket without CDN.
    #[must_use]
    pub fn new(bucket: impl Into<String>, distribution_base: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            distribution_base: distribution_base.into(),
            distribution_id: None,
            wait_for_cdn: true,
            cdn_timeout: DEFAULT_CDN_TIMEOUT,
        }
    }

    /// Sets the CDN distribution.
    #[must_use]
    pub fn with_distribution(mut self, distribution_id: Option<String>) -> Self {
        self.distribution_id = distribution_id;
        self
    }

    /// Sets whether to wait for the CDN.
    #[must_use]
    pub const fn with_wait_for_cdn(mut self, wait: bool) -> Self {
        self.wait_for_cdn = wait;
        self
    }
}

/// A release uploaded to storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedRelease {
    /// Artifact hash.
    pub hash: String,
    /// Key of the release's entry document.
    pub document: String,
    /// Assets uploaded by the sync.
    pub uploaded: usize,
    /// Assets already up to date.
    pub unchanged: usize,
}

/// Publishes and switches front-end releases.
pub struct ReleaseOrchestrator<'a> {
    storage: &'a dyn StorageApi,
    cdn: Option<&'a dyn CdnApi>,
    settings: ReleaseSettings,
}

impl std::fmt::Debug for ReleaseOrchestrator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseOrchestrator")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<'a> ReleaseOrchestrator<'a> {
    /// Creates an orchestrator.
    #[must_use]
    pub const fn new(
        storage: &'a dyn StorageApi,
        cdn: Option<&'a dyn CdnApi>,
        settings: ReleaseSettings,
    ) -> Self {
        Self {
            storage,
            cdn,
            settings,
        }
    }

    /// Returns the settings.
    #[must_use]
    pub const fn settings(&self) -> &ReleaseSettings {
        &self.settings
    }

    /// Uploads a built asset directory as release `hash` without switching
    /// to it.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::EntryDocumentMissing`] if the directory has no
    /// entry document, an IO error, or the provider error of an upload.
    pub async fn upload_release(&self, artifact_dir: &Path, hash: &str) -> Result<UploadedRelease> {
        let entry = artifact_dir.join(ENTRY_DOCUMENT);
        if !entry.is_file() {
            return Err(ReleaseError::EntryDocumentMissing { path: entry }.into());
        }

        let bucket = &self.settings.bucket;
        let base = self.settings.distribution_base.as_str();
        let report: SyncReport = DirectorySync::new(self.storage, bucket.as_str())
            .sync(artifact_dir, hash, |key, body| {
                if !is_static_asset(key) {
                    return body;
                }
                match String::from_utf8(body) {
                    Ok(text) => rewrite_static_urls(&text, base, hash).into_bytes(),
                    Err(e) => e.into_bytes(),
                }
            })
            .await?;

        let html = fs::read_to_string(&entry)?;
        let rewritten = rewrite_entry_document(&html, &self.settings.distribution_base, hash);
        let document = release_document(hash);

        info!("Uploading entry document {document}");
        let body = rewritten.into_bytes();
        self.storage
            .put_object(PutObject {
                bucket: bucket.clone(),
                key: document.clone(),
                sha256: Some(fingerprint(&body)),
                body,
                content_type: String::from("text/html"),
                public_read: true,
            })
            .await?;

        Ok(UploadedRelease {
            hash: hash.to_string(),
            document,
            uploaded: report.uploaded,
            unchanged: report.skipped,
        })
    }

    /// Uploads release `hash` and makes it the current release.
    ///
    /// # Errors
    ///
    /// Returns any error of [`Self::upload_release`] or [`Self::release`].
    pub async fn publish_release(&self, artifact_dir: &Path, hash: &str) -> Result<UploadedRelease> {
        let uploaded = self.upload_release(artifact_dir, hash).await?;
        self.release(&uploaded.document).await?;
        Ok(uploaded)
    }

    /// Points the website and, if configured, the CDN at a release.
    ///
    /// # Errors
    ///
    /// Returns the provider error of the pointer update, the distribution
    /// update or the distribution wait.
    pub async fn release(&self, version: &str) -> Result<()> {
        let document = release_document(version);
        info!("Releasing {document} on {}", self.settings.bucket);

        self.storage
            .put_website_documents(&self.settings.bucket, &document, &document)
            .await?;

        match (self.cdn, self.settings.distribution_id.as_deref()) {
            (Some(cdn), Some(distribution_id)) => {
                info!("Updating distribution {distribution_id}");
                cdn.set_default_root_object(distribution_id, &document).await?;
                if self.settings.wait_for_cdn {
                    cdn.wait_deployed(distribution_id, self.settings.cdn_timeout)
                        .await?;
                }
            }
            (None, Some(distribution_id)) => {
                warn!("No CDN client for distribution {distribution_id}, skipping");
            }
            _ => {}
        }

        Ok(())
    }

    /// Returns the entry document currently served.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::NoWebsiteConfig`] if the bucket has no index
    /// document, or the provider error.
    pub async fn current_release(&self) -> Result<String> {
        self.storage
            .website_index_document(&self.settings.bucket)
            .await?
            .ok_or_else(|| {
                ReleaseError::NoWebsiteConfig {
                    bucket: self.settings.bucket.clone(),
                }
                .into()
            })
    }

    /// Lists published releases, oldest first.
    ///
    /// # Errors
    ///
    /// Returns the provider error of the listing.
    pub async fn list_releases(&self) -> Result<Vec<StoredObject>> {
        let mut releases = Vec::new();
        let mut next_token = None;
        loop {
            let page = self
                .storage
                .list_objects_page(&self.settings.bucket, None, Some(String::from("/")), next_token)
                .await?;
            releases.extend(page.items.into_iter().filter(|o| o.key.ends_with(".html")));
            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
        }

        releases.sort_by(|a, b| a.last_modified.cmp(&b.last_modified));
        Ok(releases)
    }

    /// Returns the most recently published release.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::NoReleases`] if nothing was published.
    pub async fn latest_release(&self) -> Result<String> {
        self.list_releases()
            .await?
            .pop()
            .map(|release| release.key)
            .ok_or_else(|| {
                ReleaseError::NoReleases {
                    bucket: self.settings.bucket.clone(),
                }
                .into()
            })
    }

    /// Switches back to a previously published release.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::UnknownRelease`] if `version` was never
    /// published, or any error of [`Self::release`].
    pub async fn rollback(&self, version: &str) -> Result<()> {
        let document = self.require_published(version).await?;
        info!("Rolling back to {document}");
        self.release(&document).await
    }

    /// Returns the entry document of `version` if it was published.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::UnknownRelease`] if no such entry document
    /// exists in the bucket.
    pub async fn require_published(&self, version: &str) -> Result<String> {
        let document = release_document(version);
        let known = self
            .list_releases()
            .await?
            .iter()
            .any(|release| release.key == document);

        if !known {
            return Err(ReleaseError::UnknownRelease {
                version: document,
                bucket: self.settings.bucket.clone(),
            }
            .into());
        }
        Ok(document)
    }
}

//! Function package upload.
//!
//! Packages are content addressed by source revision: the object key is the
//! revision itself, so an existing object is never replaced unless forced.

use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::aws::{PutObject, StorageApi};
use crate::deploy::Artifact;
use crate::error::{BuildError, DeployError, Result};
use crate::release::fingerprint;

/// Result of publishing a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageUpload {
    /// Where the package lives.
    pub artifact: Artifact,
    /// False if an existing package was kept.
    pub uploaded: bool,
}

/// Stores function packages in the artifact bucket.
pub struct PackageStore<'a> {
    storage: &'a dyn StorageApi,
    bucket: String,
}

impl std::fmt::Debug for PackageStore<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageStore")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl<'a> PackageStore<'a> {
    /// Creates a store over `bucket`.
    #[must_use]
    pub fn new(storage: &'a dyn StorageApi, bucket: impl Into<String>) -> Self {
        Self {
            storage,
            bucket: bucket.into(),
        }
    }

    /// Returns true if a package exists for `revision`.
    ///
    /// # Errors
    ///
    /// Returns the provider error of the lookup.
    pub async fn exists(&self, revision: &str) -> Result<bool> {
        Ok(self.storage.head_object(&self.bucket, revision).await?.is_some())
    }

    /// Returns the artifact of an already published revision.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::PackageMissing`] if no package exists.
    pub async fn require(&self, revision: &str) -> Result<Artifact> {
        if self.exists(revision).await? {
            Ok(Artifact::new(self.bucket.as_str(), revision))
        } else {
            Err(DeployError::PackageMissing {
                bucket: self.bucket.clone(),
                revision: revision.to_string(),
            }
            .into())
        }
    }

    /// Uploads the package at `path` for `revision`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::OutputMissing`] if the package file does not
    /// exist, or the provider error of the upload.
    pub async fn publish(&self, path: &Path, revision: &str, force: bool) -> Result<PackageUpload> {
        if !path.is_file() {
            return Err(BuildError::OutputMissing {
                path: path.to_path_buf(),
            }
            .into());
        }

        let artifact = Artifact::new(self.bucket.as_str(), revision);
        if !force && self.exists(revision).await? {
            info!("Package for {revision} already in s3://{}, skipping", self.bucket);
            return Ok(PackageUpload {
                artifact,
                uploaded: false,
            });
        }

        let body = fs::read(path)?;
        info!(
            "Uploading {} ({} bytes) to s3://{}/{revision}",
            path.display(),
            body.len(),
            self.bucket
        );
        self.storage
            .put_object(PutObject {
                bucket: self.bucket.clone(),
                key: artifact.key().to_string(),
                sha256: Some(fingerprint(&body)),
                body,
                content_type: String::from("application/zip"),
                public_read: false,
            })
            .await?;

        Ok(PackageUpload {
            artifact,
            uploaded: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::testing::FakeStorage;
    use crate::error::TizonaError;
    use tempfile::TempDir;

    const REV: &str = "3f786850e387550fdab836ed7e6dc881de23001b";

    fn package(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("package.zip");
        fs::write(&path, content).expect("write");
        path
    }

    #[tokio::test]
    async fn test_same_revision_is_uploaded_once() {
        let dir = TempDir::new().expect("tempdir");
        let storage = FakeStorage::default();
        let store = PackageStore::new(&storage, "acme-artifacts");

        let first = store.publish(&package(&dir, "v1"), REV, false).await.expect("publish");
        assert!(first.uploaded);
        assert_eq!(first.artifact, Artifact::new("acme-artifacts", REV));

        let second = store.publish(&package(&dir, "v2"), REV, false).await.expect("publish");
        assert!(!second.uploaded);
        assert_eq!(storage.text("acme-artifacts", REV).as_deref(), Some("v1"));
        assert_eq!(storage.put_count(), 1);
    }

    #[tokio::test]
    async fn test_force_replaces_package() {
        let dir = TempDir::new().expect("tempdir");
        let storage = FakeStorage::default();
        let store = PackageStore::new(&storage, "acme-artifacts");

        store.publish(&package(&dir, "v1"), REV, false).await.expect("publish");
        let forced = store.publish(&package(&dir, "v2"), REV, true).await.expect("publish");

        assert!(forced.uploaded);
        assert_eq!(storage.text("acme-artifacts", REV).as_deref(), Some("v2"));
    }

    #[tokio::test]
    async fn test_missing_package_file() {
        let dir = TempDir::new().expect("tempdir");
        let storage = FakeStorage::default();
        let store = PackageStore::new(&storage, "acme-artifacts");

        let err = store
            .publish(&dir.path().join("package.zip"), REV, false)
            .await
            .expect_err("missing");
        assert!(matches!(
            err,
            TizonaError::Build(BuildError::OutputMissing { .. })
        ));
    }

    #[tokio::test]
    async fn test_require_published_revision() {
        let dir = TempDir::new().expect("tempdir");
        let storage = FakeStorage::default();
        let store = PackageStore::new(&storage, "acme-artifacts");

        let err = store.require(REV).await.expect_err("not published");
        assert!(matches!(
            err,
            TizonaError::Deploy(DeployError::PackageMissing { .. })
        ));

        store.publish(&package(&dir, "v1"), REV, false).await.expect("publish");
        assert_eq!(
            store.require(REV).await.expect("published"),
            Artifact::new("acme-artifacts", REV)
        );
    }
}

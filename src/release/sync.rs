//! One-way directory sync into object storage.
//!
//! Only objects whose fingerprint differs from the local content are
//! uploaded. Nothing is ever deleted remotely.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::aws::{PutObject, StorageApi};
use crate::error::Result;

/// Counts of a finished sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Objects uploaded.
    pub uploaded: usize,
    /// Objects already up to date.
    pub skipped: usize,
}

/// Hex SHA-256 of some content.
#[must_use]
pub fn fingerprint(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// MIME type of a file, guessed from its extension.
#[must_use]
pub fn content_type(path: &Path) -> String {
    mime_guess::from_path(path).first_or_octet_stream().to_string()
}

/// Lists the files below `root` as `(relative key, path)` pairs, sorted by
/// key. Keys always use `/` as separator. Linked files are included, linked
/// directories are not descended into.
///
/// # Errors
///
/// Returns an IO error if a directory cannot be read.
pub fn collect_files(root: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let path = entry.path();
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_symlink() && path.is_dir() {
                debug!("Skipping linked directory {}", path.display());
            } else if let Ok(relative) = path.strip_prefix(root) {
                let key = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                files.push((key, path));
            }
        }
    }

    files.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(files)
}

/// Mirrors local directories into a bucket.
pub struct DirectorySync<'a> {
    storage: &'a dyn StorageApi,
    bucket: String,
}

impl std::fmt::Debug for DirectorySync<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectorySync")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl<'a> DirectorySync<'a> {
    /// Creates a sync targeting `bucket`.
    #[must_use]
    pub fn new(storage: &'a dyn StorageApi, bucket: impl Into<String>) -> Self {
        Self {
            storage,
            bucket: bucket.into(),
        }
    }

    /// Uploads every changed file of `dir` under `prefix`.
    ///
    /// `transform` receives the relative key and the file content and
    /// returns the content to upload; local files are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an IO error if a file cannot be read, or the provider error
    /// if a storage call fails.
    pub async fn sync<F>(&self, dir: &Path, prefix: &str, transform: F) -> Result<SyncReport>
    where
        F: Fn(&str, Vec<u8>) -> Vec<u8>,
    {
        let prefix = prefix.trim_end_matches('/');
        info!("Syncing {} to s3://{}/{prefix}/", dir.display(), self.bucket);

        let mut report = SyncReport::default();
        for (relative, path) in collect_files(dir)? {
            let key = format!("{prefix}/{relative}");
            let body = transform(&relative, fs::read(&path)?);
            let sha256 = fingerprint(&body);

            let remote = self.storage.head_object(&self.bucket, &key).await?;
            if remote.and_then(|head| head.sha256).as_deref() == Some(sha256.as_str()) {
                debug!("Unchanged: {key}");
                report.skipped += 1;
                continue;
            }

            self.storage
                .put_object(PutObject {
                    bucket: self.bucket.clone(),
                    key,
                    body,
                    content_type: content_type(&path),
                    public_read: false,
                    sha256: Some(sha256),
                })
                .await?;
            report.uploaded += 1;
        }

        info!(
            "Sync finished: {} uploaded, {} unchanged",
            report.uploaded, report.skipped
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::testing::FakeStorage;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let dir = TempDir::new().expect("tempdir");
        fs::create_dir_all(dir.path().join("static/js")).expect("mkdir");
        fs::write(dir.path().join("index.html"), "<html></html>").expect("write");
        fs::write(dir.path().join("static/js/app.js"), "console.log(1)").expect("write");
        dir
    }

    #[test]
    fn test_collect_files_uses_relative_keys() {
        let dir = site();
        let keys: Vec<String> = collect_files(dir.path())
            .expect("collect")
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys, vec!["index.html", "static/js/app.js"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_collect_files_skips_linked_directories() {
        let dir = site();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("static/loop")).expect("symlink");
        std::os::unix::fs::symlink(
            dir.path().join("index.html"),
            dir.path().join("static/index.html"),
        )
        .expect("symlink");

        let keys: Vec<String> = collect_files(dir.path())
            .expect("collect")
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys, vec!["index.html", "static/index.html", "static/js/app.js"]);
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type(Path::new("index.html")), "text/html");
        assert_eq!(content_type(Path::new("app.css")), "text/css");
        assert_eq!(content_type(Path::new("blob")), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_second_sync_skips_unchanged_files() {
        let dir = site();
        let storage = FakeStorage::default();
        let sync = DirectorySync::new(&storage, "acme-website");

        let first = sync.sync(dir.path(), "abc123/", |_, body| body).await.expect("sync");
        assert_eq!(first, SyncReport { uploaded: 2, skipped: 0 });

        fs::write(dir.path().join("index.html"), "<html>v2</html>").expect("write");
        let second = sync.sync(dir.path(), "abc123", |_, body| body).await.expect("sync");
        assert_eq!(second, SyncReport { uploaded: 1, skipped: 1 });
        assert_eq!(
            storage.text("acme-website", "abc123/index.html").as_deref(),
            Some("<html>v2</html>")
        );
    }

    #[tokio::test]
    async fn test_transform_applies_to_uploaded_content_only() {
        let dir = site();
        let storage = FakeStorage::default();
        let sync = DirectorySync::new(&storage, "acme-website");

        sync.sync(dir.path(), "abc123", |key, body| {
            if key.ends_with(".js") { b"rewritten".to_vec() } else { body }
        })
        .await
        .expect("sync");

        assert_eq!(
            storage.text("acme-website", "abc123/static/js/app.js").as_deref(),
            Some("rewritten")
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("static/js/app.js")).expect("read"),
            "console.log(1)"
        );
    }
}

//! S3-backed [`StorageApi`].
//!
//! Object fingerprints are stored as `sha256` user metadata so a sync can
//! skip objects whose content did not change.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{ErrorDocument, IndexDocument, ObjectCannedAcl, WebsiteConfiguration};
use aws_sdk_s3::Client;
use tracing::{debug, trace};

use crate::error::{ProviderError, Result};

use super::api::StorageApi;
use super::client::{provider_error, to_chrono};
use super::types::{ObjectHead, Page, PutObject, StoredObject};

/// Metadata key of the content fingerprint.
pub const FINGERPRINT_METADATA: &str = "sha256";

/// S3 capability client.
#[derive(Debug, Clone)]
pub struct S3 {
    /// SDK client.
    client: Client,
}

impl S3 {
    /// Wraps an SDK client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StorageApi for S3 {
    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: Option<String>,
        delimiter: Option<String>,
        next_token: Option<String>,
    ) -> Result<Page<StoredObject>> {
        trace!("ListObjectsV2 s3://{bucket}/{prefix:?}");

        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_prefix(prefix)
            .set_delimiter(delimiter)
            .set_continuation_token(next_token)
            .send()
            .await
            .map_err(provider_error("ListObjectsV2"))?;

        let items = output
            .contents()
            .iter()
            .filter_map(|object| {
                object.key().map(|key| StoredObject {
                    key: key.to_string(),
                    size: object
                        .size()
                        .and_then(|size| u64::try_from(size).ok())
                        .unwrap_or_default(),
                    last_modified: object.last_modified().and_then(to_chrono),
                })
            })
            .collect();

        Ok(Page {
            items,
            next_token: output.next_continuation_token().map(String::from),
        })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectHead>> {
        let result = self.client.head_object().bucket(bucket).key(key).send().await;

        match result {
            Ok(output) => Ok(Some(ObjectHead {
                sha256: output
                    .metadata()
                    .and_then(|metadata| metadata.get(FINGERPRINT_METADATA))
                    .cloned(),
            })),
            Err(sdk_err) => {
                let service_err = sdk_err.into_service_error();
                if service_err.is_not_found() {
                    Ok(None)
                } else {
                    Err(ProviderError::new("HeadObject", service_err.to_string()).into())
                }
            }
        }
    }

    async fn put_object(&self, request: PutObject) -> Result<()> {
        debug!(
            "PutObject s3://{}/{} ({} bytes, {})",
            request.bucket,
            request.key,
            request.body.len(),
            request.content_type
        );

        let mut builder = self
            .client
            .put_object()
            .bucket(&request.bucket)
            .key(&request.key)
            .content_type(&request.content_type)
            .body(ByteStream::from(request.body));

        if request.public_read {
            builder = builder.acl(ObjectCannedAcl::PublicRead);
        }
        if let Some(sha256) = request.sha256 {
            builder = builder.metadata(FINGERPRINT_METADATA, sha256);
        }

        builder.send().await.map_err(provider_error("PutObject"))?;
        Ok(())
    }

    async fn website_index_document(&self, bucket: &str) -> Result<Option<String>> {
        let output = self
            .client
            .get_bucket_website()
            .bucket(bucket)
            .send()
            .await
            .map_err(provider_error("GetBucketWebsite"))?;

        Ok(output
            .index_document()
            .map(|document| document.suffix().to_string()))
    }

    async fn put_website_documents(
        &self,
        bucket: &str,
        index_document: &str,
        error_document: &str,
    ) -> Result<()> {
        debug!("PutBucketWebsite s3://{bucket} -> {index_document}");

        let index = IndexDocument::builder()
            .suffix(index_document)
            .build()
            .map_err(provider_error("PutBucketWebsite"))?;
        let error = ErrorDocument::builder()
            .key(error_document)
            .build()
            .map_err(provider_error("PutBucketWebsite"))?;

        self.client
            .put_bucket_website()
            .bucket(bucket)
            .website_configuration(
                WebsiteConfiguration::builder()
                    .index_document(index)
                    .error_document(error)
                    .build(),
            )
            .send()
            .await
            .map_err(provider_error("PutBucketWebsite"))?;

        Ok(())
    }
}

//! Lambda-backed [`FunctionApi`].

use async_trait::async_trait;
use aws_sdk_lambda::Client;
use tracing::debug;

use crate::error::Result;

use super::api::FunctionApi;
use super::client::provider_error;
use super::types::{CodeUpdate, PublishedVersion};

/// Lambda capability client.
#[derive(Debug, Clone)]
pub struct Lambda {
    /// SDK client.
    client: Client,
}

impl Lambda {
    /// Wraps an SDK client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FunctionApi for Lambda {
    async fn update_function_code(&self, update: &CodeUpdate) -> Result<PublishedVersion> {
        debug!(
            "UpdateFunctionCode {} from s3://{}/{} (publish: {})",
            update.function_name, update.bucket, update.key, update.publish
        );

        let output = self
            .client
            .update_function_code()
            .function_name(&update.function_name)
            .s3_bucket(&update.bucket)
            .s3_key(&update.key)
            .publish(update.publish)
            .send()
            .await
            .map_err(provider_error("UpdateFunctionCode"))?;

        Ok(PublishedVersion {
            function_name: output
                .function_name()
                .map_or_else(|| update.function_name.clone(), String::from),
            version: output.version().unwrap_or("$LATEST").to_string(),
            handler: output.handler().map(String::from),
            code_sha256: output.code_sha256().map(String::from),
            last_modified: output.last_modified().map(String::from),
        })
    }
}

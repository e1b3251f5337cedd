//! `CloudFront`-backed [`CdnApi`].

use async_trait::async_trait;
use aws_sdk_cloudfront::client::Waiters;
use aws_sdk_cloudfront::Client;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{ProviderError, Result};

use super::api::CdnApi;
use super::client::provider_error;

/// `CloudFront` capability client.
#[derive(Debug, Clone)]
pub struct CloudFront {
    /// SDK client.
    client: Client,
}

impl CloudFront {
    /// Wraps an SDK client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CdnApi for CloudFront {
    async fn set_default_root_object(&self, distribution_id: &str, object: &str) -> Result<()> {
        let output = self
            .client
            .get_distribution_config()
            .id(distribution_id)
            .send()
            .await
            .map_err(provider_error("GetDistributionConfig"))?;

        let etag = output.e_tag().map(String::from);
        let mut config = output.distribution_config().cloned().ok_or_else(|| {
            ProviderError::new(
                "GetDistributionConfig",
                format!("Distribution {distribution_id} returned no configuration"),
            )
        })?;

        debug!(
            "Default root object of {distribution_id}: {:?} -> {object}",
            config.default_root_object
        );
        config.default_root_object = Some(object.to_string());

        self.client
            .update_distribution()
            .id(distribution_id)
            .set_if_match(etag)
            .distribution_config(config)
            .send()
            .await
            .map_err(provider_error("UpdateDistribution"))?;

        Ok(())
    }

    async fn wait_deployed(&self, distribution_id: &str, max_wait: Duration) -> Result<()> {
        info!("Waiting for distribution {distribution_id} to be deployed");

        self.client
            .wait_until_distribution_deployed()
            .id(distribution_id)
            .wait(max_wait)
            .await
            .map_err(provider_error("DistributionDeployed"))?;

        Ok(())
    }
}

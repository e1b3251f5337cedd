//! AWS session setup.
//!
//! This module loads the shared SDK configuration for a resolved profile and
//! region and hands out the capability clients built from it.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_s3::error::DisplayErrorContext;
use tracing::debug;

use crate::error::{ProviderError, TizonaError};

use super::apigateway::ApiGateway;
use super::cloudformation::CloudFormation;
use super::cloudfront::CloudFront;
use super::lambda::Lambda;
use super::s3::S3;

/// Shared AWS configuration for one command invocation.
#[derive(Debug, Clone)]
pub struct AwsSession {
    /// Loaded SDK configuration.
    config: SdkConfig,
    /// Region the session is bound to.
    region: String,
}

impl AwsSession {
    /// Loads credentials and settings for a named profile and region.
    pub async fn load(profile: &str, region: &str) -> Self {
        debug!("Loading AWS configuration for profile {profile} in {region}");

        let config = aws_config::defaults(BehaviorVersion::latest())
            .profile_name(profile)
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self {
            config,
            region: region.to_string(),
        }
    }

    /// Returns the session region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Creates a CloudFormation capability client.
    #[must_use]
    pub fn cloudformation(&self) -> CloudFormation {
        CloudFormation::new(aws_sdk_cloudformation::Client::new(&self.config))
    }

    /// Creates a Lambda capability client.
    #[must_use]
    pub fn lambda(&self) -> Lambda {
        Lambda::new(aws_sdk_lambda::Client::new(&self.config))
    }

    /// Creates an S3 capability client.
    #[must_use]
    pub fn s3(&self) -> S3 {
        S3::new(aws_sdk_s3::Client::new(&self.config))
    }

    /// Creates a `CloudFront` capability client.
    #[must_use]
    pub fn cloudfront(&self) -> CloudFront {
        CloudFront::new(aws_sdk_cloudfront::Client::new(&self.config))
    }

    /// Creates an API Gateway capability client.
    #[must_use]
    pub fn apigateway(&self) -> ApiGateway {
        ApiGateway::new(aws_sdk_apigateway::Client::new(&self.config))
    }
}

/// Converts an SDK error into a [`ProviderError`] keeping the provider's
/// message and its source chain.
pub(crate) fn provider_error<E>(operation: &'static str) -> impl FnOnce(E) -> TizonaError
where
    E: std::error::Error + 'static,
{
    move |err| ProviderError::new(operation, DisplayErrorContext(err).to_string()).into()
}

/// Converts an SDK timestamp into a chrono timestamp.
pub(crate) fn to_chrono(
    timestamp: &aws_sdk_s3::primitives::DateTime,
) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

//! AWS integration module.
//!
//! This module exposes the narrow capability interfaces the deployment
//! workflow depends on (stacks, functions, storage, CDN, REST API
//! introspection) together with their AWS SDK implementations.

mod api;
mod apigateway;
mod client;
mod cloudformation;
mod cloudfront;
mod lambda;
mod s3;
mod types;

#[cfg(test)]
pub mod testing;

pub use api::{CdnApi, FunctionApi, GatewayApi, StackApi, StorageApi};
#[cfg(test)]
pub use api::{MockCdnApi, MockFunctionApi, MockGatewayApi, MockStackApi, MockStorageApi};
pub use apigateway::ApiGateway;
pub use client::AwsSession;
pub use cloudformation::CloudFormation;
pub use cloudfront::CloudFront;
pub use lambda::Lambda;
pub use s3::{FINGERPRINT_METADATA, S3};
pub use types::{
    ApiResource, BUCKET_TYPE, ChangeSetDescription, ChangeSetRequest, ChangeSetStatus,
    CodeUpdate, DISTRIBUTION_TYPE, FUNCTION_TYPE, ObjectHead, Page, PublishedVersion, PutObject,
    REST_API_TYPE, Resource, Stack, StackStatus, StoredObject,
};

//! Capability interfaces over the AWS control plane.
//!
//! Each component holds only the capabilities it needs. The SDK-backed
//! implementations live next to this module; tests substitute mocks or the
//! in-memory fakes from [`super::testing`].

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

use super::types::{
    ApiResource, ChangeSetDescription, ChangeSetRequest, CodeUpdate, ObjectHead, Page,
    PublishedVersion, PutObject, Resource, Stack, StackStatus, StoredObject,
};

/// Stack listing, resource listing and change set operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StackApi: Send + Sync {
    /// Lists one page of the stacks visible in the account and region.
    async fn list_stacks_page(&self, next_token: Option<String>) -> Result<Page<Stack>>;

    /// Lists one page of the resources of a stack.
    async fn list_stack_resources_page(
        &self,
        stack_name: &str,
        next_token: Option<String>,
    ) -> Result<Page<Resource>>;

    /// Returns the current status and status reason of a stack.
    async fn stack_status(&self, stack_name: &str) -> Result<(StackStatus, Option<String>)>;

    /// Submits a change set and returns its provider id.
    async fn create_change_set(&self, request: &ChangeSetRequest) -> Result<String>;

    /// Describes a change set.
    async fn describe_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
    ) -> Result<ChangeSetDescription>;

    /// Executes a computed change set.
    async fn execute_change_set(&self, stack_name: &str, change_set_name: &str) -> Result<()>;

    /// Deletes a change set that will not be executed.
    async fn delete_change_set(&self, stack_name: &str, change_set_name: &str) -> Result<()>;

    /// Fetches the deployed template, or a change set's candidate template
    /// when `change_set_name` is given.
    async fn get_template(
        &self,
        stack_name: &str,
        change_set_name: Option<String>,
    ) -> Result<String>;
}

/// Function code updates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FunctionApi: Send + Sync {
    /// Replaces a function's code with a stored package.
    async fn update_function_code(&self, update: &CodeUpdate) -> Result<PublishedVersion>;
}

/// Object storage and website hosting.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StorageApi: Send + Sync {
    /// Lists one page of objects under a prefix.
    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: Option<String>,
        delimiter: Option<String>,
        next_token: Option<String>,
    ) -> Result<Page<StoredObject>>;

    /// Returns object metadata, or `None` if the key does not exist.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectHead>>;

    /// Uploads an object.
    async fn put_object(&self, request: PutObject) -> Result<()>;

    /// Returns the website index document suffix, if website hosting is set.
    async fn website_index_document(&self, bucket: &str) -> Result<Option<String>>;

    /// Points website hosting at the given index and error documents.
    async fn put_website_documents(
        &self,
        bucket: &str,
        index_document: &str,
        error_document: &str,
    ) -> Result<()>;
}

/// Content delivery distribution updates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CdnApi: Send + Sync {
    /// Sets a distribution's default root object.
    async fn set_default_root_object(&self, distribution_id: &str, object: &str) -> Result<()>;

    /// Waits until the distribution reports `Deployed`.
    async fn wait_deployed(&self, distribution_id: &str, max_wait: Duration) -> Result<()>;
}

/// REST API introspection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GatewayApi: Send + Sync {
    /// Lists authorizer names of an API.
    async fn authorizer_names(&self, api_id: &str) -> Result<Vec<String>>;

    /// Lists resource paths of an API with their methods.
    async fn resources(&self, api_id: &str) -> Result<Vec<ApiResource>>;

    /// Returns the integration URI of a method, if it has one.
    async fn integration_uri(
        &self,
        api_id: &str,
        resource_id: &str,
        http_method: &str,
    ) -> Result<Option<String>>;
}

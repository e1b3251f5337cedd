//! Resource lister.
//!
//! Enumerates the resources of a stack across all provider pages, in the
//! order the provider returns them.

use tracing::{debug, info};

use crate::aws::{Resource, StackApi};
use crate::error::{ConfigError, Result};

/// Lists stack resources.
pub struct ResourceLister<'a> {
    /// Stack capability.
    api: &'a dyn StackApi,
}

impl std::fmt::Debug for ResourceLister<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLister").finish_non_exhaustive()
    }
}

impl<'a> ResourceLister<'a> {
    /// Creates a new lister.
    #[must_use]
    pub const fn new(api: &'a dyn StackApi) -> Self {
        Self { api }
    }

    /// Lists every resource of a stack.
    ///
    /// # Errors
    ///
    /// Propagates the provider error unchanged, including when the stack no
    /// longer exists.
    pub async fn list_resources(&self, stack_name: &str) -> Result<Vec<Resource>> {
        info!("Listing resources of stack: {stack_name}");

        let mut resources = Vec::new();
        let mut next_token = None;
        loop {
            let page = self
                .api
                .list_stack_resources_page(stack_name, next_token)
                .await?;
            resources.extend(page.items);
            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
        }

        debug!("Stack {stack_name} has {} resources", resources.len());
        Ok(resources)
    }

    /// Lists the resources of a stack having the given type tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the listing fails.
    pub async fn list_of_type(&self, stack_name: &str, resource_type: &str) -> Result<Vec<Resource>> {
        Ok(self
            .list_resources(stack_name)
            .await?
            .into_iter()
            .filter(|resource| resource.is(resource_type))
            .collect())
    }

    /// Returns the physical id of the first resource of the given type.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ResourceNotFound`] if the stack has no such
    /// resource, or an error if the listing fails.
    pub async fn physical_id_of(&self, stack_name: &str, resource_type: &str) -> Result<String> {
        self.list_of_type(stack_name, resource_type)
            .await?
            .into_iter()
            .find_map(|resource| resource.physical_id)
            .ok_or_else(|| {
                ConfigError::ResourceNotFound {
                    stack: stack_name.to_string(),
                    resource_type: resource_type.to_string(),
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::testing::FakeStacks;
    use crate::aws::{BUCKET_TYPE, FUNCTION_TYPE, REST_API_TYPE};
    use crate::error::TizonaError;

    #[tokio::test]
    async fn test_list_resources_preserves_page_order() {
        let mut api = FakeStacks::default();
        api.resource_pages.insert(
            String::from("acme-api"),
            vec![
                vec![
                    Resource::new("ZFunction", "acme-z", FUNCTION_TYPE),
                    Resource::new("Api", "abc123", REST_API_TYPE),
                ],
                vec![Resource::new("AFunction", "acme-a", FUNCTION_TYPE)],
            ],
        );
        let lister = ResourceLister::new(&api);

        let resources = lister.list_resources("acme-api").await.expect("list");
        let ids: Vec<&str> = resources.iter().map(|r| r.logical_id.as_str()).collect();
        assert_eq!(ids, vec!["ZFunction", "Api", "AFunction"]);
    }

    #[tokio::test]
    async fn test_missing_stack_error_is_propagated() {
        let api = FakeStacks::default();
        let lister = ResourceLister::new(&api);

        let err = lister.list_resources("acme-gone").await.expect_err("missing");
        match err {
            TizonaError::Provider(e) => {
                assert_eq!(e.operation, "ListStackResources");
                assert!(e.message.contains("does not exist"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_physical_id_of() {
        let api = FakeStacks::default().with_resources(
            "acme-s3-website",
            vec![
                Resource::new("Distribution", "E123", "AWS::CloudFront::Distribution"),
                Resource::new("Bucket", "acme-website", BUCKET_TYPE),
            ],
        );
        let lister = ResourceLister::new(&api);

        let bucket = lister
            .physical_id_of("acme-s3-website", BUCKET_TYPE)
            .await
            .expect("bucket");
        assert_eq!(bucket, "acme-website");

        let err = lister
            .physical_id_of("acme-s3-website", REST_API_TYPE)
            .await
            .expect_err("no api");
        assert!(err.is_configuration());
    }
}

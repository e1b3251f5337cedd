//! CloudFormation-backed [`StackApi`].

use async_trait::async_trait;
use aws_sdk_cloudformation::types::{Capability, ChangeSetType, Parameter, TemplateStage};
use aws_sdk_cloudformation::Client;
use tracing::{debug, trace};

use crate::error::{ProviderError, Result};

use super::api::StackApi;
use super::client::{provider_error, to_chrono};
use super::types::{
    ChangeSetDescription, ChangeSetRequest, ChangeSetStatus, Page, Resource, Stack, StackStatus,
};

/// CloudFormation capability client.
#[derive(Debug, Clone)]
pub struct CloudFormation {
    /// SDK client.
    client: Client,
}

impl CloudFormation {
    /// Wraps an SDK client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StackApi for CloudFormation {
    async fn list_stacks_page(&self, next_token: Option<String>) -> Result<Page<Stack>> {
        trace!("ListStacks page (token: {next_token:?})");

        let output = self
            .client
            .list_stacks()
            .set_next_token(next_token)
            .send()
            .await
            .map_err(provider_error("ListStacks"))?;

        let items = output
            .stack_summaries()
            .iter()
            .map(|summary| Stack {
                name: summary.stack_name().unwrap_or_default().to_string(),
                id: summary.stack_id().map(String::from),
                status: StackStatus::new(summary.stack_status().map(|s| s.as_str()).unwrap_or_default()),
                created_at: summary.creation_time().and_then(to_chrono),
                updated_at: summary.last_updated_time().and_then(to_chrono),
            })
            .collect();

        Ok(Page {
            items,
            next_token: output.next_token().map(String::from),
        })
    }

    async fn list_stack_resources_page(
        &self,
        stack_name: &str,
        next_token: Option<String>,
    ) -> Result<Page<Resource>> {
        trace!("ListStackResources {stack_name} (token: {next_token:?})");

        let output = self
            .client
            .list_stack_resources()
            .stack_name(stack_name)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(provider_error("ListStackResources"))?;

        let items = output
            .stack_resource_summaries()
            .iter()
            .map(|summary| Resource {
                logical_id: summary.logical_resource_id().unwrap_or_default().to_string(),
                physical_id: summary.physical_resource_id().map(String::from),
                resource_type: summary.resource_type().unwrap_or_default().to_string(),
                status: summary.resource_status().map(|s| s.as_str()).unwrap_or_default().to_string(),
            })
            .collect();

        Ok(Page {
            items,
            next_token: output.next_token().map(String::from),
        })
    }

    async fn stack_status(&self, stack_name: &str) -> Result<(StackStatus, Option<String>)> {
        let output = self
            .client
            .describe_stacks()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(provider_error("DescribeStacks"))?;

        let stack = output.stacks().first().ok_or_else(|| {
            ProviderError::new("DescribeStacks", format!("Stack {stack_name} does not exist"))
        })?;

        Ok((
            StackStatus::new(stack.stack_status().map(|s| s.as_str()).unwrap_or_default()),
            stack.stack_status_reason().map(String::from),
        ))
    }

    async fn create_change_set(&self, request: &ChangeSetRequest) -> Result<String> {
        debug!(
            "CreateChangeSet {} on {}",
            request.change_set_name, request.stack_name
        );

        let parameters: Vec<Parameter> = request
            .parameters
            .iter()
            .map(|(key, value)| {
                Parameter::builder()
                    .parameter_key(key)
                    .parameter_value(value)
                    .build()
            })
            .collect();

        let output = self
            .client
            .create_change_set()
            .stack_name(&request.stack_name)
            .change_set_name(&request.change_set_name)
            .change_set_type(ChangeSetType::Update)
            .template_body(&request.template_body)
            .set_parameters(Some(parameters))
            .capabilities(Capability::CapabilityIam)
            .capabilities(Capability::CapabilityNamedIam)
            .capabilities(Capability::CapabilityAutoExpand)
            .send()
            .await
            .map_err(provider_error("CreateChangeSet"))?;

        Ok(output
            .id()
            .map_or_else(|| request.change_set_name.clone(), String::from))
    }

    async fn describe_change_set(
        &self,
        stack_name: &str,
        change_set_name: &str,
    ) -> Result<ChangeSetDescription> {
        let output = self
            .client
            .describe_change_set()
            .stack_name(stack_name)
            .change_set_name(change_set_name)
            .send()
            .await
            .map_err(provider_error("DescribeChangeSet"))?;

        let status = output.status().map_or(ChangeSetStatus::Pending, |s| {
            ChangeSetStatus::from_provider(s.as_str())
        });

        Ok(ChangeSetDescription {
            status,
            status_reason: output.status_reason().map(String::from),
        })
    }

    async fn execute_change_set(&self, stack_name: &str, change_set_name: &str) -> Result<()> {
        debug!("ExecuteChangeSet {change_set_name} on {stack_name}");

        self.client
            .execute_change_set()
            .stack_name(stack_name)
            .change_set_name(change_set_name)
            .send()
            .await
            .map_err(provider_error("ExecuteChangeSet"))?;

        Ok(())
    }

    async fn delete_change_set(&self, stack_name: &str, change_set_name: &str) -> Result<()> {
        debug!("DeleteChangeSet {change_set_name} on {stack_name}");

        self.client
            .delete_change_set()
            .stack_name(stack_name)
            .change_set_name(change_set_name)
            .send()
            .await
            .map_err(provider_error("DeleteChangeSet"))?;

        Ok(())
    }

    async fn get_template(
        &self,
        stack_name: &str,
        change_set_name: Option<String>,
    ) -> Result<String> {
        let output = self
            .client
            .get_template()
            .stack_name(stack_name)
            .set_change_set_name(change_set_name)
            .template_stage(TemplateStage::Original)
            .send()
            .await
            .map_err(provider_error("GetTemplate"))?;

        Ok(output.template_body().unwrap_or_default().to_string())
    }
}

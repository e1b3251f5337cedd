//! API Gateway-backed [`GatewayApi`].

use async_trait::async_trait;
use aws_sdk_apigateway::Client;
use tracing::trace;

use crate::error::Result;

use super::api::GatewayApi;
use super::client::provider_error;
use super::types::ApiResource;

/// API Gateway capability client.
#[derive(Debug, Clone)]
pub struct ApiGateway {
    /// SDK client.
    client: Client,
}

impl ApiGateway {
    /// Wraps an SDK client.
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl GatewayApi for ApiGateway {
    async fn authorizer_names(&self, api_id: &str) -> Result<Vec<String>> {
        let output = self
            .client
            .get_authorizers()
            .rest_api_id(api_id)
            .send()
            .await
            .map_err(provider_error("GetAuthorizers"))?;

        Ok(output
            .items()
            .iter()
            .filter_map(|authorizer| authorizer.name().map(String::from))
            .collect())
    }

    async fn resources(&self, api_id: &str) -> Result<Vec<ApiResource>> {
        let mut resources = Vec::new();
        let mut position: Option<String> = None;

        loop {
            trace!("GetResources {api_id} (position: {position:?})");

            let output = self
                .client
                .get_resources()
                .rest_api_id(api_id)
                .set_position(position)
                .send()
                .await
                .map_err(provider_error("GetResources"))?;

            for item in output.items() {
                let mut methods: Vec<String> = item
                    .resource_methods()
                    .map(|methods| methods.keys().cloned().collect())
                    .unwrap_or_default();
                methods.sort();

                resources.push(ApiResource {
                    id: item.id().unwrap_or_default().to_string(),
                    path: item.path().unwrap_or_default().to_string(),
                    methods,
                });
            }

            position = output.position().map(String::from);
            if position.is_none() {
                break;
            }
        }

        Ok(resources)
    }

    async fn integration_uri(
        &self,
        api_id: &str,
        resource_id: &str,
        http_method: &str,
    ) -> Result<Option<String>> {
        let output = self
            .client
            .get_method()
            .rest_api_id(api_id)
            .resource_id(resource_id)
            .http_method(http_method)
            .send()
            .await
            .map_err(provider_error("GetMethod"))?;

        Ok(output
            .method_integration()
            .and_then(|integration| integration.uri())
            .map(String::from))
    }
}

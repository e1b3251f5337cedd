//! REST API introspection.

use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::aws::{FUNCTION_TYPE, GatewayApi, REST_API_TYPE};
use crate::error::Result;
use crate::stack::{ResourceLister, StackRegistry};

/// Default deployment stage of generated APIs.
pub const DEFAULT_STAGE: &str = "Prod";

/// Functions of the stack behind a REST API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiFunctions {
    /// Logical id of the REST API resource.
    pub api: String,
    /// Stack holding the API.
    pub stack: String,
    /// Logical ids of the functions in that stack.
    pub functions: Vec<String>,
}

/// A resource path and the functions integrated behind each method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiPath {
    /// Resource path.
    pub path: String,
    /// HTTP method to integrated function names.
    pub methods: BTreeMap<String, Vec<String>>,
}

/// Description of a deployed REST API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiDescription {
    /// Gateway API id.
    pub id: String,
    /// Invoke URL of the default stage.
    pub url: String,
    /// Authorizer names.
    pub authorizers: Vec<String>,
    /// Paths having at least one method.
    pub paths: Vec<ApiPath>,
}

/// Builds the invoke URL of an API stage.
#[must_use]
pub fn invoke_url(api_id: &str, region: &str, stage: &str) -> String {
    format!("https://{api_id}.execute-api.{region}.amazonaws.com/{stage}")
}

/// Extracts function names from a Lambda integration URI.
///
/// URIs look like
/// `arn:aws:apigateway:{region}:lambda:path/2015-03-31/functions/arn:aws:lambda:{region}:{account}:function:{name}/invocations`.
#[must_use]
pub fn integrated_functions(uri: &str) -> Vec<String> {
    let mut parts: Vec<&str> = uri.split("/invocations").collect();
    parts.pop();
    parts
        .into_iter()
        .filter_map(|part| part.rsplit(':').next())
        .filter(|name| {
            !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        })
        .map(String::from)
        .collect()
}

/// Describes the REST APIs of a project.
pub struct ApiInspector<'a> {
    registry: &'a StackRegistry<'a>,
    resources: ResourceLister<'a>,
    gateway: &'a dyn GatewayApi,
    region: String,
}

impl std::fmt::Debug for ApiInspector<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiInspector")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl<'a> ApiInspector<'a> {
    /// Creates an inspector for the given region.
    #[must_use]
    pub fn new(
        registry: &'a StackRegistry<'a>,
        resources: ResourceLister<'a>,
        gateway: &'a dyn GatewayApi,
        region: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            resources,
            gateway,
            region: region.into(),
        }
    }

    /// Maps each REST API of the project to the functions of its stack.
    ///
    /// When `fragment` is given, only stacks whose name contains it are
    /// considered.
    ///
    /// # Errors
    ///
    /// Returns an error if a listing fails.
    pub async fn list_api_functions(
        &self,
        project: &str,
        fragment: Option<&str>,
    ) -> Result<Vec<ApiFunctions>> {
        let stacks = self.registry.list_stacks(project).await?;
        let mut apis = Vec::new();

        for stack in stacks
            .iter()
            .filter(|s| fragment.is_none_or(|f| s.name.contains(f)))
        {
            let resources = self.resources.list_resources(&stack.name).await?;
            let functions: Vec<String> = resources
                .iter()
                .filter(|r| r.is(FUNCTION_TYPE))
                .map(|r| r.logical_id.clone())
                .collect();

            apis.extend(resources.iter().filter(|r| r.is(REST_API_TYPE)).map(|api| {
                ApiFunctions {
                    api: api.logical_id.clone(),
                    stack: stack.name.clone(),
                    functions: functions.clone(),
                }
            }));
        }

        Ok(apis)
    }

    /// Describes one API by its gateway id.
    ///
    /// # Errors
    ///
    /// Returns the provider error if a gateway call fails.
    pub async fn describe(&self, api_id: &str) -> Result<ApiDescription> {
        debug!("Describing REST API {api_id}");

        let authorizers = self.gateway.authorizer_names(api_id).await?;
        let mut paths = Vec::new();

        for resource in self.gateway.resources(api_id).await? {
            if resource.methods.is_empty() {
                continue;
            }

            let mut methods = BTreeMap::new();
            for method in &resource.methods {
                let functions = self
                    .gateway
                    .integration_uri(api_id, &resource.id, method)
                    .await?
                    .map(|uri| integrated_functions(&uri))
                    .unwrap_or_default();
                methods.insert(method.clone(), functions);
            }

            paths.push(ApiPath {
                path: resource.path,
                methods,
            });
        }

        Ok(ApiDescription {
            id: api_id.to_string(),
            url: invoke_url(api_id, &self.region, DEFAULT_STAGE),
            authorizers,
            paths,
        })
    }

    /// Describes the REST API of a service's stack.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the stack or its API cannot be
    /// found, or the provider error if a call fails.
    pub async fn describe_service(&self, project: &str, service: &str) -> Result<ApiDescription> {
        let stack = self.registry.require_stack(project, service).await?;
        let api_id = self
            .resources
            .physical_id_of(&stack.name, REST_API_TYPE)
            .await?;
        self.describe(&api_id).await
    }

    /// Describes every REST API of the project.
    ///
    /// # Errors
    ///
    /// Returns the provider error if a call fails.
    pub async fn describe_project(&self, project: &str) -> Result<Vec<ApiDescription>> {
        let mut descriptions = Vec::new();
        for stack in self.registry.list_stacks(project).await? {
            let apis = self.resources.list_of_type(&stack.name, REST_API_TYPE).await?;
            for api in apis {
                descriptions.push(self.describe(api.physical_or_logical()).await?);
            }
        }
        Ok(descriptions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::testing::FakeStacks;
    use crate::aws::{ApiResource, MockGatewayApi, Resource, Stack};

    const URI: &str = "arn:aws:apigateway:eu-west-1:lambda:path/2015-03-31/functions/arn:aws:lambda:eu-west-1:123456789012:function:acme-api-ListUsers-X1/invocations";

    fn project_stacks() -> FakeStacks {
        FakeStacks {
            stack_pages: vec![vec![
                Stack::named("acme-api", "UPDATE_COMPLETE"),
                Stack::named("acme-ui", "UPDATE_COMPLETE"),
            ]],
            ..FakeStacks::default()
        }
        .with_resources(
            "acme-api",
            vec![
                Resource::new("Api", "abc123", REST_API_TYPE),
                Resource::new("ListUsers", "acme-api-ListUsers-X1", FUNCTION_TYPE),
                Resource::new("GetUser", "acme-api-GetUser-Y2", FUNCTION_TYPE),
            ],
        )
        .with_resources(
            "acme-ui",
            vec![Resource::new("Bucket", "acme-website", "AWS::S3::Bucket")],
        )
    }

    fn gateway() -> MockGatewayApi {
        let mut gateway = MockGatewayApi::new();
        gateway
            .expect_authorizer_names()
            .returning(|_| Ok(vec![String::from("CognitoAuthorizer")]));
        gateway.expect_resources().returning(|_| {
            Ok(vec![
                ApiResource {
                    id: String::from("root"),
                    path: String::from("/"),
                    methods: Vec::new(),
                },
                ApiResource {
                    id: String::from("r1"),
                    path: String::from("/users"),
                    methods: vec![String::from("GET"), String::from("OPTIONS")],
                },
            ])
        });
        gateway
            .expect_integration_uri()
            .returning(|_, _, method| Ok((method == "GET").then(|| URI.to_string())));
        gateway
    }

    #[test]
    fn test_integrated_functions() {
        assert_eq!(integrated_functions(URI), vec!["acme-api-ListUsers-X1"]);
        assert!(integrated_functions("http://example.com/mock").is_empty());
    }

    #[test]
    fn test_invoke_url() {
        assert_eq!(
            invoke_url("abc123", "eu-west-1", DEFAULT_STAGE),
            "https://abc123.execute-api.eu-west-1.amazonaws.com/Prod"
        );
    }

    #[tokio::test]
    async fn test_list_api_functions() {
        let stacks = project_stacks();
        let registry = StackRegistry::new(&stacks);
        let gateway = MockGatewayApi::new();
        let inspector = ApiInspector::new(&registry, ResourceLister::new(&stacks), &gateway, "eu-west-1");

        let apis = inspector.list_api_functions("acme", None).await.expect("list");
        assert_eq!(
            apis,
            vec![ApiFunctions {
                api: String::from("Api"),
                stack: String::from("acme-api"),
                functions: vec![String::from("ListUsers"), String::from("GetUser")],
            }]
        );

        let none = inspector
            .list_api_functions("acme", Some("ui"))
            .await
            .expect("list");
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_describe_service() {
        let stacks = project_stacks();
        let registry = StackRegistry::new(&stacks);
        let gateway = gateway();
        let inspector = ApiInspector::new(&registry, ResourceLister::new(&stacks), &gateway, "eu-west-1");

        let api = inspector.describe_service("acme", "api").await.expect("describe");

        assert_eq!(api.id, "abc123");
        assert_eq!(api.url, "https://abc123.execute-api.eu-west-1.amazonaws.com/Prod");
        assert_eq!(api.authorizers, vec!["CognitoAuthorizer"]);
        assert_eq!(api.paths.len(), 1);
        assert_eq!(api.paths[0].path, "/users");
        assert_eq!(
            api.paths[0].methods.get("GET"),
            Some(&vec![String::from("acme-api-ListUsers-X1")])
        );
        assert_eq!(api.paths[0].methods.get("OPTIONS"), Some(&Vec::new()));
    }

    #[tokio::test]
    async fn test_describe_service_without_api() {
        let stacks = project_stacks();
        let registry = StackRegistry::new(&stacks);
        let gateway = MockGatewayApi::new();
        let inspector = ApiInspector::new(&registry, ResourceLister::new(&stacks), &gateway, "eu-west-1");

        let err = inspector
            .describe_service("acme", "ui")
            .await
            .expect_err("no api");
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_describe_project() {
        let stacks = project_stacks();
        let registry = StackRegistry::new(&stacks);
        let gateway = gateway();
        let inspector = ApiInspector::new(&registry, ResourceLister::new(&stacks), &gateway, "eu-west-1");

        let apis = inspector.describe_project("acme").await.expect("describe");
        assert_eq!(apis.len(), 1);
        assert_eq!(apis[0].id, "abc123");
    }
}

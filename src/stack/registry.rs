//! Stack registry.
//!
//! Resolves which stacks belong to a project. Ownership is a naming
//! convention: a stack belongs to a project when its name contains the project
//! name, and a service's stack is the first project stack whose name contains
//! the service fragment. Listings are cached per project for the lifetime of
//! the registry, which is one command invocation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::aws::{Stack, StackApi};
use crate::error::{ConfigError, Result};

/// Per-invocation registry of project stacks.
pub struct StackRegistry<'a> {
    /// Stack listing capability.
    api: &'a dyn StackApi,
    /// Stacks per project, filled on first use and never invalidated.
    cache: Mutex<HashMap<String, Vec<Stack>>>,
}

impl std::fmt::Debug for StackRegistry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackRegistry")
            .field("cached_projects", &self.cached().len())
            .finish_non_exhaustive()
    }
}

impl<'a> StackRegistry<'a> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(api: &'a dyn StackApi) -> Self {
        Self {
            api,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self) -> MutexGuard<'_, HashMap<String, Vec<Stack>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lists the stacks whose name contains `project`, in provider order.
    ///
    /// All pages are aggregated before filtering. Deleted stacks, which the
    /// provider keeps reporting for a while, are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if `project` is empty or the listing fails.
    pub async fn list_stacks(&self, project: &str) -> Result<Vec<Stack>> {
        if project.trim().is_empty() {
            return Err(ConfigError::validation("Project name cannot be empty", "project").into());
        }

        if let Some(stacks) = self.cached().get(project) {
            debug!("Using cached stacks for project {project}");
            return Ok(stacks.clone());
        }

        info!("Listing stacks for project: {project}");

        let mut all = Vec::new();
        let mut next_token = None;
        loop {
            let page = self.api.list_stacks_page(next_token).await?;
            all.extend(page.items);
            next_token = page.next_token;
            if next_token.is_none() {
                break;
            }
        }

        let stacks: Vec<Stack> = all
            .into_iter()
            .filter(|stack| !stack.status.is_deleted() && stack.name.contains(project))
            .collect();

        debug!("Found {} stacks for project {project}", stacks.len());

        self.cached().insert(project.to_string(), stacks.clone());
        Ok(stacks)
    }

    /// Returns the first project stack whose name contains `service`.
    ///
    /// Returns `Ok(None)` when the project has no stacks at all; callers treat
    /// that as a usage error rather than retrying.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::StackNotFound`] if the project has stacks but
    /// none matches, or an error if the listing fails.
    pub async fn resolve_stack(&self, project: &str, service: &str) -> Result<Option<Stack>> {
        let stacks = self.list_stacks(project).await?;
        if stacks.is_empty() {
            debug!("Project {project} has no stacks");
            return Ok(None);
        }

        stacks
            .into_iter()
            .find(|stack| stack.name.contains(service))
            .map(Some)
            .ok_or_else(|| {
                ConfigError::StackNotFound {
                    project: project.to_string(),
                    service: service.to_string(),
                }
                .into()
            })
    }

    /// Like [`Self::resolve_stack`], but finding no matching stack is an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::StackNotFound`] if no stack matches.
    pub async fn require_stack(&self, project: &str, service: &str) -> Result<Stack> {
        self.resolve_stack(project, service).await?.ok_or_else(|| {
            ConfigError::StackNotFound {
                project: project.to_string(),
                service: service.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aws::testing::FakeStacks;
    use crate::error::TizonaError;
    use std::sync::atomic::Ordering;

    fn names(stacks: &[Stack]) -> Vec<&str> {
        stacks.iter().map(|s| s.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_stacks_filters_by_project() {
        let api = FakeStacks::with_stacks(&["acme-api", "acme-ui", "other-api"]);
        let registry = StackRegistry::new(&api);

        let stacks = registry.list_stacks("acme").await.expect("list stacks");
        assert_eq!(names(&stacks), vec!["acme-api", "acme-ui"]);
    }

    #[tokio::test]
    async fn test_list_stacks_aggregates_pages() {
        let api = FakeStacks {
            stack_pages: vec![
                vec![Stack::named("acme-api", "UPDATE_COMPLETE")],
                vec![Stack::named("other-db", "CREATE_COMPLETE")],
                vec![Stack::named("acme-ui", "CREATE_COMPLETE")],
            ],
            ..FakeStacks::default()
        };
        let registry = StackRegistry::new(&api);

        let stacks = registry.list_stacks("acme").await.expect("list stacks");
        assert_eq!(names(&stacks), vec!["acme-api", "acme-ui"]);
    }

    #[tokio::test]
    async fn test_list_stacks_skips_deleted() {
        let api = FakeStacks {
            stack_pages: vec![vec![
                Stack::named("acme-api", "DELETE_COMPLETE"),
                Stack::named("acme-api", "UPDATE_COMPLETE"),
            ]],
            ..FakeStacks::default()
        };
        let registry = StackRegistry::new(&api);

        let stacks = registry.list_stacks("acme").await.expect("list stacks");
        assert_eq!(stacks.len(), 1);
        assert_eq!(stacks[0].status.as_str(), "UPDATE_COMPLETE");
    }

    #[tokio::test]
    async fn test_empty_project_is_rejected() {
        let api = FakeStacks::with_stacks(&["acme-api"]);
        let registry = StackRegistry::new(&api);

        let err = registry.list_stacks("").await.expect_err("empty project");
        assert!(err.is_configuration());
        assert_eq!(api.list_stack_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_resolve_stack_is_cached() {
        let api = FakeStacks::with_stacks(&["acme-api", "acme-ui"]);
        let registry = StackRegistry::new(&api);

        let first = registry.resolve_stack("acme", "ui").await.expect("resolve");
        let second = registry.resolve_stack("acme", "ui").await.expect("resolve");

        assert_eq!(first, second);
        assert_eq!(first.map(|s| s.name), Some(String::from("acme-ui")));
        assert_eq!(api.list_stack_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_resolve_stack_returns_first_match() {
        let api = FakeStacks::with_stacks(&["acme-api-v2", "acme-api"]);
        let registry = StackRegistry::new(&api);

        let stack = registry.require_stack("acme", "api").await.expect("resolve");
        assert_eq!(stack.name, "acme-api-v2");
    }

    #[tokio::test]
    async fn test_resolve_stack_not_found() {
        let api = FakeStacks::with_stacks(&["acme-api"]);
        let registry = StackRegistry::new(&api);

        let err = registry
            .resolve_stack("acme", "website")
            .await
            .expect_err("no match");
        assert!(matches!(
            err,
            TizonaError::Config(ConfigError::StackNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_resolve_stack_silent_without_stacks() {
        let api = FakeStacks::with_stacks(&["other-api"]);
        let registry = StackRegistry::new(&api);

        let resolved = registry.resolve_stack("acme", "api").await.expect("resolve");
        assert!(resolved.is_none());

        let err = registry.require_stack("acme", "api").await.expect_err("absent");
        assert!(err.is_configuration());
    }
}

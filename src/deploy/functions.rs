//! Function updater.
//!
//! Points the functions of a stack at a stored package and publishes a new
//! immutable version of each. Updates run one after the other; a failed
//! update is recorded and the remaining functions are still processed.

use serde::Serialize;
use tracing::{info, warn};

use crate::aws::{CodeUpdate, FUNCTION_TYPE, FunctionApi, PublishedVersion, REST_API_TYPE, Resource, Stack};
use crate::error::{DeployError, Result};
use crate::stack::ResourceLister;

/// Reference to a function package in durable storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// Bucket holding the package.
    pub bucket: String,
    /// Source revision the package was built from; also its key.
    pub revision: String,
}

impl Artifact {
    /// Creates an artifact reference.
    #[must_use]
    pub fn new(bucket: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            revision: revision.into(),
        }
    }

    /// Storage key of the package.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.revision
    }
}

/// Outcome of updating one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionOutcome {
    /// Logical id of the function in its stack.
    pub logical_id: String,
    /// Function name the update was issued against.
    pub function_name: String,
    /// Published version, on success.
    pub published: Option<PublishedVersion>,
    /// Provider error message, on failure.
    pub error: Option<String>,
}

impl FunctionOutcome {
    /// Returns true if the update succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Updates function code from a stored package.
pub struct FunctionUpdater<'a> {
    resources: ResourceLister<'a>,
    functions: &'a dyn FunctionApi,
}

impl std::fmt::Debug for FunctionUpdater<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionUpdater").finish_non_exhaustive()
    }
}

impl<'a> FunctionUpdater<'a> {
    /// Creates an updater.
    #[must_use]
    pub const fn new(resources: ResourceLister<'a>, functions: &'a dyn FunctionApi) -> Self {
        Self {
            resources,
            functions,
        }
    }

    /// Selects the functions to update.
    ///
    /// With a target, exactly that function (matched by logical or physical
    /// id). Without one, every function of a stack that carries a REST API.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::FunctionNotFound`] if the target is not a
    /// function of the stack, and [`DeployError::NothingToDeploy`] if the
    /// default selection is empty.
    pub async fn select_functions(&self, stack: &Stack, target: Option<&str>) -> Result<Vec<Resource>> {
        let resources = self.resources.list_resources(&stack.name).await?;
        let has_api = resources.iter().any(|r| r.is(REST_API_TYPE));
        let functions: Vec<Resource> = resources
            .into_iter()
            .filter(|r| r.is(FUNCTION_TYPE))
            .collect();

        if let Some(target) = target {
            return functions
                .into_iter()
                .find(|f| f.logical_id == target || f.physical_id.as_deref() == Some(target))
                .map(|f| vec![f])
                .ok_or_else(|| {
                    DeployError::FunctionNotFound {
                        function: target.to_string(),
                        stack: stack.name.clone(),
                    }
                    .into()
                });
        }

        if !has_api || functions.is_empty() {
            return Err(DeployError::NothingToDeploy {
                stack: stack.name.clone(),
            }
            .into());
        }

        Ok(functions)
    }

    /// Updates the selected functions of a stack to the given artifact.
    ///
    /// Returns one outcome per selected function, in stack order. Provider
    /// failures of individual updates are reported in their outcome rather
    /// than as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the selection fails (see
    /// [`Self::select_functions`]) or the resource listing fails.
    pub async fn update_functions(
        &self,
        stack: &Stack,
        artifact: &Artifact,
        target: Option<&str>,
    ) -> Result<Vec<FunctionOutcome>> {
        let selected = self.select_functions(stack, target).await?;
        Ok(self.update_selected(stack, selected, artifact).await)
    }

    /// Updates functions already chosen by [`Self::select_functions`].
    ///
    /// Each provider failure is recorded in its own outcome.
    pub async fn update_selected(
        &self,
        stack: &Stack,
        selected: Vec<Resource>,
        artifact: &Artifact,
    ) -> Vec<FunctionOutcome> {
        info!(
            "Updating {} functions of {} to revision {}",
            selected.len(),
            stack.name,
            artifact.revision
        );

        let mut outcomes = Vec::with_capacity(selected.len());
        for function in selected {
            let function_name = function.physical_or_logical().to_string();
            let update = CodeUpdate {
                function_name: function_name.clone(),
                bucket: artifact.bucket.clone(),
                key: artifact.key().to_string(),
                publish: true,
            };

            let outcome = match self.functions.update_function_code(&update).await {
                Ok(published) => {
                    info!("Published {} version {}", function_name, published.version);
                    FunctionOutcome {
                        logical_id: function.logical_id,
                        function_name,
                        published: Some(published),
                        error: None,
                    }
                }
                Err(e) => {
                    warn!("Failed to update {function_name}: {e}");
                    FunctionOutcome {
                        logical_id: function.logical_id,
                        function_name,
                        published: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}

/// Turns a list of outcomes into the command result.
///
/// # Errors
///
/// Returns [`DeployError::UpdatesFailed`] if any outcome failed.
pub fn summarize(outcomes: &[FunctionOutcome]) -> Result<()> {
    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    if failed > 0 {
        return Err(DeployError::UpdatesFailed {
            failed,
            total: outcomes.len(),
        }
        .into());
    }
    Ok(())
}

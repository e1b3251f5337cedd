//! Change planner.
//!
//! A change proposal (CloudFormation change set) moves through
//! `Created -> Computing -> Computed | Failed` and optionally
//! `Computed -> Applying -> Applied | Failed`. Proposals are named freshly on
//! every attempt and never reused across invocations.

use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aws::{ChangeSetRequest, ChangeSetStatus, Stack, StackApi, StackStatus};
use crate::error::{ChangeSetError, Result, TizonaError};

use super::diff::TemplateDiff;

/// Prefix of generated change set names.
pub const CHANGE_SET_PREFIX: &str = "tizona";

/// Maximum change set name length accepted by the provider.
pub const MAX_CHANGE_SET_NAME_LEN: usize = 128;

/// Provider reasons meaning the candidate equals the deployed template.
const NO_CHANGE_REASONS: &[&str] = &[
    "didn't contain changes",
    "No updates are to be performed",
];

/// Generates a fresh change set name.
///
/// The name is time-based plus a random suffix, so collisions with stale
/// proposals from earlier attempts cannot happen.
#[must_use]
pub fn generate_change_set_name() -> String {
    format!(
        "{CHANGE_SET_PREFIX}-{}-{}",
        Utc::now().format("%Y%m%d%H%M%S"),
        Uuid::new_v4().simple()
    )
}

/// Returns true if `name` is a valid change set name: a letter followed by
/// letters, digits or hyphens.
#[must_use]
pub fn is_valid_change_set_name(name: &str) -> bool {
    let mut chars = name.chars();
    name.len() <= MAX_CHANGE_SET_NAME_LEN
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Returns true if a provider message reports that there is nothing to change.
#[must_use]
pub fn is_no_changes_reason(reason: &str) -> bool {
    NO_CHANGE_REASONS.iter().any(|r| reason.contains(r))
}

/// State of a change proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum ProposalState {
    /// Named but not yet submitted.
    Created,
    /// Submitted, provider is computing the changes.
    Computing,
    /// Changes computed, ready to inspect or apply.
    Computed,
    /// Being executed against the stack.
    Applying,
    /// Executed successfully.
    Applied,
    /// Computation or execution failed.
    Failed(String),
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Computing => write!(f, "computing"),
            Self::Computed => write!(f, "computed"),
            Self::Applying => write!(f, "applying"),
            Self::Applied => write!(f, "applied"),
            Self::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

/// An ephemeral, named diff between a stack's deployed and candidate template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeProposal {
    /// Generated name.
    pub name: String,
    /// Provider id, once submitted.
    pub id: Option<String>,
    /// Target stack.
    pub stack_name: String,
    /// Current state.
    pub state: ProposalState,
}

impl ChangeProposal {
    /// Creates a freshly named proposal for a stack.
    #[must_use]
    pub fn new(stack_name: impl Into<String>) -> Self {
        Self {
            name: generate_change_set_name(),
            id: None,
            stack_name: stack_name.into(),
            state: ProposalState::Created,
        }
    }

    fn require(&self, expected: &ProposalState) -> Result<()> {
        if &self.state == expected {
            Ok(())
        } else {
            Err(ChangeSetError::InvalidState {
                name: self.name.clone(),
                state: self.state.to_string(),
                expected: expected.to_string(),
            }
            .into())
        }
    }

    fn fail(&mut self, reason: impl Into<String>) {
        self.state = ProposalState::Failed(reason.into());
    }
}

/// Result of planning a change.
#[derive(Debug)]
pub enum PlanOutcome {
    /// The candidate template equals the deployed one.
    NoChanges,
    /// A computed proposal and its template diff.
    Changes {
        /// The computed proposal.
        proposal: ChangeProposal,
        /// Canonical template diff.
        diff: TemplateDiff,
    },
}

/// Polling bounds of the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerSettings {
    /// Delay between status polls.
    pub poll_interval: Duration,
    /// Maximum time to wait for a change set to be computed.
    pub compute_timeout: Duration,
    /// Maximum time to wait for a stack update to finish.
    pub apply_timeout: Duration,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            compute_timeout: Duration::from_secs(600),
            apply_timeout: Duration::from_secs(1800),
        }
    }
}

/// Creates, inspects and applies change proposals.
pub struct ChangePlanner<'a> {
    /// Stack capability.
    api: &'a dyn StackApi,
    /// Polling bounds.
    settings: PlannerSettings,
}

impl fmt::Debug for ChangePlanner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangePlanner")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<'a> ChangePlanner<'a> {
    /// Creates a planner with default polling bounds.
    #[must_use]
    pub fn new(api: &'a dyn StackApi) -> Self {
        Self {
            api,
            settings: PlannerSettings::default(),
        }
    }

    /// Overrides the polling bounds.
    #[must_use]
    pub const fn with_settings(mut self, settings: PlannerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Submits a new change proposal for a stack.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeSetError::NoChanges`] if the provider rejects the
    /// proposal because nothing changed, or the provider error otherwise.
    pub async fn create_change_proposal(
        &self,
        stack: &Stack,
        template_body: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<ChangeProposal> {
        let mut proposal = ChangeProposal::new(&stack.name);
        info!("Creating change set {} for {}", proposal.name, stack.name);

        let request = ChangeSetRequest {
            stack_name: stack.name.clone(),
            change_set_name: proposal.name.clone(),
            template_body: template_body.to_string(),
            parameters: parameters.clone(),
        };

        match self.api.create_change_set(&request).await {
            Ok(id) => {
                proposal.id = Some(id);
                proposal.state = ProposalState::Computing;
                Ok(proposal)
            }
            Err(TizonaError::Provider(e)) if is_no_changes_reason(&e.message) => {
                Err(ChangeSetError::NoChanges {
                    stack: stack.name.clone(),
                }
                .into())
            }
            Err(e) => Err(e),
        }
    }

    /// Polls until the proposal leaves the computing state.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeSetError::NoChanges`] when the provider computed an
    /// empty change, [`ChangeSetError::Failed`] on other failures and
    /// [`ChangeSetError::Timeout`] when the compute bound is exceeded.
    pub async fn await_completion(&self, proposal: &mut ChangeProposal) -> Result<()> {
        proposal.require(&ProposalState::Computing)?;
        let started = Instant::now();

        loop {
            let description = self
                .api
                .describe_change_set(&proposal.stack_name, &proposal.name)
                .await?;
            debug!("Change set {} status: {:?}", proposal.name, description.status);

            match description.status {
                ChangeSetStatus::Complete => {
                    proposal.state = ProposalState::Computed;
                    return Ok(());
                }
                ChangeSetStatus::Pending => {}
                ChangeSetStatus::Failed | ChangeSetStatus::Other(_) => {
                    let reason = description.status_reason.unwrap_or_else(|| {
                        format!("change set ended in {:?}", description.status)
                    });
                    proposal.fail(&reason);

                    return Err(if is_no_changes_reason(&reason) {
                        ChangeSetError::NoChanges {
                            stack: proposal.stack_name.clone(),
                        }
                    } else {
                        ChangeSetError::Failed {
                            name: proposal.name.clone(),
                            reason,
                        }
                    }
                    .into());
                }
            }

            if started.elapsed() >= self.settings.compute_timeout {
                let reason = String::from("timed out while computing");
                proposal.fail(&reason);
                return Err(ChangeSetError::Timeout {
                    what: format!("change set {}", proposal.name),
                    waited_secs: started.elapsed().as_secs(),
                }
                .into());
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    /// Computes the canonical diff between the deployed and the candidate
    /// template of a computed proposal.
    ///
    /// # Errors
    ///
    /// Returns an error if the proposal is not computed, a template cannot be
    /// fetched, or a template cannot be parsed.
    pub async fn diff(&self, proposal: &ChangeProposal) -> Result<TemplateDiff> {
        proposal.require(&ProposalState::Computed)?;

        let deployed = self.api.get_template(&proposal.stack_name, None).await?;
        let candidate = self
            .api
            .get_template(&proposal.stack_name, Some(proposal.name.clone()))
            .await?;

        TemplateDiff::compute(&deployed, &candidate)
    }

    /// Executes a computed proposal and waits for the stack update to end.
    ///
    /// No rollback is attempted by this tool; the provider's own rollback
    /// behavior applies. A settled status only counts once the update has
    /// been seen in progress.
    ///
    /// # Errors
    ///
    /// Returns the provider error verbatim if execution cannot start,
    /// [`ChangeSetError::ExecutionFailed`] if the stack update fails and
    /// [`ChangeSetError::Timeout`] when the apply bound is exceeded.
    pub async fn apply(&self, proposal: &mut ChangeProposal) -> Result<StackStatus> {
        proposal.require(&ProposalState::Computed)?;
        proposal.state = ProposalState::Applying;
        info!("Executing change set {} on {}", proposal.name, proposal.stack_name);

        if let Err(e) = self
            .api
            .execute_change_set(&proposal.stack_name, &proposal.name)
            .await
        {
            proposal.fail(e.to_string());
            return Err(e);
        }

        let started = Instant::now();
        let mut update_seen = false;
        loop {
            let (status, reason) = match self.api.stack_status(&proposal.stack_name).await {
                Ok(status) => status,
                Err(e) => {
                    proposal.fail(e.to_string());
                    return Err(e);
                }
            };
            debug!("Stack {} status: {status}", proposal.stack_name);

            // A terminal status read before the update registers is the previous one.
            if status.is_in_progress() {
                update_seen = true;
            } else if update_seen {
                if status.is_successful() {
                    proposal.state = ProposalState::Applied;
                    info!("Stack {} updated: {status}", proposal.stack_name);
                    return Ok(status);
                }

                let reason = reason.unwrap_or_default();
                proposal.fail(format!("{status}: {reason}"));
                return Err(ChangeSetError::ExecutionFailed {
                    stack: proposal.stack_name.clone(),
                    status: status.to_string(),
                    reason,
                }
                .into());
            }

            if started.elapsed() >= self.settings.apply_timeout {
                proposal.fail("timed out while applying");
                return Err(ChangeSetError::Timeout {
                    what: format!("stack {}", proposal.stack_name),
                    waited_secs: started.elapsed().as_secs(),
                }
                .into());
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    /// Deletes a proposal that will not be applied.
    ///
    /// # Errors
    ///
    /// Returns the provider error if deletion fails.
    pub async fn discard(&self, proposal: &ChangeProposal) -> Result<()> {
        self.api
            .delete_change_set(&proposal.stack_name, &proposal.name)
            .await
    }

    /// Creates a proposal, waits for it and computes its diff.
    ///
    /// An empty change is reported as [`PlanOutcome::NoChanges`]. Once the
    /// proposal exists, every path other than a computed diff deletes it.
    ///
    /// # Errors
    ///
    /// Returns any other error of the create, wait or diff steps.
    pub async fn plan(
        &self,
        stack: &Stack,
        template_body: &str,
        parameters: &BTreeMap<String, String>,
    ) -> Result<PlanOutcome> {
        let mut proposal = match self
            .create_change_proposal(stack, template_body, parameters)
            .await
        {
            Ok(proposal) => proposal,
            Err(e) if e.is_no_changes() => return Ok(PlanOutcome::NoChanges),
            Err(e) => return Err(e),
        };

        match self.await_completion(&mut proposal).await {
            Ok(()) => {}
            Err(e) if e.is_no_changes() => {
                self.discard_quietly(&proposal).await;
                return Ok(PlanOutcome::NoChanges);
            }
            Err(e) => {
                self.discard_quietly(&proposal).await;
                return Err(e);
            }
        }

        match self.diff(&proposal).await {
            Ok(diff) => Ok(PlanOutcome::Changes { proposal, diff }),
            Err(e) => {
                self.discard_quietly(&proposal).await;
                Err(e)
            }
        }
    }

    async fn discard_quietly(&self, proposal: &ChangeProposal) {
        if let Err(cleanup) = self.discard(proposal).await {
            warn!("Failed to delete change set {}: {cleanup}", proposal.name);
        }
    }
}

//! Change planning for stack updates.
//!
//! This module creates change proposals against a stack, waits for the
//! provider to compute them, presents the canonical template diff, and
//! applies confirmed proposals.

mod change_set;
mod diff;

pub use change_set::{
    CHANGE_SET_PREFIX, ChangePlanner, ChangeProposal, PlanOutcome, PlannerSettings,
    ProposalState, generate_change_set_name, is_no_changes_reason, is_valid_change_set_name,
};
pub use diff::{DiffLine, LineChange, TemplateDiff, canonicalize};

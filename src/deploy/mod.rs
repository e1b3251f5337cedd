//! Function deployment.
//!
//! This module updates the functions of a resolved stack to a stored
//! package and introspects the REST APIs that front them.

mod api;
mod functions;

pub use api::{
    ApiDescription, ApiFunctions, ApiInspector, ApiPath, DEFAULT_STAGE, integrated_functions,
    invoke_url,
};
pub use functions::{Artifact, FunctionOutcome, FunctionUpdater, summarize};

//! Stack identity resolution.
//!
//! Every workflow starts here: the [`StackRegistry`] resolves which stacks
//! belong to a project and service, and the [`ResourceLister`] enumerates
//! their resources.

mod registry;
mod resources;

pub use registry::StackRegistry;
pub use resources::ResourceLister;

//! Provider data types.
//!
//! These are command-scoped, read-only copies of what the AWS control plane
//! reports. They are converted from SDK shapes at the adapter boundary so the
//! rest of the crate never depends on SDK types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// CloudFormation type tag of a Lambda function.
pub const FUNCTION_TYPE: &str = "AWS::Lambda::Function";

/// CloudFormation type tag of an S3 bucket.
pub const BUCKET_TYPE: &str = "AWS::S3::Bucket";

/// CloudFormation type tag of an API Gateway REST API.
pub const REST_API_TYPE: &str = "AWS::ApiGateway::RestApi";

/// CloudFormation type tag of a `CloudFront` distribution.
pub const DISTRIBUTION_TYPE: &str = "AWS::CloudFront::Distribution";

/// One page of a paginated provider listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items of this page, in provider order.
    pub items: Vec<T>,
    /// Token for the next page, if any.
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    /// Creates the last page of a listing.
    #[must_use]
    pub const fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

/// Lifecycle status of a stack, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StackStatus(String);

impl StackStatus {
    /// Wraps a provider status string such as `UPDATE_COMPLETE`.
    #[must_use]
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    /// Returns the provider status string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true while an operation is still running on the stack.
    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.0.ends_with("_IN_PROGRESS")
    }

    /// Returns true if the stack has been deleted.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.0 == "DELETE_COMPLETE"
    }

    /// Returns true if the last operation completed without rollback.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.0.ends_with("_COMPLETE") && !self.0.contains("ROLLBACK") && !self.is_deleted()
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A deployed infrastructure unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stack {
    /// Stack name, unique per account and region.
    pub name: String,
    /// Provider-assigned stack id.
    pub id: Option<String>,
    /// Current lifecycle status.
    pub status: StackStatus,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last update time.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Stack {
    /// Creates a stack summary with only a name and status.
    #[must_use]
    pub fn named(name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            status: StackStatus::new(status),
            created_at: None,
            updated_at: None,
        }
    }
}

/// A named, typed member of a stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    /// Logical id, unique within its stack only.
    pub logical_id: String,
    /// Provider-assigned physical id.
    pub physical_id: Option<String>,
    /// Type tag, e.g. `AWS::Lambda::Function`.
    pub resource_type: String,
    /// Resource status.
    pub status: String,
}

impl Resource {
    /// Creates a resource summary.
    #[must_use]
    pub fn new(
        logical_id: impl Into<String>,
        physical_id: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        Self {
            logical_id: logical_id.into(),
            physical_id: Some(physical_id.into()),
            resource_type: resource_type.into(),
            status: String::from("CREATE_COMPLETE"),
        }
    }

    /// Returns true if this resource has the given type tag.
    #[must_use]
    pub fn is(&self, resource_type: &str) -> bool {
        self.resource_type == resource_type
    }

    /// Returns the physical id, falling back to the logical id.
    #[must_use]
    pub fn physical_or_logical(&self) -> &str {
        self.physical_id.as_deref().unwrap_or(&self.logical_id)
    }
}

/// Parameters for creating a change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSetRequest {
    /// Target stack.
    pub stack_name: String,
    /// Generated change set name.
    pub change_set_name: String,
    /// Candidate template body (JSON or YAML).
    pub template_body: String,
    /// Parameter overrides.
    pub parameters: BTreeMap<String, String>,
}

/// Provider-side status of a change set computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSetStatus {
    /// Queued or still computing.
    Pending,
    /// Computation finished.
    Complete,
    /// Computation failed.
    Failed,
    /// Any other provider status (e.g. deletion).
    Other(String),
}

impl ChangeSetStatus {
    /// Maps a provider status string.
    #[must_use]
    pub fn from_provider(status: &str) -> Self {
        match status {
            "CREATE_PENDING" | "CREATE_IN_PROGRESS" => Self::Pending,
            "CREATE_COMPLETE" => Self::Complete,
            "FAILED" => Self::Failed,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Result of describing a change set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSetDescription {
    /// Computation status.
    pub status: ChangeSetStatus,
    /// Provider explanation, set on failure.
    pub status_reason: Option<String>,
}

/// Request to replace a function's code with a stored package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeUpdate {
    /// Function name or ARN.
    pub function_name: String,
    /// Bucket holding the package.
    pub bucket: String,
    /// Key of the package (the artifact address).
    pub key: String,
    /// Whether to publish a new immutable version.
    pub publish: bool,
}

/// Function configuration reported after a code update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishedVersion {
    /// Function name.
    pub function_name: String,
    /// Published version number (`$LATEST` when not published).
    pub version: String,
    /// Handler entry point.
    pub handler: Option<String>,
    /// Base64 SHA-256 of the deployed package.
    pub code_sha256: Option<String>,
    /// Provider last-modified timestamp.
    pub last_modified: Option<String>,
}

/// Summary of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    /// Object key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: Option<DateTime<Utc>>,
}

/// Metadata of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectHead {
    /// Hex SHA-256 fingerprint recorded at upload, if any.
    pub sha256: Option<String>,
}

/// Object upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObject {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// Object content.
    pub body: Vec<u8>,
    /// MIME type.
    pub content_type: String,
    /// Grant public read access.
    pub public_read: bool,
    /// Hex SHA-256 fingerprint stored as object metadata.
    pub sha256: Option<String>,
}

/// A resource path of a REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResource {
    /// Gateway resource id.
    pub id: String,
    /// Resource path, e.g. `/users/{id}`.
    pub path: String,
    /// HTTP methods defined on the path.
    pub methods: Vec<String>,
}

//! In-memory fakes of the capability interfaces for stateful test scenarios.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::{ProviderError, Result};

use super::api::{CdnApi, StackApi, StorageApi};
use super::types::{
    ChangeSetDescription, ChangeSetRequest, ChangeSetStatus, ObjectHead, Page, PutObject,
    Resource, Stack, StackStatus, StoredObject,
};

/// Fake CloudFormation holding paged listings and scripted change set states.
#[derive(Debug, Default)]
pub struct FakeStacks {
    /// Stack listing, one inner vector per page.
    pub stack_pages: Vec<Vec<Stack>>,
    /// Resource listings per stack, one inner vector per page.
    pub resource_pages: HashMap<String, Vec<Vec<Resource>>>,
    /// Deployed template body.
    pub deployed_template: String,
    /// Candidate template body returned for any change set.
    pub candidate_template: String,
    /// Error returned by `create_change_set`, if set.
    pub create_error: Option<String>,
    /// Scripted change set descriptions; the last one repeats.
    pub descriptions: Mutex<VecDeque<ChangeSetDescription>>,
    /// Scripted stack statuses after execution; the last one repeats.
    pub statuses: Mutex<VecDeque<(String, Option<String>)>>,
    /// Number of `list_stacks_page` calls.
    pub list_stack_calls: AtomicUsize,
    /// Submitted change set requests.
    pub created: Mutex<Vec<ChangeSetRequest>>,
    /// Executed change set names.
    pub executed: Mutex<Vec<String>>,
    /// Deleted change set names.
    pub deleted: Mutex<Vec<String>>,
}

impl FakeStacks {
    /// Creates a fake listing the given stack names on a single page.
    #[must_use]
    pub fn with_stacks(names: &[&str]) -> Self {
        Self {
            stack_pages: vec![names
                .iter()
                .map(|name| Stack::named(*name, "UPDATE_COMPLETE"))
                .collect()],
            ..Self::default()
        }
    }

    /// Sets the resources of a stack on a single page.
    #[must_use]
    pub fn with_resources(mut self, stack: &str, resources: Vec<Resource>) -> Self {
        self.resource_pages.insert(stack.to_string(), vec![resources]);
        self
    }

    /// Scripts the change set descriptions returned by successive polls.
    #[must_use]
    pub fn with_descriptions(self, descriptions: Vec<(ChangeSetStatus, Option<&str>)>) -> Self {
        {
            let mut queue = lock(&self.descriptions);
            for (status, reason) in descriptions {
                queue.push_back(ChangeSetDescription {
                    status,
                    status_reason: reason.map(String::from),
                });
            }
        }
        self
    }

    /// Scripts the stack statuses returned by successive polls.
    #[must_use]
    pub fn with_statuses(self, statuses: Vec<(&str, Option<&str>)>) -> Self {
        {
            let mut queue = lock(&self.statuses);
            for (status, reason) in statuses {
                queue.push_back((status.to_string(), reason.map(String::from)));
            }
        }
        self
    }
}

/// Pops the next scripted value, repeating the last one.
fn next_scripted<T: Clone>(queue: &Mutex<VecDeque<T>>) -> Option<T> {
    let mut queue = lock(queue);
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn page_at<T: Clone>(pages: &[Vec<T>], token: Option<String>) -> Page<T> {
    let index = token.and_then(|t| t.parse::<usize>().ok()).unwrap_or(0);
    let items = pages.get(index).cloned().unwrap_or_default();
    let next_token = (index + 1 < pages.len()).then(|| (index + 1).to_string());
    Page { items, next_token }
}

#[async_trait]
impl StackApi for FakeStacks {
    async fn list_stacks_page(&self, next_token: Option<String>) -> Result<Page<Stack>> {
        if next_token.is_none() {
            self.list_stack_calls.fetch_add(1, Ordering::SeqCst);
        }
        Ok(page_at(&self.stack_pages, next_token))
    }

    async fn list_stack_resources_page(
        &self,
        stack_name: &str,
        next_token: Option<String>,
    ) -> Result<Page<Resource>> {
        let pages = self.resource_pages.get(stack_name).ok_or_else(|| {
            ProviderError::new(
                "ListStackResources",
                format!("Stack with id {stack_name} does not exist"),
            )
        })?;
        Ok(page_at(pages, next_token))
    }

    async fn stack_status(&self, _stack_name: &str) -> Result<(StackStatus, Option<String>)> {
        let (status, reason) =
            next_scripted(&self.statuses).unwrap_or((String::from("UPDATE_COMPLETE"), None));
        Ok((StackStatus::new(status), reason))
    }

    async fn create_change_set(&self, request: &ChangeSetRequest) -> Result<String> {
        if let Some(message) = &self.create_error {
            return Err(ProviderError::new("CreateChangeSet", message.clone()).into());
        }
        lock(&self.created).push(request.clone());
        Ok(format!("arn:aws:cloudformation:changeSet/{}", request.change_set_name))
    }

    async fn describe_change_set(
        &self,
        _stack_name: &str,
        _change_set_name: &str,
    ) -> Result<ChangeSetDescription> {
        Ok(next_scripted(&self.descriptions).unwrap_or(ChangeSetDescription {
            status: ChangeSetStatus::Complete,
            status_reason: None,
        }))
    }

    async fn execute_change_set(&self, _stack_name: &str, change_set_name: &str) -> Result<()> {
        lock(&self.executed).push(change_set_name.to_string());
        Ok(())
    }

    async fn delete_change_set(&self, _stack_name: &str, change_set_name: &str) -> Result<()> {
        lock(&self.deleted).push(change_set_name.to_string());
        Ok(())
    }

    async fn get_template(
        &self,
        _stack_name: &str,
        change_set_name: Option<String>,
    ) -> Result<String> {
        Ok(if change_set_name.is_some() {
            self.candidate_template.clone()
        } else {
            self.deployed_template.clone()
        })
    }
}

/// A stored object of [`FakeStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeObject {
    /// Object content.
    pub body: Vec<u8>,
    /// MIME type.
    pub content_type: String,
    /// Whether the object is publicly readable.
    pub public_read: bool,
    /// Recorded fingerprint.
    pub sha256: Option<String>,
    /// Upload sequence number, used as modification time.
    pub sequence: i64,
}

/// Fake S3 holding objects and website settings in memory.
#[derive(Debug, Default)]
pub struct FakeStorage {
    /// Objects keyed by `(bucket, key)`.
    pub objects: Mutex<BTreeMap<(String, String), FakeObject>>,
    /// Website `(index, error)` documents per bucket.
    pub websites: Mutex<HashMap<String, (String, String)>>,
    /// Number of uploads performed.
    pub puts: AtomicUsize,
}

impl FakeStorage {
    /// Returns the body of an object as text.
    #[must_use]
    pub fn text(&self, bucket: &str, key: &str) -> Option<String> {
        lock(&self.objects)
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| String::from_utf8_lossy(&object.body).into_owned())
    }

    /// Returns a stored object.
    #[must_use]
    pub fn object(&self, bucket: &str, key: &str) -> Option<FakeObject> {
        lock(&self.objects)
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Returns all keys of a bucket.
    #[must_use]
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        lock(&self.objects)
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, key)| key.clone())
            .collect()
    }

    /// Returns the website index document of a bucket.
    #[must_use]
    pub fn index_document(&self, bucket: &str) -> Option<String> {
        lock(&self.websites).get(bucket).map(|(index, _)| index.clone())
    }

    /// Number of uploads performed so far.
    #[must_use]
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageApi for FakeStorage {
    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: Option<String>,
        delimiter: Option<String>,
        _next_token: Option<String>,
    ) -> Result<Page<StoredObject>> {
        let prefix = prefix.unwrap_or_default();
        let items = lock(&self.objects)
            .iter()
            .filter(|((b, key), _)| b == bucket && key.starts_with(&prefix))
            .filter(|((_, key), _)| {
                delimiter
                    .as_deref()
                    .is_none_or(|d| !key[prefix.len()..].contains(d))
            })
            .map(|((_, key), object)| StoredObject {
                key: key.clone(),
                size: object.body.len() as u64,
                last_modified: Utc.timestamp_opt(object.sequence, 0).single(),
            })
            .collect();
        Ok(Page::last(items))
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectHead>> {
        Ok(self.object(bucket, key).map(|object| ObjectHead {
            sha256: object.sha256,
        }))
    }

    async fn put_object(&self, request: PutObject) -> Result<()> {
        let sequence = i64::try_from(self.puts.fetch_add(1, Ordering::SeqCst)).unwrap_or_default();
        lock(&self.objects).insert(
            (request.bucket, request.key),
            FakeObject {
                body: request.body,
                content_type: request.content_type,
                public_read: request.public_read,
                sha256: request.sha256,
                sequence: 1_700_000_000 + sequence,
            },
        );
        Ok(())
    }

    async fn website_index_document(&self, bucket: &str) -> Result<Option<String>> {
        Ok(self.index_document(bucket))
    }

    async fn put_website_documents(
        &self,
        bucket: &str,
        index_document: &str,
        error_document: &str,
    ) -> Result<()> {
        lock(&self.websites).insert(
            bucket.to_string(),
            (index_document.to_string(), error_document.to_string()),
        );
        Ok(())
    }
}

/// Fake `CloudFront` recording default root objects.
#[derive(Debug, Default)]
pub struct FakeCdn {
    /// Default root object per distribution.
    pub root_objects: Mutex<HashMap<String, String>>,
    /// Distributions waited on.
    pub waited: Mutex<Vec<String>>,
}

impl FakeCdn {
    /// Returns the default root object of a distribution.
    #[must_use]
    pub fn root_object(&self, distribution_id: &str) -> Option<String> {
        lock(&self.root_objects).get(distribution_id).cloned()
    }
}

#[async_trait]
impl CdnApi for FakeCdn {
    async fn set_default_root_object(&self, distribution_id: &str, object: &str) -> Result<()> {
        lock(&self.root_objects).insert(distribution_id.to_string(), object.to_string());
        Ok(())
    }

    async fn wait_deployed(&self, distribution_id: &str, _max_wait: Duration) -> Result<()> {
        lock(&self.waited).push(distribution_id.to_string());
        Ok(())
    }
}

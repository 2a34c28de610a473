//! In-memory implementations of the store traits.
//!
//! Used by the tests and by the server when no database is configured.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::access::{AccessQuery, AccessRecord, AccessStore};
use crate::error::StoreError;
use crate::invocation::{Invocation, InvocationStore};
use crate::notebook::{NotebookStore, StoredNotebook};
use crate::scheduler::{CronStore, DeviceEvent, EventStore, Job, Mapping, MappingStore};
use crate::transformation::{Snippet, SnippetStore};

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Records keyed by (account, id)
struct AccountMap<T> {
    kind: &'static str,
    items: RwLock<HashMap<(String, String), T>>,
}

impl<T: Clone> AccountMap<T> {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            items: RwLock::new(HashMap::new()),
        }
    }

    async fn insert(&self, account_id: &str, id: String, item: T) {
        self.items.write().await.insert((account_id.to_string(), id), item);
    }

    async fn get(&self, account_id: &str, id: &str) -> Result<T, StoreError> {
        self.items
            .read()
            .await
            .get(&(account_id.to_string(), id.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::not_found(self.kind, id))
    }

    async fn remove(&self, account_id: &str, id: &str) -> Result<T, StoreError> {
        self.items
            .write()
            .await
            .remove(&(account_id.to_string(), id.to_string()))
            .ok_or_else(|| StoreError::not_found(self.kind, id))
    }

    async fn len(&self) -> usize {
        self.items.read().await.len()
    }
}

/// Access records with a count of every successful write
pub struct MemoryAccessStore {
    records: RwLock<Vec<AccessRecord>>,
    mutations: AtomicUsize,
}

impl MemoryAccessStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            mutations: AtomicUsize::new(0),
        }
    }

    /// Number of creates, updates and deletes applied so far
    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    pub async fn records(&self) -> Vec<AccessRecord> {
        self.records.read().await.clone()
    }
}

impl Default for MemoryAccessStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccessStore for MemoryAccessStore {
    async fn query_access(&self, query: &AccessQuery) -> Result<Vec<AccessRecord>, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| query.matches(r)).cloned().collect())
    }

    async fn create_access(&self, record: &AccessRecord) -> Result<String, StoreError> {
        let id = new_id();
        self.records.write().await.push(AccessRecord {
            id: id.clone(),
            ..record.clone()
        });
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn update_access(&self, id: &str, record: &AccessRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let existing = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::not_found("access", id))?;
        *existing = AccessRecord {
            id: id.to_string(),
            ..record.clone()
        };
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_access(&self, id: &str) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(StoreError::not_found("access", id));
        }
        self.mutations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryNotebookStore {
    notebooks: RwLock<HashMap<String, StoredNotebook>>,
}

impl MemoryNotebookStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.notebooks.read().await.len()
    }
}

#[async_trait]
impl NotebookStore for MemoryNotebookStore {
    async fn create_notebook(&self, data: &str) -> Result<StoredNotebook, StoreError> {
        let now = Utc::now();
        let stored = StoredNotebook {
            id: new_id(),
            version: 1,
            created_on: now,
            updated_on: now,
            data: data.to_string(),
        };
        self.notebooks
            .write()
            .await
            .insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_notebook(&self, id: &str) -> Result<StoredNotebook, StoreError> {
        self.notebooks
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("notebook", id))
    }

    async fn update_notebook(
        &self,
        id: &str,
        data: &str,
        expected_version: Option<i64>,
    ) -> Result<StoredNotebook, StoreError> {
        let mut notebooks = self.notebooks.write().await;
        let stored = notebooks
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found("notebook", id))?;

        if let Some(expected) = expected_version {
            if stored.version != expected {
                return Err(StoreError::VersionConflict {
                    kind: "notebook",
                    id: id.to_string(),
                    expected,
                    actual: stored.version,
                });
            }
        }

        stored.version += 1;
        stored.updated_on = Utc::now();
        stored.data = data.to_string();
        Ok(stored.clone())
    }

    async fn delete_notebook(&self, id: &str) -> Result<(), StoreError> {
        self.notebooks
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("notebook", id))
    }
}

pub struct MemorySnippetStore {
    snippets: AccountMap<Snippet>,
}

impl MemorySnippetStore {
    pub fn new() -> Self {
        Self {
            snippets: AccountMap::new("snippet"),
        }
    }
}

impl Default for MemorySnippetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnippetStore for MemorySnippetStore {
    async fn add_snippet(&self, account_id: &str, snippet: &Snippet) -> Result<String, StoreError> {
        let id = new_id();
        let now = Utc::now();
        let stored = Snippet {
            id: id.clone(),
            created_on: now,
            updated_on: now,
            version: 1,
            ..snippet.clone()
        };
        self.snippets.insert(account_id, id.clone(), stored).await;
        Ok(id)
    }

    async fn get_snippet(&self, account_id: &str, id: &str) -> Result<Snippet, StoreError> {
        self.snippets.get(account_id, id).await
    }

    async fn get_snippets(&self, account_id: &str) -> Result<Vec<Snippet>, StoreError> {
        let items = self.snippets.items.read().await;
        let mut snippets: Vec<Snippet> = items
            .iter()
            .filter(|((account, _), _)| account == account_id)
            .map(|(_, snippet)| snippet.clone())
            .collect();
        snippets.sort_by(|a, b| a.created_on.cmp(&b.created_on).then_with(|| a.id.cmp(&b.id)));
        Ok(snippets)
    }

    async fn update_snippet(
        &self,
        account_id: &str,
        snippet: &Snippet,
        expected_version: i64,
    ) -> Result<i64, StoreError> {
        let mut items = self.snippets.items.write().await;
        let stored = items
            .get_mut(&(account_id.to_string(), snippet.id.clone()))
            .ok_or_else(|| StoreError::not_found("snippet", &snippet.id))?;

        if stored.version != expected_version {
            return Err(StoreError::VersionConflict {
                kind: "snippet",
                id: snippet.id.clone(),
                expected: expected_version,
                actual: stored.version,
            });
        }

        let version = stored.version + 1;
        *stored = Snippet {
            created_on: stored.created_on,
            updated_on: Utc::now(),
            version,
            ..snippet.clone()
        };
        Ok(version)
    }

    async fn delete_snippet(&self, account_id: &str, id: &str) -> Result<(), StoreError> {
        self.snippets.remove(account_id, id).await.map(|_| ())
    }
}

pub struct MemoryCronStore {
    jobs: AccountMap<Job>,
}

impl MemoryCronStore {
    pub fn new() -> Self {
        Self {
            jobs: AccountMap::new("job"),
        }
    }

    pub async fn len(&self) -> usize {
        self.jobs.len().await
    }
}

impl Default for MemoryCronStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CronStore for MemoryCronStore {
    async fn add_job(&self, account_id: &str, job: &Job) -> Result<String, StoreError> {
        let id = new_id();
        let stored = Job {
            id: id.clone(),
            ..job.clone()
        };
        self.jobs.insert(account_id, id.clone(), stored).await;
        Ok(id)
    }

    async fn get_job(&self, account_id: &str, id: &str) -> Result<Job, StoreError> {
        self.jobs.get(account_id, id).await
    }

    async fn delete_job(&self, account_id: &str, id: &str) -> Result<(), StoreError> {
        self.jobs.remove(account_id, id).await.map(|_| ())
    }
}

pub struct MemoryEventStore {
    events: AccountMap<DeviceEvent>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self {
            events: AccountMap::new("event"),
        }
    }

    pub async fn len(&self) -> usize {
        self.events.len().await
    }
}

impl Default for MemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn add_event(&self, account_id: &str, event: &DeviceEvent) -> Result<String, StoreError> {
        let id = new_id();
        let stored = DeviceEvent {
            id: id.clone(),
            ..event.clone()
        };
        self.events.insert(account_id, id.clone(), stored).await;
        Ok(id)
    }

    async fn get_event(&self, account_id: &str, id: &str) -> Result<DeviceEvent, StoreError> {
        self.events.get(account_id, id).await
    }

    async fn delete_event(&self, account_id: &str, id: &str) -> Result<(), StoreError> {
        self.events.remove(account_id, id).await.map(|_| ())
    }
}

pub struct MemoryMappingStore {
    mappings: AccountMap<Mapping>,
}

impl MemoryMappingStore {
    pub fn new() -> Self {
        Self {
            mappings: AccountMap::new("mapping"),
        }
    }

    pub async fn len(&self) -> usize {
        self.mappings.len().await
    }
}

impl Default for MemoryMappingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MappingStore for MemoryMappingStore {
    async fn add_mapping(&self, account_id: &str, mapping: &Mapping) -> Result<String, StoreError> {
        let id = new_id();
        let stored = Mapping {
            id: id.clone(),
            ..mapping.clone()
        };
        self.mappings.insert(account_id, id.clone(), stored).await;
        Ok(id)
    }

    async fn get_mapping(&self, account_id: &str, id: &str) -> Result<Mapping, StoreError> {
        self.mappings.get(account_id, id).await
    }

    async fn delete_mapping(&self, account_id: &str, id: &str) -> Result<(), StoreError> {
        self.mappings.remove(account_id, id).await.map(|_| ())
    }
}

/// Invocation results, seeded through [`MemoryInvocationStore::record`]
#[derive(Default)]
pub struct MemoryInvocationStore {
    invocations: RwLock<Vec<(String, Invocation)>>,
}

impl MemoryInvocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished run. Assigns an id when the invocation has none.
    pub async fn record(&self, account_id: &str, mut invocation: Invocation) -> String {
        if invocation.id.is_empty() {
            invocation.id = new_id();
        }
        let id = invocation.id.clone();
        self.invocations
            .write()
            .await
            .push((account_id.to_string(), invocation));
        id
    }
}

#[async_trait]
impl InvocationStore for MemoryInvocationStore {
    async fn get_invocation_results(
        &self,
        account_id: &str,
        snippet_id: &str,
        limit: usize,
    ) -> Result<Vec<Invocation>, StoreError> {
        let invocations = self.invocations.read().await;
        let mut results: Vec<Invocation> = invocations
            .iter()
            .filter(|(account, i)| account == account_id && i.snippet_id == snippet_id)
            .map(|(_, i)| i.clone())
            .collect();
        results.sort_by(|a, b| b.created_on.cmp(&a.created_on));
        results.truncate(limit);
        Ok(results)
    }
}

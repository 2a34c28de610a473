//! Pluggable schedulers, one per event category.

pub mod device;
pub mod timer;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{NorthstarError, StoreError};
use crate::schedule::Schedule;

pub use device::{DeviceEvent, DeviceScheduler, EventStore, Mapping, MappingStore};
pub use timer::{CronStore, Job, TimerScheduler};

/// Backend that materializes schedules for one event category
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Create the schedule for `transformation_id`. The returned schedule
    /// carries the scheduler's own id for it.
    async fn create(
        &self,
        account_id: &str,
        transformation_id: &str,
        schedule: &Schedule,
    ) -> Result<Schedule, NorthstarError>;

    async fn get(&self, account_id: &str, schedule_id: &str) -> Result<Schedule, NorthstarError>;

    /// Delete the schedule. Deleting one that is already gone succeeds.
    async fn delete(&self, account_id: &str, schedule_id: &str) -> Result<(), NorthstarError>;
}

/// Treat a record that no longer exists as deleted, so a delete that stopped
/// halfway can be run again.
pub(crate) fn deleted(context: &str, result: Result<(), StoreError>) -> Result<(), NorthstarError> {
    match result {
        Err(StoreError::NotFound { kind, id }) => {
            tracing::debug!(kind, id = %id, "{}: already deleted", context);
            Ok(())
        }
        result => result.map_err(|e| NorthstarError::external(context, e)),
    }
}

/// Maps event categories to schedulers. Built at startup and shared.
#[derive(Default, Clone)]
pub struct SchedulerRegistry {
    schedulers: HashMap<String, Arc<dyn Scheduler>>,
}

impl SchedulerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a scheduler, replacing any previous one for the category
    pub fn register(&mut self, category: impl Into<String>, scheduler: Arc<dyn Scheduler>) {
        self.schedulers.insert(category.into(), scheduler);
    }

    pub fn with(mut self, category: impl Into<String>, scheduler: Arc<dyn Scheduler>) -> Self {
        self.register(category, scheduler);
        self
    }

    pub fn get(&self, category: &str) -> Option<Arc<dyn Scheduler>> {
        self.schedulers.get(category).cloned()
    }

    /// Like [`SchedulerRegistry::get`], failing with `BadRequest` for an
    /// unknown category
    pub fn resolve(&self, category: &str) -> Result<Arc<dyn Scheduler>, NorthstarError> {
        self.get(category).ok_or_else(|| {
            NorthstarError::BadRequest(format!(
                "The event category '{}' is invalid or not supported.",
                category
            ))
        })
    }

    pub fn categories(&self) -> Vec<&str> {
        let mut categories: Vec<&str> = self.schedulers.keys().map(String::as_str).collect();
        categories.sort_unstable();
        categories
    }
}

impl fmt::Debug for SchedulerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerRegistry")
            .field("categories", &self.categories())
            .finish()
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{NorthstarError, StoreError};
use crate::schedule::{Schedule, DEVICE_EVENT};

use super::{deleted, Scheduler};

/// A device event a snippet can be triggered by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEvent {
    pub id: String,
    pub name: String,
    pub created_on: DateTime<Utc>,
}

/// Link between a device event and a snippet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    pub id: String,
    pub event_id: String,
    pub snippet_id: String,
    pub created_on: DateTime<Utc>,
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn add_event(&self, account_id: &str, event: &DeviceEvent) -> Result<String, StoreError>;

    async fn get_event(&self, account_id: &str, id: &str) -> Result<DeviceEvent, StoreError>;

    async fn delete_event(&self, account_id: &str, id: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn add_mapping(&self, account_id: &str, mapping: &Mapping) -> Result<String, StoreError>;

    async fn get_mapping(&self, account_id: &str, id: &str) -> Result<Mapping, StoreError>;

    async fn delete_mapping(&self, account_id: &str, id: &str) -> Result<(), StoreError>;
}

/// Event-based schedules. Each schedule is an event record plus a mapping
/// record; the schedule id is the mapping id.
pub struct DeviceScheduler {
    events: Arc<dyn EventStore>,
    mappings: Arc<dyn MappingStore>,
}

impl DeviceScheduler {
    pub fn new(events: Arc<dyn EventStore>, mappings: Arc<dyn MappingStore>) -> Self {
        Self { events, mappings }
    }

    async fn mapping(&self, account_id: &str, schedule_id: &str) -> Result<Mapping, NorthstarError> {
        self.mappings
            .get_mapping(account_id, schedule_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => NorthstarError::from(e),
                e => NorthstarError::external("Get mapping", e),
            })
    }
}

#[async_trait]
impl Scheduler for DeviceScheduler {
    async fn create(
        &self,
        account_id: &str,
        transformation_id: &str,
        schedule: &Schedule,
    ) -> Result<Schedule, NorthstarError> {
        tracing::debug!(transformation_id, event = %schedule.event.name, "Creating device schedule");
        let now = Utc::now();

        let event = DeviceEvent {
            id: String::new(),
            name: schedule.event.name.clone(),
            created_on: now,
        };
        let event_id = self
            .events
            .add_event(account_id, &event)
            .await
            .map_err(|e| NorthstarError::external("Create event", e))?;

        let mapping = Mapping {
            id: String::new(),
            event_id: event_id.clone(),
            snippet_id: transformation_id.to_string(),
            created_on: now,
        };
        let mapping_id = match self.mappings.add_mapping(account_id, &mapping).await {
            Ok(id) => id,
            Err(e) => {
                // Compensate: the event has no mapping pointing at it
                if let Err(cleanup) = self.events.delete_event(account_id, &event_id).await {
                    tracing::error!(event_id = %event_id, "Delete orphaned event failed: {}", cleanup);
                }
                return Err(NorthstarError::external("Create mapping", e));
            }
        };

        Ok(Schedule {
            id: mapping_id,
            created_on: Some(now),
            ..schedule.clone()
        })
    }

    async fn get(&self, account_id: &str, schedule_id: &str) -> Result<Schedule, NorthstarError> {
        let mapping = self.mapping(account_id, schedule_id).await?;

        let event = self
            .events
            .get_event(account_id, &mapping.event_id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => NorthstarError::from(e),
                e => NorthstarError::external("Get event", e),
            })?;

        let mut schedule = Schedule::new(DEVICE_EVENT, event.name, "");
        schedule.id = mapping.id;
        schedule.created_on = Some(mapping.created_on);
        Ok(schedule)
    }

    /// Deletes the event first, then the mapping. Records already gone are
    /// skipped, so a delete that failed after the event was removed can be
    /// run again.
    async fn delete(&self, account_id: &str, schedule_id: &str) -> Result<(), NorthstarError> {
        tracing::debug!(schedule_id, "Deleting device schedule");
        let mapping = match self.mappings.get_mapping(account_id, schedule_id).await {
            Ok(mapping) => mapping,
            Err(StoreError::NotFound { .. }) => {
                tracing::debug!(schedule_id, "Mapping already deleted");
                return Ok(());
            }
            Err(e) => return Err(NorthstarError::external("Get mapping", e)),
        };

        deleted(
            "Delete event",
            self.events.delete_event(account_id, &mapping.event_id).await,
        )?;
        deleted(
            "Delete mapping",
            self.mappings.delete_mapping(account_id, &mapping.id).await,
        )
    }
}

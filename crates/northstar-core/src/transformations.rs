//! Transformation lifecycle and the Unscheduled/Scheduled state machine.
//!
//! A scheduled transformation cannot be updated, deleted or scheduled again
//! until its schedule is removed. Every write back to the snippet store is
//! conditional on the version that was read, so of two racing schedule
//! changes only one commits.

use std::sync::Arc;

use crate::error::{NorthstarError, StoreError};
use crate::invocation::{InvocationStore, Output, RESULTS_LIMIT};
use crate::limits::ExecutionLimits;
use crate::schedule::Schedule;
use crate::scheduler::{Scheduler, SchedulerRegistry};
use crate::transformation::{SnippetStore, Transformation};

pub struct TransformationService {
    snippets: Arc<dyn SnippetStore>,
    invocations: Arc<dyn InvocationStore>,
    schedulers: Arc<SchedulerRegistry>,
    limits: ExecutionLimits,
}

impl TransformationService {
    pub fn new(
        snippets: Arc<dyn SnippetStore>,
        invocations: Arc<dyn InvocationStore>,
        schedulers: Arc<SchedulerRegistry>,
        limits: ExecutionLimits,
    ) -> Self {
        Self {
            snippets,
            invocations,
            schedulers,
            limits,
        }
    }

    /// Categories a schedule can be created for
    pub fn event_categories(&self) -> Vec<String> {
        self.schedulers.categories().into_iter().map(str::to_string).collect()
    }

    /// Store a new, unscheduled transformation
    pub async fn create(
        &self,
        account_id: &str,
        mut transformation: Transformation,
    ) -> Result<Transformation, NorthstarError> {
        tracing::debug!(account_id, name = %transformation.name, "Create transformation");
        transformation.validate(&self.limits)?;
        transformation.mark_unscheduled();

        let snippet = transformation.to_snippet()?;
        let id = self
            .snippets
            .add_snippet(account_id, &snippet)
            .await
            .map_err(|e| NorthstarError::external("Create snippet", e))?;

        tracing::info!(transformation_id = %id, "Transformation created");
        self.fetch(account_id, &id).await
    }

    /// Get a transformation with its schedule attached
    pub async fn get(&self, account_id: &str, id: &str) -> Result<Transformation, NorthstarError> {
        tracing::debug!(account_id, transformation_id = id, "Get transformation");
        let mut transformation = self.fetch(account_id, id).await?;

        if transformation.scheduled {
            let scheduler = self.schedulers.resolve(&transformation.scheduler_type)?;
            let schedule = scheduler
                .get(account_id, &transformation.scheduler_id)
                .await
                .map_err(|e| match e {
                    NorthstarError::External(_) => e,
                    e => NorthstarError::external("Get schedule", e),
                })?;
            transformation.schedule = Some(schedule);
        }

        Ok(transformation)
    }

    /// All transformations of the account. One whose schedule cannot be
    /// read is left out.
    pub async fn list(&self, account_id: &str) -> Result<Vec<Transformation>, NorthstarError> {
        tracing::debug!(account_id, "List transformations");
        let snippets = self
            .snippets
            .get_snippets(account_id)
            .await
            .map_err(|e| NorthstarError::external("List snippets", e))?;

        let mut transformations = Vec::with_capacity(snippets.len());
        for snippet in &snippets {
            let mut transformation = Transformation::from_snippet(snippet);

            if transformation.scheduled {
                let scheduler = self.schedulers.resolve(&transformation.scheduler_type)?;
                match scheduler.get(account_id, &transformation.scheduler_id).await {
                    Ok(schedule) => transformation.schedule = Some(schedule),
                    Err(e) => {
                        tracing::error!(transformation_id = %transformation.id, "Get schedule returned error: {}", e);
                        continue;
                    }
                }
            }

            transformations.push(transformation);
        }

        Ok(transformations)
    }

    /// Replace an unscheduled transformation
    pub async fn update(
        &self,
        account_id: &str,
        mut transformation: Transformation,
    ) -> Result<Transformation, NorthstarError> {
        tracing::debug!(account_id, transformation_id = %transformation.id, "Update transformation");
        transformation.validate(&self.limits)?;

        let current = self.fetch(account_id, &transformation.id).await?;
        ensure_unscheduled(&current)?;

        transformation.mark_unscheduled();
        transformation.created_on = current.created_on;
        self.write(account_id, &transformation, current.version).await?;

        self.fetch(account_id, &transformation.id).await
    }

    /// Delete an unscheduled transformation
    pub async fn delete(&self, account_id: &str, id: &str) -> Result<(), NorthstarError> {
        tracing::debug!(account_id, transformation_id = id, "Delete transformation");
        let current = self.fetch(account_id, id).await?;
        ensure_unscheduled(&current)?;

        self.snippets
            .delete_snippet(account_id, id)
            .await
            .map_err(|e| snippet_error("Delete snippet", e))?;

        tracing::info!(transformation_id = id, "Transformation deleted");
        Ok(())
    }

    /// Schedule the transformation with the scheduler for the event category
    pub async fn create_schedule(
        &self,
        account_id: &str,
        id: &str,
        schedule: &Schedule,
    ) -> Result<Schedule, NorthstarError> {
        tracing::debug!(account_id, transformation_id = id, category = schedule.category(), "Create schedule");
        schedule.validate()?;

        let mut transformation = self.fetch(account_id, id).await?;
        ensure_unscheduled(&transformation)?;

        let scheduler = self.schedulers.resolve(schedule.category())?;
        let created = scheduler.create(account_id, id, schedule).await?;

        transformation.mark_scheduled(schedule.category(), &created.id);
        let version = transformation.version;
        if let Err(e) = self.write(account_id, &transformation, version).await {
            compensate(scheduler.as_ref(), account_id, &created.id).await;
            return Err(e);
        }

        tracing::info!(transformation_id = id, schedule_id = %created.id, "Transformation scheduled");
        Ok(created)
    }

    pub async fn get_schedule(&self, account_id: &str, id: &str) -> Result<Schedule, NorthstarError> {
        tracing::debug!(account_id, transformation_id = id, "Get schedule");
        let transformation = self.fetch(account_id, id).await?;
        if !transformation.scheduled {
            return Err(not_scheduled(id));
        }

        let scheduler = self.schedulers.resolve(&transformation.scheduler_type)?;
        scheduler.get(account_id, &transformation.scheduler_id).await
    }

    /// Remove the schedule. If the scheduler fails, the transformation stays
    /// scheduled.
    pub async fn delete_schedule(&self, account_id: &str, id: &str) -> Result<(), NorthstarError> {
        tracing::debug!(account_id, transformation_id = id, "Delete schedule");
        let mut transformation = self.fetch(account_id, id).await?;
        if !transformation.scheduled {
            return Err(not_scheduled(id));
        }

        let scheduler = self.schedulers.resolve(&transformation.scheduler_type)?;
        scheduler
            .delete(account_id, &transformation.scheduler_id)
            .await
            .map_err(|e| {
                tracing::error!(transformation_id = id, "Delete schedule returned error: {}", e);
                e
            })?;

        let schedule_id = transformation.scheduler_id.clone();
        transformation.mark_unscheduled();
        let version = transformation.version;
        self.write(account_id, &transformation, version).await.map_err(|e| {
            tracing::error!(
                transformation_id = id,
                schedule_id = %schedule_id,
                "Schedule deleted but transformation still references it: {}",
                e
            );
            e
        })?;

        tracing::info!(transformation_id = id, "Transformation unscheduled");
        Ok(())
    }

    /// Outputs of the most recent runs, newest first
    pub async fn results(&self, account_id: &str, id: &str) -> Result<Vec<Output>, NorthstarError> {
        tracing::debug!(account_id, transformation_id = id, "Get results");
        self.fetch(account_id, id).await?;

        let invocations = self
            .invocations
            .get_invocation_results(account_id, id, RESULTS_LIMIT)
            .await
            .map_err(|e| {
                NorthstarError::external(&format!("Get results for transformation {}", id), e)
            })?;

        Ok(invocations.iter().map(Output::from_invocation).collect())
    }

    async fn fetch(&self, account_id: &str, id: &str) -> Result<Transformation, NorthstarError> {
        let snippet = self
            .snippets
            .get_snippet(account_id, id)
            .await
            .map_err(|e| snippet_error("Get snippet", e))?;
        Ok(Transformation::from_snippet(&snippet))
    }

    async fn write(
        &self,
        account_id: &str,
        transformation: &Transformation,
        expected_version: i64,
    ) -> Result<i64, NorthstarError> {
        let snippet = transformation.to_snippet()?;
        self.snippets
            .update_snippet(account_id, &snippet, expected_version)
            .await
            .map_err(|e| snippet_error("Update snippet", e))
    }
}

async fn compensate(scheduler: &dyn Scheduler, account_id: &str, schedule_id: &str) {
    tracing::warn!(schedule_id, "Snippet write failed, deleting schedule");
    if let Err(e) = scheduler.delete(account_id, schedule_id).await {
        tracing::error!(schedule_id, "Delete schedule error: {}", e);
    }
}

fn ensure_unscheduled(transformation: &Transformation) -> Result<(), NorthstarError> {
    if transformation.scheduled {
        tracing::debug!(transformation_id = %transformation.id, "Transformation is scheduled");
        return Err(NorthstarError::Conflict(format!(
            "Transformation {} is scheduled. Delete the schedule first.",
            transformation.id
        )));
    }
    Ok(())
}

fn not_scheduled(id: &str) -> NorthstarError {
    NorthstarError::NotFound(format!("Transformation {} has no schedule.", id))
}

fn snippet_error(context: &str, err: StoreError) -> NorthstarError {
    match err {
        StoreError::Backend(_) => NorthstarError::external(context, err),
        e => e.into(),
    }
}

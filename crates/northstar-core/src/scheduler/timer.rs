use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{NorthstarError, StoreError};
use crate::schedule::{Schedule, TIMER_EVENT};

use super::{deleted, Scheduler};

/// A cron job that runs a snippet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub name: String,
    pub snippet_id: String,
    /// Cron expression, 5 fields or 6 with leading seconds
    pub schedule: String,
    pub updated_on: DateTime<Utc>,
}

/// Per-account store of cron jobs
#[async_trait]
pub trait CronStore: Send + Sync {
    async fn add_job(&self, account_id: &str, job: &Job) -> Result<String, StoreError>;

    async fn get_job(&self, account_id: &str, id: &str) -> Result<Job, StoreError>;

    async fn delete_job(&self, account_id: &str, id: &str) -> Result<(), StoreError>;
}

/// Time-based schedules backed by the cron job service
pub struct TimerScheduler {
    jobs: Arc<dyn CronStore>,
}

impl TimerScheduler {
    pub fn new(jobs: Arc<dyn CronStore>) -> Self {
        Self { jobs }
    }
}

fn check_expression(expression: &str) -> Result<(), NorthstarError> {
    let fields = expression.split_whitespace().count();
    if fields == 5 || fields == 6 {
        Ok(())
    } else {
        Err(NorthstarError::BadRequest(format!(
            "Invalid timer expression '{}' (need 5 or 6 fields).",
            expression
        )))
    }
}

#[async_trait]
impl Scheduler for TimerScheduler {
    async fn create(
        &self,
        account_id: &str,
        transformation_id: &str,
        schedule: &Schedule,
    ) -> Result<Schedule, NorthstarError> {
        tracing::debug!(transformation_id, "Creating timer schedule");
        check_expression(&schedule.event.value)?;

        let job = Job {
            id: String::new(),
            name: schedule.event.name.clone(),
            snippet_id: transformation_id.to_string(),
            schedule: schedule.event.value.clone(),
            updated_on: Utc::now(),
        };

        let job_id = self
            .jobs
            .add_job(account_id, &job)
            .await
            .map_err(|e| NorthstarError::external("Create job", e))?;

        Ok(Schedule {
            id: job_id,
            ..schedule.clone()
        })
    }

    async fn get(&self, account_id: &str, schedule_id: &str) -> Result<Schedule, NorthstarError> {
        let job = self.jobs.get_job(account_id, schedule_id).await.map_err(|e| match e {
            StoreError::NotFound { .. } => NorthstarError::from(e),
            e => NorthstarError::external("Get job", e),
        })?;

        let mut schedule = Schedule::new(TIMER_EVENT, job.name, job.schedule);
        schedule.id = job.id;
        schedule.last_updated = Some(job.updated_on);
        Ok(schedule)
    }

    async fn delete(&self, account_id: &str, schedule_id: &str) -> Result<(), NorthstarError> {
        tracing::debug!(schedule_id, "Deleting timer schedule");
        deleted("Delete job", self.jobs.delete_job(account_id, schedule_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCronStore;

    #[tokio::test]
    async fn test_create_get_delete() {
        let jobs = Arc::new(MemoryCronStore::new());
        let scheduler = TimerScheduler::new(jobs.clone());

        let created = scheduler
            .create("acct", "t1", &Schedule::new(TIMER_EVENT, "hourly", "0 0 * * * *"))
            .await
            .unwrap();
        assert!(!created.id.is_empty());

        let job = jobs.get_job("acct", &created.id).await.unwrap();
        assert_eq!(job.snippet_id, "t1");

        let fetched = scheduler.get("acct", &created.id).await.unwrap();
        assert_eq!(fetched.event, created.event);
        assert!(fetched.last_updated.is_some());

        scheduler.delete("acct", &created.id).await.unwrap();
        assert!(matches!(
            scheduler.get("acct", &created.id).await,
            Err(NorthstarError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_job_succeeds() {
        let jobs = Arc::new(MemoryCronStore::new());
        let scheduler = TimerScheduler::new(jobs.clone());

        let created = scheduler
            .create("acct", "t1", &Schedule::new(TIMER_EVENT, "hourly", "0 0 * * * *"))
            .await
            .unwrap();
        jobs.delete_job("acct", &created.id).await.unwrap();

        scheduler.delete("acct", &created.id).await.unwrap();
        scheduler.delete("acct", &created.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_malformed_expression() {
        let jobs = Arc::new(MemoryCronStore::new());
        let scheduler = TimerScheduler::new(jobs.clone());

        let err = scheduler
            .create("acct", "t1", &Schedule::new(TIMER_EVENT, "bad", "every hour"))
            .await
            .unwrap_err();
        assert!(matches!(err, NorthstarError::BadRequest(_)));
        assert_eq!(jobs.len().await, 0);
    }

    #[tokio::test]
    async fn test_accounts_are_isolated() {
        let scheduler = TimerScheduler::new(Arc::new(MemoryCronStore::new()));
        let created = scheduler
            .create("acct", "t1", &Schedule::new(TIMER_EVENT, "daily", "0 8 * * *"))
            .await
            .unwrap();
        assert!(scheduler.get("other", &created.id).await.is_err());
    }
}

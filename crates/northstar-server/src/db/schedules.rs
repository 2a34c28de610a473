//! Backing tables of the Timer and Device schedulers.

use async_trait::async_trait;
use northstar_core::scheduler::{CronStore, DeviceEvent, EventStore, Job, Mapping, MappingStore};
use northstar_core::StoreError;
use uuid::Uuid;

use super::models::{EventRow, JobRow, MappingRow};
use super::{backend, expect_row, parse_id, Database};

#[async_trait]
impl CronStore for Database {
    async fn add_job(&self, account_id: &str, job: &Job) -> Result<String, StoreError> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO cron_jobs (account_id, name, snippet_id, schedule, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(account_id)
        .bind(&job.name)
        .bind(&job.snippet_id)
        .bind(&job.schedule)
        .bind(job.updated_on)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(id.to_string())
    }

    async fn get_job(&self, account_id: &str, id: &str) -> Result<Job, StoreError> {
        sqlx::query_as::<_, JobRow>(
            r#"SELECT id, name, snippet_id, schedule, updated_at FROM cron_jobs WHERE account_id = $1 AND id = $2"#,
        )
        .bind(account_id)
        .bind(parse_id("job", id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .map(Into::into)
        .ok_or_else(|| StoreError::not_found("job", id))
    }

    async fn delete_job(&self, account_id: &str, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM cron_jobs WHERE account_id = $1 AND id = $2")
            .bind(account_id)
            .bind(parse_id("job", id)?)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        expect_row("job", id, result.rows_affected())
    }
}

#[async_trait]
impl EventStore for Database {
    async fn add_event(&self, account_id: &str, event: &DeviceEvent) -> Result<String, StoreError> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"INSERT INTO device_events (account_id, name, created_at) VALUES ($1, $2, $3) RETURNING id"#,
        )
        .bind(account_id)
        .bind(&event.name)
        .bind(event.created_on)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(id.to_string())
    }

    async fn get_event(&self, account_id: &str, id: &str) -> Result<DeviceEvent, StoreError> {
        sqlx::query_as::<_, EventRow>(
            r#"SELECT id, name, created_at FROM device_events WHERE account_id = $1 AND id = $2"#,
        )
        .bind(account_id)
        .bind(parse_id("event", id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .map(Into::into)
        .ok_or_else(|| StoreError::not_found("event", id))
    }

    async fn delete_event(&self, account_id: &str, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM device_events WHERE account_id = $1 AND id = $2")
            .bind(account_id)
            .bind(parse_id("event", id)?)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        expect_row("event", id, result.rows_affected())
    }
}

#[async_trait]
impl MappingStore for Database {
    async fn add_mapping(&self, account_id: &str, mapping: &Mapping) -> Result<String, StoreError> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO event_mappings (account_id, event_id, snippet_id, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(account_id)
        .bind(&mapping.event_id)
        .bind(&mapping.snippet_id)
        .bind(mapping.created_on)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(id.to_string())
    }

    async fn get_mapping(&self, account_id: &str, id: &str) -> Result<Mapping, StoreError> {
        sqlx::query_as::<_, MappingRow>(
            r#"SELECT id, event_id, snippet_id, created_at FROM event_mappings WHERE account_id = $1 AND id = $2"#,
        )
        .bind(account_id)
        .bind(parse_id("mapping", id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?
        .map(Into::into)
        .ok_or_else(|| StoreError::not_found("mapping", id))
    }

    async fn delete_mapping(&self, account_id: &str, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM event_mappings WHERE account_id = $1 AND id = $2")
            .bind(account_id)
            .bind(parse_id("mapping", id)?)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        expect_row("mapping", id, result.rows_affected())
    }
}

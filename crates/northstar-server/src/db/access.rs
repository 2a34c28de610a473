use async_trait::async_trait;
use northstar_core::{AccessQuery, AccessRecord, AccessStore, StoreError};

use super::models::AccessRow;
use super::{backend, expect_row, parse_id, Database};

#[async_trait]
impl AccessStore for Database {
    async fn query_access(&self, query: &AccessQuery) -> Result<Vec<AccessRecord>, StoreError> {
        let rows = sqlx::query_as::<_, AccessRow>(
            r#"
            SELECT id, account_id, user_id, notebook_id, permission
            FROM notebook_access
            WHERE ($1::text IS NULL OR account_id = $1)
              AND ($2::text IS NULL OR user_id = $2)
              AND ($3::text IS NULL OR notebook_id = $3)
            ORDER BY created_at
            "#,
        )
        .bind(query.account_id.as_deref())
        .bind(query.user_id.as_deref())
        .bind(query.notebook_id.as_deref())
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(AccessRecord::try_from).collect()
    }

    async fn create_access(&self, record: &AccessRecord) -> Result<String, StoreError> {
        let (id,): (uuid::Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO notebook_access (account_id, user_id, notebook_id, permission)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&record.account_id)
        .bind(&record.user_id)
        .bind(&record.notebook_id)
        .bind(record.permission.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(id.to_string())
    }

    async fn update_access(&self, id: &str, record: &AccessRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE notebook_access
            SET account_id = $1, user_id = $2, notebook_id = $3, permission = $4
            WHERE id = $5
            "#,
        )
        .bind(&record.account_id)
        .bind(&record.user_id)
        .bind(&record.notebook_id)
        .bind(record.permission.as_str())
        .bind(parse_id("access", id)?)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        expect_row("access", id, result.rows_affected())
    }

    async fn delete_access(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM notebook_access WHERE id = $1")
            .bind(parse_id("access", id)?)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        expect_row("access", id, result.rows_affected())
    }
}

use async_trait::async_trait;
use northstar_core::{NotebookStore, StoreError, StoredNotebook};

use super::models::NotebookRow;
use super::{backend, expect_row, parse_id, Database};

#[async_trait]
impl NotebookStore for Database {
    async fn create_notebook(&self, data: &str) -> Result<StoredNotebook, StoreError> {
        let row = sqlx::query_as::<_, NotebookRow>(
            r#"
            INSERT INTO notebooks (data) VALUES ($1::jsonb)
            RETURNING id, version, data::text AS data, created_at, updated_at
            "#,
        )
        .bind(data)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(row.into())
    }

    async fn get_notebook(&self, id: &str) -> Result<StoredNotebook, StoreError> {
        let row = sqlx::query_as::<_, NotebookRow>(
            r#"SELECT id, version, data::text AS data, created_at, updated_at FROM notebooks WHERE id = $1"#,
        )
        .bind(parse_id("notebook", id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.map(Into::into)
            .ok_or_else(|| StoreError::not_found("notebook", id))
    }

    async fn update_notebook(
        &self,
        id: &str,
        data: &str,
        expected_version: Option<i64>,
    ) -> Result<StoredNotebook, StoreError> {
        let uuid = parse_id("notebook", id)?;
        let row = sqlx::query_as::<_, NotebookRow>(
            r#"
            UPDATE notebooks
            SET data = $1::jsonb, version = version + 1, updated_at = NOW()
            WHERE id = $2 AND ($3::bigint IS NULL OR version = $3)
            RETURNING id, version, data::text AS data, created_at, updated_at
            "#,
        )
        .bind(data)
        .bind(uuid)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        if let Some(row) = row {
            return Ok(row.into());
        }

        let actual: Option<(i64,)> = sqlx::query_as("SELECT version FROM notebooks WHERE id = $1")
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match (actual, expected_version) {
            (Some((actual,)), Some(expected)) => Err(StoreError::VersionConflict {
                kind: "notebook",
                id: id.to_string(),
                expected,
                actual,
            }),
            _ => Err(StoreError::not_found("notebook", id)),
        }
    }

    async fn delete_notebook(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM notebooks WHERE id = $1")
            .bind(parse_id("notebook", id)?)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        expect_row("notebook", id, result.rows_affected())
    }
}

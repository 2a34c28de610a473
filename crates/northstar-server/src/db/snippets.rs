use async_trait::async_trait;
use northstar_core::{Snippet, SnippetStore, StoreError};

use super::models::SnippetRow;
use super::{backend, expect_row, parse_id, Database};

const SNIPPET_COLUMNS: &str = "id, name, description, runtime, main_fn, url, code, arguments, \
     timeout_ms, memory_bytes, event_type, event_id, created_at, updated_at, version";

fn memory_bytes(snippet: &Snippet) -> Result<i64, StoreError> {
    i64::try_from(snippet.memory)
        .map_err(|_| StoreError::Backend(format!("snippet memory {} is out of range", snippet.memory)))
}

#[async_trait]
impl SnippetStore for Database {
    async fn add_snippet(&self, account_id: &str, snippet: &Snippet) -> Result<String, StoreError> {
        let (id,): (uuid::Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO snippets (account_id, name, description, runtime, main_fn, url, code,
                                  arguments, timeout_ms, memory_bytes, event_type, event_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(account_id)
        .bind(&snippet.name)
        .bind(&snippet.description)
        .bind(&snippet.runtime)
        .bind(&snippet.main_fn)
        .bind(&snippet.url)
        .bind(&snippet.code)
        .bind(serde_json::Value::Object(snippet.arguments.clone()))
        .bind(snippet.timeout)
        .bind(memory_bytes(snippet)?)
        .bind(snippet.event_type.as_str())
        .bind(&snippet.event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(id.to_string())
    }

    async fn get_snippet(&self, account_id: &str, id: &str) -> Result<Snippet, StoreError> {
        let sql = format!(
            "SELECT {} FROM snippets WHERE account_id = $1 AND id = $2",
            SNIPPET_COLUMNS
        );
        let row = sqlx::query_as::<_, SnippetRow>(&sql)
            .bind(account_id)
            .bind(parse_id("snippet", id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.ok_or_else(|| StoreError::not_found("snippet", id))?
            .try_into()
    }

    async fn get_snippets(&self, account_id: &str) -> Result<Vec<Snippet>, StoreError> {
        let sql = format!(
            "SELECT {} FROM snippets WHERE account_id = $1 ORDER BY created_at",
            SNIPPET_COLUMNS
        );
        let rows = sqlx::query_as::<_, SnippetRow>(&sql)
            .bind(account_id)
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

        rows.into_iter().map(Snippet::try_from).collect()
    }

    async fn update_snippet(
        &self,
        account_id: &str,
        snippet: &Snippet,
        expected_version: i64,
    ) -> Result<i64, StoreError> {
        let uuid = parse_id("snippet", &snippet.id)?;
        let updated: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE snippets
            SET name = $1, description = $2, runtime = $3, main_fn = $4, url = $5, code = $6,
                arguments = $7, timeout_ms = $8, memory_bytes = $9, event_type = $10,
                event_id = $11, version = version + 1, updated_at = NOW()
            WHERE account_id = $12 AND id = $13 AND version = $14
            RETURNING version
            "#,
        )
        .bind(&snippet.name)
        .bind(&snippet.description)
        .bind(&snippet.runtime)
        .bind(&snippet.main_fn)
        .bind(&snippet.url)
        .bind(&snippet.code)
        .bind(serde_json::Value::Object(snippet.arguments.clone()))
        .bind(snippet.timeout)
        .bind(memory_bytes(snippet)?)
        .bind(snippet.event_type.as_str())
        .bind(&snippet.event_id)
        .bind(account_id)
        .bind(uuid)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        if let Some((version,)) = updated {
            return Ok(version);
        }

        let actual: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM snippets WHERE account_id = $1 AND id = $2")
                .bind(account_id)
                .bind(uuid)
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;

        match actual {
            Some((actual,)) => Err(StoreError::VersionConflict {
                kind: "snippet",
                id: snippet.id.clone(),
                expected: expected_version,
                actual,
            }),
            None => Err(StoreError::not_found("snippet", &snippet.id)),
        }
    }

    async fn delete_snippet(&self, account_id: &str, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM snippets WHERE account_id = $1 AND id = $2")
            .bind(account_id)
            .bind(parse_id("snippet", id)?)
            .execute(&self.pool)
            .await
            .map_err(backend)?;

        expect_row("snippet", id, result.rows_affected())
    }
}

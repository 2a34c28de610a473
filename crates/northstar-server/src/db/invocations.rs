use async_trait::async_trait;
use northstar_core::{Invocation, InvocationStore, StoreError};

use super::models::InvocationRow;
use super::{backend, Database};

#[async_trait]
impl InvocationStore for Database {
    async fn get_invocation_results(
        &self,
        account_id: &str,
        snippet_id: &str,
        limit: usize,
    ) -> Result<Vec<Invocation>, StoreError> {
        let rows = sqlx::query_as::<_, InvocationRow>(
            r#"
            SELECT id, snippet_id, elapsed_ms, stdout, result, status, error_descr, created_at
            FROM invocations
            WHERE account_id = $1 AND snippet_id = $2
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(account_id)
        .bind(snippet_id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

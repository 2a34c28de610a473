pub mod models;

mod access;
mod invocations;
mod notebooks;
mod schedules;
mod snippets;

use northstar_core::StoreError;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

/// Database connection wrapper. Implements every store trait of the core.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect to the database
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Run database migrations
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    tracing::error!("Database error: {:?}", err);
    StoreError::Backend(err.to_string())
}

/// Ids are UUIDs; anything else cannot name a stored row
fn parse_id(kind: &'static str, id: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(id).map_err(|_| StoreError::not_found(kind, id))
}

/// Map the affected row count of a keyed DELETE/UPDATE
fn expect_row(kind: &'static str, id: &str, rows_affected: u64) -> Result<(), StoreError> {
    if rows_affected == 0 {
        Err(StoreError::not_found(kind, id))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id("snippet", &id.to_string()), Ok(id));
        assert_eq!(
            parse_id("snippet", "not-a-uuid"),
            Err(StoreError::not_found("snippet", "not-a-uuid"))
        );
    }

    #[test]
    fn test_expect_row() {
        assert!(expect_row("job", "j1", 1).is_ok());
        assert!(matches!(
            expect_row("job", "j1", 0),
            Err(StoreError::NotFound { kind: "job", .. })
        ));
    }
}

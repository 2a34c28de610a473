use chrono::{DateTime, Utc};
use northstar_core::{
    scheduler::{DeviceEvent, Job, Mapping},
    AccessRecord, EventType, Invocation, Permission, Snippet, StoreError, StoredNotebook,
};
use uuid::Uuid;

/// Notebook access database model
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccessRow {
    pub id: Uuid,
    pub account_id: String,
    pub user_id: String,
    pub notebook_id: String,
    pub permission: String,
}

impl TryFrom<AccessRow> for AccessRecord {
    type Error = StoreError;

    fn try_from(row: AccessRow) -> Result<Self, Self::Error> {
        let permission: Permission = row.permission.parse().map_err(StoreError::Backend)?;
        Ok(AccessRecord {
            id: row.id.to_string(),
            account_id: row.account_id,
            user_id: row.user_id,
            notebook_id: row.notebook_id,
            permission,
        })
    }
}

/// Notebook database model. `data` is selected as text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotebookRow {
    pub id: Uuid,
    pub version: i64,
    pub data: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<NotebookRow> for StoredNotebook {
    fn from(row: NotebookRow) -> Self {
        Self {
            id: row.id.to_string(),
            version: row.version,
            created_on: row.created_at,
            updated_on: row.updated_at,
            data: row.data,
        }
    }
}

/// Snippet database model
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnippetRow {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub runtime: String,
    pub main_fn: String,
    pub url: String,
    pub code: String,
    pub arguments: serde_json::Value,
    pub timeout_ms: i64,
    pub memory_bytes: i64,
    pub event_type: String,
    pub event_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl TryFrom<SnippetRow> for Snippet {
    type Error = StoreError;

    fn try_from(row: SnippetRow) -> Result<Self, Self::Error> {
        let arguments = match row.arguments {
            serde_json::Value::Object(map) => map,
            serde_json::Value::Null => Default::default(),
            other => {
                return Err(StoreError::Backend(format!(
                    "snippet {} arguments are not an object: {}",
                    row.id, other
                )))
            }
        };
        let memory = u64::try_from(row.memory_bytes)
            .map_err(|_| StoreError::Backend(format!("snippet {} has negative memory", row.id)))?;

        Ok(Snippet {
            id: row.id.to_string(),
            name: row.name,
            description: row.description,
            runtime: row.runtime,
            main_fn: row.main_fn,
            url: row.url,
            code: row.code,
            arguments,
            timeout: row.timeout_ms,
            memory,
            event_type: EventType::parse(&row.event_type),
            event_id: row.event_id,
            created_on: row.created_at,
            updated_on: row.updated_at,
            version: row.version,
        })
    }
}

/// Cron job database model
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub name: String,
    pub snippet_id: String,
    pub schedule: String,
    pub updated_at: DateTime<Utc>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Self {
            id: row.id.to_string(),
            name: row.name,
            snippet_id: row.snippet_id,
            schedule: row.schedule,
            updated_on: row.updated_at,
        }
    }
}

/// Device event database model
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<EventRow> for DeviceEvent {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id.to_string(),
            name: row.name,
            created_on: row.created_at,
        }
    }
}

/// Event to snippet mapping database model
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MappingRow {
    pub id: Uuid,
    pub event_id: String,
    pub snippet_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<MappingRow> for Mapping {
    fn from(row: MappingRow) -> Self {
        Self {
            id: row.id.to_string(),
            event_id: row.event_id,
            snippet_id: row.snippet_id,
            created_on: row.created_at,
        }
    }
}

/// Invocation database model, written by the execution runtime
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvocationRow {
    pub id: Uuid,
    pub snippet_id: String,
    pub elapsed_ms: f64,
    pub stdout: String,
    pub result: String,
    pub status: String,
    pub error_descr: String,
    pub created_at: DateTime<Utc>,
}

impl From<InvocationRow> for Invocation {
    fn from(row: InvocationRow) -> Self {
        Self {
            id: row.id.to_string(),
            snippet_id: row.snippet_id,
            created_on: row.created_at,
            elapsed_time: row.elapsed_ms,
            stdout: row.stdout,
            result: row.result,
            status: row.status,
            error_descr: row.error_descr,
        }
    }
}

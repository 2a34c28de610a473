use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{NorthstarError, StoreError};
use crate::limits::ExecutionLimits;
use crate::permission::Permission;

/// A notebook resource.
///
/// `permissions` is the level of the user reading the notebook. It is
/// computed on every read and never persisted with the body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notebook {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permission>,
    #[serde(default)]
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub input: Input,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub execution_id: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellType {
    Static,
    #[default]
    Code,
    Query,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Input {
    #[serde(default, rename = "type")]
    pub cell_type: CellType,
    #[serde(default)]
    pub language: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub arguments: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub entry_point: String,
    #[serde(default)]
    pub body: String,
    /// Seconds. Zero or negative falls back to the maximum.
    #[serde(default)]
    pub timeout: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_results: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execution: Option<DateTime<Utc>>,
}

/// Display and resource settings of a cell
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub show_code: bool,
    #[serde(default)]
    pub show_output: bool,
    #[serde(default)]
    pub show_configuration: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization: Option<serde_json::Value>,
    /// MB. Zero falls back to the default.
    #[serde(default)]
    pub memory: u64,
}

impl Notebook {
    /// Validate every cell, filling in defaults for timeout and memory
    pub fn validate(&mut self, limits: &ExecutionLimits) -> Result<(), NorthstarError> {
        for cell in &mut self.cells {
            cell.validate(limits)?;
        }
        Ok(())
    }

    /// Serialize the part of the notebook that is persisted as its body
    pub fn to_body(&self) -> Result<String, NorthstarError> {
        let body = Notebook {
            id: String::new(),
            etag: None,
            created_on: None,
            last_updated: None,
            permissions: None,
            ..self.clone()
        };
        serde_json::to_string(&body)
            .map_err(|e| NorthstarError::Internal(format!("notebook serialization failed: {}", e)))
    }

    /// Rebuild a notebook from its stored form and the reader's permission
    pub fn from_stored(stored: &StoredNotebook, permission: Permission) -> Result<Self, NorthstarError> {
        let mut notebook: Notebook = serde_json::from_str(&stored.data).map_err(|e| {
            NorthstarError::Internal(format!("notebook {} body is unreadable: {}", stored.id, e))
        })?;
        notebook.id = stored.id.clone();
        notebook.etag = Some(stored.version.to_string());
        notebook.created_on = Some(stored.created_on);
        notebook.last_updated = Some(stored.updated_on);
        notebook.permissions = Some(permission);
        Ok(notebook)
    }

    /// Parse the etag supplied by a client into a store version
    pub fn expected_version(&self) -> Result<Option<i64>, NorthstarError> {
        match self.etag.as_deref() {
            None | Some("") => Ok(None),
            Some(etag) => etag
                .parse()
                .map(Some)
                .map_err(|_| NorthstarError::BadRequest(format!("invalid etag '{}'", etag))),
        }
    }
}

impl Cell {
    pub fn validate(&mut self, limits: &ExecutionLimits) -> Result<(), NorthstarError> {
        let input = &mut self.input;

        if input.timeout <= 0 {
            input.timeout = limits.max_timeout;
        }
        if input.timeout > limits.max_timeout {
            return Err(NorthstarError::BadRequest(format!(
                "The timeout value is out of range ({} of {}).",
                input.timeout, limits.max_timeout
            )));
        }

        if input.body.is_empty() {
            return Err(NorthstarError::BadRequest("The input body is missing.".to_string()));
        }
        if input.body.len() > limits.max_code_size {
            return Err(NorthstarError::BadRequest("The input body is too large.".to_string()));
        }

        if input.arguments.len() > limits.max_arg_count {
            return Err(NorthstarError::BadRequest(format!(
                "Number of arguments is too high ({} of {}).",
                input.arguments.len(),
                limits.max_arg_count
            )));
        }

        if self.name.is_empty() {
            return Err(NorthstarError::BadRequest("The cell name is empty.".to_string()));
        }

        if self.settings.memory == 0 {
            self.settings.memory = limits.default_memory;
        }
        if self.settings.memory > limits.max_memory {
            return Err(NorthstarError::BadRequest(format!(
                "Requested memory ({}) is greater than the max of: {}.",
                self.settings.memory, limits.max_memory
            )));
        }

        Ok(())
    }
}

/// A notebook as held by the notebook store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNotebook {
    pub id: String,
    /// Incremented on every update; exposed to clients as the etag
    pub version: i64,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    /// JSON body
    pub data: String,
}

/// Key-value store of notebook bodies
#[async_trait]
pub trait NotebookStore: Send + Sync {
    async fn create_notebook(&self, data: &str) -> Result<StoredNotebook, StoreError>;

    async fn get_notebook(&self, id: &str) -> Result<StoredNotebook, StoreError>;

    /// Replace the body. When `expected_version` is set the write only
    /// succeeds if the stored version still matches.
    async fn update_notebook(
        &self,
        id: &str,
        data: &str,
        expected_version: Option<i64>,
    ) -> Result<StoredNotebook, StoreError>;

    async fn delete_notebook(&self, id: &str) -> Result<(), StoreError>;
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::permission::Permission;

/// One user's permission grant on one notebook
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRecord {
    /// Store-assigned id, empty until created
    #[serde(default)]
    pub id: String,
    pub account_id: String,
    pub user_id: String,
    pub notebook_id: String,
    pub permission: Permission,
}

impl AccessRecord {
    pub fn new(
        account_id: impl Into<String>,
        user_id: impl Into<String>,
        notebook_id: impl Into<String>,
        permission: Permission,
    ) -> Self {
        Self {
            id: String::new(),
            account_id: account_id.into(),
            user_id: user_id.into(),
            notebook_id: notebook_id.into(),
            permission,
        }
    }

    /// The sentinel returned when a user has no record for a notebook
    pub fn no_access() -> Self {
        Self::default()
    }
}

/// Filter for [`AccessStore::query_access`]. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessQuery {
    pub account_id: Option<String>,
    pub user_id: Option<String>,
    pub notebook_id: Option<String>,
}

impl AccessQuery {
    pub fn notebook(notebook_id: &str) -> Self {
        Self {
            notebook_id: Some(notebook_id.to_string()),
            ..Default::default()
        }
    }

    pub fn user(account_id: &str, user_id: &str) -> Self {
        Self {
            account_id: Some(account_id.to_string()),
            user_id: Some(user_id.to_string()),
            notebook_id: None,
        }
    }

    pub fn user_notebook(account_id: &str, user_id: &str, notebook_id: &str) -> Self {
        Self {
            account_id: Some(account_id.to_string()),
            user_id: Some(user_id.to_string()),
            notebook_id: Some(notebook_id.to_string()),
        }
    }

    pub fn matches(&self, record: &AccessRecord) -> bool {
        fn field(filter: &Option<String>, value: &str) -> bool {
            filter.as_deref().map_or(true, |f| f == value)
        }

        field(&self.account_id, &record.account_id)
            && field(&self.user_id, &record.user_id)
            && field(&self.notebook_id, &record.notebook_id)
    }
}

/// Queryable store of notebook access records
#[async_trait]
pub trait AccessStore: Send + Sync {
    async fn query_access(&self, query: &AccessQuery) -> Result<Vec<AccessRecord>, StoreError>;

    /// Create a record, returning the assigned id
    async fn create_access(&self, record: &AccessRecord) -> Result<String, StoreError>;

    async fn update_access(&self, id: &str, record: &AccessRecord) -> Result<(), StoreError>;

    async fn delete_access(&self, id: &str) -> Result<(), StoreError>;
}

use serde::{Deserialize, Serialize};

use crate::access::AccessRecord;
use crate::permission::Permission;

/// A notebook user as seen by the API.
///
/// `permissions` is contextual: the level this user holds on the notebook
/// being described.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub permissions: Permission,
}

impl User {
    pub fn new(account_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            account_id: account_id.into(),
            ..Default::default()
        }
    }

    pub fn with_permissions(mut self, permissions: Permission) -> Self {
        self.permissions = permissions;
        self
    }
}

impl From<&AccessRecord> for User {
    fn from(access: &AccessRecord) -> Self {
        Self {
            id: access.user_id.clone(),
            account_id: access.account_id.clone(),
            display_name: None,
            email: None,
            permissions: access.permission,
        }
    }
}

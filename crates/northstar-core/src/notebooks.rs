//! Notebook operations, gated by the caller's access record.

use std::sync::Arc;

use crate::access::{AccessQuery, AccessRecord, AccessStore};
use crate::error::{NorthstarError, StoreError};
use crate::limits::ExecutionLimits;
use crate::notebook::{Notebook, NotebookStore};
use crate::permission::{Capability, Permission};
use crate::reconcile;
use crate::user::User;

pub struct NotebookService {
    access: Arc<dyn AccessStore>,
    notebooks: Arc<dyn NotebookStore>,
    limits: ExecutionLimits,
}

impl NotebookService {
    pub fn new(
        access: Arc<dyn AccessStore>,
        notebooks: Arc<dyn NotebookStore>,
        limits: ExecutionLimits,
    ) -> Self {
        Self {
            access,
            notebooks,
            limits,
        }
    }

    /// Create a notebook owned by `user`
    pub async fn create(&self, user: &User, mut notebook: Notebook) -> Result<Notebook, NorthstarError> {
        tracing::debug!(user_id = %user.id, "Create notebook");
        notebook.validate(&self.limits)?;

        let stored = self
            .notebooks
            .create_notebook(&notebook.to_body()?)
            .await
            .map_err(|e| NorthstarError::external("Create notebook", e))?;

        let owner = AccessRecord::new(&user.account_id, &user.id, &stored.id, Permission::Owner);
        if let Err(e) = self.access.create_access(&owner).await {
            // Compensate: a notebook without an owner is unreachable
            if let Err(cleanup) = self.notebooks.delete_notebook(&stored.id).await {
                tracing::error!(notebook_id = %stored.id, "Delete of unowned notebook failed: {}", cleanup);
            }
            return Err(NorthstarError::external("Create notebook access", e));
        }

        tracing::info!(notebook_id = %stored.id, user_id = %user.id, "Notebook created");
        Notebook::from_stored(&stored, Permission::Owner)
    }

    /// List the notebooks `user` has any access to
    pub async fn list(&self, user: &User) -> Result<Vec<Notebook>, NorthstarError> {
        tracing::debug!(user_id = %user.id, "List notebooks");
        let records = self
            .access
            .query_access(&AccessQuery::user(&user.account_id, &user.id))
            .await
            .map_err(|e| NorthstarError::external("Query notebook access", e))?;

        let mut notebooks = Vec::with_capacity(records.len());
        for access in records {
            let stored = match self.notebooks.get_notebook(&access.notebook_id).await {
                Ok(stored) => stored,
                Err(StoreError::NotFound { .. }) => {
                    tracing::warn!(
                        notebook_id = %access.notebook_id,
                        "Notebook not found, deleting its access record"
                    );
                    if let Err(e) = self.access.delete_access(&access.id).await {
                        tracing::error!(access_id = %access.id, "Delete access returned error: {}", e);
                    }
                    continue;
                }
                Err(e) => {
                    tracing::error!(notebook_id = %access.notebook_id, "Get notebook returned error: {}", e);
                    continue;
                }
            };

            match Notebook::from_stored(&stored, access.permission) {
                Ok(notebook) => notebooks.push(notebook),
                Err(e) => tracing::error!("{}", e),
            }
        }

        Ok(notebooks)
    }

    pub async fn get(&self, user: &User, notebook_id: &str) -> Result<Notebook, NorthstarError> {
        tracing::debug!(notebook_id, user_id = %user.id, "Get notebook");
        let access = self.caller_access(user, notebook_id).await?;
        require(&access, Capability::Read)?;

        let stored = self.notebooks.get_notebook(notebook_id).await.map_err(fetch_error)?;
        Notebook::from_stored(&stored, access.permission)
    }

    /// Replace the notebook body. A non-empty etag makes the write
    /// conditional on the stored version.
    pub async fn update(&self, user: &User, mut notebook: Notebook) -> Result<Notebook, NorthstarError> {
        tracing::debug!(notebook_id = %notebook.id, user_id = %user.id, "Update notebook");
        let access = self.caller_access(user, &notebook.id).await?;
        require(&access, Capability::Write)?;

        notebook.validate(&self.limits)?;
        let expected_version = notebook.expected_version()?;

        let stored = self
            .notebooks
            .update_notebook(&notebook.id, &notebook.to_body()?, expected_version)
            .await
            .map_err(|e| match e {
                StoreError::Backend(_) => NorthstarError::external("Update notebook", e),
                e => e.into(),
            })?;

        Notebook::from_stored(&stored, access.permission)
    }

    /// Delete the notebook. Owner only.
    pub async fn delete(&self, user: &User, notebook_id: &str) -> Result<(), NorthstarError> {
        tracing::debug!(notebook_id, user_id = %user.id, "Delete notebook");
        let access = self.caller_access(user, notebook_id).await?;
        require(&access, Capability::Delete)?;

        // Access goes first; a body left behind is unreachable
        self.access
            .delete_access(&access.id)
            .await
            .map_err(|e| NorthstarError::external("Delete access", e))?;

        self.notebooks
            .delete_notebook(notebook_id)
            .await
            .map_err(|e| NorthstarError::external("Delete notebook", e))?;

        tracing::info!(notebook_id, "Notebook deleted");
        Ok(())
    }

    /// Every user with access to the notebook. Owner only.
    pub async fn get_users(&self, user: &User, notebook_id: &str) -> Result<Vec<User>, NorthstarError> {
        tracing::debug!(notebook_id, user_id = %user.id, "Get notebook users");
        let records = self.notebook_access(notebook_id).await?;
        require(&find_caller(user, &records), Capability::ManageUsers)?;

        Ok(records.iter().map(User::from).collect())
    }

    /// The owner's identity, used to run the notebook's cells.
    pub async fn get_execution_information(
        &self,
        user: &User,
        notebook_id: &str,
    ) -> Result<User, NorthstarError> {
        tracing::debug!(notebook_id, user_id = %user.id, "Get execution information");
        let records = self.notebook_access(notebook_id).await?;
        require(&find_caller(user, &records), Capability::Execute)?;

        match records.iter().find(|a| a.permission == Permission::Owner) {
            Some(owner) => Ok(User::from(owner)),
            None => {
                tracing::error!(notebook_id, "Notebook has no owner access record");
                Err(NorthstarError::Internal(format!("owner of notebook {} not found", notebook_id)))
            }
        }
    }

    /// Bring the notebook's grants in line with `desired`. Owner only.
    pub async fn update_users(
        &self,
        user: &User,
        notebook_id: &str,
        desired: &[User],
    ) -> Result<(), NorthstarError> {
        tracing::debug!(notebook_id, user_id = %user.id, count = desired.len(), "Update notebook users");
        let records = self.notebook_access(notebook_id).await?;
        require(&find_caller(user, &records), Capability::ManageUsers)?;

        let owner_id = records
            .iter()
            .find(|a| a.permission == Permission::Owner)
            .map(|a| a.user_id.as_str())
            .unwrap_or(user.id.as_str());

        // Users named without an account belong to the caller's account
        let desired: Vec<User> = desired
            .iter()
            .map(|u| {
                let mut u = u.clone();
                if u.account_id.is_empty() {
                    u.account_id = user.account_id.clone();
                }
                u
            })
            .collect();

        let plan = reconcile::plan(notebook_id, owner_id, &records, &desired)?;
        if plan.is_empty() {
            return Ok(());
        }

        tracing::info!(
            notebook_id,
            create = plan.create.len(),
            update = plan.update.len(),
            delete = plan.delete.len(),
            "Applying access changes"
        );
        plan.apply(self.access.as_ref()).await
    }

    /// The caller's record for the notebook, or the no-access sentinel
    async fn caller_access(&self, user: &User, notebook_id: &str) -> Result<AccessRecord, NorthstarError> {
        let records = self
            .access
            .query_access(&AccessQuery::user_notebook(&user.account_id, &user.id, notebook_id))
            .await
            .map_err(|e| NorthstarError::external("Query notebook access", e))?;

        if records.len() > 1 {
            tracing::warn!(notebook_id, user_id = %user.id, "Multiple access records for user");
        }

        Ok(records.into_iter().next().unwrap_or_else(AccessRecord::no_access))
    }

    async fn notebook_access(&self, notebook_id: &str) -> Result<Vec<AccessRecord>, NorthstarError> {
        self.access
            .query_access(&AccessQuery::notebook(notebook_id))
            .await
            .map_err(|e| NorthstarError::external("Query notebook access", e))
    }
}

fn find_caller(user: &User, records: &[AccessRecord]) -> AccessRecord {
    records
        .iter()
        .find(|a| a.user_id == user.id && a.account_id == user.account_id)
        .cloned()
        .unwrap_or_else(AccessRecord::no_access)
}

fn require(access: &AccessRecord, capability: Capability) -> Result<(), NorthstarError> {
    if access.permission.grants(capability) {
        return Ok(());
    }

    let message = match capability {
        Capability::Read | Capability::Write | Capability::Delete => {
            "User does not have permissions for the notebook."
        }
        Capability::Execute => "User does not have execute permissions for the notebook.",
        Capability::ManageUsers => "User does not have permissions to manage notebook users.",
    };
    Err(NorthstarError::PermissionDenied(message.to_string()))
}

fn fetch_error(err: StoreError) -> NorthstarError {
    match err {
        StoreError::NotFound { .. } => err.into(),
        e => NorthstarError::external("Get notebook", e),
    }
}

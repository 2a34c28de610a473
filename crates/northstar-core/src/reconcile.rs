//! Reconciliation of a notebook's access grants against a desired user list.
//!
//! The plan is computed in full before anything is written, so a rejected
//! entry (an owner grant) fails the call with no store mutations. Applying
//! a plan is not transactional: creates, then updates, then deletes, stopping
//! at the first store failure. Re-submitting the same desired list is safe
//! because a satisfied grant produces no operation.

use std::collections::BTreeMap;

use crate::access::{AccessRecord, AccessStore};
use crate::error::NorthstarError;
use crate::permission::Permission;
use crate::user::User;

/// Store operations needed to move from the current grants to the desired ones
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPlan {
    pub create: Vec<AccessRecord>,
    pub update: Vec<AccessRecord>,
    pub delete: Vec<AccessRecord>,
}

impl AccessPlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }

    pub fn len(&self) -> usize {
        self.create.len() + self.update.len() + self.delete.len()
    }

    /// Execute the plan against the store
    pub async fn apply(&self, store: &dyn AccessStore) -> Result<(), NorthstarError> {
        for access in &self.create {
            tracing::debug!(user_id = %access.user_id, permission = %access.permission, "Creating access");
            store
                .create_access(access)
                .await
                .map_err(|e| NorthstarError::external("Create access", e))?;
        }

        for access in &self.update {
            tracing::debug!(user_id = %access.user_id, permission = %access.permission, "Updating access");
            store
                .update_access(&access.id, access)
                .await
                .map_err(|e| NorthstarError::external("Update access", e))?;
        }

        for access in &self.delete {
            tracing::debug!(user_id = %access.user_id, "Deleting access");
            store
                .delete_access(&access.id)
                .await
                .map_err(|e| NorthstarError::external("Delete access", e))?;
        }

        Ok(())
    }
}

/// Compute the plan for `notebook_id`.
///
/// `current` holds every record of the notebook; owner records are never
/// touched. Entries for `owner_id` in `desired` are skipped. A desired
/// permission of `None` means the user should have no access.
pub fn plan(
    notebook_id: &str,
    owner_id: &str,
    current: &[AccessRecord],
    desired: &[User],
) -> Result<AccessPlan, NorthstarError> {
    let mut remaining: BTreeMap<&str, &AccessRecord> = current
        .iter()
        .filter(|access| access.permission != Permission::Owner)
        .map(|access| (access.user_id.as_str(), access))
        .collect();

    // Last entry wins when a user appears more than once
    let mut wanted: BTreeMap<&str, &User> = BTreeMap::new();
    for user in desired {
        if user.id == owner_id {
            continue;
        }
        if user.permissions == Permission::Owner {
            return Err(NorthstarError::Forbidden(
                "New owners cannot be assigned to the notebook.".to_string(),
            ));
        }
        wanted.insert(user.id.as_str(), user);
    }

    let mut plan = AccessPlan::default();

    for (user_id, user) in wanted {
        if user.permissions == Permission::None {
            // Left in `remaining` so an existing grant is revoked
            continue;
        }

        match remaining.remove(user_id) {
            Some(access) if access.permission != user.permissions => {
                plan.update.push(AccessRecord {
                    permission: user.permissions,
                    ..access.clone()
                });
            }
            Some(_) => {}
            None => {
                plan.create.push(AccessRecord::new(
                    user.account_id.clone(),
                    user.id.clone(),
                    notebook_id,
                    user.permissions,
                ));
            }
        }
    }

    plan.delete = remaining.into_values().cloned().collect();

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, user: &str, permission: Permission) -> AccessRecord {
        AccessRecord {
            id: id.to_string(),
            ..AccessRecord::new("acct", user, "nb", permission)
        }
    }

    fn user(id: &str, permission: Permission) -> User {
        User::new("acct", id).with_permissions(permission)
    }

    fn current() -> Vec<AccessRecord> {
        vec![
            record("x0", "owner", Permission::Owner),
            record("xa", "A", Permission::Read),
            record("xb", "B", Permission::ReadWrite),
        ]
    }

    #[test]
    fn test_plan_diff() {
        let desired = vec![user("B", Permission::Read), user("D", Permission::ReadWrite)];
        let plan = plan("nb", "owner", &current(), &desired).unwrap();

        assert_eq!(plan.create, vec![AccessRecord::new("acct", "D", "nb", Permission::ReadWrite)]);
        assert_eq!(plan.update, vec![record("xb", "B", Permission::Read)]);
        assert_eq!(plan.delete, vec![record("xa", "A", Permission::Read)]);
    }

    #[test]
    fn test_owner_grant_rejects_whole_plan() {
        let desired = vec![
            user("B", Permission::Read),
            user("C", Permission::Owner),
            user("D", Permission::ReadWrite),
        ];
        let err = plan("nb", "owner", &current(), &desired).unwrap_err();
        assert!(matches!(err, NorthstarError::Forbidden(_)));
    }

    #[test]
    fn test_owner_is_never_touched() {
        // Owner absent from desired: not deleted. Owner present with another
        // level: skipped.
        let plan_absent = plan("nb", "owner", &current(), &[]).unwrap();
        assert!(plan_absent.delete.iter().all(|a| a.user_id != "owner"));
        assert_eq!(plan_absent.delete.len(), 2);

        let desired = vec![
            user("owner", Permission::Read),
            user("A", Permission::Read),
            user("B", Permission::ReadWrite),
        ];
        let plan_present = plan("nb", "owner", &current(), &desired).unwrap();
        assert!(plan_present.is_empty());
    }

    #[test]
    fn test_satisfied_grants_produce_nothing() {
        let desired = vec![user("A", Permission::Read), user("B", Permission::ReadWrite)];
        let plan = plan("nb", "owner", &current(), &desired).unwrap();
        assert!(plan.is_empty());
        assert_eq!(plan.len(), 0);
    }

    #[test]
    fn test_none_permission_revokes() {
        let desired = vec![
            user("A", Permission::None),
            user("B", Permission::ReadWrite),
            user("E", Permission::None),
        ];
        let plan = plan("nb", "owner", &current(), &desired).unwrap();
        assert!(plan.create.is_empty());
        assert!(plan.update.is_empty());
        assert_eq!(plan.delete, vec![record("xa", "A", Permission::Read)]);
    }

    #[test]
    fn test_duplicate_desired_last_wins() {
        let desired = vec![
            user("A", Permission::ReadWrite),
            user("A", Permission::ReadExecute),
            user("B", Permission::ReadWrite),
        ];
        let plan = plan("nb", "owner", &current(), &desired).unwrap();
        assert_eq!(plan.update, vec![record("xa", "A", Permission::ReadExecute)]);
        assert!(plan.create.is_empty());
        assert!(plan.delete.is_empty());
    }
}

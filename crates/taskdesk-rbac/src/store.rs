//! Role storage and user-role assignments.
//!
//! The [`RoleStore`] trait is the seam between the RBAC core and whatever
//! persists roles. Aggregation and enforcement receive a store handle
//! explicitly; nothing reaches for a global connection.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use taskdesk_types::{RoleName, UserId};
use tracing::{debug, info};

use crate::error::{RbacError, Result};
use crate::roles::{NewRole, Role, RoleUpdate, StandardRoles};

/// Storage for role definitions and the user-role relation.
///
/// Implementations must uphold:
/// - role names are unique and never change except through
///   [`rename_role`](RoleStore::rename_role)
/// - system roles reject delete and rename
/// - a failed mutation leaves the store unchanged
pub trait RoleStore: Send + Sync {
    /// Looks up a role by name.
    fn get_role(&self, name: &RoleName) -> Result<Role>;

    /// Returns every role, sorted by name.
    fn list_roles(&self) -> Result<Vec<Role>>;

    /// Creates a role. Fails with [`RbacError::DuplicateRoleName`] if the
    /// name is taken.
    fn create_role(&self, role: NewRole) -> Result<Role>;

    /// Updates display name and/or permissions.
    fn update_role(&self, name: &RoleName, update: RoleUpdate) -> Result<Role>;

    /// Renames a non-system role, carrying its assignments along.
    fn rename_role(&self, from: &RoleName, to: RoleName) -> Result<Role>;

    /// Deletes a non-system role and drops its assignments.
    fn delete_role(&self, name: &RoleName) -> Result<Role>;

    /// Assigns an existing role to a user. Idempotent.
    fn assign_role(&self, user: &UserId, name: &RoleName) -> Result<()>;

    /// Removes a role from a user. Returns whether it was assigned.
    fn revoke_role(&self, user: &UserId, name: &RoleName) -> Result<bool>;

    /// Returns the roles currently held by a user.
    ///
    /// Assigned names that no longer resolve are skipped.
    fn roles_for_user(&self, user: &UserId) -> Result<Vec<Role>>;
}

#[derive(Debug, Default)]
struct StoreState {
    roles: BTreeMap<RoleName, Role>,
    assignments: BTreeMap<UserId, BTreeSet<RoleName>>,
}

/// Role store backed by process memory.
///
/// Reads take a shared lock for the duration of one call; writes are
/// infrequent administrative operations and take the exclusive lock.
#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    state: RwLock<StoreState>,
}

impl InMemoryRoleStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the built-in roles.
    pub fn with_default_roles() -> Self {
        let roles = StandardRoles::all()
            .into_iter()
            .map(|new| (new.name.clone(), Role::from(new)))
            .collect();

        Self {
            state: RwLock::new(StoreState {
                roles,
                assignments: BTreeMap::new(),
            }),
        }
    }

    /// Creates a store from an explicit role list.
    pub fn seeded(roles: impl IntoIterator<Item = NewRole>) -> Result<Self> {
        let store = Self::new();
        for role in roles {
            store.create_role(role)?;
        }
        Ok(store)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| RbacError::Storage("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| RbacError::Storage("lock poisoned".to_string()))
    }
}

impl RoleStore for InMemoryRoleStore {
    fn get_role(&self, name: &RoleName) -> Result<Role> {
        self.read()?
            .roles
            .get(name)
            .cloned()
            .ok_or_else(|| RbacError::RoleNotFound(name.clone()))
    }

    fn list_roles(&self) -> Result<Vec<Role>> {
        Ok(self.read()?.roles.values().cloned().collect())
    }

    fn create_role(&self, role: NewRole) -> Result<Role> {
        role.permissions.validate()?;
        let mut state = self.write()?;

        if state.roles.contains_key(&role.name) {
            return Err(RbacError::DuplicateRoleName(role.name));
        }

        let role = Role::from(role);
        state.roles.insert(role.name().clone(), role.clone());

        info!(
            role = %role.name(),
            system = role.is_system(),
            grants_all = role.grants_all(),
            permissions = role.permissions().len(),
            "Role created"
        );

        Ok(role)
    }

    fn update_role(&self, name: &RoleName, update: RoleUpdate) -> Result<Role> {
        if let Some(permissions) = &update.permissions {
            permissions.validate()?;
        }
        let mut state = self.write()?;

        let role = state
            .roles
            .get_mut(name)
            .ok_or_else(|| RbacError::RoleNotFound(name.clone()))?;

        if update.is_empty() {
            return Ok(role.clone());
        }

        role.apply(update);

        info!(
            role = %role.name(),
            revision = role.revision(),
            grants_all = role.grants_all(),
            permissions = role.permissions().len(),
            "Role updated"
        );

        Ok(role.clone())
    }

    fn rename_role(&self, from: &RoleName, to: RoleName) -> Result<Role> {
        let mut state = self.write()?;

        let current = state
            .roles
            .get(from)
            .ok_or_else(|| RbacError::RoleNotFound(from.clone()))?;

        if current.is_system() {
            return Err(RbacError::ProtectedRoleViolation {
                role: from.clone(),
                attempted: "renamed",
            });
        }
        if *from == to {
            return Ok(current.clone());
        }
        if state.roles.contains_key(&to) {
            return Err(RbacError::DuplicateRoleName(to));
        }

        let renamed = current.renamed(to.clone());
        state.roles.remove(from);
        state.roles.insert(to.clone(), renamed.clone());

        for held in state.assignments.values_mut() {
            if held.remove(from) {
                held.insert(to.clone());
            }
        }

        info!(from = %from, to = %to, "Role renamed");

        Ok(renamed)
    }

    fn delete_role(&self, name: &RoleName) -> Result<Role> {
        let mut state = self.write()?;

        let role = state
            .roles
            .get(name)
            .ok_or_else(|| RbacError::RoleNotFound(name.clone()))?;

        if role.is_system() {
            return Err(RbacError::ProtectedRoleViolation {
                role: name.clone(),
                attempted: "deleted",
            });
        }

        let removed = state
            .roles
            .remove(name)
            .ok_or_else(|| RbacError::RoleNotFound(name.clone()))?;

        let mut revoked = 0usize;
        for held in state.assignments.values_mut() {
            if held.remove(name) {
                revoked += 1;
            }
        }
        state.assignments.retain(|_, held| !held.is_empty());

        info!(role = %name, revoked_assignments = revoked, "Role deleted");

        Ok(removed)
    }

    fn assign_role(&self, user: &UserId, name: &RoleName) -> Result<()> {
        let mut state = self.write()?;

        if !state.roles.contains_key(name) {
            return Err(RbacError::RoleNotFound(name.clone()));
        }

        let newly_assigned = state
            .assignments
            .entry(user.clone())
            .or_default()
            .insert(name.clone());

        if newly_assigned {
            info!(user = %user, role = %name, "Role assigned");
        }

        Ok(())
    }

    fn revoke_role(&self, user: &UserId, name: &RoleName) -> Result<bool> {
        let mut state = self.write()?;

        let Some(held) = state.assignments.get_mut(user) else {
            return Ok(false);
        };

        let removed = held.remove(name);
        if held.is_empty() {
            state.assignments.remove(user);
        }

        if removed {
            info!(user = %user, role = %name, "Role revoked");
        }

        Ok(removed)
    }

    fn roles_for_user(&self, user: &UserId) -> Result<Vec<Role>> {
        let state = self.read()?;

        let Some(held) = state.assignments.get(user) else {
            return Ok(Vec::new());
        };

        let mut roles = Vec::with_capacity(held.len());
        for name in held {
            match state.roles.get(name) {
                Some(role) => roles.push(role.clone()),
                None => debug!(user = %user, role = %name, "Skipping unresolved role"),
            }
        }

        Ok(roles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Grants;

    fn name(raw: &str) -> RoleName {
        RoleName::parse(raw).unwrap()
    }

    fn role(raw: &str, perms: &[&str]) -> NewRole {
        NewRole::parse(raw, raw, perms).unwrap()
    }

    fn store_with(roles: Vec<NewRole>) -> InMemoryRoleStore {
        InMemoryRoleStore::seeded(roles).unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let store = store_with(vec![role("admin", &["tasks.create", "tasks.update"])]);

        let role = store.get_role(&name("admin")).unwrap();
        assert_eq!(role.display_name(), "admin");
        assert!(role.permissions().allows("tasks.create"));
    }

    #[test]
    fn test_get_missing_role() {
        let store = InMemoryRoleStore::new();
        assert_eq!(
            store.get_role(&name("ghost")),
            Err(RbacError::RoleNotFound(name("ghost")))
        );
    }

    #[test]
    fn test_duplicate_name_rejected_case_insensitively() {
        let store = store_with(vec![role("admin", &["tasks.create"])]);

        let err = store
            .create_role(NewRole::parse("Admin", "Shadow Admin", ["tasks.delete"]).unwrap())
            .unwrap_err();
        assert_eq!(err, RbacError::DuplicateRoleName(name("admin")));

        // Original role is untouched.
        let admin = store.get_role(&name("admin")).unwrap();
        assert_eq!(admin.display_name(), "admin");
        assert!(!admin.permissions().allows("tasks.delete"));
        assert!(store.get_role(&name("Admin")).is_ok());
        assert_eq!(store.list_roles().unwrap().len(), 1);
    }

    #[test]
    fn test_list_sorted_by_name() {
        let store = store_with(vec![role("member", &[]), role("admin", &[]), role("guest", &[])]);

        let names: Vec<String> = store
            .list_roles()
            .unwrap()
            .iter()
            .map(|r| r.name().to_string())
            .collect();
        assert_eq!(names, vec!["admin", "guest", "member"]);
    }

    #[test]
    fn test_update_role() {
        let store = store_with(vec![role("guest", &["tasks.view"])]);
        let before = store.get_role(&name("guest")).unwrap().revision();

        let updated = store
            .update_role(
                &name("guest"),
                RoleUpdate::new()
                    .display_name("Visitor")
                    .permissions(Grants::from_tokens(["notes.view", "tasks.view", "notes.view"])),
            )
            .unwrap();

        assert_eq!(updated.display_name(), "Visitor");
        assert_eq!(updated.permissions().len(), 2);
        assert!(updated.revision() > before);
        assert_eq!(store.get_role(&name("guest")).unwrap(), updated);
    }

    #[test]
    fn test_writes_reject_tokens_the_codec_would_alter() {
        let store = store_with(vec![role("guest", &["tasks.view"])]);
        let before = store.list_roles().unwrap();

        for bad in ["*", "tasks.view,tasks.delete", "tasks view"] {
            let created = store.create_role(
                NewRole::new(name("sneaky"), "Sneaky").with_permissions(Grants::from_tokens([bad])),
            );
            assert!(matches!(created, Err(RbacError::InvalidPermission(_))), "{bad:?}");

            let updated = store.update_role(
                &name("guest"),
                RoleUpdate::new().permissions(Grants::from_tokens([bad])),
            );
            assert!(matches!(updated, Err(RbacError::InvalidPermission(_))), "{bad:?}");
        }

        assert_eq!(store.list_roles().unwrap(), before);
    }

    #[test]
    fn test_empty_update_is_noop() {
        let store = store_with(vec![role("guest", &["tasks.view"])]);
        let before = store.get_role(&name("guest")).unwrap();
        let role = store.update_role(&name("guest"), RoleUpdate::new()).unwrap();
        assert_eq!(role, before);
    }

    #[test]
    fn test_system_role_permissions_can_change() {
        let store = InMemoryRoleStore::with_default_roles();

        let admin = store
            .update_role(
                &name("admin"),
                RoleUpdate::new().permissions(Grants::from_tokens(["tasks.view"])),
            )
            .unwrap();

        assert!(admin.is_system());
        assert_eq!(admin.permissions().len(), 1);
    }

    #[test]
    fn test_delete_system_role_rejected() {
        let store = InMemoryRoleStore::with_default_roles();
        let before = store.list_roles().unwrap();

        let err = store.delete_role(&name("super_admin")).unwrap_err();
        assert_eq!(
            err,
            RbacError::ProtectedRoleViolation {
                role: name("super_admin"),
                attempted: "deleted",
            }
        );
        assert_eq!(store.list_roles().unwrap(), before);
    }

    #[test]
    fn test_rename_system_role_rejected() {
        let store = InMemoryRoleStore::with_default_roles();

        let err = store.rename_role(&name("admin"), name("root")).unwrap_err();
        assert!(matches!(err, RbacError::ProtectedRoleViolation { .. }));
        assert!(store.get_role(&name("admin")).is_ok());
        assert!(store.get_role(&name("root")).is_err());
    }

    #[test]
    fn test_rename_moves_assignments() {
        let store = store_with(vec![role("reviewer", &["reports.view"]), role("guest", &[])]);
        let user = UserId::from("u1");
        store.assign_role(&user, &name("reviewer")).unwrap();
        let before = store.get_role(&name("reviewer")).unwrap().revision();

        let renamed = store.rename_role(&name("reviewer"), name("auditor")).unwrap();
        assert_eq!(renamed.name().as_str(), "auditor");
        assert!(renamed.revision() > before);

        let held = store.roles_for_user(&user).unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].name().as_str(), "auditor");

        let err = store.rename_role(&name("auditor"), name("guest")).unwrap_err();
        assert_eq!(err, RbacError::DuplicateRoleName(name("guest")));
    }

    #[test]
    fn test_delete_drops_assignments() {
        let store = store_with(vec![role("reviewer", &["reports.view"]), role("guest", &["tasks.view"])]);
        let user = UserId::from("u1");
        store.assign_role(&user, &name("reviewer")).unwrap();
        store.assign_role(&user, &name("guest")).unwrap();

        let removed = store.delete_role(&name("reviewer")).unwrap();
        assert_eq!(removed.name().as_str(), "reviewer");

        let held = store.roles_for_user(&user).unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].name().as_str(), "guest");
    }

    #[test]
    fn test_assign_missing_role_is_error() {
        let store = InMemoryRoleStore::new();
        let err = store
            .assign_role(&UserId::from("u1"), &name("ghost"))
            .unwrap_err();

        assert_eq!(err, RbacError::RoleNotFound(name("ghost")));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_assign_and_revoke() {
        let store = InMemoryRoleStore::with_default_roles();
        let user = UserId::from("u1");

        assert!(store.roles_for_user(&user).unwrap().is_empty());

        store.assign_role(&user, &name("guest")).unwrap();
        store.assign_role(&user, &name("guest")).unwrap();
        store.assign_role(&user, &name("member")).unwrap();
        assert_eq!(store.roles_for_user(&user).unwrap().len(), 2);

        assert!(store.revoke_role(&user, &name("guest")).unwrap());
        assert!(!store.revoke_role(&user, &name("guest")).unwrap());
        assert_eq!(store.roles_for_user(&user).unwrap().len(), 1);
    }

    #[test]
    fn test_seeded_rejects_duplicates() {
        let result = InMemoryRoleStore::seeded([
            NewRole::parse("ops", "Ops", ["tasks.view"]).unwrap(),
            NewRole::parse("OPS", "Ops again", ["tasks.view"]).unwrap(),
        ]);

        assert!(matches!(result, Err(RbacError::DuplicateRoleName(_))));
    }

    #[test]
    fn test_store_is_object_safe() {
        let store: std::sync::Arc<dyn RoleStore> =
            std::sync::Arc::new(InMemoryRoleStore::with_default_roles());
        assert_eq!(store.list_roles().unwrap().len(), 5);
    }
}

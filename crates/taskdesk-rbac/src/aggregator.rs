//! Permission aggregation.
//!
//! Folds the permissions of every role a user holds into a single
//! [`EffectivePermissions`] value.

use serde::{Deserialize, Serialize};
use taskdesk_types::{RoleName, UserId};
use tracing::debug;

use crate::error::{RbacError, Result};
use crate::permissions::PermissionSet;
use crate::roles::{Role, SUPER_ADMIN};
use crate::store::RoleStore;

/// Resolved permissions of a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectivePermissions {
    /// Every permission is granted (super-role or `*` sentinel).
    AllowAll,

    /// Exactly these permissions are granted.
    Set(PermissionSet),
}

impl EffectivePermissions {
    /// Resolution of an empty role set: denies everything.
    pub fn none() -> Self {
        EffectivePermissions::Set(PermissionSet::empty())
    }

    /// Returns whether `permission` is granted.
    pub fn has(&self, permission: &str) -> bool {
        match self {
            EffectivePermissions::AllowAll => true,
            EffectivePermissions::Set(set) => set.has(permission),
        }
    }

    pub fn is_allow_all(&self) -> bool {
        matches!(self, EffectivePermissions::AllowAll)
    }
}

/// Computes effective permissions from a role set.
///
/// A role triggers the all-permissions bypass if its name is the configured
/// super-role, or if it carries the `*` sentinel. The name check wins even
/// when the super-role's stored permission list is restricted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionAggregator {
    super_role: RoleName,
}

impl PermissionAggregator {
    /// Creates an aggregator using `super_admin` as the super-role.
    pub fn new() -> Self {
        match RoleName::parse(SUPER_ADMIN) {
            Ok(super_role) => Self { super_role },
            Err(e) => unreachable!("built-in super-role name is invalid: {e}"),
        }
    }

    /// Creates an aggregator with a custom super-role name.
    pub fn with_super_role(super_role: RoleName) -> Self {
        Self { super_role }
    }

    pub fn super_role(&self) -> &RoleName {
        &self.super_role
    }

    /// Returns whether holding `role` grants every permission.
    pub fn bypasses(&self, role: &Role) -> bool {
        *role.name() == self.super_role || role.grants_all()
    }

    /// Resolves the effective permissions of a role set.
    ///
    /// # Examples
    ///
    /// ```
    /// use taskdesk_rbac::{NewRole, PermissionAggregator, Role};
    ///
    /// let admin = Role::from(NewRole::parse("admin", "Admin", ["tasks.create"]).unwrap());
    /// let guest = Role::from(NewRole::parse("guest", "Guest", ["tasks.view"]).unwrap());
    ///
    /// let effective = PermissionAggregator::new().resolve([&admin, &guest]);
    /// assert!(effective.has("tasks.create"));
    /// assert!(effective.has("tasks.view"));
    /// assert!(!effective.has("tasks.delete"));
    /// ```
    pub fn resolve<'a, I>(&self, roles: I) -> EffectivePermissions
    where
        I: IntoIterator<Item = &'a Role>,
    {
        let mut union = PermissionSet::empty();

        for role in roles {
            if self.bypasses(role) {
                return EffectivePermissions::AllowAll;
            }
            union.extend_from(role.permissions());
        }

        EffectivePermissions::Set(union)
    }

    /// Looks up a user's roles and resolves them.
    ///
    /// Store failures propagate; roles that vanished between assignment and
    /// lookup are already excluded by the store.
    pub fn resolve_user(&self, store: &dyn RoleStore, user: &UserId) -> Result<EffectivePermissions> {
        let roles = store.roles_for_user(user)?;
        let effective = self.resolve(&roles);

        debug!(
            user = %user,
            roles = roles.len(),
            allow_all = effective.is_allow_all(),
            "Resolved effective permissions"
        );

        Ok(effective)
    }

    /// Resolves roles by name, skipping names the store does not know.
    pub fn resolve_names<'a, I>(&self, store: &dyn RoleStore, names: I) -> Result<EffectivePermissions>
    where
        I: IntoIterator<Item = &'a RoleName>,
    {
        let mut roles = Vec::new();
        for name in names {
            match store.get_role(name) {
                Ok(role) => roles.push(role),
                Err(RbacError::RoleNotFound(missing)) => {
                    debug!(role = %missing, "Skipping unknown role during aggregation");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(self.resolve(&roles))
    }
}

impl Default for PermissionAggregator {
    fn default() -> Self {
        Self::new()
    }
}

//! Role definitions for RBAC.
//!
//! A [`Role`] is a named bundle of permission tokens. Roles are created
//! through a [`RoleStore`](crate::store::RoleStore) from a [`NewRole`] and
//! edited with a [`RoleUpdate`]; the name and system flag never change
//! after creation.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use taskdesk_types::RoleName;

use crate::catalog;
use crate::error::{RbacError, Result};
use crate::permissions::Grants;

/// Default name of the super-role that bypasses every permission check.
pub const SUPER_ADMIN: &str = "super_admin";

/// Process-wide revision source. A `(name, revision)` pair is never handed
/// out twice, even when a role is deleted and re-created under its old name.
static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

/// A role held by users.
///
/// Not deserializable: revisions are only issued by construction. Persisted
/// rows go through [`RoleRecord`](crate::codec::RoleRecord).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Role {
    name: RoleName,
    display_name: String,
    permissions: Grants,
    is_system: bool,
    /// Fresh on every construction, update and rename.
    revision: u64,
}

impl Role {
    pub fn name(&self) -> &RoleName {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn permissions(&self) -> &Grants {
        &self.permissions
    }

    /// Returns whether this role is protected from deletion and renaming.
    pub fn is_system(&self) -> bool {
        self.is_system
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns whether this role carries the all-permissions sentinel.
    pub fn grants_all(&self) -> bool {
        self.permissions.is_all()
    }

    pub(crate) fn from_new(new: NewRole) -> Self {
        Self {
            name: new.name,
            display_name: new.display_name,
            permissions: new.permissions,
            is_system: new.is_system,
            revision: next_revision(),
        }
    }

    /// Applies an update under a fresh revision.
    pub(crate) fn apply(&mut self, update: RoleUpdate) {
        if let Some(display_name) = update.display_name {
            self.display_name = display_name;
        }
        if let Some(permissions) = update.permissions {
            self.permissions = permissions;
        }
        self.revision = next_revision();
    }

    pub(crate) fn renamed(&self, name: RoleName) -> Self {
        Self {
            name,
            revision: next_revision(),
            ..self.clone()
        }
    }
}

/// Materializes a role without going through a store.
impl From<NewRole> for Role {
    fn from(new: NewRole) -> Self {
        Role::from_new(new)
    }
}

/// Request to create a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRole {
    pub name: RoleName,
    pub display_name: String,
    pub permissions: Grants,
    #[serde(default)]
    pub is_system: bool,
}

impl NewRole {
    /// Creates a role request with no permissions.
    pub fn new(name: RoleName, display_name: impl Into<String>) -> Self {
        Self {
            name,
            display_name: display_name.into(),
            permissions: Grants::none(),
            is_system: false,
        }
    }

    /// Parses a role request from raw input, validating the name and every
    /// permission token.
    ///
    /// # Examples
    ///
    /// ```
    /// use taskdesk_rbac::roles::NewRole;
    ///
    /// let role = NewRole::parse("Guest", "Guest", ["tasks.view", "tasks.view"]).unwrap();
    /// assert_eq!(role.name.as_str(), "guest");
    /// assert_eq!(role.permissions.len(), 1);
    /// ```
    pub fn parse<I, S>(name: &str, display_name: impl Into<String>, permissions: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = RoleName::parse(name).map_err(RbacError::InvalidRoleName)?;
        Ok(Self::new(name, display_name).with_permissions(Grants::validated(permissions)?))
    }

    pub fn with_permissions(mut self, permissions: Grants) -> Self {
        self.permissions = permissions;
        self
    }

    /// Grants every permission (the `*` sentinel).
    pub fn with_all_permissions(mut self) -> Self {
        self.permissions = Grants::All;
        self
    }

    /// Marks the role as a protected system role.
    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }
}

/// Mutable fields of an existing role.
///
/// The name and system flag are intentionally absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleUpdate {
    pub display_name: Option<String>,
    pub permissions: Option<Grants>,
}

impl RoleUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn permissions(mut self, permissions: Grants) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.permissions.is_none()
    }
}

/// Built-in role definitions.
///
/// | Role          | System | Permissions                                  |
/// |---------------|--------|----------------------------------------------|
/// | `super_admin` | ✓      | `*`                                          |
/// | `admin`       | ✓      | every catalogued permission but `roles.manage` |
/// | `manager`     | ✗      | projects, tasks, notes, chat, notifications, reports |
/// | `member`      | ✗      | day-to-day project work                      |
/// | `guest`       | ✗      | read-only                                    |
pub struct StandardRoles;

impl StandardRoles {
    pub fn super_admin() -> NewRole {
        NewRole::new(builtin_name(SUPER_ADMIN), "Super Administrator")
            .with_all_permissions()
            .system()
    }

    pub fn admin() -> NewRole {
        let tokens = catalog::ALL
            .iter()
            .copied()
            .filter(|token| *token != catalog::ROLES_MANAGE);

        NewRole::new(builtin_name("admin"), "Administrator")
            .with_permissions(Grants::from_tokens(tokens))
            .system()
    }

    pub fn manager() -> NewRole {
        NewRole::new(builtin_name("manager"), "Project Manager").with_permissions(
            Grants::from_tokens([
                catalog::PROJECTS_VIEW,
                catalog::PROJECTS_CREATE,
                catalog::PROJECTS_UPDATE,
                catalog::PROJECTS_DELETE,
                catalog::PROJECTS_MANAGE_MEMBERS,
                catalog::TASKS_VIEW,
                catalog::TASKS_CREATE,
                catalog::TASKS_UPDATE,
                catalog::TASKS_DELETE,
                catalog::TASKS_ASSIGN,
                catalog::NOTES_VIEW,
                catalog::NOTES_CREATE,
                catalog::NOTES_UPDATE,
                catalog::NOTES_DELETE,
                catalog::CHAT_VIEW,
                catalog::CHAT_SEND,
                catalog::CHAT_MODERATE,
                catalog::NOTIFICATIONS_VIEW,
                catalog::NOTIFICATIONS_SEND,
                catalog::REPORTS_VIEW,
                catalog::REPORTS_EXPORT,
                catalog::USERS_VIEW,
            ]),
        )
    }

    pub fn member() -> NewRole {
        NewRole::new(builtin_name("member"), "Member").with_permissions(Grants::from_tokens([
            catalog::PROJECTS_VIEW,
            catalog::TASKS_VIEW,
            catalog::TASKS_CREATE,
            catalog::TASKS_UPDATE,
            catalog::NOTES_VIEW,
            catalog::NOTES_CREATE,
            catalog::NOTES_UPDATE,
            catalog::CHAT_VIEW,
            catalog::CHAT_SEND,
            catalog::NOTIFICATIONS_VIEW,
        ]))
    }

    pub fn guest() -> NewRole {
        NewRole::new(builtin_name("guest"), "Guest").with_permissions(Grants::from_tokens([
            catalog::PROJECTS_VIEW,
            catalog::TASKS_VIEW,
            catalog::NOTES_VIEW,
            catalog::CHAT_VIEW,
        ]))
    }

    /// All built-in roles, most privileged first.
    pub fn all() -> Vec<NewRole> {
        vec![
            Self::super_admin(),
            Self::admin(),
            Self::manager(),
            Self::member(),
            Self::guest(),
        ]
    }
}

fn builtin_name(name: &'static str) -> RoleName {
    match RoleName::parse(name) {
        Ok(name) => name,
        Err(e) => unreachable!("built-in role name '{name}' is invalid: {e}"),
    }
}

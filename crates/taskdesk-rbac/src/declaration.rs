//! Per-operation permission declarations.
//!
//! Every backend operation states the permissions it requires in a static
//! [`Declaration`]. The dispatch layer looks the operation up in a
//! [`DeclarationTable`] and hands the requirement to the
//! [`AuthorizationGuard`](crate::enforcement::AuthorizationGuard) before
//! invoking the handler. Multiple tokens mean all of them are required.

use std::collections::BTreeMap;
use std::fmt::Display;

use serde::Serialize;

use crate::catalog;

/// Identifier of a dispatchable operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct OperationId(&'static str);

impl OperationId {
    pub const fn new(id: &'static str) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Permissions required by one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Declaration {
    pub operation: OperationId,
    pub required: &'static [&'static str],
}

impl Declaration {
    pub const fn new(operation: &'static str, required: &'static [&'static str]) -> Self {
        Self {
            operation: OperationId::new(operation),
            required,
        }
    }

    /// Declares an operation with no permission requirement.
    pub const fn public(operation: &'static str) -> Self {
        Self::new(operation, &[])
    }

    pub fn is_public(&self) -> bool {
        self.required.is_empty()
    }
}

/// Lookup table from operation id to declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationTable {
    entries: BTreeMap<&'static str, Declaration>,
}

impl DeclarationTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table holding every built-in backend operation.
    pub fn builtin() -> Self {
        Self::from_declarations(operations::ALL.iter().copied())
    }

    /// Builds a table; later declarations for the same operation win.
    pub fn from_declarations(declarations: impl IntoIterator<Item = Declaration>) -> Self {
        let mut table = Self::new();
        for declaration in declarations {
            table.insert(declaration);
        }
        table
    }

    /// Adds a declaration, returning the one it replaced.
    pub fn insert(&mut self, declaration: Declaration) -> Option<Declaration> {
        self.entries
            .insert(declaration.operation.as_str(), declaration)
    }

    pub fn get(&self, operation: &str) -> Option<&Declaration> {
        self.entries.get(operation)
    }

    /// Returns the permissions `operation` requires.
    ///
    /// Undeclared operations require nothing.
    pub fn required(&self, operation: &str) -> &'static [&'static str] {
        self.entries
            .get(operation)
            .map(|declaration| declaration.required)
            .unwrap_or_default()
    }

    /// Iterates declarations sorted by operation id.
    pub fn iter(&self) -> impl Iterator<Item = &Declaration> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Built-in backend operations.
pub mod operations {
    use super::{Declaration, catalog};

    pub const HEALTH_CHECK: Declaration = Declaration::public("health_check");

    pub const LIST_PROJECTS: Declaration = Declaration::new("list_projects", &[catalog::PROJECTS_VIEW]);
    pub const GET_PROJECT: Declaration = Declaration::new("get_project", &[catalog::PROJECTS_VIEW]);
    pub const CREATE_PROJECT: Declaration =
        Declaration::new("create_project", &[catalog::PROJECTS_CREATE]);
    pub const UPDATE_PROJECT: Declaration =
        Declaration::new("update_project", &[catalog::PROJECTS_UPDATE]);
    pub const DELETE_PROJECT: Declaration =
        Declaration::new("delete_project", &[catalog::PROJECTS_DELETE]);
    pub const ADD_PROJECT_MEMBER: Declaration = Declaration::new(
        "add_project_member",
        &[catalog::PROJECTS_UPDATE, catalog::PROJECTS_MANAGE_MEMBERS],
    );

    pub const LIST_TASKS: Declaration = Declaration::new("list_tasks", &[catalog::TASKS_VIEW]);
    pub const GET_TASK: Declaration = Declaration::new("get_task", &[catalog::TASKS_VIEW]);
    pub const CREATE_TASK: Declaration = Declaration::new("create_task", &[catalog::TASKS_CREATE]);
    pub const UPDATE_TASK: Declaration = Declaration::new("update_task", &[catalog::TASKS_UPDATE]);
    pub const DELETE_TASK: Declaration = Declaration::new("delete_task", &[catalog::TASKS_DELETE]);
    pub const ASSIGN_TASK: Declaration =
        Declaration::new("assign_task", &[catalog::TASKS_UPDATE, catalog::TASKS_ASSIGN]);

    pub const LIST_NOTES: Declaration = Declaration::new("list_notes", &[catalog::NOTES_VIEW]);
    pub const CREATE_NOTE: Declaration = Declaration::new("create_note", &[catalog::NOTES_CREATE]);
    pub const UPDATE_NOTE: Declaration = Declaration::new("update_note", &[catalog::NOTES_UPDATE]);
    pub const DELETE_NOTE: Declaration = Declaration::new("delete_note", &[catalog::NOTES_DELETE]);

    pub const LIST_MESSAGES: Declaration = Declaration::new("list_messages", &[catalog::CHAT_VIEW]);
    pub const SEND_MESSAGE: Declaration =
        Declaration::new("send_message", &[catalog::CHAT_VIEW, catalog::CHAT_SEND]);
    pub const DELETE_MESSAGE: Declaration =
        Declaration::new("delete_message", &[catalog::CHAT_MODERATE]);

    pub const LIST_NOTIFICATIONS: Declaration =
        Declaration::new("list_notifications", &[catalog::NOTIFICATIONS_VIEW]);
    pub const SEND_NOTIFICATION: Declaration =
        Declaration::new("send_notification", &[catalog::NOTIFICATIONS_SEND]);

    pub const VIEW_REPORT: Declaration = Declaration::new("view_report", &[catalog::REPORTS_VIEW]);
    pub const EXPORT_REPORT_CSV: Declaration = Declaration::new(
        "export_report_csv",
        &[catalog::REPORTS_VIEW, catalog::REPORTS_EXPORT],
    );

    pub const LIST_USERS: Declaration = Declaration::new("list_users", &[catalog::USERS_VIEW]);
    pub const UPDATE_USER: Declaration = Declaration::new("update_user", &[catalog::USERS_MANAGE]);

    pub const LIST_ROLES: Declaration = Declaration::new("list_roles", &[catalog::ROLES_VIEW]);
    pub const CREATE_ROLE: Declaration = Declaration::new("create_role", &[catalog::ROLES_MANAGE]);
    pub const UPDATE_ROLE: Declaration = Declaration::new("update_role", &[catalog::ROLES_MANAGE]);
    pub const DELETE_ROLE: Declaration = Declaration::new("delete_role", &[catalog::ROLES_MANAGE]);
    pub const ASSIGN_ROLE: Declaration =
        Declaration::new("assign_role", &[catalog::ROLES_VIEW, catalog::ROLES_ASSIGN]);

    pub const ALL: &[Declaration] = &[
        HEALTH_CHECK,
        LIST_PROJECTS,
        GET_PROJECT,
        CREATE_PROJECT,
        UPDATE_PROJECT,
        DELETE_PROJECT,
        ADD_PROJECT_MEMBER,
        LIST_TASKS,
        GET_TASK,
        CREATE_TASK,
        UPDATE_TASK,
        DELETE_TASK,
        ASSIGN_TASK,
        LIST_NOTES,
        CREATE_NOTE,
        UPDATE_NOTE,
        DELETE_NOTE,
        LIST_MESSAGES,
        SEND_MESSAGE,
        DELETE_MESSAGE,
        LIST_NOTIFICATIONS,
        SEND_NOTIFICATION,
        VIEW_REPORT,
        EXPORT_REPORT_CSV,
        LIST_USERS,
        UPDATE_USER,
        LIST_ROLES,
        CREATE_ROLE,
        UPDATE_ROLE,
        DELETE_ROLE,
        ASSIGN_ROLE,
    ];
}

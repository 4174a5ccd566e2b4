//! Built-in permission tokens.
//!
//! Centralized constants for every permission the backend declares. Role
//! definitions and operation declarations should reference these instead of
//! string literals. Tokens outside this list are still valid; nothing checks
//! a role's permissions against the catalog.

// =============================================================================
// Projects
// =============================================================================

pub const PROJECTS_VIEW: &str = "projects.view";
pub const PROJECTS_CREATE: &str = "projects.create";
pub const PROJECTS_UPDATE: &str = "projects.update";
pub const PROJECTS_DELETE: &str = "projects.delete";
pub const PROJECTS_MANAGE_MEMBERS: &str = "projects.manage_members";

// =============================================================================
// Tasks
// =============================================================================

pub const TASKS_VIEW: &str = "tasks.view";
pub const TASKS_CREATE: &str = "tasks.create";
pub const TASKS_UPDATE: &str = "tasks.update";
pub const TASKS_DELETE: &str = "tasks.delete";
pub const TASKS_ASSIGN: &str = "tasks.assign";

// =============================================================================
// Notes
// =============================================================================

pub const NOTES_VIEW: &str = "notes.view";
pub const NOTES_CREATE: &str = "notes.create";
pub const NOTES_UPDATE: &str = "notes.update";
pub const NOTES_DELETE: &str = "notes.delete";

// =============================================================================
// Chat
// =============================================================================

pub const CHAT_VIEW: &str = "chat.view";
pub const CHAT_SEND: &str = "chat.send";
pub const CHAT_MODERATE: &str = "chat.moderate";

// =============================================================================
// Notifications
// =============================================================================

pub const NOTIFICATIONS_VIEW: &str = "notifications.view";
pub const NOTIFICATIONS_SEND: &str = "notifications.send";

// =============================================================================
// Reports
// =============================================================================

pub const REPORTS_VIEW: &str = "reports.view";
pub const REPORTS_EXPORT: &str = "reports.export";

// =============================================================================
// Administration
// =============================================================================

pub const USERS_VIEW: &str = "users.view";
pub const USERS_MANAGE: &str = "users.manage";
pub const ROLES_VIEW: &str = "roles.view";
pub const ROLES_MANAGE: &str = "roles.manage";
pub const ROLES_ASSIGN: &str = "roles.assign";

/// Every catalogued permission, grouped by resource.
pub const ALL: &[&str] = &[
    PROJECTS_VIEW,
    PROJECTS_CREATE,
    PROJECTS_UPDATE,
    PROJECTS_DELETE,
    PROJECTS_MANAGE_MEMBERS,
    TASKS_VIEW,
    TASKS_CREATE,
    TASKS_UPDATE,
    TASKS_DELETE,
    TASKS_ASSIGN,
    NOTES_VIEW,
    NOTES_CREATE,
    NOTES_UPDATE,
    NOTES_DELETE,
    CHAT_VIEW,
    CHAT_SEND,
    CHAT_MODERATE,
    NOTIFICATIONS_VIEW,
    NOTIFICATIONS_SEND,
    REPORTS_VIEW,
    REPORTS_EXPORT,
    USERS_VIEW,
    USERS_MANAGE,
    ROLES_VIEW,
    ROLES_MANAGE,
    ROLES_ASSIGN,
];

/// Returns whether `token` is one of the built-in permissions.
pub fn is_known(token: &str) -> bool {
    ALL.contains(&token)
}

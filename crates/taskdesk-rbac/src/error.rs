//! Error types for role administration and authorization.

use taskdesk_types::{InvalidIdentifier, PermissionToken, RoleName};
use thiserror::Error;

/// Error type for RBAC operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RbacError {
    /// Referenced role does not exist.
    ///
    /// Raised by lookups and assignments. Authorization never raises it; a
    /// missing role is simply left out of aggregation.
    #[error("role '{0}' not found")]
    RoleNotFound(RoleName),

    /// A role with this name already exists.
    #[error("role '{0}' already exists")]
    DuplicateRoleName(RoleName),

    /// Attempted to delete or rename a system role.
    #[error("role '{role}' is a system role and cannot be {attempted}")]
    ProtectedRoleViolation {
        role: RoleName,
        attempted: &'static str,
    },

    /// Authorization failed.
    ///
    /// Displays only "forbidden". `missing` is the first unmet
    /// permission and is for server-side diagnostics only.
    #[error("forbidden")]
    PermissionDenied { missing: PermissionToken },

    /// Role name failed validation.
    #[error("invalid role name: {0}")]
    InvalidRoleName(InvalidIdentifier),

    /// Permission token failed write-time validation.
    #[error("invalid permission: {0}")]
    InvalidPermission(InvalidIdentifier),

    /// The backing store failed; propagated unchanged to the caller.
    #[error("role store error: {0}")]
    Storage(String),
}

/// Result type for RBAC operations.
pub type Result<T> = std::result::Result<T, RbacError>;

impl RbacError {
    /// Returns whether this error should be reported to the caller as a
    /// client error (bad request / conflict) rather than a denial.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            RbacError::PermissionDenied { .. } | RbacError::Storage(_)
        )
    }
}

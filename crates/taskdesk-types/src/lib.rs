//! # taskdesk-types: Core types for `taskdesk`
//!
//! This crate contains shared identifiers used across the `taskdesk` system:
//! - User identity ([`UserId`])
//! - Role identity ([`RoleName`])
//! - Permission identity ([`PermissionToken`])
//!
//! Role names are case-insensitive: input is folded to ASCII lowercase before
//! validation, so `"Admin"` and `"admin"` name the same role. Permission
//! tokens are opaque and compared verbatim.

use std::{
    borrow::Borrow,
    fmt::{Debug, Display},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum length of a role name, in bytes.
pub const MAX_ROLE_NAME_LEN: usize = 64;

/// Literal used at storage boundaries to mean "every permission".
pub const ALL_PERMISSIONS_SENTINEL: &str = "*";

/// Delimiter between permission tokens in the persisted representation.
pub const PERMISSION_DELIMITER: char = ',';

/// Rejected identifier input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidIdentifier {
    #[error("role name must not be empty")]
    EmptyRoleName,

    #[error("role name '{0}' exceeds {MAX_ROLE_NAME_LEN} bytes")]
    RoleNameTooLong(String),

    #[error("role name '{0}' must start with a letter and contain only [a-z0-9_]")]
    MalformedRoleName(String),

    #[error("permission token must not be empty")]
    EmptyPermission,

    #[error("permission token '{0}' contains whitespace or a delimiter")]
    MalformedPermission(String),

    #[error("'*' grants every permission and cannot be used as a token")]
    SentinelAsPermission,
}

// ============================================================================
// User ID - Clone (opaque external identifier)
// ============================================================================

/// Identifier of an authenticated caller, as issued by the identity layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ============================================================================
// Role Name - Clone (validated, case-folded token)
// ============================================================================

/// Unique name of a role.
///
/// Always lowercase, starts with a letter, contains only `[a-z0-9_]`.
/// Construction folds ASCII case, which makes role identity
/// case-insensitive:
///
/// ```
/// # use taskdesk_types::RoleName;
/// let a = RoleName::parse("Admin").unwrap();
/// let b = RoleName::parse("admin").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "admin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    /// Parses and normalizes a role name.
    pub fn parse(name: impl AsRef<str>) -> Result<Self, InvalidIdentifier> {
        let folded = name.as_ref().trim().to_ascii_lowercase();

        if folded.is_empty() {
            return Err(InvalidIdentifier::EmptyRoleName);
        }
        if folded.len() > MAX_ROLE_NAME_LEN {
            return Err(InvalidIdentifier::RoleNameTooLong(folded));
        }

        let mut chars = folded.chars();
        let starts_with_letter = chars.next().is_some_and(|c| c.is_ascii_lowercase());
        let rest_ok = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !starts_with_letter || !rest_ok {
            return Err(InvalidIdentifier::MalformedRoleName(folded));
        }

        Ok(Self(folded))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RoleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RoleName {
    type Error = InvalidIdentifier;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for RoleName {
    type Error = InvalidIdentifier;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<RoleName> for String {
    fn from(value: RoleName) -> Self {
        value.0
    }
}

impl Borrow<str> for RoleName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Permission Token - Clone (opaque `resource.action` string)
// ============================================================================

/// A single permission, conventionally `resource.action` (e.g. `tasks.delete`).
///
/// Tokens are compared by exact string equality. [`PermissionToken::new`]
/// stores its input verbatim; [`PermissionToken::parse`] additionally checks
/// the token can survive the comma-joined storage format and is used when
/// roles are written.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionToken(String);

impl PermissionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Validates a token for persistence.
    pub fn parse(token: impl AsRef<str>) -> Result<Self, InvalidIdentifier> {
        let token = token.as_ref().trim();

        if token.is_empty() {
            return Err(InvalidIdentifier::EmptyPermission);
        }
        if token == ALL_PERMISSIONS_SENTINEL {
            return Err(InvalidIdentifier::SentinelAsPermission);
        }
        if token
            .chars()
            .any(|c| c.is_whitespace() || c == PERMISSION_DELIMITER)
        {
            return Err(InvalidIdentifier::MalformedPermission(token.to_string()));
        }

        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the `resource` half of a `resource.action` token, if present.
    pub fn resource(&self) -> Option<&str> {
        self.0.split_once('.').map(|(resource, _)| resource)
    }

    /// Returns the `action` half of a `resource.action` token, if present.
    pub fn action(&self) -> Option<&str> {
        self.0.split_once('.').map(|(_, action)| action)
    }
}

impl Display for PermissionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PermissionToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl From<String> for PermissionToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl Borrow<str> for PermissionToken {
    fn borrow(&self) -> &str {
        &self.0
    }
}

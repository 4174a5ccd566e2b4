//! Storage-boundary encoding of role permissions.
//!
//! Persisted rows keep a role's permissions as a single comma-joined string,
//! with the literal `*` meaning "all permissions". Inside the crate the list
//! is always a [`Grants`]; these helpers are the only place the delimited
//! form exists.

use serde::{Deserialize, Serialize};
use taskdesk_types::{ALL_PERMISSIONS_SENTINEL, PERMISSION_DELIMITER, PermissionToken, RoleName};

use crate::error::{RbacError, Result};
use crate::permissions::Grants;
use crate::roles::{NewRole, Role};

/// Encodes grants as a sorted, comma-joined string (`*` for all).
///
/// # Examples
///
/// ```
/// use taskdesk_rbac::codec::encode_permissions;
/// use taskdesk_rbac::Grants;
///
/// let grants = Grants::from_tokens(["tasks.view", "notes.view"]);
/// assert_eq!(encode_permissions(&grants), "notes.view,tasks.view");
/// assert_eq!(encode_permissions(&Grants::All), "*");
/// ```
pub fn encode_permissions(grants: &Grants) -> String {
    match grants {
        Grants::All => ALL_PERMISSIONS_SENTINEL.to_string(),
        Grants::Tokens(_) => grants
            .tokens()
            .map(PermissionToken::as_str)
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// Decodes a delimited permission string.
///
/// Segments are trimmed and empty segments are skipped. A `*` segment
/// anywhere in the list yields [`Grants::All`]. Tokens are otherwise kept
/// verbatim; decoding never rejects a stored row.
pub fn decode_permissions(raw: &str) -> Grants {
    let segments = raw
        .split(PERMISSION_DELIMITER)
        .map(str::trim)
        .filter(|segment| !segment.is_empty());

    let mut tokens = Vec::new();
    for segment in segments {
        if segment == ALL_PERMISSIONS_SENTINEL {
            return Grants::All;
        }
        tokens.push(segment);
    }

    Grants::from_tokens(tokens)
}

/// Persisted row layout of a role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRecord {
    pub name: String,
    pub display_name: String,
    /// Comma-joined tokens, or `*`.
    pub permissions: String,
    #[serde(default)]
    pub is_system: bool,
}

impl RoleRecord {
    /// Converts the row into a creation request.
    ///
    /// The role name is validated; permission tokens are not.
    pub fn into_new_role(self) -> Result<NewRole> {
        let name = RoleName::parse(&self.name).map_err(RbacError::InvalidRoleName)?;
        let mut role = NewRole::new(name, self.display_name)
            .with_permissions(decode_permissions(&self.permissions));
        role.is_system = self.is_system;
        Ok(role)
    }
}

impl From<&Role> for RoleRecord {
    fn from(role: &Role) -> Self {
        Self {
            name: role.name().to_string(),
            display_name: role.display_name().to_string(),
            permissions: encode_permissions(role.permissions()),
            is_system: role.is_system(),
        }
    }
}

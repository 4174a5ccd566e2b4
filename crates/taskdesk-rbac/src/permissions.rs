//! Permission types for access control.
//!
//! [`Grants`] is what a single role carries; [`PermissionSet`] is the union
//! computed across several roles.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use taskdesk_types::{InvalidIdentifier, PermissionToken};

use crate::error::{RbacError, Result};

/// Permissions granted by a single role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grants {
    /// Every permission, present or future (the `*` sentinel).
    All,

    /// An explicit, deduplicated and sorted list of tokens.
    Tokens(BTreeSet<PermissionToken>),
}

impl Grants {
    /// Creates an empty grant list.
    pub fn none() -> Self {
        Grants::Tokens(BTreeSet::new())
    }

    /// Builds a grant list from tokens, collapsing duplicates.
    ///
    /// Tokens are kept verbatim; see [`Grants::validated`] for write-time
    /// checks.
    pub fn from_tokens<I, T>(tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<PermissionToken>,
    {
        Grants::Tokens(tokens.into_iter().map(Into::into).collect())
    }

    /// Builds a grant list from raw strings, validating each token.
    pub fn validated<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = BTreeSet::new();
        for raw in tokens {
            let token = PermissionToken::parse(raw).map_err(RbacError::InvalidPermission)?;
            set.insert(token);
        }
        Ok(Grants::Tokens(set))
    }

    /// Checks every explicit token against write-time syntax.
    ///
    /// Rejects tokens that would not survive the storage codec unchanged:
    /// empty, padded, containing whitespace or `,`, or the bare `*` (which
    /// is spelled [`Grants::All`] instead).
    pub fn validate(&self) -> Result<()> {
        for token in self.tokens() {
            let parsed =
                PermissionToken::parse(token.as_str()).map_err(RbacError::InvalidPermission)?;
            if parsed != *token {
                return Err(RbacError::InvalidPermission(
                    InvalidIdentifier::MalformedPermission(token.to_string()),
                ));
            }
        }
        Ok(())
    }

    /// Returns whether this is the all-permissions sentinel.
    pub fn is_all(&self) -> bool {
        matches!(self, Grants::All)
    }

    /// Returns whether this grant list covers `token`.
    pub fn allows(&self, token: &str) -> bool {
        match self {
            Grants::All => true,
            Grants::Tokens(tokens) => tokens.contains(token),
        }
    }

    /// Iterates over explicit tokens in sorted order.
    ///
    /// Yields nothing for [`Grants::All`].
    pub fn tokens(&self) -> impl Iterator<Item = &PermissionToken> {
        let set = match self {
            Grants::All => None,
            Grants::Tokens(tokens) => Some(tokens),
        };
        set.into_iter().flatten()
    }

    /// Number of explicit tokens (zero for [`Grants::All`]).
    pub fn len(&self) -> usize {
        match self {
            Grants::All => 0,
            Grants::Tokens(tokens) => tokens.len(),
        }
    }

    /// Returns whether this grants nothing at all.
    pub fn is_empty(&self) -> bool {
        matches!(self, Grants::Tokens(tokens) if tokens.is_empty())
    }
}

impl Default for Grants {
    fn default() -> Self {
        Self::none()
    }
}

/// Union of explicit permissions across a set of roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    permissions: BTreeSet<PermissionToken>,
}

impl PermissionSet {
    /// Creates an empty permission set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns whether this set contains the given permission.
    pub fn has(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Adds a permission to the set. Duplicate grants are no-ops.
    pub fn grant(&mut self, permission: PermissionToken) {
        self.permissions.insert(permission);
    }

    /// Adds every explicit token from `grants`.
    pub fn extend_from(&mut self, grants: &Grants) {
        self.permissions.extend(grants.tokens().cloned());
    }

    /// Returns all permissions in the set, sorted.
    pub fn iter(&self) -> impl Iterator<Item = &PermissionToken> {
        self.permissions.iter()
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}

impl FromIterator<PermissionToken> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = PermissionToken>>(iter: I) -> Self {
        Self {
            permissions: iter.into_iter().collect(),
        }
    }
}

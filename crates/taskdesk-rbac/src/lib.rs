//! # taskdesk-rbac: Role-Based Access Control
//!
//! Decides whether a caller may invoke a backend operation (projects, tasks,
//! notes, chat, notifications, reports, administration):
//! - **Role store** holding role definitions and user-role assignments
//! - **Permission aggregation** across every role a user holds
//! - **Authorization guard** enforcing per-operation requirements
//! - **Permission declarations** binding operations to required tokens
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Inbound request (credential verified)       │
//! └─────────────────┬───────────────────────────┘
//!                   │ Identity { user_id, roles }
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  AuthorizationGuard                          │
//! │  ├─ DeclarationTable: operation → required   │
//! │  ├─ PermissionAggregator (+ PermissionCache) │
//! │  └─ check: every required token granted?     │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//!         Decision::Allow | Decision::Deny
//! ```
//!
//! ## Rules
//!
//! - Effective permissions are the union of every held role's tokens.
//! - Holding the super-role (`super_admin` by default, matched by name) or
//!   any role whose permissions are `*` grants everything.
//! - A user with no roles is granted nothing.
//! - An operation with no declaration, or an empty one, is allowed.
//! - A declaration with several tokens requires all of them.
//! - Denials carry the first unmet token for server-side logs only; the
//!   error's display text is just "forbidden".
//!
//! ## Examples
//!
//! ```
//! use std::sync::Arc;
//! use taskdesk_rbac::{AuthorizationGuard, Identity, InMemoryRoleStore, RoleStore};
//! use taskdesk_types::{RoleName, UserId};
//!
//! let store = Arc::new(InMemoryRoleStore::with_default_roles());
//! let user = UserId::from("u-17");
//! store.assign_role(&user, &RoleName::parse("member")?)?;
//!
//! let guard = AuthorizationGuard::new(store.clone());
//! let identity = Identity::load(store.as_ref(), user)?;
//!
//! assert!(guard.authorize_operation(&identity, "create_task").is_allowed());
//! assert!(!guard.authorize_operation(&identity, "delete_project").is_allowed());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod aggregator;
pub mod cache;
pub mod catalog;
pub mod codec;
pub mod declaration;
pub mod enforcement;
pub mod error;
pub mod permissions;
pub mod roles;
pub mod store;

// Re-export commonly used types
pub use aggregator::{EffectivePermissions, PermissionAggregator};
pub use cache::{CacheStats, PermissionCache, RoleSignature};
pub use declaration::{Declaration, DeclarationTable, OperationId};
pub use enforcement::{AuthorizationGuard, Decision, Identity, RequestAuthorization, RequestState};
pub use error::{RbacError, Result};
pub use permissions::{Grants, PermissionSet};
pub use roles::{NewRole, Role, RoleUpdate, StandardRoles};
pub use store::{InMemoryRoleStore, RoleStore};

//! Authorization enforcement.
//!
//! Decides whether a caller may invoke an operation, at request time:
//!
//! ```text
//! Unauthenticated ──authenticate──▶ Authenticated ──require──▶ Authorized
//!                                                      │
//!                                                      └──────▶ Denied
//! ```
//!
//! [`authorize`] is the pure decision. [`AuthorizationGuard`] wraps it with
//! store lookups, declaration lookups, an optional shared cache and audit
//! logging. [`RequestAuthorization`] tracks one request through the state
//! machine above.

use std::collections::HashMap;
use std::sync::Arc;

use taskdesk_types::{PermissionToken, UserId};
use tracing::{info, warn};

use crate::aggregator::{EffectivePermissions, PermissionAggregator};
use crate::cache::PermissionCache;
use crate::declaration::DeclarationTable;
use crate::error::{RbacError, Result};
use crate::roles::Role;
use crate::store::RoleStore;

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,

    /// `missing` is the first required permission that was not granted.
    /// It must not be sent back to the caller.
    Deny { missing: PermissionToken },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Returns the first unmet permission of a denial.
    pub fn missing(&self) -> Option<&PermissionToken> {
        match self {
            Decision::Allow => None,
            Decision::Deny { missing } => Some(missing),
        }
    }

    /// Converts a denial into [`RbacError::PermissionDenied`].
    pub fn into_result(self) -> Result<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny { missing } => Err(RbacError::PermissionDenied { missing }),
        }
    }
}

/// Checks `required` against already-resolved permissions.
///
/// All required tokens must be granted. An empty requirement is always
/// allowed.
pub fn check<S: AsRef<str>>(required: &[S], effective: &EffectivePermissions) -> Decision {
    match required.iter().find(|token| !effective.has(token.as_ref())) {
        None => Decision::Allow,
        Some(missing) => Decision::Deny {
            missing: PermissionToken::new(missing.as_ref()),
        },
    }
}

/// Decides whether a holder of `roles` satisfies every token in `required`.
///
/// # Examples
///
/// ```
/// use taskdesk_rbac::enforcement::{authorize, Decision};
/// use taskdesk_rbac::{NewRole, PermissionAggregator, Role};
///
/// let admin = Role::from(NewRole::parse("admin", "Admin", ["tasks.create", "tasks.update"]).unwrap());
/// let guest = Role::from(NewRole::parse("guest", "Guest", ["tasks.view"]).unwrap());
/// let roles = [admin, guest];
/// let aggregator = PermissionAggregator::new();
///
/// assert_eq!(authorize(&aggregator, &["tasks.create", "tasks.view"], &roles), Decision::Allow);
/// assert_eq!(
///     authorize(&aggregator, &["tasks.delete"], &roles).missing().map(|p| p.as_str()),
///     Some("tasks.delete"),
/// );
/// ```
pub fn authorize<S: AsRef<str>>(
    aggregator: &PermissionAggregator,
    required: &[S],
    roles: &[Role],
) -> Decision {
    if required.is_empty() {
        return Decision::Allow;
    }
    check(required, &aggregator.resolve(roles))
}

/// A caller whose credential has already been verified upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

impl Identity {
    pub fn new(user_id: impl Into<UserId>, roles: Vec<Role>) -> Self {
        Self {
            user_id: user_id.into(),
            roles,
        }
    }

    /// Loads the caller's current roles from the store.
    pub fn load(store: &dyn RoleStore, user_id: UserId) -> Result<Self> {
        let roles = store.roles_for_user(&user_id)?;
        Ok(Self { user_id, roles })
    }
}

/// Authorization entry point used by the dispatch layer.
///
/// Cheap to clone; all shared state is behind `Arc`s.
#[derive(Clone)]
pub struct AuthorizationGuard {
    store: Arc<dyn RoleStore>,
    aggregator: PermissionAggregator,
    declarations: Arc<DeclarationTable>,
    cache: Option<Arc<PermissionCache>>,
    audit_enabled: bool,
}

impl AuthorizationGuard {
    /// Creates a guard over `store` using the built-in declarations and the
    /// default super-role.
    pub fn new(store: Arc<dyn RoleStore>) -> Self {
        Self {
            store,
            aggregator: PermissionAggregator::new(),
            declarations: Arc::new(DeclarationTable::builtin()),
            cache: None,
            audit_enabled: true,
        }
    }

    pub fn with_aggregator(mut self, aggregator: PermissionAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    pub fn with_declarations(mut self, declarations: DeclarationTable) -> Self {
        self.declarations = Arc::new(declarations);
        self
    }

    /// Shares a resolution cache across requests.
    pub fn with_cache(mut self, cache: Arc<PermissionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Disables audit logging (for testing).
    pub fn without_audit(mut self) -> Self {
        self.audit_enabled = false;
        self
    }

    pub fn store(&self) -> &Arc<dyn RoleStore> {
        &self.store
    }

    pub fn declarations(&self) -> &DeclarationTable {
        &self.declarations
    }

    pub fn aggregator(&self) -> &PermissionAggregator {
        &self.aggregator
    }

    /// Resolves effective permissions, going through the cache if set.
    pub fn resolve(&self, roles: &[Role]) -> EffectivePermissions {
        match &self.cache {
            Some(cache) => cache.resolve(&self.aggregator, roles),
            None => self.aggregator.resolve(roles),
        }
    }

    /// Decides `required` for a caller holding `roles`.
    pub fn authorize<S: AsRef<str>>(&self, required: &[S], roles: &[Role]) -> Decision {
        if required.is_empty() {
            return Decision::Allow;
        }
        check(required, &self.resolve(roles))
    }

    /// Decides whether `identity` may invoke `operation`.
    pub fn authorize_operation(&self, identity: &Identity, operation: &str) -> Decision {
        let required = self.declarations.required(operation);
        let decision = self.authorize(required, &identity.roles);
        self.audit(&identity.user_id, operation, &decision);
        decision
    }

    /// Looks up `user`'s roles in the store and decides `required`.
    pub fn authorize_user<S: AsRef<str>>(&self, user: &UserId, required: &[S]) -> Result<Decision> {
        if required.is_empty() {
            return Ok(Decision::Allow);
        }
        let roles = self.store.roles_for_user(user)?;
        Ok(self.authorize(required, &roles))
    }

    /// Starts tracking a new request.
    pub fn begin_request(&self) -> RequestAuthorization<'_> {
        RequestAuthorization::new(self)
    }

    fn audit(&self, user: &UserId, operation: &str, decision: &Decision) {
        if !self.audit_enabled {
            return;
        }

        match decision {
            Decision::Allow => info!(user = %user, operation = %operation, "Operation authorized"),
            Decision::Deny { missing } => warn!(
                user = %user,
                operation = %operation,
                missing = %missing,
                "Operation denied"
            ),
        }
    }
}

impl std::fmt::Debug for AuthorizationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGuard")
            .field("aggregator", &self.aggregator)
            .field("declarations", &self.declarations.len())
            .field("cached", &self.cache.is_some())
            .field("audit_enabled", &self.audit_enabled)
            .finish_non_exhaustive()
    }
}

/// Per-request authorization state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// No verified credential yet.
    Unauthenticated,
    /// Credential verified, no permission check performed yet.
    Authenticated,
    /// Every check so far has passed.
    Authorized,
    /// At least one check failed.
    Denied,
}

/// Tracks one request through authentication and authorization.
///
/// Effective permissions are resolved once, on the first check, and reused
/// for the rest of the request. Decisions are memoized per requirement.
#[derive(Debug)]
pub struct RequestAuthorization<'g> {
    guard: &'g AuthorizationGuard,
    identity: Option<Identity>,
    effective: Option<EffectivePermissions>,
    decisions: HashMap<Vec<String>, Decision>,
    state: RequestState,
}

impl<'g> RequestAuthorization<'g> {
    fn new(guard: &'g AuthorizationGuard) -> Self {
        Self {
            guard,
            identity: None,
            effective: None,
            decisions: HashMap::new(),
            state: RequestState::Unauthenticated,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Records the verified caller. Resets any earlier decisions.
    pub fn authenticate(&mut self, identity: Identity) {
        self.identity = Some(identity);
        self.effective = None;
        self.decisions.clear();
        self.state = RequestState::Authenticated;
    }

    /// Checks `required` for the current caller.
    ///
    /// An unauthenticated request holds no roles, so only empty
    /// requirements pass.
    pub fn require<S: AsRef<str>>(&mut self, required: &[S]) -> Decision {
        let key: Vec<String> = required.iter().map(|t| t.as_ref().to_string()).collect();
        if let Some(decision) = self.decisions.get(&key) {
            return decision.clone();
        }

        let decision = if required.is_empty() {
            Decision::Allow
        } else {
            check(required, self.effective())
        };

        self.record(&decision);
        self.decisions.insert(key, decision.clone());
        decision
    }

    /// Checks the declared requirement of `operation`.
    pub fn require_operation(&mut self, operation: &str) -> Decision {
        let required = self.guard.declarations().required(operation);
        let decision = self.require(required);

        if let Some(identity) = &self.identity {
            self.guard.audit(&identity.user_id, operation, &decision);
        }
        decision
    }

    fn effective(&mut self) -> &EffectivePermissions {
        let guard = self.guard;
        let identity = self.identity.as_ref();
        self.effective.get_or_insert_with(|| match identity {
            Some(identity) => guard.resolve(&identity.roles),
            None => EffectivePermissions::none(),
        })
    }

    fn record(&mut self, decision: &Decision) {
        self.state = match (self.state, decision) {
            (RequestState::Denied, _) | (_, Decision::Deny { .. }) => RequestState::Denied,
            (RequestState::Unauthenticated, Decision::Allow) => RequestState::Unauthenticated,
            (_, Decision::Allow) => RequestState::Authorized,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::{Declaration, operations};
    use crate::permissions::Grants;
    use crate::roles::{NewRole, RoleUpdate};
    use crate::store::InMemoryRoleStore;
    use taskdesk_types::RoleName;

    fn role(name: &str, perms: &[&str]) -> Role {
        Role::from(NewRole::parse(name, name, perms).unwrap())
    }

    fn scenario_roles() -> Vec<Role> {
        vec![
            role("admin", &["tasks.create", "tasks.update"]),
            role("guest", &["tasks.view"]),
        ]
    }

    fn guard() -> AuthorizationGuard {
        AuthorizationGuard::new(Arc::new(InMemoryRoleStore::with_default_roles())).without_audit()
    }

    #[test]
    fn test_empty_requirement_always_allowed() {
        let aggregator = PermissionAggregator::new();
        let none: &[&str] = &[];

        assert_eq!(authorize(&aggregator, none, &[]), Decision::Allow);
        assert_eq!(authorize(&aggregator, none, &scenario_roles()), Decision::Allow);
    }

    #[test]
    fn test_all_required_and_semantics() {
        let aggregator = PermissionAggregator::new();
        let roles = scenario_roles();

        assert_eq!(
            authorize(&aggregator, &["tasks.create", "tasks.view"], &roles),
            Decision::Allow
        );
        assert_eq!(
            authorize(&aggregator, &["tasks.delete"], &roles),
            Decision::Deny {
                missing: PermissionToken::new("tasks.delete")
            }
        );
    }

    #[test]
    fn test_deny_reports_first_unmet() {
        let aggregator = PermissionAggregator::new();
        let roles = scenario_roles();

        let decision = authorize(
            &aggregator,
            &["tasks.view", "tasks.archive", "tasks.delete"],
            &roles,
        );
        assert_eq!(decision.missing().unwrap().as_str(), "tasks.archive");
    }

    #[test]
    fn test_super_admin_allows_anything() {
        let aggregator = PermissionAggregator::new();
        let super_admin = Role::from(crate::roles::StandardRoles::super_admin());

        assert_eq!(
            authorize(&aggregator, &["anything.whatsoever"], &[super_admin]),
            Decision::Allow
        );
    }

    #[test]
    fn test_no_roles_denied() {
        let aggregator = PermissionAggregator::new();
        let decision = authorize(&aggregator, &["tasks.view"], &[]);
        assert!(!decision.is_allowed());
    }

    #[test]
    fn test_denial_error_is_generic() {
        let err = Decision::Deny {
            missing: PermissionToken::new("roles.manage"),
        }
        .into_result()
        .unwrap_err();

        assert_eq!(err.to_string(), "forbidden");
        assert!(!err.to_string().contains("roles.manage"));
        assert!(!err.is_client_error());
        assert!(matches!(
            err,
            RbacError::PermissionDenied { missing } if missing.as_str() == "roles.manage"
        ));
        assert!(Decision::Allow.into_result().is_ok());
    }

    #[test]
    fn test_authorize_operation_uses_declarations() {
        let guard = guard();
        let member = guard.store().get_role(&RoleName::parse("member").unwrap()).unwrap();
        let identity = Identity::new("u1", vec![member]);

        assert!(guard.authorize_operation(&identity, "create_task").is_allowed());
        assert_eq!(
            guard.authorize_operation(&identity, "delete_task"),
            Decision::Deny {
                missing: PermissionToken::new("tasks.delete")
            }
        );
        assert!(guard.authorize_operation(&identity, "health_check").is_allowed());
        assert!(guard.authorize_operation(&identity, "undeclared_op").is_allowed());
    }

    #[test]
    fn test_custom_declarations() {
        let guard = guard().with_declarations(DeclarationTable::from_declarations([
            Declaration::new("archive_task", &["tasks.archive"]),
            operations::HEALTH_CHECK,
        ]));
        let identity = Identity::new("u1", vec![role("archivist", &["tasks.archive"])]);

        assert!(guard.authorize_operation(&identity, "archive_task").is_allowed());
        // Built-in declarations are gone, so this is undeclared.
        assert!(guard.authorize_operation(&identity, "delete_task").is_allowed());
    }

    #[test]
    fn test_authorize_user_through_store() {
        let store = Arc::new(InMemoryRoleStore::with_default_roles());
        let guard = AuthorizationGuard::new(store.clone()).without_audit();
        let user = UserId::from("u1");

        assert!(!guard.authorize_user(&user, &["tasks.view"]).unwrap().is_allowed());

        store
            .assign_role(&user, &RoleName::parse("guest").unwrap())
            .unwrap();
        assert!(guard.authorize_user(&user, &["tasks.view"]).unwrap().is_allowed());

        store
            .assign_role(&user, &RoleName::parse("super_admin").unwrap())
            .unwrap();
        assert!(guard.authorize_user(&user, &["roles.manage"]).unwrap().is_allowed());
    }

    #[test]
    fn test_cached_guard_sees_role_updates() {
        let store = Arc::new(InMemoryRoleStore::with_default_roles());
        let cache = Arc::new(PermissionCache::new(16));
        let guard = AuthorizationGuard::new(store.clone())
            .with_cache(cache.clone())
            .without_audit();
        let user = UserId::from("u1");
        let guest = RoleName::parse("guest").unwrap();
        store.assign_role(&user, &guest).unwrap();

        assert!(!guard.authorize_user(&user, &["reports.view"]).unwrap().is_allowed());
        assert!(!guard.authorize_user(&user, &["reports.view"]).unwrap().is_allowed());
        assert_eq!(cache.stats().hits, 1);

        store
            .update_role(
                &guest,
                RoleUpdate::new().permissions(Grants::from_tokens(["reports.view"])),
            )
            .unwrap();
        assert!(guard.authorize_user(&user, &["reports.view"]).unwrap().is_allowed());
    }

    #[test]
    fn test_cached_guard_sees_recreated_role() {
        let store = Arc::new(InMemoryRoleStore::new());
        let guard = AuthorizationGuard::new(store.clone())
            .with_cache(Arc::new(PermissionCache::new(16)))
            .without_audit();
        let user = UserId::from("u1");
        let reviewer = RoleName::parse("reviewer").unwrap();

        store
            .create_role(NewRole::parse("reviewer", "Reviewer", ["tasks.delete"]).unwrap())
            .unwrap();
        store.assign_role(&user, &reviewer).unwrap();
        assert!(guard.authorize_user(&user, &["tasks.delete"]).unwrap().is_allowed());

        store.delete_role(&reviewer).unwrap();
        store
            .create_role(NewRole::parse("reviewer", "Reviewer", ["tasks.view"]).unwrap())
            .unwrap();
        store.assign_role(&user, &reviewer).unwrap();

        assert_eq!(
            guard.authorize_user(&user, &["tasks.delete"]).unwrap(),
            Decision::Deny {
                missing: PermissionToken::new("tasks.delete")
            }
        );
        assert!(guard.authorize_user(&user, &["tasks.view"]).unwrap().is_allowed());
    }

    #[test]
    fn test_cached_guard_sees_name_reused_after_rename() {
        let store = Arc::new(InMemoryRoleStore::new());
        let guard = AuthorizationGuard::new(store.clone())
            .with_cache(Arc::new(PermissionCache::new(16)))
            .without_audit();
        let user = UserId::from("u1");
        let lead = RoleName::parse("lead").unwrap();

        store
            .create_role(NewRole::parse("lead", "Lead", ["projects.delete"]).unwrap())
            .unwrap();
        store.assign_role(&user, &lead).unwrap();
        assert!(guard.authorize_user(&user, &["projects.delete"]).unwrap().is_allowed());

        store
            .rename_role(&lead, RoleName::parse("senior_lead").unwrap())
            .unwrap();
        store
            .create_role(NewRole::parse("lead", "Lead", ["projects.view"]).unwrap())
            .unwrap();
        store.revoke_role(&user, &RoleName::parse("senior_lead").unwrap()).unwrap();
        store.assign_role(&user, &lead).unwrap();

        assert!(!guard.authorize_user(&user, &["projects.delete"]).unwrap().is_allowed());
        assert!(guard.authorize_user(&user, &["projects.view"]).unwrap().is_allowed());
    }

    #[test]
    fn test_request_state_machine() {
        let guard = guard();
        let mut request = guard.begin_request();
        assert_eq!(request.state(), RequestState::Unauthenticated);

        // Public checks do not need a caller.
        assert!(request.require_operation("health_check").is_allowed());
        assert_eq!(request.state(), RequestState::Unauthenticated);

        // Anything else is denied without a caller.
        assert!(!request.require(&["tasks.view"]).is_allowed());
        assert_eq!(request.state(), RequestState::Denied);

        request.authenticate(Identity::new("u1", scenario_roles()));
        assert_eq!(request.state(), RequestState::Authenticated);

        assert!(request.require(&["tasks.create", "tasks.view"]).is_allowed());
        assert_eq!(request.state(), RequestState::Authorized);

        assert!(!request.require(&["tasks.delete"]).is_allowed());
        assert_eq!(request.state(), RequestState::Denied);

        // Denied is sticky for the rest of the request.
        assert!(request.require(&["tasks.view"]).is_allowed());
        assert_eq!(request.state(), RequestState::Denied);
    }

    #[test]
    fn test_request_snapshot_is_stable() {
        let store = Arc::new(InMemoryRoleStore::with_default_roles());
        let guard = AuthorizationGuard::new(store.clone()).without_audit();
        let user = UserId::from("u1");
        let guest = RoleName::parse("guest").unwrap();
        store.assign_role(&user, &guest).unwrap();

        let mut request = guard.begin_request();
        request.authenticate(Identity::load(store.as_ref(), user).unwrap());
        assert!(request.require(&["tasks.view"]).is_allowed());

        // A mid-request role edit does not change this request's answers.
        store
            .update_role(&guest, RoleUpdate::new().permissions(Grants::none()))
            .unwrap();
        assert!(request.require(&["tasks.view"]).is_allowed());
        assert!(request.require(&["tasks.view", "projects.view"]).is_allowed());
    }
}

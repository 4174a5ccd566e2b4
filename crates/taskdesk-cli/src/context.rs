//! Builds the role store and authorization guard from configuration.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use taskdesk_config::{ConfigLoader, TaskdeskConfig};
use taskdesk_rbac::codec::RoleRecord;
use taskdesk_rbac::{
    AuthorizationGuard, InMemoryRoleStore, PermissionAggregator, PermissionCache, RbacError,
    RoleStore, RoleUpdate,
};
use taskdesk_types::{RoleName, UserId};
use tracing::{debug, warn};

/// Everything a command needs, seeded from one configuration.
pub struct AppContext {
    pub config: TaskdeskConfig,
    pub store: Arc<InMemoryRoleStore>,
    pub guard: AuthorizationGuard,
}

impl AppContext {
    pub fn load(project: &Path) -> Result<Self> {
        let config = ConfigLoader::new()
            .with_project_dir(project)
            .load()
            .context("Failed to load configuration")?;
        Self::from_config(config)
    }

    pub fn from_config(config: TaskdeskConfig) -> Result<Self> {
        let store = Arc::new(seed_store(&config)?);

        let super_role = RoleName::parse(&config.rbac.super_role)
            .context("Invalid rbac.super_role")?;
        let mut guard = AuthorizationGuard::new(store.clone())
            .with_aggregator(PermissionAggregator::with_super_role(super_role))
            .with_cache(Arc::new(PermissionCache::new(config.rbac.cache_capacity)));
        if !config.rbac.audit {
            guard = guard.without_audit();
        }

        Ok(Self {
            config,
            store,
            guard,
        })
    }
}

/// Installs built-in roles (unless disabled), then configured roles, then
/// assignments.
///
/// A configured role with the name of an existing one replaces its display
/// name and permissions. Its `system` flag is ignored with a warning.
pub fn seed_store(config: &TaskdeskConfig) -> Result<InMemoryRoleStore> {
    let store = if config.rbac.default_roles {
        InMemoryRoleStore::with_default_roles()
    } else {
        InMemoryRoleStore::new()
    };

    for seed in &config.roles {
        let record = RoleRecord {
            name: seed.name.clone(),
            display_name: seed.display_name().to_string(),
            permissions: seed.permissions.clone(),
            is_system: seed.system,
        };
        let role = record
            .into_new_role()
            .with_context(|| format!("Invalid role '{}' in configuration", seed.name))?;

        match store.get_role(&role.name) {
            Ok(existing) => {
                if existing.is_system() != role.is_system {
                    warn!(
                        role = %role.name,
                        configured = role.is_system,
                        kept = existing.is_system(),
                        "System flag of an existing role cannot change; ignoring it"
                    );
                }
                debug!(role = %role.name, "Overriding role from configuration");
                let update = RoleUpdate::new()
                    .display_name(role.display_name)
                    .permissions(role.permissions);
                store.update_role(&role.name, update)?;
            }
            Err(RbacError::RoleNotFound(_)) => {
                store.create_role(role)?;
            }
            Err(e) => return Err(e.into()),
        }
    }

    for assignment in &config.assignments {
        let user = UserId::from(assignment.user.as_str());
        for raw in &assignment.roles {
            let name = RoleName::parse(raw)
                .with_context(|| format!("Invalid role name '{raw}' assigned to {user}"))?;
            store
                .assign_role(&user, &name)
                .with_context(|| format!("Cannot assign '{name}' to {user}"))?;
        }
    }

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdesk_config::{AssignmentSeed, RoleSeed};

    fn seed(name: &str, permissions: &str) -> RoleSeed {
        RoleSeed {
            name: name.to_string(),
            display_name: String::new(),
            permissions: permissions.to_string(),
            system: false,
        }
    }

    #[test]
    fn test_seed_defaults_and_custom_roles() {
        let mut config = TaskdeskConfig::default();
        config.roles.push(seed("Reporter", "reports.view, reports.export"));
        config.assignments.push(AssignmentSeed {
            user: "alice".to_string(),
            roles: vec!["reporter".to_string(), "guest".to_string()],
        });

        let store = seed_store(&config).unwrap();
        let reporter = store.get_role(&RoleName::parse("reporter").unwrap()).unwrap();
        assert_eq!(reporter.display_name(), "Reporter");
        assert!(reporter.permissions().allows("reports.export"));
        assert_eq!(store.list_roles().unwrap().len(), 6);
        assert_eq!(store.roles_for_user(&UserId::from("alice")).unwrap().len(), 2);
    }

    #[test]
    fn test_seed_overrides_builtin() {
        let mut config = TaskdeskConfig::default();
        config.roles.push(seed("guest", "tasks.view"));

        let store = seed_store(&config).unwrap();
        let guest = store.get_role(&RoleName::parse("guest").unwrap()).unwrap();
        assert!(guest.permissions().allows("tasks.view"));
        assert!(!guest.permissions().allows("projects.view"));
    }

    #[test]
    fn test_seed_override_keeps_system_flag() {
        let mut config = TaskdeskConfig::default();
        let mut admin = seed("admin", "tasks.view");
        admin.system = false;
        config.roles.push(admin);
        let mut guest = seed("guest", "tasks.view");
        guest.system = true;
        config.roles.push(guest);

        let store = seed_store(&config).unwrap();
        let admin = store.get_role(&RoleName::parse("admin").unwrap()).unwrap();
        assert!(admin.is_system());
        assert_eq!(admin.permissions().len(), 1);
        assert!(!store.get_role(&RoleName::parse("guest").unwrap()).unwrap().is_system());
        assert!(store.delete_role(&RoleName::parse("admin").unwrap()).is_err());
    }

    #[test]
    fn test_seed_rejects_malformed_token() {
        let mut config = TaskdeskConfig::default();
        config.roles.push(seed("reporter", "reports.view, reports export"));
        assert!(seed_store(&config).is_err());
    }

    #[test]
    fn test_seed_without_defaults() {
        let mut config = TaskdeskConfig::default();
        config.rbac.default_roles = false;
        config.roles.push(seed("owner", "*"));

        let store = seed_store(&config).unwrap();
        let roles = store.list_roles().unwrap();
        assert_eq!(roles.len(), 1);
        assert!(roles[0].grants_all());
    }

    #[test]
    fn test_assignment_to_unknown_role_fails() {
        let mut config = TaskdeskConfig::default();
        config.assignments.push(AssignmentSeed {
            user: "bob".to_string(),
            roles: vec!["ghost".to_string()],
        });
        assert!(seed_store(&config).is_err());
    }

    #[test]
    fn test_custom_super_role() {
        let mut config = TaskdeskConfig::default();
        config.rbac.super_role = "owner".to_string();
        config.rbac.audit = false;
        config.roles.push(seed("owner", ""));
        config.assignments.push(AssignmentSeed {
            user: "carol".to_string(),
            roles: vec!["owner".to_string()],
        });

        let ctx = AppContext::from_config(config).unwrap();
        let decision = ctx
            .guard
            .authorize_user(&UserId::from("carol"), &["roles.manage"])
            .unwrap();
        assert!(decision.is_allowed());
    }
}

//! Shared cache of resolved permissions.
//!
//! Entries are keyed by a [`RoleSignature`]: the sorted `(name, revision)`
//! pairs of the roles being aggregated. Every role construction, update and
//! rename draws a fresh revision, so a mutated or re-created role always
//! produces a new key and stale entries are never served.
//! [`PermissionCache::invalidate_role`] reclaims the memory they hold.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use taskdesk_types::RoleName;
use tracing::debug;

use crate::aggregator::{EffectivePermissions, PermissionAggregator};
use crate::roles::Role;

/// Default number of distinct role sets kept in the cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Identity of a role set for caching purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleSignature(Vec<(RoleName, u64)>);

impl RoleSignature {
    /// Computes the signature of a role set. Order and duplicates are
    /// ignored.
    pub fn of<'a, I>(roles: I) -> Self
    where
        I: IntoIterator<Item = &'a Role>,
    {
        let mut entries: Vec<(RoleName, u64)> = roles
            .into_iter()
            .map(|role| (role.name().clone(), role.revision()))
            .collect();
        entries.sort();
        entries.dedup();
        Self(entries)
    }

    /// Returns whether a role with this name participates in the signature.
    pub fn contains(&self, name: &RoleName) -> bool {
        self.0.iter().any(|(held, _)| held == name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Bounded, thread-safe cache of [`EffectivePermissions`].
///
/// When full, the cache is cleared wholesale before inserting. A poisoned
/// lock degrades to uncached resolution.
#[derive(Debug)]
pub struct PermissionCache {
    entries: RwLock<HashMap<RoleSignature, EffectivePermissions>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PermissionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the cached resolution for `roles`, computing it on a miss.
    pub fn resolve(&self, aggregator: &PermissionAggregator, roles: &[Role]) -> EffectivePermissions {
        let signature = RoleSignature::of(roles);

        if let Ok(entries) = self.entries.read() {
            if let Some(hit) = entries.get(&signature) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return hit.clone();
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let effective = aggregator.resolve(roles);

        if let Ok(mut entries) = self.entries.write() {
            if entries.len() >= self.capacity {
                debug!(capacity = self.capacity, "Permission cache full, clearing");
                entries.clear();
            }
            entries.insert(signature, effective.clone());
        }

        effective
    }

    /// Drops every entry whose role set includes `name`.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_role(&self, name: &RoleName) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };

        let before = entries.len();
        entries.retain(|signature, _| !signature.contains(name));
        let removed = before - entries.len();

        if removed > 0 {
            debug!(role = %name, removed, "Invalidated cached permissions");
        }
        removed
    }

    /// Drops every entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.read().map(|e| e.len()).unwrap_or(0),
        }
    }
}

impl Default for PermissionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Grants;
    use crate::roles::{NewRole, RoleUpdate};
    use crate::store::{InMemoryRoleStore, RoleStore};

    fn name(raw: &str) -> RoleName {
        RoleName::parse(raw).unwrap()
    }

    fn role(raw: &str, perms: &[&str]) -> Role {
        Role::from(NewRole::parse(raw, raw, perms).unwrap())
    }

    #[test]
    fn test_signature_ignores_order_and_duplicates() {
        let a = role("alpha", &["x.y"]);
        let b = role("beta", &[]);

        assert_eq!(
            RoleSignature::of([&a, &b]),
            RoleSignature::of([&b, &a, &b])
        );
        assert!(RoleSignature::of([&a]).contains(&name("alpha")));
        assert!(!RoleSignature::of([&a]).contains(&name("beta")));
    }

    #[test]
    fn test_cache_hit_and_miss() {
        let cache = PermissionCache::new(8);
        let aggregator = PermissionAggregator::new();
        let roles = vec![role("guest", &["tasks.view"])];

        let first = cache.resolve(&aggregator, &roles);
        let second = cache.resolve(&aggregator, &roles);

        assert_eq!(first, second);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                entries: 1,
            }
        );
    }

    #[test]
    fn test_role_update_changes_signature() {
        let store = InMemoryRoleStore::with_default_roles();
        let cache = PermissionCache::default();
        let aggregator = PermissionAggregator::new();

        let before = vec![store.get_role(&name("guest")).unwrap()];
        assert!(!cache.resolve(&aggregator, &before).has("tasks.delete"));

        store
            .update_role(
                &name("guest"),
                RoleUpdate::new().permissions(Grants::from_tokens(["tasks.delete"])),
            )
            .unwrap();

        let after = vec![store.get_role(&name("guest")).unwrap()];
        assert!(cache.resolve(&aggregator, &after).has("tasks.delete"));
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_invalidate_role() {
        let cache = PermissionCache::default();
        let aggregator = PermissionAggregator::new();
        let guest = role("guest", &["tasks.view"]);
        let member = role("member", &["tasks.create"]);

        cache.resolve(&aggregator, &[guest.clone()]);
        cache.resolve(&aggregator, &[guest.clone(), member.clone()]);
        cache.resolve(&aggregator, &[member.clone()]);

        assert_eq!(cache.invalidate_role(&name("guest")), 2);
        assert_eq!(cache.stats().entries, 1);
        assert_eq!(cache.invalidate_role(&name("guest")), 0);

        cache.clear();
        assert_eq!(cache.stats().entries, 0);
    }

    #[test]
    fn test_capacity_bound() {
        let cache = PermissionCache::new(2);
        let aggregator = PermissionAggregator::new();

        for i in 0..5 {
            cache.resolve(&aggregator, &[role(&format!("r{i}"), &[])]);
            assert!(cache.stats().entries <= 2);
        }
    }
}

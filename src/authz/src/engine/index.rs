//! In-memory policy index
//!
//! Materializes, per user, the union of the permissions reachable through the
//! user's roles so that a decision is a scan over one small set. Every
//! mutation recomputes only the users it can affect.

use crate::config::PermissionPropagation;
use crate::matcher::{ActionPattern, ResourcePattern};
use crate::types::{Permission, PermissionId, Role, RoleId, User, ADMIN_ROLE_ID, ADMIN_ROLE_NAME};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

/// Outcome of a lookup, kept for logging and metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// User holds the admin role
    AdminBypass,
    /// Granted by the given permission
    Granted(PermissionId),
    /// No matching permission, or unknown user
    Denied,
}

impl Verdict {
    pub(crate) fn is_allowed(&self) -> bool {
        !matches!(self, Verdict::Denied)
    }
}

/// Permission with its patterns compiled at index time
#[derive(Debug, Clone)]
struct IndexedPermission {
    id: PermissionId,
    resource: ResourcePattern,
    action: ActionPattern,
}

impl IndexedPermission {
    fn new(permission: &Permission) -> Self {
        Self {
            id: permission.id,
            resource: ResourcePattern::compile(&permission.resource),
            action: ActionPattern::compile(&permission.action),
        }
    }

    fn grants(&self, resource: &str, action: &str) -> bool {
        self.resource.matches(resource) && self.action.matches(action)
    }
}

/// Cached view of one user
#[derive(Debug, Clone, Default)]
struct ResolvedUser {
    has_admin_role: bool,
    roles: Vec<RoleId>,
    permissions: HashMap<PermissionId, IndexedPermission>,
}

/// Counts reported after a full build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct IndexStats {
    pub users: usize,
    pub roles: usize,
    pub permissions: usize,
}

/// Index over the user → role → permission graph
#[derive(Debug)]
pub(crate) struct PolicyIndex {
    propagation: PermissionPropagation,
    permissions: HashMap<PermissionId, IndexedPermission>,
    role_permissions: HashMap<RoleId, HashSet<PermissionId>>,
    role_names: HashMap<RoleId, String>,
    users: HashMap<String, ResolvedUser>,
}

impl PolicyIndex {
    pub(crate) fn new(propagation: PermissionPropagation) -> Self {
        Self {
            propagation,
            permissions: HashMap::new(),
            role_permissions: HashMap::new(),
            role_names: HashMap::new(),
            users: HashMap::new(),
        }
    }

    /// Build a fresh index from a full snapshot of the store
    pub(crate) fn build(
        propagation: PermissionPropagation,
        users: Vec<User>,
        roles: Vec<Role>,
        permissions: Vec<Permission>,
    ) -> Self {
        let mut index = Self::new(propagation);
        index.init(users, roles, permissions);
        index
    }

    /// Populate the index from a full snapshot
    pub(crate) fn init(&mut self, users: Vec<User>, roles: Vec<Role>, permissions: Vec<Permission>) {
        for permission in &permissions {
            self.permissions.insert(permission.id, IndexedPermission::new(permission));
        }

        let mut dangling_grants = 0usize;
        for role in roles {
            let granted: HashSet<PermissionId> = role.permission_ids.into_iter().collect();
            dangling_grants += self.missing_permissions(&granted);
            self.role_permissions.insert(role.id, granted);
            self.role_names.insert(role.id, role.name);
        }

        let mut dangling_roles = 0usize;
        for user in users {
            dangling_roles += self.missing_roles(&user.roles);
            let resolved = self.resolve(user.roles);
            self.users.insert(user.name, resolved);
        }

        if dangling_grants > 0 || dangling_roles > 0 {
            warn!(
                "Policy references missing entries: {} role grants to unknown permissions, \
                 {} user assignments to unknown roles",
                dangling_grants, dangling_roles
            );
        }
    }

    /// Discard all state and rebuild from a full snapshot
    pub(crate) fn refresh(&mut self, users: Vec<User>, roles: Vec<Role>, permissions: Vec<Permission>) {
        *self = Self::build(self.propagation, users, roles, permissions);
    }

    pub(crate) fn stats(&self) -> IndexStats {
        IndexStats {
            users: self.users.len(),
            roles: self.role_permissions.len(),
            permissions: self.permissions.len(),
        }
    }

    #[cfg(test)]
    pub(crate) fn has_permission(&self, user: &str, resource: &str, action: &str) -> bool {
        self.check(user, resource, action).is_allowed()
    }

    pub(crate) fn check(&self, user: &str, resource: &str, action: &str) -> Verdict {
        let Some(cache) = self.users.get(user) else {
            return Verdict::Denied;
        };

        if cache.has_admin_role {
            return Verdict::AdminBypass;
        }

        cache
            .permissions
            .values()
            .find(|p| p.grants(resource, action))
            .map(|p| Verdict::Granted(p.id))
            .unwrap_or(Verdict::Denied)
    }

    /// Register or rename a role without touching its grants
    pub(crate) fn set_role_name(&mut self, id: RoleId, name: impl Into<String>) {
        self.role_names.insert(id, name.into());
    }

    /// Replace the grants of a role and recompute every user holding it
    pub(crate) fn update_role(&mut self, id: RoleId, permission_ids: impl IntoIterator<Item = PermissionId>) {
        let granted: HashSet<PermissionId> = permission_ids.into_iter().collect();
        let dangling = self.missing_permissions(&granted);
        if dangling > 0 {
            warn!("Role {} grants {} unknown permissions", id, dangling);
        }
        self.role_permissions.insert(id, granted);

        let affected = self.users_holding(id);
        debug!("Role {} updated, recomputing {} users", id, affected.len());
        for name in affected {
            self.recompute_user(&name);
        }
    }

    /// Forget a role and strip it from every user holding it
    pub(crate) fn remove_role(&mut self, id: RoleId) {
        self.role_permissions.remove(&id);
        self.role_names.remove(&id);

        let affected = self.users_holding(id);
        debug!("Role {} removed, recomputing {} users", id, affected.len());
        for name in affected {
            if let Some(cache) = self.users.get_mut(&name) {
                cache.roles.retain(|r| *r != id);
            }
            self.recompute_user(&name);
        }
    }

    /// Set the roles of a user, indexing the user if it is new
    pub(crate) fn update_user(&mut self, name: &str, roles: Vec<RoleId>) {
        let dangling = self.missing_roles(&roles);
        if dangling > 0 {
            warn!("User '{}' assigned {} unknown roles", name, dangling);
        }
        let resolved = self.resolve(roles);
        self.users.insert(name.to_string(), resolved);
    }

    pub(crate) fn remove_user(&mut self, name: &str) {
        self.users.remove(name);
    }

    /// Recompute every user's resolved set from the current maps
    pub(crate) fn refresh_all_users(&mut self) {
        let names: Vec<String> = self.users.keys().cloned().collect();
        for name in names {
            self.recompute_user(&name);
        }
    }

    pub(crate) fn add_permission(&mut self, permission: Permission) {
        self.upsert_permission(permission);
    }

    pub(crate) fn update_permission(&mut self, permission: Permission) {
        self.upsert_permission(permission);
    }

    /// Forget a permission and drop it from every role granting it
    pub(crate) fn remove_permission(&mut self, id: PermissionId) {
        self.permissions.remove(&id);
        for granted in self.role_permissions.values_mut() {
            granted.remove(&id);
        }
        self.propagate_permission_change();
    }

    /// Display names of the roles a user holds, in assignment order
    pub(crate) fn user_role_names(&self, name: &str) -> Vec<String> {
        let Some(cache) = self.users.get(name) else {
            return Vec::new();
        };

        cache
            .roles
            .iter()
            .filter_map(|id| {
                if *id == ADMIN_ROLE_ID {
                    Some(ADMIN_ROLE_NAME.to_string())
                } else {
                    self.role_names.get(id).cloned()
                }
            })
            .collect()
    }

    /// Ids in a user's resolved set, `None` for an unknown user
    pub(crate) fn resolved_permission_ids(&self, name: &str) -> Option<BTreeSet<PermissionId>> {
        self.users
            .get(name)
            .map(|cache| cache.permissions.keys().copied().collect())
    }

    fn upsert_permission(&mut self, permission: Permission) {
        self.permissions.insert(permission.id, IndexedPermission::new(&permission));
        self.propagate_permission_change();
    }

    /// Grants naming a permission the index does not hold
    fn missing_permissions(&self, granted: &HashSet<PermissionId>) -> usize {
        granted
            .iter()
            .filter(|id| !self.permissions.contains_key(id))
            .count()
    }

    /// Assignments naming a role the index does not hold, admin excluded
    fn missing_roles(&self, roles: &[RoleId]) -> usize {
        roles
            .iter()
            .filter(|r| **r != ADMIN_ROLE_ID && !self.role_permissions.contains_key(r))
            .count()
    }

    fn propagate_permission_change(&mut self) {
        match self.propagation {
            PermissionPropagation::Eager => self.refresh_all_users(),
            PermissionPropagation::Lazy => {
                debug!("Lazy propagation: cached user permissions kept until refresh");
            }
        }
    }

    fn users_holding(&self, role: RoleId) -> Vec<String> {
        self.users
            .iter()
            .filter(|(_, cache)| cache.roles.contains(&role))
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn recompute_user(&mut self, name: &str) {
        let Some(roles) = self.users.get(name).map(|cache| cache.roles.clone()) else {
            return;
        };
        let resolved = self.resolve(roles);
        self.users.insert(name.to_string(), resolved);
    }

    fn resolve(&self, roles: Vec<RoleId>) -> ResolvedUser {
        let mut permissions = HashMap::new();
        for role in &roles {
            let Some(granted) = self.role_permissions.get(role) else {
                continue;
            };
            for id in granted {
                if let Some(permission) = self.permissions.get(id) {
                    permissions.insert(*id, permission.clone());
                }
            }
        }

        ResolvedUser {
            has_admin_role: roles.contains(&ADMIN_ROLE_ID),
            roles,
            permissions,
        }
    }
}

//! Synchronized enforcer
//!
//! Combines the in-memory policy index with a [`PolicyStore`].
//! Every mutation writes the store first and then applies the matching
//! incremental update to the index while still holding the write lock, so a
//! reader never sees the store and the index disagree about a completed
//! write, and a failed store write never reaches the index.
//!
//! # Architecture
//!
//! ```text
//! admin layer ──► Enforcer ──(write lock)──► PolicyStore ──► PolicyIndex
//! request     ──► Enforcer ──(read lock)───────────────────► PolicyIndex
//! ```

mod index;
pub mod metrics;

pub use metrics::{EnforcerMetrics, MetricsCollector};

use self::index::{PolicyIndex, Verdict};
use crate::config::EnforcerConfig;
use crate::error::{AuthzError, Result};
use crate::policy::PolicyStore;
use crate::types::{Permission, PermissionId, Role, RoleId, RolePage, User, UserId};

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Role-based enforcer with a write-through policy cache
///
/// Construct once at startup and share it by `Arc` with every request
/// handler.
pub struct Enforcer {
    /// Durable policy storage
    store: Arc<dyn PolicyStore>,

    /// Cached policy graph; the only state `enforce` reads
    index: RwLock<PolicyIndex>,

    /// Decision counters
    metrics: Option<MetricsCollector>,

    config: EnforcerConfig,
}

impl Enforcer {
    /// Create an enforcer with an empty index
    ///
    /// Every request is denied until [`Enforcer::load_policy`] succeeds.
    pub fn new(config: EnforcerConfig, store: Arc<dyn PolicyStore>) -> Self {
        let metrics = config.enable_metrics.then(MetricsCollector::new);

        info!(
            "Enforcer initialized with propagation={}, metrics={}",
            config.propagation, config.enable_metrics
        );

        Self {
            store,
            index: RwLock::new(PolicyIndex::new(config.propagation)),
            metrics,
            config,
        }
    }

    /// Create an enforcer and load the full policy from the store
    pub async fn with_loaded_policy(config: EnforcerConfig, store: Arc<dyn PolicyStore>) -> Result<Self> {
        let enforcer = Self::new(config, store);
        enforcer.load_policy().await?;
        Ok(enforcer)
    }

    pub fn config(&self) -> &EnforcerConfig {
        &self.config
    }

    /// Get enforcer metrics, `None` when disabled
    pub fn metrics(&self) -> Option<EnforcerMetrics> {
        self.metrics.as_ref().map(MetricsCollector::snapshot)
    }

    /// Load users, roles and permissions from the store and index them
    ///
    /// On failure the previous index is kept as is.
    pub async fn load_policy(&self) -> Result<()> {
        let mut index = self.index.write().await;
        let (users, roles, permissions) = self.fetch_all().await?;

        let mut loaded = PolicyIndex::new(self.config.propagation);
        loaded.init(users, roles, permissions);
        *index = loaded;

        let stats = index.stats();
        info!(
            "Policy loaded: {} users, {} roles, {} permissions",
            stats.users, stats.roles, stats.permissions
        );
        Ok(())
    }

    /// Re-read the full policy and rebuild the index
    ///
    /// Recovers from drift, and applies permission edits made under
    /// [`crate::PermissionPropagation::Lazy`].
    pub async fn refresh_policy(&self) -> Result<()> {
        let mut index = self.index.write().await;
        let (users, roles, permissions) = self.fetch_all().await?;

        index.refresh(users, roles, permissions);

        let stats = index.stats();
        info!(
            "Policy refreshed: {} users, {} roles, {} permissions",
            stats.users, stats.roles, stats.permissions
        );
        Ok(())
    }

    /// Decide whether `user` may perform `action` on `resource`
    ///
    /// Unknown users are denied. Never touches the store.
    pub async fn enforce(&self, user: &str, resource: &str, action: &str) -> bool {
        let verdict = self.index.read().await.check(user, resource, action);

        debug!(
            "Decision for user={}, resource={}, action={}: {:?}",
            user, resource, action, verdict
        );

        if let Some(metrics) = &self.metrics {
            metrics.record_decision(verdict.is_allowed(), verdict == Verdict::AdminBypass);
        }

        verdict.is_allowed()
    }

    /// Names of the roles a user holds, the admin role reported as `admin`
    pub async fn get_roles_for_user(&self, name: &str) -> Vec<String> {
        self.index.read().await.user_role_names(name)
    }

    /// Ids of the permissions currently cached for a user, sorted
    ///
    /// `None` when the user is not indexed. Admin users report only the
    /// permissions their other roles grant.
    pub async fn resolved_permissions(&self, name: &str) -> Option<Vec<PermissionId>> {
        self.index
            .read()
            .await
            .resolved_permission_ids(name)
            .map(|ids| ids.into_iter().collect())
    }

    /// Create a role with its initial permissions
    pub async fn create_role(&self, role: Role) -> Result<()> {
        let mut index = self.index.write().await;
        self.store
            .create_role(&role)
            .await
            .map_err(|e| self.store_failed("create_role", e))?;

        index.set_role_name(role.id, role.name.clone());
        index.update_role(role.id, role.permission_ids.iter().copied());
        self.mutated();

        info!("Role {} '{}' created with {} permissions", role.id, role.name, role.permission_ids.len());
        Ok(())
    }

    /// Replace the permissions granted by a role
    pub async fn save_role(&self, id: RoleId, permission_ids: Vec<PermissionId>) -> Result<()> {
        let mut index = self.index.write().await;
        self.store
            .replace_role_permissions(id, &permission_ids)
            .await
            .map_err(|e| self.store_failed("save_role", e))?;

        let count = permission_ids.len();
        index.update_role(id, permission_ids);
        self.mutated();

        info!("Role {} saved with {} permissions", id, count);
        Ok(())
    }

    /// Delete a role and revoke it from every user holding it
    pub async fn delete_role(&self, id: RoleId) -> Result<()> {
        let mut index = self.index.write().await;
        self.store
            .delete_role(id)
            .await
            .map_err(|e| self.store_failed("delete_role", e))?;

        index.remove_role(id);
        self.mutated();

        info!("Role {} deleted", id);
        Ok(())
    }

    /// Create a permission
    pub async fn create_permission(&self, permission: Permission) -> Result<()> {
        let mut index = self.index.write().await;
        self.store
            .create_permission(&permission)
            .await
            .map_err(|e| self.store_failed("create_permission", e))?;

        info!(
            "Permission {} '{}' created: {} {}",
            permission.id, permission.name, permission.action, permission.resource
        );
        index.add_permission(permission);
        self.mutated();
        Ok(())
    }

    /// Overwrite the patterns or name of an existing permission
    pub async fn update_permission(&self, permission: Permission) -> Result<()> {
        let mut index = self.index.write().await;
        self.store
            .update_permission(&permission)
            .await
            .map_err(|e| self.store_failed("update_permission", e))?;

        info!(
            "Permission {} '{}' updated: {} {}",
            permission.id, permission.name, permission.action, permission.resource
        );
        index.update_permission(permission);
        self.mutated();
        Ok(())
    }

    /// Delete a permission
    pub async fn delete_permission(&self, id: PermissionId) -> Result<()> {
        let mut index = self.index.write().await;
        self.store
            .delete_permission(id)
            .await
            .map_err(|e| self.store_failed("delete_permission", e))?;

        index.remove_permission(id);
        self.mutated();

        info!("Permission {} deleted", id);
        Ok(())
    }

    /// Assign roles to a user, creating the user if needed
    pub async fn save_user(&self, name: &str, role_ids: Vec<RoleId>) -> Result<User> {
        let mut index = self.index.write().await;
        let user = self
            .store
            .upsert_user_roles(name, &role_ids)
            .await
            .map_err(|e| self.store_failed("save_user", e))?;

        index.update_user(name, role_ids);
        self.mutated();

        info!("User '{}' saved with roles {:?}", name, user.roles);
        Ok(user)
    }

    /// Delete a user; later requests on its behalf are denied
    pub async fn delete_user(&self, name: &str) -> Result<()> {
        let mut index = self.index.write().await;
        self.store
            .delete_user(name)
            .await
            .map_err(|e| self.store_failed("delete_user", e))?;

        index.remove_user(name);
        self.mutated();

        info!("User '{}' deleted", name);
        Ok(())
    }

    /// Get a role from the store
    pub async fn get_role(&self, id: RoleId) -> Result<Role> {
        self.store
            .find_role(id)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("role {}", id)))
    }

    /// Get one page of roles from the store
    pub async fn get_roles(&self, offset: usize, limit: usize) -> Result<RolePage> {
        self.store.find_roles_page(offset, limit).await
    }

    /// Get every role from the store
    pub async fn get_all_roles(&self) -> Result<Vec<Role>> {
        self.store.find_all_roles().await
    }

    /// Get every permission from the store
    pub async fn get_permissions(&self) -> Result<Vec<Permission>> {
        self.store.find_permissions().await
    }

    /// Get a user from the store
    pub async fn get_user(&self, id: UserId) -> Result<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| AuthzError::NotFound(format!("user {}", id)))
    }

    // Private helper methods

    async fn fetch_all(&self) -> Result<(Vec<User>, Vec<Role>, Vec<Permission>)> {
        tokio::try_join!(
            self.store.find_all_users(),
            self.store.find_all_roles(),
            self.store.find_all_permissions(),
        )
        .map_err(|e| self.store_failed("load_policy", e))
    }

    fn store_failed(&self, operation: &str, error: AuthzError) -> AuthzError {
        warn!("Policy store call '{}' failed, index unchanged: {}", operation, error);
        if let Some(metrics) = &self.metrics {
            metrics.record_store_failure();
        }
        error
    }

    fn mutated(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_mutation();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::InMemoryPolicyStore;

    #[tokio::test]
    async fn test_enforcer_creation() {
        let store = Arc::new(InMemoryPolicyStore::new());
        let enforcer = Enforcer::new(EnforcerConfig::default(), store);

        assert!(enforcer.metrics().is_some());
        assert!(!enforcer.enforce("alice", "/docs/1", "GET").await);
    }

    #[tokio::test]
    async fn test_metrics_disabled() {
        let config = EnforcerConfig {
            enable_metrics: false,
            ..Default::default()
        };
        let enforcer = Enforcer::new(config, Arc::new(InMemoryPolicyStore::new()));

        enforcer.enforce("alice", "/", "GET").await;
        assert!(enforcer.metrics().is_none());
    }

    #[tokio::test]
    async fn test_decisions_counted() {
        let store = Arc::new(InMemoryPolicyStore::with_policy(
            vec![User::new(1, "root", vec![crate::types::ADMIN_ROLE_ID])],
            vec![],
            vec![],
        ));
        let enforcer = Enforcer::with_loaded_policy(EnforcerConfig::default(), store)
            .await
            .unwrap();

        assert!(enforcer.enforce("root", "/x", "DELETE").await);
        assert!(!enforcer.enforce("guest", "/x", "GET").await);

        let metrics = enforcer.metrics().unwrap();
        assert_eq!(metrics.allowed_decisions, 1);
        assert_eq!(metrics.denied_decisions, 1);
        assert_eq!(metrics.admin_bypasses, 1);
    }

    #[tokio::test]
    async fn test_not_found_lookups() {
        let enforcer = Enforcer::new(EnforcerConfig::default(), Arc::new(InMemoryPolicyStore::new()));

        assert!(matches!(enforcer.get_role(9).await, Err(AuthzError::NotFound(_))));
        assert!(matches!(enforcer.get_user(9).await, Err(AuthzError::NotFound(_))));
    }
}

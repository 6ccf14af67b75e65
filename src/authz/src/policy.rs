//! Policy storage
//!
//! [`PolicyStore`] is the narrow interface the [`crate::Enforcer`] uses to
//! reach the durable role/permission/user graph. Implementations map their
//! backend failures to [`AuthzError::StoreUnavailable`] and missing rows to
//! `Ok(None)` or [`AuthzError::NotFound`].

use crate::error::{AuthzError, Result};
use crate::types::{Permission, PermissionId, Role, RoleId, RolePage, User, UserId};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "postgres")]
pub use postgres::PostgresPolicyStore;

/// Policy store trait
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// List every user with its role ids
    async fn find_all_users(&self) -> Result<Vec<User>>;

    /// List every role with the ids of the permissions it grants
    async fn find_all_roles(&self) -> Result<Vec<Role>>;

    /// List every permission
    async fn find_all_permissions(&self) -> Result<Vec<Permission>>;

    /// Insert a new role together with its permission associations
    async fn create_role(&self, role: &Role) -> Result<()>;

    /// Replace the permission associations of an existing role
    async fn replace_role_permissions(&self, id: RoleId, permission_ids: &[PermissionId]) -> Result<()>;

    /// Delete a role, its permission associations and its user assignments
    async fn delete_role(&self, id: RoleId) -> Result<()>;

    /// Insert a new permission
    async fn create_permission(&self, permission: &Permission) -> Result<()>;

    /// Overwrite an existing permission by id
    async fn update_permission(&self, permission: &Permission) -> Result<()>;

    /// Delete a permission and its role associations
    async fn delete_permission(&self, id: PermissionId) -> Result<()>;

    /// Insert the user if missing and set its role ids
    async fn upsert_user_roles(&self, name: &str, role_ids: &[RoleId]) -> Result<User>;

    /// Delete a user by name
    async fn delete_user(&self, name: &str) -> Result<()>;

    /// Get a role by id
    async fn find_role(&self, id: RoleId) -> Result<Option<Role>>;

    /// Get roles ordered by id, starting at `offset`, at most `limit` of them
    async fn find_roles_page(&self, offset: usize, limit: usize) -> Result<RolePage>;

    /// List permissions for administrative display
    async fn find_permissions(&self) -> Result<Vec<Permission>>;

    /// Get a user by store id
    async fn find_user(&self, id: UserId) -> Result<Option<User>>;
}

#[derive(Default)]
struct StoreState {
    permissions: BTreeMap<PermissionId, Permission>,
    roles: BTreeMap<RoleId, Role>,
    users: BTreeMap<UserId, User>,
    next_user_id: UserId,
}

impl StoreState {
    fn user_by_name_mut(&mut self, name: &str) -> Option<&mut User> {
        self.users.values_mut().find(|u| u.name == name)
    }
}

/// In-memory policy store implementation
///
/// Applies the same referential clean-up a relational store does: deleting
/// a role strips it from users, deleting a permission strips it from roles.
#[derive(Clone)]
pub struct InMemoryPolicyStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryPolicyStore {
    /// Create a new empty in-memory policy store
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState {
                next_user_id: 1,
                ..Default::default()
            })),
        }
    }

    /// Create a store pre-populated with the given graph
    ///
    /// Users keep the ids they carry; later inserts continue after the
    /// largest one.
    pub fn with_policy(users: Vec<User>, roles: Vec<Role>, permissions: Vec<Permission>) -> Self {
        let next_user_id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
        let state = StoreState {
            permissions: permissions.into_iter().map(|p| (p.id, p)).collect(),
            roles: roles.into_iter().map(|r| (r.id, r)).collect(),
            users: users.into_iter().map(|u| (u.id, u)).collect(),
            next_user_id,
        };

        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }
}

impl Default for InMemoryPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn find_all_users(&self) -> Result<Vec<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().cloned().collect())
    }

    async fn find_all_roles(&self) -> Result<Vec<Role>> {
        let state = self.state.read().await;
        Ok(state.roles.values().cloned().collect())
    }

    async fn find_all_permissions(&self) -> Result<Vec<Permission>> {
        let state = self.state.read().await;
        Ok(state.permissions.values().cloned().collect())
    }

    async fn create_role(&self, role: &Role) -> Result<()> {
        let mut state = self.state.write().await;
        if state.roles.contains_key(&role.id) {
            return Err(AuthzError::Conflict(format!("role {} already exists", role.id)));
        }
        state.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn replace_role_permissions(&self, id: RoleId, permission_ids: &[PermissionId]) -> Result<()> {
        let mut state = self.state.write().await;
        let role = state
            .roles
            .get_mut(&id)
            .ok_or_else(|| AuthzError::NotFound(format!("role {}", id)))?;
        role.permission_ids = permission_ids.to_vec();
        Ok(())
    }

    async fn delete_role(&self, id: RoleId) -> Result<()> {
        let mut state = self.state.write().await;
        if state.roles.remove(&id).is_none() {
            return Err(AuthzError::NotFound(format!("role {}", id)));
        }
        for user in state.users.values_mut() {
            user.roles.retain(|r| *r != id);
        }
        Ok(())
    }

    async fn create_permission(&self, permission: &Permission) -> Result<()> {
        let mut state = self.state.write().await;
        if state.permissions.contains_key(&permission.id) {
            return Err(AuthzError::Conflict(format!(
                "permission {} already exists",
                permission.id
            )));
        }
        state.permissions.insert(permission.id, permission.clone());
        Ok(())
    }

    async fn update_permission(&self, permission: &Permission) -> Result<()> {
        let mut state = self.state.write().await;
        match state.permissions.get_mut(&permission.id) {
            Some(existing) => {
                *existing = permission.clone();
                Ok(())
            }
            None => Err(AuthzError::NotFound(format!("permission {}", permission.id))),
        }
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<()> {
        let mut state = self.state.write().await;
        if state.permissions.remove(&id).is_none() {
            return Err(AuthzError::NotFound(format!("permission {}", id)));
        }
        for role in state.roles.values_mut() {
            role.permission_ids.retain(|p| *p != id);
        }
        Ok(())
    }

    async fn upsert_user_roles(&self, name: &str, role_ids: &[RoleId]) -> Result<User> {
        let mut state = self.state.write().await;
        if let Some(user) = state.user_by_name_mut(name) {
            user.roles = role_ids.to_vec();
            return Ok(user.clone());
        }

        let id = state.next_user_id;
        state.next_user_id += 1;
        let user = User::new(id, name, role_ids.to_vec());
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn delete_user(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let id = state
            .users
            .values()
            .find(|u| u.name == name)
            .map(|u| u.id)
            .ok_or_else(|| AuthzError::NotFound(format!("user '{}'", name)))?;
        state.users.remove(&id);
        Ok(())
    }

    async fn find_role(&self, id: RoleId) -> Result<Option<Role>> {
        let state = self.state.read().await;
        Ok(state.roles.get(&id).cloned())
    }

    async fn find_roles_page(&self, offset: usize, limit: usize) -> Result<RolePage> {
        let state = self.state.read().await;
        Ok(RolePage {
            roles: state.roles.values().skip(offset).take(limit).cloned().collect(),
            total: state.roles.len(),
        })
    }

    async fn find_permissions(&self) -> Result<Vec<Permission>> {
        self.find_all_permissions().await
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).cloned())
    }
}

//! Policy records shared by the index and the policy stores

use serde::{Deserialize, Serialize};

/// Unique permission identifier
pub type PermissionId = u64;

/// Unique role identifier
pub type RoleId = u64;

/// Store key of a user record
pub type UserId = i64;

/// Role id reserved for the built-in admin role
pub const ADMIN_ROLE_ID: RoleId = 0;

/// Display name reported for [`ADMIN_ROLE_ID`]
pub const ADMIN_ROLE_NAME: &str = "admin";

/// A grant of one action pattern on one resource pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Unique, stable identifier
    pub id: PermissionId,

    /// Human readable name
    pub name: String,

    /// Resource pattern (e.g., "/docs/*", "/admin/users", "*")
    pub resource: String,

    /// Action pattern (e.g., "GET", "PUT|POST", "*")
    pub action: String,
}

impl Permission {
    /// Create a new permission
    pub fn new(
        id: PermissionId,
        name: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            resource: resource.into(),
            action: action.into(),
        }
    }

    /// Check whether this permission grants `action` on `resource`
    pub fn grants(&self, resource: &str, action: &str) -> bool {
        crate::matcher::match_resource(resource, &self.resource)
            && crate::matcher::match_action(action, &self.action)
    }
}

/// A named set of permissions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Unique identifier; [`ADMIN_ROLE_ID`] denotes the admin role
    pub id: RoleId,

    /// Role name
    pub name: String,

    /// Permissions granted by this role
    #[serde(default)]
    pub permission_ids: Vec<PermissionId>,
}

impl Role {
    /// Create a role without permissions
    pub fn new(id: RoleId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            permission_ids: Vec::new(),
        }
    }

    /// Add granted permissions
    pub fn with_permissions(mut self, ids: impl IntoIterator<Item = PermissionId>) -> Self {
        self.permission_ids.extend(ids);
        self
    }
}

/// A principal and the roles assigned to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store key
    pub id: UserId,

    /// Authenticated identity; unique
    pub name: String,

    /// Assigned roles
    #[serde(default)]
    pub roles: Vec<RoleId>,
}

impl User {
    /// Create a new user record
    pub fn new(id: UserId, name: impl Into<String>, roles: Vec<RoleId>) -> Self {
        Self {
            id,
            name: name.into(),
            roles,
        }
    }
}

/// One page of roles plus the total number of roles in the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePage {
    pub roles: Vec<Role>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_grants() {
        let permission = Permission::new(5, "edit docs", "/docs/*", "PUT");

        assert!(permission.grants("/docs/42", "PUT"));
        assert!(permission.grants("/docs/42", "put"));
        assert!(!permission.grants("/docs/42", "DELETE"));
        assert!(!permission.grants("/public/42", "PUT"));
    }

    #[test]
    fn test_role_builder() {
        let role = Role::new(2, "editor").with_permissions([5, 6]);
        assert_eq!(role.permission_ids, vec![5, 6]);
    }

    #[test]
    fn test_role_deserialize_without_permissions() {
        let role: Role = serde_json::from_str(r#"{"id": 3, "name": "viewer"}"#).unwrap();
        assert_eq!(role, Role::new(3, "viewer"));
    }
}

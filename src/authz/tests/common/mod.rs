//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use rbac_authz::{
    AuthzError, InMemoryPolicyStore, Permission, PermissionId, PolicyStore, Result, Role, RoleId,
    RolePage, User, UserId, ADMIN_ROLE_ID,
};
use std::sync::atomic::{AtomicBool, Ordering};

/// Store wrapper whose reads and writes can be switched to fail
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryPolicyStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl FlakyStore {
    pub fn new(inner: InMemoryPolicyStore) -> Self {
        Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &InMemoryPolicyStore {
        &self.inner
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AuthzError::StoreUnavailable("read refused".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AuthzError::StoreUnavailable("transaction aborted".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PolicyStore for FlakyStore {
    async fn find_all_users(&self) -> Result<Vec<User>> {
        self.check_read()?;
        self.inner.find_all_users().await
    }

    async fn find_all_roles(&self) -> Result<Vec<Role>> {
        self.check_read()?;
        self.inner.find_all_roles().await
    }

    async fn find_all_permissions(&self) -> Result<Vec<Permission>> {
        self.check_read()?;
        self.inner.find_all_permissions().await
    }

    async fn create_role(&self, role: &Role) -> Result<()> {
        self.check_write()?;
        self.inner.create_role(role).await
    }

    async fn replace_role_permissions(&self, id: RoleId, permission_ids: &[PermissionId]) -> Result<()> {
        self.check_write()?;
        self.inner.replace_role_permissions(id, permission_ids).await
    }

    async fn delete_role(&self, id: RoleId) -> Result<()> {
        self.check_write()?;
        self.inner.delete_role(id).await
    }

    async fn create_permission(&self, permission: &Permission) -> Result<()> {
        self.check_write()?;
        self.inner.create_permission(permission).await
    }

    async fn update_permission(&self, permission: &Permission) -> Result<()> {
        self.check_write()?;
        self.inner.update_permission(permission).await
    }

    async fn delete_permission(&self, id: PermissionId) -> Result<()> {
        self.check_write()?;
        self.inner.delete_permission(id).await
    }

    async fn upsert_user_roles(&self, name: &str, role_ids: &[RoleId]) -> Result<User> {
        self.check_write()?;
        self.inner.upsert_user_roles(name, role_ids).await
    }

    async fn delete_user(&self, name: &str) -> Result<()> {
        self.check_write()?;
        self.inner.delete_user(name).await
    }

    async fn find_role(&self, id: RoleId) -> Result<Option<Role>> {
        self.check_read()?;
        self.inner.find_role(id).await
    }

    async fn find_roles_page(&self, offset: usize, limit: usize) -> Result<RolePage> {
        self.check_read()?;
        self.inner.find_roles_page(offset, limit).await
    }

    async fn find_permissions(&self) -> Result<Vec<Permission>> {
        self.check_read()?;
        self.inner.find_permissions().await
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>> {
        self.check_read()?;
        self.inner.find_user(id).await
    }
}

/// Editor/viewer/auditor graph used across tests
///
/// - permission 5: PUT /docs/*, 6: GET /docs/*, 7: GET /admin/users,
///   8: * *
/// - role 2 editor [5, 6], 3 viewer [6], 4 auditor [7], 9 superuser [8]
/// - alice [2], bob [admin], carol [3, 4], dave [9]
pub fn sample_store() -> InMemoryPolicyStore {
    InMemoryPolicyStore::with_policy(
        vec![
            User::new(1, "alice", vec![2]),
            User::new(2, "bob", vec![ADMIN_ROLE_ID]),
            User::new(3, "carol", vec![3, 4]),
            User::new(4, "dave", vec![9]),
        ],
        vec![
            Role::new(2, "editor").with_permissions([5, 6]),
            Role::new(3, "viewer").with_permissions([6]),
            Role::new(4, "auditor").with_permissions([7]),
            Role::new(9, "superuser").with_permissions([8]),
        ],
        vec![
            Permission::new(5, "edit docs", "/docs/*", "PUT"),
            Permission::new(6, "read docs", "/docs/*", "GET"),
            Permission::new(7, "list users", "/admin/users", "GET"),
            Permission::new(8, "everything", "*", "*"),
        ],
    )
}

/// Requests probed when comparing two enforcers
pub const PROBES: &[(&str, &str)] = &[
    ("/docs/42", "GET"),
    ("/docs/42", "PUT"),
    ("/docs/42", "DELETE"),
    ("/admin/users", "GET"),
    ("/admin/users", "POST"),
    ("/public/index", "GET"),
    ("/export", "POST"),
];

pub const PRINCIPALS: &[&str] = &["alice", "bob", "carol", "dave", "erin", "nobody"];

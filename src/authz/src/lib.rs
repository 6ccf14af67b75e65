//! # RBAC Authorization Engine
//!
//! Role-based authorization with a write-through, read-optimized policy
//! cache.
//!
//! ## Features
//!
//! - **Users → roles → permissions** graph materialized per user, so a
//!   decision never waits on the store
//! - **Admin role** (id `0`) that bypasses pattern matching
//! - **Resource patterns** with `*` wildcards, **action patterns** over
//!   `GET`/`POST`/`PUT`/`DELETE`
//! - **Incremental cache maintenance** on every policy mutation, with an
//!   explicit full refresh for resynchronization
//! - **Pluggable storage** through [`PolicyStore`]: in-memory, or PostgreSQL
//!   with the `postgres` feature
//!
//! ## Example
//!
//! ```rust
//! use rbac_authz::{Enforcer, EnforcerConfig, InMemoryPolicyStore, Permission, Role};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryPolicyStore::new());
//!     let enforcer = Enforcer::with_loaded_policy(EnforcerConfig::default(), store).await?;
//!
//!     enforcer.create_permission(Permission::new(5, "edit docs", "/docs/*", "PUT")).await?;
//!     enforcer.create_role(Role::new(2, "editor").with_permissions([5])).await?;
//!     enforcer.save_user("alice", vec![2]).await?;
//!
//!     assert!(enforcer.enforce("alice", "/docs/42", "PUT").await);
//!     assert!(!enforcer.enforce("alice", "/docs/42", "DELETE").await);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod policy;
pub mod types;

// Re-export commonly used types
pub use config::{EnforcerConfig, PermissionPropagation};
pub use engine::{Enforcer, EnforcerMetrics};
pub use error::{AuthzError, Result};
pub use matcher::{match_action, match_resource, ActionPattern, ResourcePattern, Verb};
pub use policy::{InMemoryPolicyStore, PolicyStore};
pub use types::{
    Permission, PermissionId, Role, RoleId, RolePage, User, UserId, ADMIN_ROLE_ID, ADMIN_ROLE_NAME,
};

#[cfg(feature = "postgres")]
pub use policy::PostgresPolicyStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Enforcer configuration
//!
//! Environment variables read by [`EnforcerConfig::from_env`]:
//! - `RBAC_PERMISSION_PROPAGATION` - `eager` or `lazy` (default: eager)
//! - `RBAC_ENABLE_METRICS` - `true` or `false` (default: true)

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const ENV_PROPAGATION: &str = "RBAC_PERMISSION_PROPAGATION";
const ENV_METRICS: &str = "RBAC_ENABLE_METRICS";

/// How edits and deletions of a permission reach the users' cached
/// permission sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionPropagation {
    /// Recompute every user's resolved set as part of the permission update
    Eager,

    /// Keep the cached copies; the edit applies after the next
    /// [`crate::Enforcer::refresh_policy`]
    Lazy,
}

impl fmt::Display for PermissionPropagation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionPropagation::Eager => f.write_str("eager"),
            PermissionPropagation::Lazy => f.write_str("lazy"),
        }
    }
}

impl FromStr for PermissionPropagation {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eager" => Ok(PermissionPropagation::Eager),
            "lazy" => Ok(PermissionPropagation::Lazy),
            other => Err(AuthzError::InvalidInput(format!(
                "unknown permission propagation '{}', expected 'eager' or 'lazy'",
                other
            ))),
        }
    }
}

/// Enforcer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcerConfig {
    /// Propagation of permission edits to cached user permission sets
    pub propagation: PermissionPropagation,

    /// Enable decision and mutation counters
    #[serde(default = "default_enable_metrics")]
    pub enable_metrics: bool,
}

fn default_enable_metrics() -> bool {
    true
}

impl Default for EnforcerConfig {
    fn default() -> Self {
        Self {
            propagation: PermissionPropagation::Eager,
            enable_metrics: true,
        }
    }
}

impl EnforcerConfig {
    /// Configuration with the given propagation and metrics enabled
    pub fn with_propagation(propagation: PermissionPropagation) -> Self {
        Self {
            propagation,
            ..Default::default()
        }
    }

    /// Build configuration from environment variables, falling back to
    /// defaults for unset variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_PROPAGATION) {
            config.propagation = value.parse()?;
        }

        if let Some(value) = lookup(ENV_METRICS) {
            config.enable_metrics = value.trim().parse().map_err(|_| {
                AuthzError::InvalidInput(format!(
                    "{} must be 'true' or 'false', got '{}'",
                    ENV_METRICS, value
                ))
            })?;
        }

        Ok(config)
    }
}

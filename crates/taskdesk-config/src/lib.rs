//! Configuration management for taskdesk
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. CLI arguments (highest precedence)
//! 2. Environment variables (TASKDESK_* prefix)
//! 3. taskdesk.local.toml (gitignored, local overrides)
//! 4. taskdesk.toml (git-tracked, project config)
//! 5. ~/.config/taskdesk/config.toml (user defaults)
//! 6. Built-in defaults (lowest precedence)
//!
//! Roles and assignments are carried as plain strings here. They are
//! validated when the CLI seeds the role store from them.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::{LOCAL_CONFIG_FILE, PROJECT_CONFIG_FILE, Paths};

/// Default number of cached role-set resolutions.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Main taskdesk configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskdeskConfig {
    pub rbac: RbacConfig,
    pub logging: LoggingConfig,
    pub roles: Vec<RoleSeed>,
    pub assignments: Vec<AssignmentSeed>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RbacConfig {
    /// Role whose holders bypass every check.
    pub super_role: String,
    /// Log every authorization decision.
    pub audit: bool,
    /// Capacity of the shared resolution cache. Must be non-zero.
    pub cache_capacity: usize,
    /// Install the built-in roles before the configured ones.
    pub default_roles: bool,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            super_role: "super_admin".to_string(),
            audit: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            default_roles: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Role definition from config
///
/// `permissions` uses the stored form: comma-separated tokens, or `*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSeed {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub permissions: String,
    #[serde(default)]
    pub system: bool,
}

impl RoleSeed {
    /// Display name, falling back to the role name.
    pub fn display_name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }
}

/// User-role assignments from config
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentSeed {
    pub user: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl TaskdeskConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Parse a single TOML document, without merging other sources.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a single TOML file, without merging other sources.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Checks structural constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rbac.super_role.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "rbac.super_role must not be empty".to_string(),
            ));
        }
        if self.rbac.cache_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "rbac.cache_capacity must be greater than zero".to_string(),
            ));
        }
        if let Some(role) = self.roles.iter().find(|role| role.name.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "role with display name '{}' has no name",
                role.display_name
            )));
        }
        if let Some(assignment) = self.assignments.iter().find(|a| a.user.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "assignment of {:?} has no user",
                assignment.roles
            )));
        }
        Ok(())
    }
}

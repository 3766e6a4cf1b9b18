//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Tool Config
//!
//! Located at (in order of precedence):
//! 1. `$NODECTL_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/nodectl/config.toml`
//! 3. `~/.nodectl/config.toml`
//!
//! # Validation
//!
//! Config values are validated after parsing: default profile entries
//! must be usable profile references.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::{EntityName, ProfileRef};

/// Registry location used when nothing else is configured.
pub const DEFAULT_NODES_CONF: &str = "/etc/warewulf/nodes.conf";

/// Profile membership given to new nodes when nothing else is configured.
pub const DEFAULT_NODE_PROFILE: &str = "default";

/// Tool configuration.
///
/// # Example
///
/// ```toml
/// nodes_conf = "/etc/warewulf/nodes.conf"
///
/// [node_defaults]
/// profiles = ["default", "compute"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Path of the registry document
    pub nodes_conf: Option<PathBuf>,

    /// Settings applied to nodes created through the CLI
    pub node_defaults: Option<NodeDefaults>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.nodes_conf {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "nodes_conf cannot be empty".to_string(),
                ));
            }
        }
        if let Some(defaults) = &self.node_defaults {
            defaults.validate()?;
        }
        Ok(())
    }
}

/// Defaults for new nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct NodeDefaults {
    /// Profile membership (`~name` entries allowed)
    pub profiles: Option<Vec<String>>,
}

impl NodeDefaults {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for entry in self.profiles.iter().flatten() {
            let reference = ProfileRef::parse(entry).ok_or_else(|| {
                ConfigError::InvalidValue(format!("empty default profile entry '{entry}'"))
            })?;
            EntityName::new(reference.name()).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid default profile: {e}"))
            })?;
        }
        Ok(())
    }
}

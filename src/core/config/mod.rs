//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! nodectl has one configuration file, which says where the registry
//! lives and how new nodes are set up. The registry location is passed
//! to [`RegistryStore`](crate::core::registry::RegistryStore) explicitly;
//! nothing reads it from global state.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. CLI flags (applied through [`Config::with_nodes_conf`])
//!
//! # Config Locations
//!
//! Searched in order:
//! 1. `$NODECTL_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/nodectl/config.toml`
//! 3. `~/.nodectl/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use nodereg::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! println!("registry: {}", config.nodes_conf().display());
//! println!("new nodes join: {:?}", config.default_node_profiles());
//! ```

pub mod schema;

pub use schema::{GlobalConfig, NodeDefaults, DEFAULT_NODES_CONF, DEFAULT_NODE_PROFILE};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration with CLI overrides applied.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// File configuration
    pub global: GlobalConfig,
    /// Path the file configuration was loaded from
    global_path: Option<PathBuf>,
    /// Registry path given on the command line
    nodes_conf_override: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed or
    /// fails validation. A missing config file is not an error.
    pub fn load() -> Result<Self, ConfigError> {
        let candidates = search_paths(
            std::env::var_os("NODECTL_CONFIG").map(PathBuf::from),
            std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
            dirs::home_dir(),
        );
        match candidates.into_iter().find(|p| p.exists()) {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from one explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let global = read_config(path)?;
        global.validate()?;
        debug!("loaded config from {}", path.display());
        Ok(Self {
            global,
            global_path: Some(path.to_path_buf()),
            nodes_conf_override: None,
        })
    }

    /// Override the registry path.
    pub fn with_nodes_conf(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.nodes_conf_override = path;
        }
        self
    }

    /// Write a config file atomically.
    ///
    /// Creates parent directories if needed, writes a temp file next to
    /// the target, then renames it into place.
    pub fn write_atomic(path: &Path, config: &GlobalConfig) -> Result<(), ConfigError> {
        config.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Path of the registry document.
    pub fn nodes_conf(&self) -> PathBuf {
        self.nodes_conf_override
            .clone()
            .or_else(|| self.global.nodes_conf.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_NODES_CONF))
    }

    /// Profile membership for newly added nodes.
    pub fn default_node_profiles(&self) -> Vec<String> {
        self.global
            .node_defaults
            .as_ref()
            .and_then(|d| d.profiles.clone())
            .unwrap_or_else(|| vec![DEFAULT_NODE_PROFILE.to_string()])
    }

    /// Path the config was loaded from, if any.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }
}

/// Candidate config paths in search order.
fn search_paths(
    env_config: Option<PathBuf>,
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    paths.extend(env_config);
    paths.extend(xdg_config_home.map(|p| p.join("nodectl/config.toml")));
    paths.extend(home.map(|p| p.join(".nodectl/config.toml")));
    paths
}

fn read_config(path: &Path) -> Result<GlobalConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.nodes_conf(), PathBuf::from(DEFAULT_NODES_CONF));
        assert_eq!(config.default_node_profiles(), vec!["default"]);
        assert!(config.loaded_from().is_none());
    }

    #[test]
    fn search_order() {
        let paths = search_paths(
            Some(PathBuf::from("/env/config.toml")),
            Some(PathBuf::from("/xdg")),
            Some(PathBuf::from("/home/u")),
        );
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/env/config.toml"),
                PathBuf::from("/xdg/nodectl/config.toml"),
                PathBuf::from("/home/u/.nodectl/config.toml"),
            ]
        );
        assert!(search_paths(None, None, None).is_empty());
    }

    #[test]
    fn load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
            nodes_conf = "/srv/warewulf/nodes.conf"

            [node_defaults]
            profiles = ["compute"]
            "#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.nodes_conf(), PathBuf::from("/srv/warewulf/nodes.conf"));
        assert_eq!(config.default_node_profiles(), vec!["compute"]);
        assert_eq!(config.loaded_from(), Some(path.as_path()));
    }

    #[test]
    fn cli_override_wins() {
        let config = Config {
            global: GlobalConfig {
                nodes_conf: Some(PathBuf::from("/from/file")),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = config.with_nodes_conf(Some(PathBuf::from("/from/cli")));
        assert_eq!(config.nodes_conf(), PathBuf::from("/from/cli"));
        let config = config.with_nodes_conf(None);
        assert_eq!(config.nodes_conf(), PathBuf::from("/from/cli"));
    }

    #[test]
    fn parse_errors() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "unknown_field = true\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));

        fs::write(&path, "[node_defaults]\nprofiles = [\"a,b\"]\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue(_))
        ));

        assert!(matches!(
            Config::load_from(&temp.path().join("missing.toml")),
            Err(ConfigError::ReadError { .. })
        ));
    }

    #[test]
    fn write_config_atomic() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.toml");
        let global = GlobalConfig {
            nodes_conf: Some(PathBuf::from("/tmp/nodes.conf")),
            node_defaults: Some(NodeDefaults {
                profiles: Some(vec!["default".into(), "gpu".into()]),
            }),
        };
        Config::write_atomic(&path, &global).unwrap();
        assert!(!path.with_extension("toml.tmp").exists());

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.global, global);
    }
}

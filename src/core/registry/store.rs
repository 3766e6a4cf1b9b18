//! core::registry::store
//!
//! Registry persistence on the local filesystem.
//!
//! # Architecture
//!
//! A [`RegistryStore`] is an explicit handle on one registry file; there
//! is no process-wide path. Every operation loads a fresh snapshot, so no
//! registry instance outlives a single operation.
//!
//! # Write Semantics
//!
//! Writes go to `<file>.tmp` in the same directory, are fsynced, then
//! renamed over the target. Readers never see a partial document.
//!
//! Cross-process safety comes only from the fingerprint check in
//! [`RegistryStore::update`]: two writers may race, and the one whose
//! precondition no longer matches fails with `Conflict`. There is no file
//! locking.
//!
//! # Example
//!
//! ```no_run
//! use nodereg::core::registry::{Precondition, RegistryStore};
//!
//! let store = RegistryStore::new("/etc/warewulf/nodes.conf");
//! let seen = store.load()?.hash()?;
//!
//! store.update(&Precondition::Hash(seen), |registry| {
//!     registry.add_node("n042")?;
//!     Ok(())
//! })?;
//! # Ok::<(), nodereg::core::registry::RegistryError>(())
//! ```

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{Precondition, Registry, RegistryError};

/// Handle on a registry file.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the registry.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::Io`] if the file cannot be read (including when it
    ///   does not exist)
    /// - [`RegistryError::Malformed`] if it does not parse
    pub fn load(&self) -> Result<Registry, RegistryError> {
        let bytes = fs::read(&self.path).map_err(|e| io_error(&self.path, e))?;
        debug!("loading registry from {}", self.path.display());
        Registry::parse(&bytes)
    }

    /// Load the registry, treating a missing file as empty.
    pub fn load_or_default(&self) -> Result<Registry, RegistryError> {
        match fs::read(&self.path) {
            Ok(bytes) => Registry::parse(&bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist, starting empty", self.path.display());
                Ok(Registry::default())
            }
            Err(e) => Err(io_error(&self.path, e)),
        }
    }

    /// Flatten and atomically write the registry.
    pub fn persist(&self, registry: &mut Registry) -> Result<(), RegistryError> {
        registry.flatten();
        let document = registry.to_document()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path).map_err(|e| io_error(&temp_path, e))?;
        file.write_all(document.as_bytes())
            .map_err(|e| io_error(&temp_path, e))?;
        file.sync_all().map_err(|e| io_error(&temp_path, e))?;

        fs::rename(&temp_path, &self.path).map_err(|e| io_error(&self.path, e))?;
        debug!("persisted registry to {}", self.path.display());
        Ok(())
    }

    /// Load a fresh snapshot, check the precondition, apply `f`, persist.
    ///
    /// Nothing is written if the precondition fails or `f` returns an
    /// error.
    pub fn update<T, F>(&self, precondition: &Precondition, f: F) -> Result<T, RegistryError>
    where
        F: FnOnce(&mut Registry) -> Result<T, RegistryError>,
    {
        let mut registry = self.load_or_default()?;
        registry.check(precondition)?;
        let out = f(&mut registry)?;
        self.persist(&mut registry)?;
        Ok(out)
    }

    /// Delete nodes under a precondition.
    ///
    /// Either every name is deleted or none is.
    pub fn delete_nodes(
        &self,
        names: &[String],
        precondition: &Precondition,
    ) -> Result<(), RegistryError> {
        self.update(precondition, |registry| {
            for name in names {
                registry.del_node(name)?;
            }
            Ok(())
        })
    }

    /// Delete profiles under a precondition.
    pub fn delete_profiles(
        &self,
        names: &[String],
        precondition: &Precondition,
    ) -> Result<(), RegistryError> {
        self.update(precondition, |registry| {
            for name in names {
                registry.del_profile(name)?;
            }
            Ok(())
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> RegistryError {
    RegistryError::Io {
        path: path.to_path_buf(),
        source,
    }
}

//! File-backed persistence for the registry document.
//!
//! The store keeps a single pretty-printed JSON document at a configured
//! path. Saves go through a sibling temp file followed by a rename, so a
//! reader (or a crashed run) never observes a half-written registry.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::model::{DatasetScope, Registry};

/// Failures in the store's own load/save path. These are the only errors the
/// pipeline treats as fatal: without durable state there is no safe way to
/// continue a run.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("registry i/o error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("registry serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// File-backed registry store. One document, one path, one scope at a time.
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

    /// Loads the registry for `scope`, or starts a fresh one.
    ///
    /// A persisted document belonging to a different scope is set aside and
    /// never merged: a registry spans exactly one scope. An unreadable
    /// document is treated the same way. Only I/O failures are fatal.
    pub fn load_or_create(&self, scope: DatasetScope) -> Result<Registry, StoreError> {
        if !self.path.exists() {
            log::info!(
                "No registry at {}, starting fresh for {}",
                self.path.display(),
                scope
            );
            return Ok(Registry::new(scope));
        }

        let raw = fs::read_to_string(&self.path).map_err(|e| StoreError::Io {
            path: self.path.clone(),
            source: e,
        })?;

        match serde_json::from_str::<Registry>(&raw) {
            Ok(registry) if registry.scope == scope => {
                log::info!("Loaded registry for {} ({} records)", scope, registry.len());
                Ok(registry)
            }
            Ok(registry) => {
                log::warn!(
                    "Registry at {} belongs to {}, requested {}; setting it aside and starting fresh",
                    self.path.display(),
                    registry.scope,
                    scope
                );
                self.set_aside();
                Ok(Registry::new(scope))
            }
            Err(e) => {
                log::warn!(
                    "Registry at {} is unreadable ({}); setting it aside and starting fresh",
                    self.path.display(),
                    e
                );
                self.set_aside();
                Ok(Registry::new(scope))
            }
        }
    }

    /// Persists the registry atomically.
    ///
    /// Idempotent and safe to call from failure handlers: the last-known-good
    /// document on disk is replaced only once the new one is fully written.
    pub fn save(&self, registry: &Registry) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        let pretty = serde_json::to_string_pretty(registry)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, pretty).map_err(|e| StoreError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(())
    }

    // Preserve a mismatched or unreadable document for operators instead of
    // deleting it. Best effort: a failed rename only costs the backup.
    fn set_aside(&self) {
        let backup = self.path.with_extension("json.bak");
        if let Err(e) = fs::rename(&self.path, &backup) {
            log::warn!(
                "Could not set aside stale registry {}: {}",
                self.path.display(),
                e
            );
        }
    }
}

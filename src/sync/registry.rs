//! Locally cached copy of the remote database listing

use crate::sync::metadata::RemoteDatabase;
use crate::BlasterError;
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RemoteRegistry {
    path: PathBuf,
    databases: BTreeMap<String, RemoteDatabase>,
}

impl RemoteRegistry {
    /// Load the registry; a missing or unreadable file gives an empty one
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let databases = std::fs::read_to_string(&path)
            .ok()
            .and_then(|text| match serde_json::from_str(&text) {
                Ok(databases) => Some(databases),
                Err(e) => {
                    warn!("Ignoring unreadable registry {}: {}", path.display(), e);
                    None
                }
            })
            .unwrap_or_default();
        Self { path, databases }
    }

    pub fn save(&self) -> Result<(), BlasterError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&self.databases)?)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn replace_all(&mut self, databases: Vec<RemoteDatabase>) {
        self.databases = databases.into_iter().map(|db| (db.name.clone(), db)).collect();
    }

    pub fn get(&self, name: &str) -> Option<&RemoteDatabase> {
        self.databases.get(name)
    }

    pub fn databases(&self) -> impl Iterator<Item = &RemoteDatabase> {
        self.databases.values()
    }

    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.databases.len()
    }

    /// When the registry file was last written
    pub fn last_fetched(&self) -> Option<DateTime<Local>> {
        std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Local>::from)
    }
}

use crate::burstcull_core::error::{CullError, Result};
use crate::burstcull_core::media::MediaItem;
use crate::burstcull_core::relocate::QuarantineRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

const STORE_FILE_NAME: &str = "sessions.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    Kept,
    Discarded,
}

/// Saved progress for one folder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDocument {
    pub folder_path: String,
    #[serde(default)]
    pub processed_paths: Vec<String>,
    #[serde(default)]
    pub selections: BTreeMap<String, Selection>,
    #[serde(default)]
    pub quarantined: Vec<QuarantineRecord>,
}

impl SessionDocument {
    pub fn new(folder: &Path) -> Self {
        SessionDocument {
            folder_path: folder_key(folder),
            ..Default::default()
        }
    }

    pub fn is_processed(&self, path: &Path) -> bool {
        let key = path.to_string_lossy();
        self.processed_paths.iter().any(|p| *p == key)
    }

    /// Whether every item has been handled in an earlier run.
    pub fn covers(&self, items: &[MediaItem]) -> bool {
        let processed: HashSet<&str> = self.processed_paths.iter().map(String::as_str).collect();
        !items.is_empty()
            && items
                .iter()
                .all(|i| processed.contains(i.path.to_string_lossy().as_ref()))
    }

    /// Record the result of one batch.
    pub fn record_batch(&mut self, items: &[MediaItem], kept: &[MediaItem], records: &[QuarantineRecord]) {
        for item in items {
            if !self.is_processed(&item.path) {
                self.processed_paths.push(item.path.to_string_lossy().to_string());
            }
        }
        for item in kept {
            self.selections
                .insert(item.path.to_string_lossy().to_string(), Selection::Kept);
        }
        for record in records {
            self.selections.insert(
                record.original_path.to_string_lossy().to_string(),
                Selection::Discarded,
            );
        }
        self.quarantined.extend(records.iter().cloned());
    }

    /// Forget a file that came back from quarantine so it is culled again.
    pub fn forget(&mut self, record: &QuarantineRecord) {
        let key = record.original_path.to_string_lossy();
        self.processed_paths.retain(|p| *p != key);
        self.selections.remove(key.as_ref());
        self.quarantined.retain(|r| r != record);
    }

    pub fn count(&self, selection: Selection) -> usize {
        self.selections.values().filter(|s| **s == selection).count()
    }
}

/// All saved sessions, keyed by absolute folder path, in one JSON file.
#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    sessions: BTreeMap<String, SessionDocument>,
}

impl SessionStore {
    /// `<data dir>/burstcull/sessions.json`, or the working directory when the
    /// platform has no data directory.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("burstcull").join(STORE_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(STORE_FILE_NAME))
    }

    /// Load the store. A missing or unreadable file, or a malformed document,
    /// counts as no saved session.
    pub fn load(path: &Path) -> Self {
        let mut store = SessionStore {
            path: path.to_path_buf(),
            sessions: BTreeMap::new(),
        };

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                log::debug!("No session store at {}: {}", path.display(), e);
                return store;
            }
        };

        let raw: BTreeMap<String, Value> = match serde_json::from_str(&contents) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Ignoring malformed session store {}: {}", path.display(), e);
                return store;
            }
        };

        for (key, value) in raw {
            match serde_json::from_value::<SessionDocument>(value) {
                Ok(doc) if doc.folder_path == key => {
                    store.sessions.insert(key, doc);
                }
                Ok(_) => log::warn!("Ignoring session for {}: folder path mismatch", key),
                Err(e) => log::warn!("Ignoring malformed session for {}: {}", key, e),
            }
        }

        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self, folder: &Path) -> Option<&SessionDocument> {
        self.sessions.get(&folder_key(folder))
    }

    pub fn put(&mut self, doc: SessionDocument) {
        self.sessions.insert(doc.folder_path.clone(), doc);
    }

    pub fn remove(&mut self, folder: &Path) -> Option<SessionDocument> {
        self.sessions.remove(&folder_key(folder))
    }

    /// Write the store, replacing the previous file in one rename.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| CullError::access(parent, e))?;
        }

        let json = serde_json::to_string_pretty(&self.sessions)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| CullError::access(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| CullError::access(&self.path, e))?;

        log::debug!("Saved {} sessions to {}", self.sessions.len(), self.path.display());
        Ok(())
    }
}

/// Absolute form of a folder path, used as the session key.
pub fn folder_key(folder: &Path) -> String {
    fs::canonicalize(folder)
        .or_else(|_| std::path::absolute(folder))
        .unwrap_or_else(|_| folder.to_path_buf())
        .to_string_lossy()
        .to_string()
}

//! Persistent store adapter: one JSON snapshot under a fixed key.
//!
//! [`Store`] is the seam between the shell and whatever backs the snapshot.
//! [`FileStore`] keeps a JSON object of key → raw string on disk, in the same
//! shape a browser origin's `localStorage` has, so other keys written by other
//! tools survive our saves. [`MemoryStore`] is the in-process variant used by
//! tests and `--memory` sessions.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::{CodeState, Error, Result};

/// Default key the snapshot is stored under
pub const DEFAULT_STORAGE_KEY: &str = "minimalist-code-lab-final";

/// Load/save of the full code state
pub trait Store {
    /// Read and parse the snapshot. Absent or malformed values yield `None`.
    fn load(&self) -> Option<CodeState>;

    /// Serialize and write the full state.
    fn save(&mut self, state: &CodeState) -> Result<()>;
}

impl<T: Store + ?Sized> Store for Box<T> {
    fn load(&self) -> Option<CodeState> {
        (**self).load()
    }

    fn save(&mut self, state: &CodeState) -> Result<()> {
        (**self).save(state)
    }
}

/// Parse a raw snapshot string, logging (not surfacing) failures.
pub fn parse_snapshot(raw: &str) -> Option<CodeState> {
    match serde_json::from_str::<CodeState>(raw) {
        Ok(state) => Some(state),
        Err(e) => {
            log::debug!("ignoring malformed snapshot: {}", e);
            None
        }
    }
}

/// In-memory key/value store. Clones share the same backing map.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    key: String,
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_key(DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            entries: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Raw value currently stored under this store's key
    pub fn raw(&self) -> Option<String> {
        self.entries.lock().ok()?.get(&self.key).cloned()
    }

    /// Overwrite the raw value, e.g. to inject a malformed snapshot
    pub fn set_raw(&self, raw: impl Into<String>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(self.key.clone(), raw.into());
        }
    }

    pub fn remove(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(&self.key);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn load(&self) -> Option<CodeState> {
        self.raw().and_then(|raw| parse_snapshot(&raw))
    }

    fn save(&mut self, state: &CodeState) -> Result<()> {
        let raw = serde_json::to_string(state)?;
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::StoreError("memory store lock poisoned".into()))?;
        entries.insert(self.key.clone(), raw);
        Ok(())
    }
}

/// File-backed key/value store
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    key: String,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }

    /// `<data dir>/codelab/storage.json`, or `./codelab-storage.json` when
    /// the platform has no data directory.
    pub fn default_path() -> PathBuf {
        match dirs::data_dir() {
            Some(dir) => dir.join("codelab").join("storage.json"),
            None => PathBuf::from("codelab-storage.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn read_entries(&self) -> Option<BTreeMap<String, String>> {
        let text = fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<BTreeMap<String, String>>(&text) {
            Ok(map) => Some(map),
            Err(e) => {
                log::debug!("storage file {:?} is not a key/value object: {}", self.path, e);
                None
            }
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let body = serde_json::to_string_pretty(entries)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(body.as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp, &self.path).map_err(|e| {
            Error::StoreError(format!("failed to replace {:?}: {}", self.path, e))
        })
    }
}

impl Store for FileStore {
    fn load(&self) -> Option<CodeState> {
        let entries = self.read_entries()?;
        let raw = entries.get(&self.key)?;
        parse_snapshot(raw)
    }

    fn save(&mut self, state: &CodeState) -> Result<()> {
        // A corrupt file is replaced rather than blocking saves forever.
        let mut entries = self.read_entries().unwrap_or_default();
        entries.insert(self.key.clone(), serde_json::to_string(state)?);
        self.write_entries(&entries)
    }
}

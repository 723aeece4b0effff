//! Durable storage for discovery state.
//!
//! ```text
//! AchievementManager ──> DiscoveryStore (load / save / clear)
//!                              │
//!                     KeyedStore<B> (JSON codec, one key)
//!                              │
//!                     KeyValueBackend (get_item / set_item / remove_item)
//!                       - MemoryBackend:       tests, fallback
//!                       - FileBackend:         one JSON file per key
//!                       - LocalStorageBackend: window.localStorage
//! ```
//!
//! Backends report failures as [`StoreError`]; the manager logs them and
//! carries on as if the store were empty.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("stored discovery state is corrupt: {0}")]
    Corrupt(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

// --- Discovery State ---------------------------------------------------------

/// Set of discovered achievement ids. A missing id is undiscovered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiscoveryState {
    discovered: BTreeSet<String>,
}

impl DiscoveryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_discovered(&self, id: &str) -> bool {
        self.discovered.contains(id)
    }

    /// Returns true if the id was not already set.
    pub fn mark(&mut self, id: &str) -> bool {
        self.discovered.insert(id.to_string())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.discovered.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.discovered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.discovered.is_empty()
    }

    /// Decode the persisted `{ "<id>": true, ... }` object.
    ///
    /// Entries whose value is anything but `true` count as undiscovered; a
    /// payload that is not a JSON object is corrupt.
    pub fn from_json(raw: &str) -> StoreResult<Self> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let Value::Object(entries) = value else {
            return Err(StoreError::Corrupt("expected a JSON object".into()));
        };
        let discovered = entries
            .into_iter()
            .filter(|(_, v)| *v == Value::Bool(true))
            .map(|(k, _)| k)
            .collect();
        Ok(Self { discovered })
    }

    /// Encode as a JSON object; only `true` entries are written.
    pub fn to_json(&self) -> String {
        let map: Map<String, Value> = self
            .discovered
            .iter()
            .map(|id| (id.clone(), Value::Bool(true)))
            .collect();
        Value::Object(map).to_string()
    }
}

// --- Store Traits ------------------------------------------------------------

/// Narrow persistence interface the manager talks to.
pub trait DiscoveryStore {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Returns an empty state when nothing has been stored yet.
    fn load(&self) -> StoreResult<DiscoveryState>;

    /// Replaces the whole stored mapping.
    fn save(&self, state: &DiscoveryState) -> StoreResult<()>;

    fn clear(&self) -> StoreResult<()>;
}

/// `localStorage`-shaped string key-value storage.
pub trait KeyValueBackend {
    fn name(&self) -> &str;
    fn get_item(&self, key: &str) -> StoreResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> StoreResult<()>;
    fn remove_item(&self, key: &str) -> StoreResult<()>;
}

impl<B: KeyValueBackend + ?Sized> KeyValueBackend for Box<B> {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get_item(key)
    }
    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set_item(key, value)
    }
    fn remove_item(&self, key: &str) -> StoreResult<()> {
        (**self).remove_item(key)
    }
}

impl<T: KeyValueBackend + ?Sized> KeyValueBackend for Rc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get_item(key)
    }
    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set_item(key, value)
    }
    fn remove_item(&self, key: &str) -> StoreResult<()> {
        (**self).remove_item(key)
    }
}

/// Stores the discovery state as JSON under a single key of a backend.
pub struct KeyedStore<B> {
    backend: B,
    key: String,
}

impl<B: KeyValueBackend> KeyedStore<B> {
    pub fn new(backend: B, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<B: KeyValueBackend> DiscoveryStore for KeyedStore<B> {
    fn name(&self) -> &str {
        self.backend.name()
    }

    fn load(&self) -> StoreResult<DiscoveryState> {
        match self.backend.get_item(&self.key)? {
            Some(raw) => DiscoveryState::from_json(&raw),
            None => Ok(DiscoveryState::new()),
        }
    }

    fn save(&self, state: &DiscoveryState) -> StoreResult<()> {
        self.backend.set_item(&self.key, &state.to_json())
    }

    fn clear(&self) -> StoreResult<()> {
        self.backend.remove_item(&self.key)
    }
}

// --- Memory Backend ----------------------------------------------------------

/// In-memory backend; contents are lost with the value.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    items: RefCell<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a raw value (used to simulate corrupted storage).
    pub fn with_item(key: &str, value: &str) -> Self {
        let backend = Self::new();
        backend
            .items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        backend
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.items.borrow().get(key).cloned()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn name(&self) -> &str {
        "MemoryBackend"
    }

    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StoreResult<()> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

// --- File Backend ------------------------------------------------------------

/// One `<key>.json` file per key inside a directory.
///
/// Writes go to `<key>.json.tmp` first, are synced, then renamed over the
/// real file.
#[derive(Debug)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// The directory does not need to exist; it is created on first write.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StoreError::Unavailable(format!(
                "key {key:?} is not usable as a file name"
            )));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueBackend for FileBackend {
    fn name(&self) -> &str {
        "FileBackend"
    }

    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        let mut tmp_path = path.clone();
        tmp_path.set_extension("json.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(value.as_bytes())?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;

        tracing::debug!(path = %path.display(), bytes = value.len(), "wrote discovery state");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StoreResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

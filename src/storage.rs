//! Storage layer for td
//!
//! Persistence goes through the [`KeyValueStore`] port so the task list can run
//! against a directory on disk or an in-memory map.
//!
//! # Directory Structure
//!
//! ```text
//! <data-dir>/
//!   td-tasks.json          # JSON array of task records
//!   td-tasks.json.lock     # Advisory lock taken while writing
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};
use crate::task::Task;

/// The single key the task list is stored under.
pub const TASKS_KEY: &str = "td-tasks";

/// Persistence port: string values addressed by string keys.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &T {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// One `<key>.json` file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        lock::write_atomic_locked(&path, value.as_bytes(), DEFAULT_LOCK_TIMEOUT_MS)?;
        debug!(key, path = %path.display(), bytes = value.len(), "value written");
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidArgument(format!("invalid storage key '{key}'")))
    }
}

/// In-memory store; remembers which keys were read and written.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
    reads: RefCell<Vec<String>>,
    writes: RefCell<Vec<String>>,
}

impl MemoryStore {
    /// Store pre-seeded with a raw value
    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        store
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    pub fn read_keys(&self) -> Vec<String> {
        self.reads.borrow().clone()
    }

    pub fn written_keys(&self) -> Vec<String> {
        self.writes.borrow().clone()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.reads.borrow_mut().push(key.to_string());
        Ok(self.values.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.writes.borrow_mut().push(key.to_string());
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Loads and saves the whole task list under [`TASKS_KEY`].
#[derive(Debug, Clone)]
pub struct TaskRepository<S> {
    store: S,
}

impl<S: KeyValueStore> TaskRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn key(&self) -> &'static str {
        TASKS_KEY
    }

    /// Read the persisted list.
    ///
    /// Absent, unreadable, or malformed data yields an empty list.
    pub fn load(&self) -> Vec<Task> {
        let raw = match self.store.get(self.key()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(key = self.key(), "failed to read tasks, starting empty: {err}");
                return Vec::new();
            }
        };

        if raw.trim().is_empty() {
            return Vec::new();
        }

        match serde_json::from_str::<Vec<Task>>(&raw) {
            Ok(tasks) => {
                debug!(key = self.key(), count = tasks.len(), "tasks loaded");
                tasks
            }
            Err(err) => {
                warn!(key = self.key(), "persisted tasks are corrupt, starting empty: {err}");
                Vec::new()
            }
        }
    }

    /// Write the full list.
    pub fn save(&self, tasks: &[Task]) -> Result<()> {
        let json = serde_json::to_string_pretty(tasks)?;
        self.store.set(self.key(), &json)
    }
}

//! Shared key/value state persisted as one JSON object.
//!
//! Every instance on the machine reads and writes the same file, so
//! read-modify-write goes through [`StateStore::update`], which holds an
//! advisory lock on unix for the whole cycle.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

pub type StateMap = Map<String, Value>;

pub trait StateStore: Send + Sync {
    fn get_value(&self, key: &str) -> Result<Option<Value>>;

    fn set_value(&self, key: &str, value: Value) -> Result<()>;

    /// Run `f` over the whole map and persist the result atomically with
    /// respect to other writers of the same store.
    fn update(&self, f: &mut dyn FnMut(&mut StateMap) -> Result<()>) -> Result<()>;
}

/// Typed access on top of [`StateStore`]
pub trait StateStoreExt: StateStore {
    /// Value under `key`, or `default` when missing or unreadable
    fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.get_value(key) {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(parsed) => parsed,
                Err(e) => {
                    debug!("Ignoring malformed state entry '{}': {}", key, e);
                    default
                }
            },
            Ok(None) => default,
            Err(e) => {
                warn!("Failed to read state entry '{}': {}", key, e);
                default
            }
        }
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set_value(key, serde_json::to_value(value)?)
    }
}

impl<S: StateStore + ?Sized> StateStoreExt for S {}

/// Store backed by a JSON file, shared across processes
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Unable to create {}", parent.display()))?;
        }
        Ok(Self { path })
    }

    /// `~/.autoaccept/state.json`
    pub fn default_path() -> Result<PathBuf> {
        let home_dir = dirs::home_dir().context("Unable to determine home directory")?;
        Ok(home_dir.join(".autoaccept").join("state.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<StateMap> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Unable to read {}", self.path.display()));
            }
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                warn!(
                    "State file {} is not a JSON object, starting fresh",
                    self.path.display()
                );
                Ok(Map::new())
            }
        }
    }

    fn write_map(&self, map: &StateMap) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(map)?;
        fs::write(&tmp, json).with_context(|| format!("Unable to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Unable to replace {}", self.path.display()))?;
        Ok(())
    }

    #[cfg(unix)]
    fn lock(&self) -> Result<fs::File> {
        use nix::fcntl::{FlockArg, flock};
        use std::os::unix::io::AsRawFd;

        let lock_path = self.path.with_extension("json.lock");
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("Unable to open {}", lock_path.display()))?;
        flock(file.as_raw_fd(), FlockArg::LockExclusive)
            .with_context(|| format!("Unable to lock {}", lock_path.display()))?;
        // Released when the file is closed
        Ok(file)
    }

    #[cfg(not(unix))]
    fn lock(&self) -> Result<()> {
        Ok(())
    }
}

impl StateStore for JsonFileStore {
    fn get_value(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.read_map()?.remove(key))
    }

    fn set_value(&self, key: &str, value: Value) -> Result<()> {
        self.update(&mut |map| {
            map.insert(key.to_string(), value.clone());
            Ok(())
        })
    }

    fn update(&self, f: &mut dyn FnMut(&mut StateMap) -> Result<()>) -> Result<()> {
        let _guard = self.lock()?;
        let mut map = self.read_map()?;
        f(&mut map)?;
        self.write_map(&map)
    }
}

/// In-process store for tests and dry runs
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<StateMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn get_value(&self, key: &str) -> Result<Option<Value>> {
        let map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(key).cloned())
    }

    fn set_value(&self, key: &str, value: Value) -> Result<()> {
        let mut map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        map.insert(key.to_string(), value);
        Ok(())
    }

    fn update(&self, f: &mut dyn FnMut(&mut StateMap) -> Result<()>) -> Result<()> {
        let mut map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        // Work on a copy so a failing closure leaves the store untouched
        let mut working = map.clone();
        f(&mut working)?;
        *map = working;
        Ok(())
    }
}

#[cfg(test)]
#[path = "state_store_test.rs"]
mod state_store_test;

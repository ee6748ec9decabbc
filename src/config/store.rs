//! Typed key/value persistence for the `[kestrel]` configuration group.
//!
//! The store keeps every entry in memory in file order and tracks two flags:
//!
//! - **dirty**: set by every write, cleared only by a successful [`ConfigStore::flush`]
//! - **externally modified**: set from the file-watch thread when another process
//!   touches the file; the store never clears it on its own
//!
//! # File Format
//!
//! ```toml
//! [kestrel]
//! forecolor = "#c0c0c0"
//! opacity_level = 99
//! copy_key = "C"
//! ```
//!
//! Values are typed in the file, but reads are lenient: an integer stored as the
//! string `"42"` still reads as `42`.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::watcher::{ConfigWatcher, WatchError};

/// Name of the single configuration group
pub const GROUP: &str = "kestrel";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("configuration key '{0}' is not set")]
    MissingKey(String),

    #[error("value of '{key}' is not a valid {expected}")]
    KeyFormat { key: String, expected: ValueKind },

    #[error("Not valid config file format: {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A flush that could not be completed. Losing configuration silently is not an
/// option, so callers are expected to report this and exit.
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Failed to write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Value types a key can be read as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Integer,
    Boolean,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::String => write!(f, "string"),
            ValueKind::Integer => write!(f, "integer"),
            ValueKind::Boolean => write!(f, "boolean"),
        }
    }
}

/// A typed configuration value
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl ConfigValue {
    fn into_toml(self) -> toml::Value {
        match self {
            ConfigValue::String(s) => toml::Value::String(s),
            ConfigValue::Integer(i) => toml::Value::Integer(i),
            ConfigValue::Boolean(b) => toml::Value::Boolean(b),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Integer(i)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Boolean(b)
    }
}

/// On-disk layout: our group plus any foreign tables, which are written back untouched
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default, rename = "kestrel")]
    group: toml::Table,
    #[serde(flatten)]
    other: toml::Table,
}

/// Configuration store
pub struct ConfigStore {
    file: ConfigFile,
    dirty: bool,
    externally_modified: Arc<AtomicBool>,
    _watcher: Option<ConfigWatcher>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            file: ConfigFile::default(),
            dirty: false,
            externally_modified: Arc::new(AtomicBool::new(false)),
            _watcher: None,
        }
    }

    /// Load the store from `path`. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No config file at {}, starting empty", path.display());
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let file: ConfigFile = toml::from_str(&content).map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Loaded {} keys from {}", file.group.len(), path.display());
        Ok(Self {
            file,
            ..Self::new()
        })
    }

    /// Check whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.file.group.contains_key(key)
    }

    /// Raw stored value, as written in the file
    pub fn raw(&self, key: &str) -> Option<&toml::Value> {
        self.file.group.get(key)
    }

    /// Read `key` as `kind`
    pub fn get(&self, key: &str, kind: ValueKind) -> Result<ConfigValue> {
        let value = self
            .file
            .group
            .get(key)
            .ok_or_else(|| StoreError::MissingKey(key.to_string()))?;

        let format_error = || StoreError::KeyFormat {
            key: key.to_string(),
            expected: kind,
        };

        match (kind, value) {
            (ValueKind::String, toml::Value::String(s)) => Ok(ConfigValue::String(s.clone())),
            (ValueKind::String, toml::Value::Integer(i)) => Ok(ConfigValue::String(i.to_string())),
            (ValueKind::String, toml::Value::Boolean(b)) => Ok(ConfigValue::String(b.to_string())),
            (ValueKind::Integer, toml::Value::Integer(i)) => Ok(ConfigValue::Integer(*i)),
            (ValueKind::Integer, toml::Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(ConfigValue::Integer)
                .map_err(|_| format_error()),
            (ValueKind::Boolean, toml::Value::Boolean(b)) => Ok(ConfigValue::Boolean(*b)),
            (ValueKind::Boolean, toml::Value::String(s)) => match s.trim() {
                "true" => Ok(ConfigValue::Boolean(true)),
                "false" => Ok(ConfigValue::Boolean(false)),
                _ => Err(format_error()),
            },
            _ => Err(format_error()),
        }
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        match self.get(key, ValueKind::String)? {
            ConfigValue::String(s) => Ok(s),
            _ => unreachable!("string read returned a non-string value"),
        }
    }

    pub fn get_integer(&self, key: &str) -> Result<i64> {
        match self.get(key, ValueKind::Integer)? {
            ConfigValue::Integer(i) => Ok(i),
            _ => unreachable!("integer read returned a non-integer value"),
        }
    }

    #[allow(dead_code)]
    pub fn get_boolean(&self, key: &str) -> Result<bool> {
        match self.get(key, ValueKind::Boolean)? {
            ConfigValue::Boolean(b) => Ok(b),
            _ => unreachable!("boolean read returned a non-boolean value"),
        }
    }

    /// Write `key`, marking the store dirty
    pub fn set(&mut self, key: &str, value: impl Into<ConfigValue>) {
        self.file
            .group
            .insert(key.to_string(), value.into().into_toml());
        self.dirty = true;
    }

    /// Write `value` only if `key` is absent. Returns whether anything was written.
    pub fn set_default_if_absent(&mut self, key: &str, value: impl Into<ConfigValue>) -> bool {
        if self.contains(key) {
            return false;
        }
        debug!("Writing default for '{}'", key);
        self.set(key, value);
        true
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the store to `path` if it has unsaved changes.
    ///
    /// Returns `Ok(true)` if the file was written, `Ok(false)` if there was nothing to do.
    pub fn flush(&mut self, path: &Path) -> std::result::Result<bool, PersistenceError> {
        if !self.dirty {
            debug!("Config unchanged, skipping write");
            return Ok(false);
        }

        let content = toml::to_string_pretty(&self.file)?;
        let write_error = |source| PersistenceError::Write {
            path: path.to_path_buf(),
            source,
        };

        let tmp_path = temp_path_for(path);
        fs::write(&tmp_path, content).map_err(write_error)?;
        if let Err(source) = fs::rename(&tmp_path, path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(write_error(source));
        }

        self.dirty = false;
        info!("Configuration saved to {}", path.display());
        Ok(true)
    }

    /// Watch `path` for changes made by other processes.
    ///
    /// `on_change` runs on the watcher thread after the externally-modified flag has
    /// been set. It must not touch the store.
    pub fn watch<F>(&mut self, path: &Path, on_change: F) -> std::result::Result<(), WatchError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let flag = Arc::clone(&self.externally_modified);
        let watcher = ConfigWatcher::new(path, move || {
            flag.store(true, Ordering::SeqCst);
            on_change();
        })?;
        self._watcher = Some(watcher);
        Ok(())
    }

    pub fn is_externally_modified(&self) -> bool {
        self.externally_modified.load(Ordering::SeqCst)
    }

    /// Read and clear the externally-modified flag
    pub fn take_external_modification(&self) -> bool {
        self.externally_modified.swap(false, Ordering::SeqCst)
    }

    /// Shared handle to the externally-modified flag
    #[allow(dead_code)]
    pub fn modification_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.externally_modified)
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| GROUP.to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

use crate::context::Scope;
use crate::session::History;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

pub const KEY_PREFIX: &str = "llm_sql_writer";
pub const GLOBAL_KEY: &str = "llm_sql_writer:global";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode history: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// String key/value persistence. Implementations decide the medium.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// How conversation history is partitioned across data sources and tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryScope {
    #[default]
    Global,
    PerScope,
}

pub fn storage_key(mode: HistoryScope, scope: &Scope) -> String {
    match (mode, &scope.data_source, &scope.table) {
        (HistoryScope::Global, _, _) | (HistoryScope::PerScope, None, _) => GLOBAL_KEY.to_string(),
        (HistoryScope::PerScope, Some(db), None) => format!("{KEY_PREFIX}:{db}"),
        (HistoryScope::PerScope, Some(db), Some(table)) => format!("{KEY_PREFIX}:{db}/{table}"),
    }
}

/// One JSON file per key inside a directory.
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

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }

    fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })
    }
}

fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' || byte == b'.' {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02x}"));
        }
    }
    out
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.key_path(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&path)(err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.ensure_dir()?;
        let final_path = self.key_path(key);
        let tmp_path = self.dir.join(format!("{}.json.tmp", encode_key(key)));

        fs::write(&tmp_path, value).map_err(io_error(&tmp_path))?;
        match fs::rename(&tmp_path, &final_path) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                if final_path.exists() {
                    fs::remove_file(&final_path).map_err(io_error(&final_path))?;
                    fs::rename(&tmp_path, &final_path).map_err(io_error(&final_path))
                } else {
                    Err(io_error(&final_path)(rename_err))
                }
            }
        }
    }
}

/// In-process store. `fail_reads` and `fail_writes` simulate an unavailable
/// or full medium.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value.to_string());
        store
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("storage disabled".to_string()));
        }
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("quota exceeded".to_string()));
        }
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

/// Reads and rewrites the whole history under a single key.
#[derive(Debug, Clone)]
pub struct HistoryStore<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> HistoryStore<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn for_scope(store: S, mode: HistoryScope, scope: &Scope) -> Self {
        Self::new(store, storage_key(mode, scope))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Missing, unreadable or malformed values all load as an empty history.
    pub fn load(&self) -> History {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return History::new(),
            Err(err) => {
                warn!(key = %self.key, error = %err, "history unreadable, starting empty");
                return History::new();
            }
        };

        match serde_json::from_str::<History>(&raw) {
            Ok(history) => {
                debug!(key = %self.key, turns = history.len(), "history loaded");
                history
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "stored history malformed, starting empty");
                History::new()
            }
        }
    }

    pub fn save(&self, history: &History) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(history)?;
        self.store.set(&self.key, &encoded)
    }
}

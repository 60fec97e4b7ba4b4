use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::filter::ExclusionList;
use crate::history::{History, HistoryEntry};

pub const STATE_FILE: &str = "state.json";
const HISTORY_KEY: &str = "history";
const EXCLUSIONS_KEY: &str = "excludedDomains";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed state: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// JSON key-value file shared by the reader and the CLI.
#[derive(Debug, Clone, Default)]
pub struct Store {
    path: Option<PathBuf>,
    values: Map<String, Value>,
}

impl Store {
    /// Opens the store at `path`; a missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let mut store = Self {
            path: Some(path.into()),
            values: Map::new(),
        };
        store.reload()?;
        Ok(store)
    }

    /// Store that never touches the disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn default_path(data_dir: &Path) -> PathBuf {
        data_dir.join(STATE_FILE)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Re-reads the file so edits made by another process are visible.
    pub fn reload(&mut self) -> StoreResult<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        self.values = match fs::read_to_string(path) {
            Ok(contents) if contents.trim().is_empty() => Map::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Map::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.clone(),
                    source,
                });
            }
        };
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.values.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> StoreResult<()> {
        self.values.insert(key.to_string(), serde_json::to_value(value)?);
        self.persist()
    }

    pub fn history(&self) -> History {
        self.get_or_default(HISTORY_KEY)
    }

    pub fn set_history(&mut self, history: &History) -> StoreResult<()> {
        self.set(HISTORY_KEY, history)
    }

    /// Reloads first so concurrent writers are not clobbered.
    pub fn record_history(&mut self, entry: HistoryEntry) -> StoreResult<()> {
        self.reload()?;
        let mut history = self.history();
        history.record(entry);
        self.set_history(&history)
    }

    pub fn exclusions(&self) -> ExclusionList {
        self.get_or_default(EXCLUSIONS_KEY)
    }

    pub fn set_exclusions(&mut self, exclusions: &ExclusionList) -> StoreResult<()> {
        self.set(EXCLUSIONS_KEY, exclusions)
    }

    fn get_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        self.get(key).map(Option::unwrap_or_default).unwrap_or_else(|err| {
            tracing::warn!(?err, key, "ignoring malformed stored value");
            T::default()
        })
    }

    fn persist(&self) -> StoreResult<()> {
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        let io_error = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let contents = serde_json::to_string_pretty(&self.values)?;
        fs::write(path, contents).map_err(io_error)?;
        tracing::debug!(?path, keys = self.values.len(), "state persisted");
        Ok(())
    }
}

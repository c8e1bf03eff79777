//! Host settings stores.
//!
//! The host keeps extension settings in one key-value record keyed by
//! extension name. The bridge only needs `load` and `save` on its own key.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::common::error::{SettingsError, SettingsResult};

/// Opaque key-value settings store owned by the host.
pub trait SettingsStore: Send + Sync {
    /// Load the value stored under `key`, if any.
    fn load(&self, key: &str) -> SettingsResult<Option<Value>>;

    /// Overwrite the value stored under `key`.
    fn save(&self, key: &str, value: Value) -> SettingsResult<()>;
}

/// Settings store backed by a single JSON object file.
///
/// Keys belonging to other extensions are preserved on save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn io_error(&self, source: std::io::Error) -> SettingsError {
        SettingsError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn read_all(&self) -> SettingsResult<Map<String, Value>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(self.io_error(e)),
        };

        if content.trim().is_empty() {
            return Ok(Map::new());
        }

        Ok(serde_json::from_str(&content)?)
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self, key: &str) -> SettingsResult<Option<Value>> {
        Ok(self.read_all()?.remove(key))
    }

    fn save(&self, key: &str, value: Value) -> SettingsResult<()> {
        let mut all = self.read_all()?;
        all.insert(key.to_string(), value);

        let content = serde_json::to_string_pretty(&Value::Object(all))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;

        debug!("Saved settings '{}' to {}", key, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
pub use memory::MemoryStore;

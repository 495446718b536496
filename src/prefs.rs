//! Persistent user preferences.
//!
//! Preferences live in a small JSON object keyed by name. Only boolean values
//! are read through [`PreferenceStore`]; unrelated keys already in the file are
//! preserved on save.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Key under which the overlay on/off switch is persisted.
pub const DISPLAY_ENABLED_KEY: &str = "isDisplayEnabled";

#[derive(thiserror::Error, Debug)]
pub enum PrefsError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed preferences file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Preference {0} is not a boolean")]
    NotABool(String),
}

/// Key-value store for boolean preferences.
pub trait PreferenceStore {
    /// Value stored under `key`, or `default` if the key was never saved.
    async fn load(&self, key: &str, default: bool) -> Result<bool, PrefsError>;

    async fn save(&self, key: &str, value: bool) -> Result<(), PrefsError>;
}

/// Default location of the preferences file.
pub fn default_prefs_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("timeoverlay")
        .join("prefs.json")
}

/// Preferences persisted to a JSON file.
#[derive(Debug, Clone)]
pub struct JsonPreferenceStore {
    path: PathBuf,
}

impl JsonPreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> PrefsError {
        PrefsError::Io { path: self.path.clone(), source }
    }

    async fn read_map(&self) -> Result<Map<String, Value>, PrefsError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            // First run - file doesn't exist yet
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    async fn write_map(&self, map: &Map<String, Value>) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| self.io_error(e))?;
        }
        let json = serde_json::to_string_pretty(map)?;
        // Write next to the target and rename so a crash never leaves half a file.
        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp).await.map_err(|e| self.io_error(e))?;
        file.write_all(json.as_bytes()).await.map_err(|e| self.io_error(e))?;
        file.flush().await.map_err(|e| self.io_error(e))?;
        drop(file);
        fs::rename(&tmp, &self.path).await.map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

impl PreferenceStore for JsonPreferenceStore {
    async fn load(&self, key: &str, default: bool) -> Result<bool, PrefsError> {
        match self.read_map().await?.get(key) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(value)) => Ok(*value),
            Some(_) => Err(PrefsError::NotABool(key.to_string())),
        }
    }

    async fn save(&self, key: &str, value: bool) -> Result<(), PrefsError> {
        // A corrupt file is replaced rather than blocking the save.
        let mut map = match self.read_map().await {
            Ok(map) => map,
            Err(PrefsError::Json(e)) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Replacing malformed preferences file");
                Map::new()
            }
            Err(e) => return Err(e),
        };
        map.insert(key.to_string(), Value::Bool(value));
        self.write_map(&map).await?;
        tracing::debug!(path = %self.path.display(), key, value, "Saved preference");
        Ok(())
    }
}

//! Plain JSON persistence for the settings blob.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A value of type `T` stored as a JSON file.
#[derive(Debug, Clone)]
pub struct JsonFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFile<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the value. A missing file yields `T::default()`; a file that is
    /// not valid JSON is reported and also yields the default.
    pub fn load(&self) -> Result<T, SettingsError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(T::default());
        }
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "unreadable settings, using defaults");
                Ok(T::default())
            }
        }
    }

    pub fn save(&self, value: &T) -> Result<(), SettingsError> {
        let io_err = |source: std::io::Error| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_string_pretty(value)?;
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(io_err)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn missing_file_is_default() {
        let temp = tempfile::tempdir().unwrap();
        let file = JsonFile::<Sample>::new(temp.path().join("nope.json"));
        assert_eq!(file.load().unwrap(), Sample::default());
    }

    #[test]
    fn partial_file_is_filled_from_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("s.json");
        fs::write(&path, r#"{"name":"x"}"#).unwrap();
        let loaded = JsonFile::<Sample>::new(&path).load().unwrap();
        assert_eq!(
            loaded,
            Sample {
                name: "x".into(),
                count: 0
            }
        );
    }

    #[test]
    fn garbage_falls_back_to_default() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("s.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(JsonFile::<Sample>::new(&path).load().unwrap(), Sample::default());
    }

    #[test]
    fn save_creates_parent_dirs_and_round_trips() {
        let temp = tempfile::tempdir().unwrap();
        let file = JsonFile::<Sample>::new(temp.path().join("nested/dir/s.json"));
        let value = Sample {
            name: "y".into(),
            count: 3,
        };
        file.save(&value).unwrap();
        assert_eq!(file.load().unwrap(), value);
    }
}

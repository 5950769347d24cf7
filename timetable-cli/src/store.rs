use std::path::{Path, PathBuf};

use timetable_core::{Error, Result, SavedState, store::Persistence};

const STATE_FILE: &str = "state.json";

/// Selection and theme kept as one JSON file in the user's data directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn with_default_dir(app_name: &str) -> Result<Self> {
        let dir = Self::get_default_data_dir(app_name)?;
        Ok(Self::new(dir.join(STATE_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn get_default_data_dir(app_name: &str) -> Result<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            if let Some(home) = std::env::var_os("HOME") {
                Ok(PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join(app_name))
            } else {
                Err(Error::Config("Cannot determine data directory".to_string()))
            }
        }

        #[cfg(target_os = "linux")]
        {
            if let Some(data_dir) = std::env::var_os("XDG_DATA_HOME") {
                Ok(PathBuf::from(data_dir).join(app_name))
            } else if let Some(home) = std::env::var_os("HOME") {
                Ok(PathBuf::from(home).join(".local").join("share").join(app_name))
            } else {
                Err(Error::Config("Cannot determine data directory".to_string()))
            }
        }

        #[cfg(target_os = "windows")]
        {
            if let Some(local_app_data) = std::env::var_os("LOCALAPPDATA") {
                Ok(PathBuf::from(local_app_data).join(app_name))
            } else {
                Err(Error::Config("Cannot determine data directory".to_string()))
            }
        }

        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            Err(Error::Config(
                "Unsupported operating system for data directory detection".to_string(),
            ))
        }
    }
}

impl Persistence for JsonFileStore {
    fn load(&self) -> Result<Option<SavedState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read(&self.path)?;
        match serde_json::from_slice::<SavedState>(&content) {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable state file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    fn save(&self, state: &SavedState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create state directory: {e}")))?;
        }

        let json = serde_json::to_vec_pretty(state)?;
        std::fs::write(&self.path, json)?;
        tracing::debug!("saved state to {}", self.path.display());
        Ok(())
    }
}

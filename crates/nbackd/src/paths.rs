//! Cross-platform application paths

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    data_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Result<Self, String> {
        let data_dir = Self::get_data_dir()?;
        Self::at(data_dir)
    }

    /// Use an explicit directory instead of the OS data dir.
    pub fn at(data_dir: impl Into<PathBuf>) -> Result<Self, String> {
        let data_dir = data_dir.into();

        // Ensure directory exists
        fs::create_dir_all(&data_dir)
            .map_err(|e| format!("Failed to create data directory: {}", e))?;

        Ok(Self { data_dir })
    }

    fn get_data_dir() -> Result<PathBuf, String> {
        let base = dirs::data_dir().ok_or("Could not determine data directory")?;
        Ok(base.join("nback"))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The one persisted artifact: the opaque settings token.
    pub fn settings_file(&self) -> PathBuf {
        self.data_dir.join("settings.token")
    }
}

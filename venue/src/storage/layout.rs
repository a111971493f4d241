//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::file::File;

/// On-disk layout under a single base directory
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Persisted session (access token and selected project)
    pub fn session_file(&self) -> File {
        File::new(self.base_dir.join("venue.json"))
    }

    /// User settings
    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }
}

impl Default for StorageLayout {
    /// `$VENUE_HOME`, falling back to `~/.venue`
    fn default() -> Self {
        if let Some(dir) = std::env::var_os("VENUE_HOME") {
            return Self::new(dir);
        }

        let base_dir = home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".venue");

        Self::new(base_dir)
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
}

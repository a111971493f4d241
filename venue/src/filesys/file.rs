//! JSON file access

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::errors::VenueError;

/// A file on disk holding a single JSON document
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Read and decode the file
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, VenueError> {
        let contents = fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Read and decode the file, or `None` if it does not exist yet
    pub async fn read_json_opt<T: DeserializeOwned>(&self) -> Result<Option<T>, VenueError> {
        match fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Encode and write the file through a temporary sibling so readers never
    /// observe a half-written document.
    pub async fn write_json<T: Serialize>(&self, value: &T) -> Result<(), VenueError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_vec_pretty(value)?;
        let temp_path = self.path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&contents).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    pub async fn delete(&self) -> Result<(), VenueError> {
        if self.exists().await {
            fs::remove_file(&self.path).await?;
        }
        Ok(())
    }

    /// Restrict the file to owner read/write (0o600). No-op off Unix.
    pub async fn set_permissions_600(&self) -> Result<(), VenueError> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path).await?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("venue-file-test-{}", std::process::id()))
            .join(name)
    }

    #[tokio::test]
    async fn test_read_missing_file_is_none() {
        let file = File::new(temp_path("missing.json"));
        let value: Option<BTreeMap<String, String>> = file.read_json_opt().await.unwrap();
        assert!(value.is_none());
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let file = File::new(temp_path("write.json"));
        let mut map = BTreeMap::new();
        map.insert("projectId".to_string(), "p1".to_string());

        file.write_json(&map).await.unwrap();
        let read: BTreeMap<String, String> = file.read_json().await.unwrap();
        assert_eq!(read, map);

        file.delete().await.unwrap();
        assert!(!file.exists().await);
    }
}

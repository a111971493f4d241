//! Persisted session: a small key-value store for the access token and the
//! selected project.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use crate::errors::VenueError;
use crate::filesys::file::File;

/// Keys held by the session store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionKey {
    AccessToken,
    ProjectId,
    ProjectName,
}

impl SessionKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionKey::AccessToken => "accessToken",
            SessionKey::ProjectId => "projectId",
            SessionKey::ProjectName => "projectName",
        }
    }
}

/// Key-value persistence for the session, trait for testability
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: SessionKey) -> Result<Option<String>, VenueError>;

    async fn set(&self, key: SessionKey, value: &str) -> Result<(), VenueError>;

    async fn delete(&self, key: SessionKey) -> Result<(), VenueError>;
}

/// Session store backed by a JSON object on disk. Every write is saved
/// immediately.
pub struct FileSessionStore {
    file: File,
    entries: AsyncMutex<BTreeMap<String, String>>,
}

impl FileSessionStore {
    /// Open the store, starting empty if the file does not exist
    pub async fn open(file: File) -> Result<Self, VenueError> {
        let entries = file
            .read_json_opt::<BTreeMap<String, String>>()
            .await
            .map_err(|e| {
                VenueError::StorageError(format!(
                    "Failed to read session file {}: {}",
                    file.path().display(),
                    e
                ))
            })?
            .unwrap_or_default();

        debug!("Loaded {} session keys from {}", entries.len(), file.path().display());

        Ok(Self {
            file,
            entries: AsyncMutex::new(entries),
        })
    }

    async fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), VenueError> {
        self.file.write_json(entries).await?;
        // holds the access token
        self.file.set_permissions_600().await
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn get(&self, key: SessionKey) -> Result<Option<String>, VenueError> {
        let entries = self.entries.lock().await;
        Ok(entries.get(key.as_str()).cloned())
    }

    async fn set(&self, key: SessionKey, value: &str) -> Result<(), VenueError> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.as_str().to_string(), value.to_string());
        self.save(&entries).await
    }

    async fn delete(&self, key: SessionKey) -> Result<(), VenueError> {
        let mut entries = self.entries.lock().await;
        if entries.remove(key.as_str()).is_some() {
            self.save(&entries).await?;
        }
        Ok(())
    }
}

/// In-memory session store
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<BTreeMap<SessionKey, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with the given entries
    pub fn with_entries(entries: &[(SessionKey, &str)]) -> Self {
        let map = entries
            .iter()
            .map(|(k, v)| (*k, v.to_string()))
            .collect();
        Self {
            entries: Mutex::new(map),
        }
    }

    /// Current value of a key without going through the async trait
    pub fn peek(&self, key: SessionKey) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&key).cloned()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: SessionKey) -> Result<Option<String>, VenueError> {
        Ok(self.peek(key))
    }

    async fn set(&self, key: SessionKey, value: &str) -> Result<(), VenueError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key, value.to_string());
        Ok(())
    }

    async fn delete(&self, key: SessionKey) -> Result<(), VenueError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(&key);
        Ok(())
    }
}

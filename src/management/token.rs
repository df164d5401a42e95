//! Storage for the single current credential: an in-memory copy for
//! reads, backed by a pluggable [`TokenPersistence`] for durability.

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;

use crate::{config, error::StorageError, types::Credential};

/// Durable backing for the current credential.
#[async_trait]
pub trait TokenPersistence: Send + Sync {
    /// Returns the persisted credential, or `None` if nothing is stored.
    async fn load(&self) -> Result<Option<Credential>, StorageError>;

    async fn save(&self, credential: &Credential) -> Result<(), StorageError>;

    /// Removes the persisted credential. Removing nothing is not an error.
    async fn remove(&self) -> Result<(), StorageError>;
}

/// Stores the credential as pretty-printed JSON on disk.
pub struct FileTokenPersistence {
    path: PathBuf,
}

impl FileTokenPersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `localify/cache/token.json` under the local data directory.
    pub fn default_location() -> Self {
        let mut path = config::data_dir();
        path.push("cache/token.json");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TokenPersistence for FileTokenPersistence {
    async fn load(&self) -> Result<Option<Credential>, StorageError> {
        let content = match async_fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let credential: Credential = serde_json::from_str(&content)?;
        Ok(Some(credential))
    }

    async fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        // write a sibling file, then rename it over the target
        let json = serde_json::to_string_pretty(credential)?;
        let tmp = self.path.with_extension("json.tmp");
        async_fs::write(&tmp, json).await?;
        async_fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn remove(&self) -> Result<(), StorageError> {
        match async_fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps the credential in process memory only.
#[derive(Default)]
pub struct MemoryTokenPersistence {
    slot: Mutex<Option<Credential>>,
}

#[async_trait]
impl TokenPersistence for MemoryTokenPersistence {
    async fn load(&self) -> Result<Option<Credential>, StorageError> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(credential.clone());
        Ok(())
    }

    async fn remove(&self) -> Result<(), StorageError> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        Ok(())
    }
}

/// Holds the current credential.
///
/// Reads take a short lock and clone; they never wait on persistence.
/// Writes are serialized, hit persistence first and only then replace the
/// in-memory value, so a failed write keeps the last-known-good credential.
pub struct TokenStore {
    current: Mutex<Option<Credential>>,
    write_lock: tokio::sync::Mutex<()>,
    persistence: Arc<dyn TokenPersistence>,
}

impl TokenStore {
    pub fn new(persistence: Arc<dyn TokenPersistence>) -> Self {
        Self {
            current: Mutex::new(None),
            write_lock: tokio::sync::Mutex::new(()),
            persistence,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenPersistence::default()))
    }

    /// Creates a store primed with whatever `persistence` already holds.
    pub async fn load(persistence: Arc<dyn TokenPersistence>) -> Result<Self, StorageError> {
        let stored = persistence.load().await?;
        let store = Self::new(persistence);
        *store.slot() = stored;
        Ok(store)
    }

    pub fn get(&self) -> Option<Credential> {
        self.slot().clone()
    }

    pub async fn set(&self, credential: Credential) -> Result<(), StorageError> {
        let _write = self.write_lock.lock().await;
        self.persistence.save(&credential).await?;
        *self.slot() = Some(credential);
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        let _write = self.write_lock.lock().await;
        self.slot().take();
        self.persistence.remove().await
    }

    fn slot(&self) -> MutexGuard<'_, Option<Credential>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

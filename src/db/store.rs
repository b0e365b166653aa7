// db/store.rs
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::{Mutex, MutexGuard};

use super::backend::KeyValueBackend;
use crate::error::StoreError;

/// Storage keys. Renaming any of these without a migration orphans the data
/// stored under the old name.
pub mod keys {
    pub const STUDENTS: &str = "students";
    pub const SUPERVISORS: &str = "supervisors";
    pub const COORDINATORS: &str = "coordinators";
    pub const CREDENTIALS: &str = "credentials";
    pub const REPORTS: &str = "reports";
    pub const CHATS: &str = "chats";
    pub const PAYMENTS: &str = "payments";
    pub const CURRENT_SESSION: &str = "current_session";

    pub const COLLECTIONS: [&str; 7] = [
        STUDENTS,
        SUPERVISORS,
        COORDINATORS,
        CREDENTIALS,
        REPORTS,
        CHATS,
        PAYMENTS,
    ];
}

/// JSON collections over a key-value backend.
///
/// Every collection is written whole. Read-modify-write sequences must run
/// inside [`RecordStore::transaction`] (or [`RecordStore::update_collection`])
/// so no other writer interleaves between the read and the write.
#[derive(Debug)]
pub struct RecordStore {
    backend: Arc<dyn KeyValueBackend>,
    namespace: String,
    write_lock: Mutex<()>,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn KeyValueBackend>, namespace: impl Into<String>) -> Self {
        RecordStore {
            backend,
            namespace: namespace.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn scoped(&self, key: &str) -> String {
        if self.namespace.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.namespace, key)
        }
    }

    pub async fn raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.backend.get(&self.scoped(key)).await
    }

    /// Absent keys read as an empty collection; malformed JSON is a
    /// `StoreError::Corruption` for that key.
    pub async fn get_collection<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        match self.raw(key).await? {
            None => Ok(Vec::new()),
            Some(data) => serde_json::from_str::<Vec<T>>(&data).map_err(|source| {
                tracing::error!("Corrupted collection under `{}`: {}", key, source);
                StoreError::Corruption {
                    key: key.to_string(),
                    source,
                }
            }),
        }
    }

    /// Serializes the whole collection before touching the backend, so a
    /// failed serialization leaves the stored value untouched.
    pub async fn put_collection<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StoreError> {
        let json = serde_json::to_string(items).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.backend.set(&self.scoped(key), json).await?;
        tracing::debug!("Store SET: {} ({} records)", key, items.len());
        Ok(())
    }

    pub async fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.raw(key).await? {
            None => Ok(None),
            Some(data) => serde_json::from_str::<T>(&data)
                .map(Some)
                .map_err(|source| StoreError::Corruption {
                    key: key.to_string(),
                    source,
                }),
        }
    }

    pub async fn put_value<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.backend.set(&self.scoped(key), json).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.backend.remove(&self.scoped(key)).await?;
        tracing::debug!("Store DELETE: {}", key);
        Ok(())
    }

    /// Takes the store-wide write lock for a multi-step write.
    pub async fn transaction(&self) -> StoreTransaction<'_> {
        StoreTransaction {
            store: self,
            _guard: self.write_lock.lock().await,
        }
    }

    /// Read-modify-write of one collection under the write lock. The closure's
    /// error aborts the write.
    pub async fn update_collection<T, R, E, F>(&self, key: &str, f: F) -> Result<R, E>
    where
        T: DeserializeOwned + Serialize,
        E: From<StoreError>,
        F: FnOnce(&mut Vec<T>) -> Result<R, E>,
    {
        let txn = self.transaction().await;
        let mut items = txn.get_collection::<T>(key).await?;
        let result = f(&mut items)?;
        txn.put_collection(key, &items).await?;
        Ok(result)
    }
}

/// Holds the write lock until dropped.
pub struct StoreTransaction<'a> {
    store: &'a RecordStore,
    _guard: MutexGuard<'a, ()>,
}

impl<'a> StoreTransaction<'a> {
    pub async fn get_collection<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        self.store.get_collection(key).await
    }

    pub async fn put_collection<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StoreError> {
        self.store.put_collection(key, items).await
    }

    pub async fn raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.store.raw(key).await
    }
}

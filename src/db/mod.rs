pub mod backend;
pub mod chatdb;
pub mod db;
pub mod paymentdb;
pub mod reportdb;
pub mod seed;
pub mod store;
pub mod userdb;

#[cfg(test)]
pub mod testutil {
    use std::sync::Arc;

    use tokio::sync::OnceCell;

    use super::{
        backend::MemoryBackend,
        db::DBClient,
        store::{keys, RecordStore},
    };

    static SEEDED: OnceCell<Vec<(String, String)>> = OnceCell::const_new();

    /// Raw fixture entries, seeded once per test binary so argon2 hashing of
    /// the fixture secrets runs a single time.
    pub async fn seeded_entries() -> Vec<(String, String)> {
        SEEDED
            .get_or_init(|| async {
                let store = RecordStore::new(Arc::new(MemoryBackend::new()), "test");
                store.seed_if_empty().await.unwrap();
                let mut entries = Vec::new();
                for key in keys::COLLECTIONS {
                    let raw = store.raw(key).await.unwrap().unwrap();
                    entries.push((format!("test:{}", key), raw));
                }
                entries
            })
            .await
            .clone()
    }

    pub async fn seeded_store() -> RecordStore {
        RecordStore::new(Arc::new(MemoryBackend::with_entries(seeded_entries().await)), "test")
    }

    /// Memory-backed client holding the fixture data.
    pub async fn seeded_client() -> Arc<DBClient> {
        Arc::new(DBClient::new(seeded_store().await))
    }
}

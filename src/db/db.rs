// db/db.rs
use std::sync::Arc;

use super::store::RecordStore;

#[derive(Debug, Clone)]
pub struct DBClient {
    pub store: Arc<RecordStore>,
}

impl DBClient {
    pub fn new(store: RecordStore) -> Self {
        DBClient {
            store: Arc::new(store),
        }
    }
}

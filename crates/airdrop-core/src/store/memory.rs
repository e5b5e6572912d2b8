use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::tokens::TokenRecord;

use super::RecordStore;

/// Process-local backend. Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<Vec<TokenRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing collection, e.g. a snapshot bundled with a
    /// deployment.
    pub fn with_records(records: Vec<TokenRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn load_all(&self) -> Result<Vec<TokenRecord>, StoreError> {
        Ok(self.records.read().await.clone())
    }

    async fn save_all(&self, records: &[TokenRecord]) -> Result<(), StoreError> {
        *self.records.write().await = records.to_vec();
        Ok(())
    }
}

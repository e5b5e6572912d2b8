//! Shared test helpers for `airdrop-core` unit tests.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::RecordStore;
use crate::tokens::TokenRecord;

/// A bare record with no metadata and no accounts.
pub fn make_record(token: &str, created_at: i64) -> TokenRecord {
    TokenRecord {
        token: token.to_string(),
        created_at,
        updated_at: created_at,
        name: String::new(),
        desc: String::new(),
        end_time: None,
        end_time_history: Vec::new(),
        acounts_max: None,
        acounts: Vec::new(),
    }
}

/// Loads an empty collection and refuses every save.
pub struct FailingStore;

#[async_trait]
impl RecordStore for FailingStore {
    async fn load_all(&self) -> Result<Vec<TokenRecord>, StoreError> {
        Ok(Vec::new())
    }

    async fn save_all(&self, _records: &[TokenRecord]) -> Result<(), StoreError> {
        Err(StoreError::Io {
            path: "unwritable".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only medium"),
        })
    }
}

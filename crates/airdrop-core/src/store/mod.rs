//! Snapshot persistence for token records.
//!
//! Defines the [`RecordStore`] trait and two backends: [`FileStore`]
//! (pretty-printed JSON on disk) and [`MemoryStore`] (process-local).
//! Stores enforce no business rules; every call moves the whole collection.

mod file;
mod memory;

pub use file::{decode_records, FileStore};
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::tokens::TokenRecord;

/// Whole-collection persistence boundary used by the token service.
///
/// Implementations do no locking of their own beyond what keeps a single
/// call atomic; callers serialize load/save sequences themselves.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Return an owned copy of every stored record.
    async fn load_all(&self) -> Result<Vec<TokenRecord>, StoreError>;

    /// Replace the stored collection with `records`.
    async fn save_all(&self, records: &[TokenRecord]) -> Result<(), StoreError>;
}

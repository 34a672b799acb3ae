//! File store contract and change feed.
//!
//! The versioned file store itself lives in the host application; the cache
//! only needs existence checks, raw reads, and the change events the host
//! forwards from its transaction stream.

use crate::error::StoreError;
use crate::types::Version;
use async_trait::async_trait;

/// Read access to the host's transactional file store.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Whether `path` currently exists in the store.
    async fn exists(&self, path: &str) -> Result<bool, StoreError>;

    /// Raw file contents. Implementations return
    /// [`StoreError::NotFound`] for missing paths.
    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError>;
}

/// Change events forwarded from the store's transaction stream.
///
/// Every open item session consumes the same broadcast feed and filters for
/// relevance on its own; no dispatch ordering is assumed across sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A single path changed, with the store version it changed at.
    FileChanged { path: String, version: Version },
    /// A transaction committed; any number of paths may have shifted.
    TransactionCommitted,
}

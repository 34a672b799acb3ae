//! Error taxonomy for resolution, store access, and session orchestration.

use thiserror::Error;

/// Errors surfaced by [`FileStore`](crate::store::FileStore) and
/// [`RootResolver`](crate::resolver::RootResolver) implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("path not present in store: {0}")]
    NotFound(String),

    #[error("dependency resolution failed: {0}")]
    Resolution(String),

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Errors surfaced at the session boundary.
///
/// A rejected unsaved-change confirmation is not an error; it is reported as
/// `Ok(false)` by the operations that can be gated.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("item load failed: {0}")]
    Load(#[from] StoreError),

    #[error("no item loaded")]
    NoItem,

    #[error("configuration error: {0}")]
    Config(String),
}

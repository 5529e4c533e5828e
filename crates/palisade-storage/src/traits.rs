//! Storage abstraction trait
//!
//! This module defines the Storage trait that the upload gate places
//! provisional and accepted files through.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use thiserror::Error;
use tokio::io::AsyncRead;

/// Boxed byte source handed to [`Storage::put_stream`].
pub type ContentReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A file written by [`Storage::put_stream`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub path: PathBuf,
    pub bytes_written: u64,
    /// The source still had data after `limit` bytes. The file holds
    /// `limit + 1` bytes in that case and must be discarded by the caller.
    pub exceeded_limit: bool,
}

/// Storage abstraction trait
///
/// Backends never overwrite an existing file and never resolve a key outside
/// their root. Keys are plain file names; see the crate root documentation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Stream `reader` into a new file named after `filename`.
    ///
    /// If the name is taken, a unique variant (`stem-1.ext`, `stem-2.ext`, ...)
    /// is reserved instead; the chosen key is returned. At most `limit + 1`
    /// bytes are read so an oversized source is detected without being drained.
    async fn put_stream(
        &self,
        filename: &str,
        reader: ContentReader,
        limit: u64,
    ) -> StorageResult<StoredObject>;

    /// Read the first `max_bytes` bytes of a file (fewer if it is shorter).
    async fn read_prefix(&self, storage_key: &str, max_bytes: usize) -> StorageResult<Vec<u8>>;

    /// Delete a file synchronously. Deleting a missing file is not an error.
    ///
    /// Used for rollback from contexts that cannot await, such as `Drop`.
    fn discard(&self, storage_key: &str) -> StorageResult<()>;

    /// Check if a file exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Root directory all keys resolve under.
    fn root(&self) -> &Path;
}

use crate::keys;
use crate::traits::{ContentReader, Storage, StorageError, StorageResult, StoredObject};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Local filesystem storage implementation
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    canonical_base: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for accepted files (e.g., "uploads"). Created if absent.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        let canonical_base = fs::canonicalize(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        Ok(LocalStorage {
            base_path,
            canonical_base,
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// This function validates that the storage key is a plain file name and,
    /// when the file already exists, that it does not resolve (e.g. through a
    /// symlink) outside the base storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        keys::validate_key(storage_key)?;

        let path = self.base_path.join(storage_key);

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&self.canonical_base).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Atomically claim the first free candidate name for `filename`.
    async fn reserve(&self, filename: &str) -> StorageResult<(String, PathBuf, fs::File)> {
        for key in keys::candidate_keys(filename) {
            let path = self.key_to_path(&key)?;
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => return Ok((key, path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    tracing::debug!(key = %key, "Storage key taken, trying next candidate");
                    continue;
                }
                Err(e) => {
                    return Err(StorageError::UploadFailed(format!(
                        "Failed to create file {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }

        Err(StorageError::UploadFailed(format!(
            "No free storage key for {}",
            filename
        )))
    }

    async fn write_stream(
        file: &mut fs::File,
        reader: ContentReader,
        limit: u64,
    ) -> std::io::Result<u64> {
        let mut limited = reader.take(limit.saturating_add(1));
        let bytes_copied = tokio::io::copy(&mut limited, file).await?;
        file.flush().await?;
        file.sync_all().await?;
        Ok(bytes_copied)
    }
}

/// Reserved file that is removed on drop unless [`PartialFile::keep`] is called.
struct PartialFile {
    path: Option<PathBuf>,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn keep(mut self) {
        self.path = None;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    condition = "CleanupFailure",
                    "Failed to remove partially written file"
                );
            }
        }
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put_stream(
        &self,
        filename: &str,
        reader: ContentReader,
        limit: u64,
    ) -> StorageResult<StoredObject> {
        keys::validate_key(filename)?;
        let start = std::time::Instant::now();

        let (key, path, mut file) = self.reserve(filename).await?;
        // Removes the file if the write fails or this future is dropped.
        let partial = PartialFile::new(path.clone());

        let bytes_written = Self::write_stream(&mut file, reader, limit)
            .await
            .map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to write stream to file {}: {}",
                    path.display(),
                    e
                ))
            })?;
        drop(file);
        partial.keep();

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = bytes_written,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage stream upload successful"
        );

        Ok(StoredObject {
            key,
            path,
            bytes_written,
            exceeded_limit: bytes_written > limit,
        })
    }

    async fn read_prefix(&self, storage_key: &str, max_bytes: usize) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(storage_key)?;

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "Failed to open file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let mut data = Vec::with_capacity(max_bytes);
        file.take(max_bytes as u64)
            .read_to_end(&mut data)
            .await
            .map_err(|e| {
                StorageError::ReadFailed(format!("Failed to read file {}: {}", path.display(), e))
            })?;

        Ok(data)
    }

    fn discard(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;

        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(key = %storage_key, "Local storage discard successful");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    fn root(&self) -> &Path {
        &self.base_path
    }
}

use crate::{LocalStorage, Storage, StorageResult};
use palisade_core::GateConfig;
use std::sync::Arc;

/// Create the storage backend for the configured storage root
pub async fn create_storage(config: &GateConfig) -> StorageResult<Arc<dyn Storage>> {
    let storage = LocalStorage::new(config.storage_root.clone()).await?;

    tracing::info!(
        root = %config.storage_root.display(),
        "Initialized local upload storage"
    );

    Ok(Arc::new(storage))
}

use std::sync::Arc;

use palisade_core::RejectReason;
use palisade_storage::Storage;

/// Provisional file that is deleted unless explicitly committed.
///
/// Covers every exit path: explicit rejection, `?` early returns, panics
/// and the pipeline future being dropped on timeout.
pub(crate) struct Quarantine {
    storage: Arc<dyn Storage>,
    key: Option<String>,
}

impl Quarantine {
    pub(crate) fn new(storage: Arc<dyn Storage>, key: String) -> Self {
        Self {
            storage,
            key: Some(key),
        }
    }

    pub(crate) fn key(&self) -> &str {
        self.key.as_deref().unwrap_or_default()
    }

    /// Keep the file; returns its key.
    pub(crate) fn commit(mut self) -> String {
        self.key.take().unwrap_or_default()
    }

    /// Delete the file now and hand back `reason` for the verdict.
    pub(crate) fn reject(mut self, reason: RejectReason) -> RejectReason {
        self.release();
        reason
    }

    fn release(&mut self) {
        let Some(key) = self.key.take() else {
            return;
        };

        match self.storage.discard(&key) {
            Ok(()) => tracing::debug!(key = %key, "Removed provisional file"),
            Err(e) => tracing::error!(
                key = %key,
                error = %e,
                condition = "CleanupFailure",
                "Failed to remove provisional file"
            ),
        }
    }
}

impl Drop for Quarantine {
    fn drop(&mut self) {
        self.release();
    }
}

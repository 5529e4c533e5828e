//! Upload pipeline: gate → sanitize → materialize → classify → verify → commit.
//!
//! [`UploadGate::admit`] is the only way a file reaches the storage root. Every
//! request yields exactly one [`ValidationVerdict`]; nothing is left on disk
//! unless that verdict is `Accepted`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use palisade_core::constants::SNIFF_PREFIX_LEN;
use palisade_core::{
    ErrorMetadata, ExtensionRecord, GateConfig, LogLevel, RejectReason, StoredArtifact,
    ValidationVerdict,
};
use palisade_storage::Storage;
use uuid::Uuid;

use super::quarantine::Quarantine;
use super::types::{InspectionReport, UploadRequest};
use crate::classifier::{Classification, ContentClassifier, ContentSniffer, InferSniffer};
use crate::sanitize::sanitize_filename;
use crate::structural::StructuralValidator;
use crate::validator::ExtensionGate;

/// Upload acceptance gate. Cheap to clone and safe to share between tasks.
#[derive(Clone)]
pub struct UploadGate {
    config: Arc<GateConfig>,
    gate: ExtensionGate,
    classifier: ContentClassifier,
    structural: StructuralValidator,
    storage: Arc<dyn Storage>,
}

impl UploadGate {
    pub fn new(
        config: GateConfig,
        storage: Arc<dyn Storage>,
        sniffer: Arc<dyn ContentSniffer>,
    ) -> Self {
        let gate = ExtensionGate::new(Arc::new(config.extensions.clone()));
        let structural = StructuralValidator::from_config(&config);
        Self {
            config: Arc::new(config),
            gate,
            classifier: ContentClassifier::new(sniffer),
            structural,
            storage,
        }
    }

    /// Gate using the `infer` signature database for MIME sniffing.
    pub fn with_default_sniffer(config: GateConfig, storage: Arc<dyn Storage>) -> Self {
        Self::new(config, storage, Arc::new(InferSniffer))
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Run the full pipeline for one upload.
    pub async fn admit(&self, request: UploadRequest) -> ValidationVerdict {
        let start = Instant::now();
        let claimed = request.claimed_filename.clone();

        let verdict =
            match tokio::time::timeout(self.config.pipeline_timeout, self.run(request)).await {
                Ok(Ok(artifact)) => ValidationVerdict::Accepted { artifact },
                Ok(Err(reason)) => ValidationVerdict::rejected(reason),
                Err(_) => {
                    tracing::warn!(
                        filename = %claimed,
                        timeout_secs = self.config.pipeline_timeout.as_secs_f64(),
                        "Upload pipeline timed out"
                    );
                    ValidationVerdict::rejected(RejectReason::TimedOut)
                }
            };

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        match &verdict {
            ValidationVerdict::Accepted { artifact } => tracing::info!(
                filename = %claimed,
                storage_key = %artifact.storage_key,
                mime_type = %artifact.mime_type,
                size_bytes = artifact.size_bytes,
                duration_ms = duration_ms,
                "Upload accepted"
            ),
            ValidationVerdict::Rejected { reason } => log_rejection(&claimed, *reason, duration_ms),
        }

        verdict
    }

    async fn run(&self, request: UploadRequest) -> Result<StoredArtifact, RejectReason> {
        let UploadRequest {
            claimed_filename,
            content,
            declared_length,
        } = request;

        if claimed_filename.trim().is_empty() {
            return Err(RejectReason::EmptyOrUnsafeFilename);
        }

        let record = self.gate.validate(&claimed_filename)?;

        if declared_length.is_some_and(|len| len > self.config.max_upload_bytes) {
            tracing::debug!(
                declared_length = ?declared_length,
                max_upload_bytes = self.config.max_upload_bytes,
                "Declared length exceeds upload limit"
            );
            return Err(RejectReason::SizeLimitExceeded);
        }

        let name = storage_name(&claimed_filename, record);
        let limit = self.effective_limit(declared_length);

        let stored = self
            .storage
            .put_stream(&name, content.into_reader(), limit)
            .await
            .map_err(|e| {
                tracing::error!(name = %name, error = %e, "Failed to materialize upload");
                RejectReason::StorageIoFailure
            })?;
        let quarantine = Quarantine::new(self.storage.clone(), stored.key.clone());

        if stored.exceeded_limit {
            tracing::debug!(
                key = %stored.key,
                limit = limit,
                "Upload stream exceeded limit"
            );
            return Err(quarantine.reject(RejectReason::SizeLimitExceeded));
        }

        let prefix = match self
            .storage
            .read_prefix(quarantine.key(), SNIFF_PREFIX_LEN)
            .await
        {
            Ok(prefix) => prefix,
            Err(e) => {
                tracing::error!(key = %stored.key, error = %e, "Failed to read provisional file");
                return Err(quarantine.reject(RejectReason::StorageIoFailure));
            }
        };

        let classification = match self.classify(record, &prefix) {
            Ok(classification) => classification,
            Err(reason) => return Err(quarantine.reject(reason)),
        };

        if let Err(reason) = self.verify_stored(record, &stored.path, limit).await {
            return Err(quarantine.reject(reason));
        }

        let storage_key = quarantine.commit();
        Ok(StoredArtifact {
            storage_key,
            path: stored.path,
            original_filename: claimed_filename,
            size_bytes: stored.bytes_written,
            mime_type: classification.mime_type,
            stored_at: Utc::now(),
        })
    }

    /// Run every content check on an in-memory file without touching storage.
    pub async fn inspect(
        &self,
        claimed_filename: &str,
        data: Vec<u8>,
    ) -> Result<InspectionReport, RejectReason> {
        if claimed_filename.trim().is_empty() {
            return Err(RejectReason::EmptyOrUnsafeFilename);
        }

        let record = self.gate.validate(claimed_filename)?;

        let size_bytes = data.len() as u64;
        if size_bytes > self.config.max_upload_bytes {
            return Err(RejectReason::SizeLimitExceeded);
        }

        let prefix = &data[..data.len().min(SNIFF_PREFIX_LEN)];
        let classification = self.classify(record, prefix)?;
        self.verify_structure(record, data).await?;

        Ok(InspectionReport {
            claimed_filename: claimed_filename.to_string(),
            extension: record.extension.clone(),
            storage_name: storage_name(claimed_filename, record),
            mime_type: classification.mime_type,
            size_bytes,
            structure: record.structure,
        })
    }

    /// MIME and magic-byte checks on a file's leading bytes. A panicking
    /// sniffer counts as unclassifiable content.
    fn classify(
        &self,
        record: &ExtensionRecord,
        prefix: &[u8],
    ) -> Result<Classification, RejectReason> {
        catch_unwind(AssertUnwindSafe(|| {
            self.classifier.classify(Some(record), prefix)
        }))
        .unwrap_or_else(|_| {
            tracing::error!(extension = %record.extension, "Content sniffer panicked");
            Err(RejectReason::MimeMismatch)
        })
    }

    /// Structural check of the materialized file, on the blocking pool.
    async fn verify_stored(
        &self,
        record: &ExtensionRecord,
        path: &Path,
        max_bytes: u64,
    ) -> Result<(), RejectReason> {
        if record.structure.is_none() {
            return Ok(());
        }

        let structural = self.structural.clone();
        let record = record.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || structural.verify(&record, &path, max_bytes))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Structural validation task failed");
                RejectReason::StructuralCorruption
            })?
    }

    /// In-memory structural check, on the blocking pool.
    async fn verify_structure(
        &self,
        record: &ExtensionRecord,
        data: Vec<u8>,
    ) -> Result<(), RejectReason> {
        if record.structure.is_none() {
            return Ok(());
        }

        let structural = self.structural.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || structural.check(&record, &data))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Structural validation task failed");
                RejectReason::StructuralCorruption
            })?
    }

    /// Bytes to read for a request: the declared length if it is smaller than
    /// the configured cap.
    fn effective_limit(&self, declared_length: Option<u64>) -> u64 {
        declared_length
            .map(|len| len.min(self.config.max_upload_bytes))
            .unwrap_or(self.config.max_upload_bytes)
    }
}

impl std::fmt::Debug for UploadGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadGate")
            .field("storage_root", &self.storage.root())
            .field("extensions", &self.gate.table().extensions())
            .finish_non_exhaustive()
    }
}

/// Sanitized storage name for `claimed`, falling back to `<uuid>.<ext>` when
/// sanitization lost the claimed extension.
fn storage_name(claimed: &str, record: &ExtensionRecord) -> String {
    let sanitized = sanitize_filename(claimed);
    if ExtensionGate::claimed_extension(&sanitized).as_deref() == Some(record.extension.as_str()) {
        sanitized
    } else {
        format!("{}.{}", Uuid::new_v4(), record.extension)
    }
}

fn log_rejection(filename: &str, reason: RejectReason, duration_ms: f64) {
    let error_code = reason.error_code();
    match reason.log_level() {
        LogLevel::Debug => tracing::debug!(
            filename = %filename,
            reason = %reason,
            error_code = error_code,
            duration_ms = duration_ms,
            "Upload rejected"
        ),
        LogLevel::Warn => tracing::warn!(
            filename = %filename,
            reason = %reason,
            error_code = error_code,
            duration_ms = duration_ms,
            "Upload rejected"
        ),
        LogLevel::Error => tracing::error!(
            filename = %filename,
            reason = %reason,
            error_code = error_code,
            duration_ms = duration_ms,
            "Upload rejected"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_name_keeps_sanitized_name() {
        let png = ExtensionRecord::builtin("png").unwrap();
        assert_eq!(storage_name("../../photo.png", &png), "photo.png");
        assert_eq!(storage_name("My Photo.PNG", &png), "My_Photo.PNG");
    }

    #[test]
    fn test_storage_name_falls_back_to_uuid() {
        let png = ExtensionRecord::builtin("png").unwrap();
        let name = storage_name(".png", &png);
        assert!(name.ends_with(".png"));
        let stem = name.trim_end_matches(".png");
        assert!(Uuid::parse_str(stem).is_ok(), "{}", name);
    }
}

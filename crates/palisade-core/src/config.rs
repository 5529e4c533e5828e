//! Configuration module
//!
//! [`GateConfig`] is built once at startup (from the environment or in code)
//! and handed to the pipeline explicitly. Nothing in Palisade reads
//! configuration from global state after that point.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{DEFAULT_ALLOWED_EXTENSIONS, DEFAULT_UPLOAD_FOLDER};
use crate::extension::ExtensionTable;

// Common constants
const MAX_UPLOAD_SIZE_MB: u64 = 10;
const PIPELINE_TIMEOUT_SECS: u64 = 30;
const MAX_IMAGE_DIMENSION: u32 = 16_384;
const MAX_DECODE_ALLOC_MB: u64 = 256;

/// Upload gate configuration
#[derive(Clone, Debug)]
pub struct GateConfig {
    /// Directory accepted files are written to. Created if absent.
    pub storage_root: PathBuf,
    /// Allow-list of extensions and their content expectations.
    pub extensions: ExtensionTable,
    /// Hard cap on the number of bytes read from one upload.
    pub max_upload_bytes: u64,
    /// Wall-clock budget for one pipeline run.
    pub pipeline_timeout: Duration,
    /// Largest width or height the image decoder will accept.
    pub max_image_dimension: u32,
    /// Largest allocation the image decoder may make.
    pub max_decode_alloc_bytes: u64,
}

impl GateConfig {
    /// Configuration with default limits and the default image allow-list.
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            storage_root: storage_root.into(),
            extensions: ExtensionTable::from_extensions(DEFAULT_ALLOWED_EXTENSIONS)
                .unwrap_or_default(),
            max_upload_bytes: MAX_UPLOAD_SIZE_MB * 1024 * 1024,
            pipeline_timeout: Duration::from_secs(PIPELINE_TIMEOUT_SECS),
            max_image_dimension: MAX_IMAGE_DIMENSION,
            max_decode_alloc_bytes: MAX_DECODE_ALLOC_MB * 1024 * 1024,
        }
    }

    pub fn with_extensions(mut self, extensions: ExtensionTable) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: u64) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn with_pipeline_timeout(mut self, pipeline_timeout: Duration) -> Self {
        self.pipeline_timeout = pipeline_timeout;
        self
    }

    pub fn with_max_image_dimension(mut self, max_image_dimension: u32) -> Self {
        self.max_image_dimension = max_image_dimension;
        self
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source. `from_env` uses the process
    /// environment; tests pass a map.
    pub fn from_vars<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage_root = var("UPLOAD_FOLDER")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_UPLOAD_FOLDER.to_string());

        let extensions = match var("ALLOWED_EXTENSIONS") {
            Some(list) => ExtensionTable::from_extensions(list.split(','))?,
            None => ExtensionTable::from_extensions(DEFAULT_ALLOWED_EXTENSIONS)?,
        };

        let max_upload_size_mb = var("MAX_UPLOAD_SIZE_MB")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(MAX_UPLOAD_SIZE_MB);

        let pipeline_timeout_secs = var("PIPELINE_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(PIPELINE_TIMEOUT_SECS);

        let max_decode_alloc_mb = var("MAX_DECODE_ALLOC_MB")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(MAX_DECODE_ALLOC_MB);

        let config = GateConfig {
            storage_root: PathBuf::from(storage_root),
            extensions,
            max_upload_bytes: max_upload_size_mb.saturating_mul(1024 * 1024),
            pipeline_timeout: Duration::from_secs(pipeline_timeout_secs),
            max_image_dimension: var("MAX_IMAGE_DIMENSION")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(MAX_IMAGE_DIMENSION),
            max_decode_alloc_bytes: max_decode_alloc_mb.saturating_mul(1024 * 1024),
        };

        config.validate()?;

        tracing::debug!(
            storage_root = %config.storage_root.display(),
            extensions = ?config.extensions.extensions(),
            max_upload_bytes = config.max_upload_bytes,
            "Loaded upload gate configuration"
        );

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.extensions.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_EXTENSIONS must name at least one extension"
            ));
        }

        if self.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_SIZE_MB must be greater than 0"));
        }

        if self.pipeline_timeout.is_zero() {
            return Err(anyhow::anyhow!(
                "PIPELINE_TIMEOUT_SECS must be greater than 0"
            ));
        }

        if self.max_image_dimension == 0 {
            return Err(anyhow::anyhow!("MAX_IMAGE_DIMENSION must be greater than 0"));
        }

        if self.max_decode_alloc_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_DECODE_ALLOC_MB must be greater than 0"));
        }

        if self.storage_root.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("UPLOAD_FOLDER must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<GateConfig, anyhow::Error> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GateConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.storage_root, PathBuf::from("uploads"));
        assert_eq!(config.extensions.extensions(), vec!["gif", "jpeg", "jpg", "png"]);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.pipeline_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("UPLOAD_FOLDER", "/srv/uploads"),
            ("ALLOWED_EXTENSIONS", "png, PDF"),
            ("MAX_UPLOAD_SIZE_MB", "2"),
            ("PIPELINE_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.storage_root, PathBuf::from("/srv/uploads"));
        assert_eq!(config.extensions.extensions(), vec!["pdf", "png"]);
        assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
        assert_eq!(config.pipeline_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_unparseable_numbers_fall_back_to_defaults() {
        let config = config_from(&[("MAX_UPLOAD_SIZE_MB", "lots")]).unwrap();
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        assert!(config_from(&[("ALLOWED_EXTENSIONS", "png,py")]).is_err());
    }

    #[test]
    fn test_empty_allow_list_is_rejected() {
        assert!(config_from(&[("ALLOWED_EXTENSIONS", " , ")]).is_err());
    }

    #[test]
    fn test_zero_size_limit_is_rejected() {
        assert!(config_from(&[("MAX_UPLOAD_SIZE_MB", "0")]).is_err());
    }

    #[test]
    fn test_new_uses_image_allow_list() {
        let config = GateConfig::new("/tmp/x");
        assert!(config.validate().is_ok());
        assert!(config.extensions.contains("png"));
        assert!(!config.extensions.contains("pdf"));
    }
}

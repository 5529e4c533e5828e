//! Structural validation.
//!
//! A file passes only if it decodes completely under resource limits *and* its
//! container ends exactly where the file does. Signatures and sniffed types
//! only look at a prefix; this is the stage that reads everything.

mod container;

use std::io::{Cursor, Read};
use std::path::Path;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageDecoder, ImageFormat, ImageReader, Limits};
use palisade_core::{ExtensionRecord, GateConfig, RejectReason, StructureKind};
use thiserror::Error;

pub use container::container_len;

#[derive(Debug, Error)]
pub enum StructuralError {
    #[error("Decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("{format} container ends at byte {end} but file has {len} bytes")]
    TrailingData {
        format: StructureKind,
        end: usize,
        len: usize,
    },

    #[error("Malformed {format} container: {detail}")]
    Malformed {
        format: StructureKind,
        detail: &'static str,
    },
}

/// Full decode plus container-length check.
#[derive(Clone, Debug)]
pub struct StructuralValidator {
    max_dimension: u32,
    max_alloc: u64,
}

impl StructuralValidator {
    pub fn new(max_dimension: u32, max_alloc: u64) -> Self {
        Self {
            max_dimension,
            max_alloc,
        }
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(config.max_image_dimension, config.max_decode_alloc_bytes)
    }

    fn limits(&self) -> Limits {
        let mut limits = Limits::default();
        limits.max_image_width = Some(self.max_dimension);
        limits.max_image_height = Some(self.max_dimension);
        limits.max_alloc = Some(self.max_alloc);
        limits
    }

    /// Check that `data` is one complete, decodable `kind` container.
    pub fn verify_bytes(&self, kind: StructureKind, data: &[u8]) -> Result<(), StructuralError> {
        let end = container_len(kind, data)?;
        if end != data.len() {
            return Err(StructuralError::TrailingData {
                format: kind,
                end,
                len: data.len(),
            });
        }

        match kind {
            // Every frame, not just the first.
            StructureKind::Gif => {
                let mut decoder = GifDecoder::new(Cursor::new(data))?;
                decoder.set_limits(self.limits())?;
                for frame in decoder.into_frames() {
                    frame?;
                }
            }
            StructureKind::Png => self.decode_still(data, ImageFormat::Png)?,
            StructureKind::Jpeg => self.decode_still(data, ImageFormat::Jpeg)?,
        }

        Ok(())
    }

    fn decode_still(&self, data: &[u8], format: ImageFormat) -> Result<(), StructuralError> {
        let mut reader = ImageReader::with_format(Cursor::new(data), format);
        reader.limits(self.limits());
        reader.decode()?;
        Ok(())
    }

    /// Check in-memory content against `record`. Types without a structural
    /// parser pass unchanged.
    pub fn check(&self, record: &ExtensionRecord, data: &[u8]) -> Result<(), RejectReason> {
        let Some(kind) = record.structure else {
            return Ok(());
        };

        self.verify_bytes(kind, data).map_err(|e| {
            tracing::warn!(
                extension = %record.extension,
                error = %e,
                "Structural validation failed"
            );
            RejectReason::StructuralCorruption
        })
    }

    /// Read the file at `path` (at most `max_bytes`) and [`check`](Self::check) it.
    ///
    /// Blocking; call from `spawn_blocking` in async contexts.
    pub fn verify(
        &self,
        record: &ExtensionRecord,
        path: &Path,
        max_bytes: u64,
    ) -> Result<(), RejectReason> {
        if record.structure.is_none() {
            return Ok(());
        }

        let data = read_bounded(path, max_bytes).map_err(|e| {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "Failed to read file for structural validation"
            );
            RejectReason::StorageIoFailure
        })?;

        self.check(record, &data)
    }
}

fn read_bounded(path: &Path, max_bytes: u64) -> std::io::Result<Vec<u8>> {
    let mut data = Vec::new();
    std::fs::File::open(path)?
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut data)?;
    if data.len() as u64 > max_bytes {
        return Err(std::io::Error::other(format!(
            "file exceeds {} bytes",
            max_bytes
        )));
    }
    Ok(data)
}

//! Types for the upload pipeline.

use std::io::Cursor;

use bytes::Bytes;
use palisade_core::StructureKind;
use palisade_storage::ContentReader;
use serde::Serialize;

/// Upload body: fully buffered, or a stream read at most once.
pub enum UploadContent {
    Buffer(Bytes),
    Stream(ContentReader),
}

impl UploadContent {
    pub fn into_reader(self) -> ContentReader {
        match self {
            UploadContent::Buffer(bytes) => Box::pin(Cursor::new(bytes)),
            UploadContent::Stream(reader) => reader,
        }
    }
}

impl std::fmt::Debug for UploadContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadContent::Buffer(bytes) => f.debug_tuple("Buffer").field(&bytes.len()).finish(),
            UploadContent::Stream(_) => f.write_str("Stream"),
        }
    }
}

/// One upload attempt. Consumed by a single pipeline run.
#[derive(Debug)]
pub struct UploadRequest {
    /// Filename as supplied by the client. Untrusted.
    pub claimed_filename: String,
    pub content: UploadContent,
    /// Length the client announced, if any.
    pub declared_length: Option<u64>,
}

impl UploadRequest {
    pub fn from_bytes(claimed_filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            claimed_filename: claimed_filename.into(),
            declared_length: Some(data.len() as u64),
            content: UploadContent::Buffer(data),
        }
    }

    pub fn from_reader(
        claimed_filename: impl Into<String>,
        reader: ContentReader,
        declared_length: Option<u64>,
    ) -> Self {
        Self {
            claimed_filename: claimed_filename.into(),
            content: UploadContent::Stream(reader),
            declared_length,
        }
    }
}

/// Result of a dry run: what `admit` would have accepted, without storing it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InspectionReport {
    pub claimed_filename: String,
    pub extension: String,
    /// Name the file would be stored under, before collision suffixes.
    pub storage_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub structure: Option<StructureKind>,
}

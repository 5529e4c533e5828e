//! Error types module
//!
//! [`RejectReason`] is the closed set of reasons an upload can be refused. Its
//! `Display` text is the only thing a caller should show to the uploader; the
//! internal cause of a rejection is logged where it happens and never carried
//! in the reason itself.

use serde::{Deserialize, Serialize};

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected rejections of bad input
    Debug,
    /// Warning level - for suspicious input or exhausted limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code a front end should return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "MIME_MISMATCH")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

/// Why an upload was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    #[error("Invalid file extension")]
    InvalidExtension,

    #[error("No file name was provided or it cannot be stored safely")]
    EmptyOrUnsafeFilename,

    #[error("File content does not match its declared type")]
    MimeMismatch,

    #[error("File header mismatch, possible polyglot file")]
    HeaderMismatch,

    #[error("File is not a valid instance of its declared type")]
    StructuralCorruption,

    #[error("File exceeds the maximum upload size")]
    SizeLimitExceeded,

    #[error("File could not be stored")]
    StorageIoFailure,

    #[error("Upload validation timed out")]
    TimedOut,
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, log_level).
fn reject_reason_static_metadata(
    reason: &RejectReason,
) -> (u16, &'static str, bool, Option<&'static str>, LogLevel) {
    match reason {
        RejectReason::InvalidExtension => (
            415,
            "INVALID_EXTENSION",
            false,
            Some("Upload a file with an allowed extension"),
            LogLevel::Debug,
        ),
        RejectReason::EmptyOrUnsafeFilename => (
            400,
            "EMPTY_OR_UNSAFE_FILENAME",
            false,
            Some("Select a file with a non-empty name"),
            LogLevel::Debug,
        ),
        RejectReason::MimeMismatch => (
            415,
            "MIME_MISMATCH",
            false,
            Some("Upload a file whose content matches its extension"),
            LogLevel::Warn,
        ),
        RejectReason::HeaderMismatch => (
            415,
            "HEADER_MISMATCH",
            false,
            Some("Upload a file whose content matches its extension"),
            LogLevel::Warn,
        ),
        RejectReason::StructuralCorruption => (
            422,
            "STRUCTURAL_CORRUPTION",
            false,
            Some("Check the file is complete and not damaged"),
            LogLevel::Warn,
        ),
        RejectReason::SizeLimitExceeded => (
            413,
            "SIZE_LIMIT_EXCEEDED",
            false,
            Some("Reduce file size"),
            LogLevel::Debug,
        ),
        RejectReason::StorageIoFailure => (
            500,
            "STORAGE_IO_FAILURE",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
        RejectReason::TimedOut => (
            408,
            "TIMED_OUT",
            false,
            Some("Upload a smaller or simpler file"),
            LogLevel::Warn,
        ),
    }
}

impl RejectReason {
    /// True for failures caused by the uploaded bytes themselves. These are
    /// terminal: the same bytes will fail the same way.
    pub fn is_content_failure(&self) -> bool {
        !matches!(self, RejectReason::StorageIoFailure | RejectReason::TimedOut)
    }
}

impl ErrorMetadata for RejectReason {
    fn http_status_code(&self) -> u16 {
        reject_reason_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        reject_reason_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        reject_reason_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        reject_reason_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        self.to_string()
    }

    fn log_level(&self) -> LogLevel {
        reject_reason_static_metadata(self).4
    }
}

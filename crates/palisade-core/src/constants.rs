//! Application-wide constants.

/// Number of leading bytes read for the magic-byte check. Every registered
/// signature fits in this prefix.
pub const HEADER_PREFIX_LEN: usize = 8;

/// Number of leading bytes handed to the MIME sniffer. The structural stage is
/// the only one that reads a whole file.
pub const SNIFF_PREFIX_LEN: usize = 8192;

/// Maximum length in bytes of a sanitized storage name (common filesystem limit).
pub const MAX_FILENAME_BYTES: usize = 255;

/// Name returned by the sanitizer when nothing usable survives.
pub const FALLBACK_FILENAME: &str = "unnamed";

/// Extensions admitted when `ALLOWED_EXTENSIONS` is not set.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Storage root used when `UPLOAD_FOLDER` is not set.
pub const DEFAULT_UPLOAD_FOLDER: &str = "uploads";

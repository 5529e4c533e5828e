//! Extension registry
//!
//! An [`ExtensionTable`] maps a lowercase extension to the magic-byte signatures
//! and MIME types that a file claiming that extension must present. Its keys are
//! the allow-list: an extension without a record is never accepted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const JPEG_JFIF_SIGNATURE: &[u8] = b"\xFF\xD8\xFF\xE0";
const JPEG_EXIF_SIGNATURE: &[u8] = b"\xFF\xD8\xFF\xE1";
const JPEG_RAW_SIGNATURE: &[u8] = b"\xFF\xD8\xFF\xDB";
const GIF87_SIGNATURE: &[u8] = b"GIF87a";
const GIF89_SIGNATURE: &[u8] = b"GIF89a";
const PDF_SIGNATURE: &[u8] = b"%PDF";

/// Extensions known to the built-in registry.
pub const REGISTERED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "pdf"];

/// Container formats the structural validator knows how to parse fully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureKind {
    Png,
    Jpeg,
    Gif,
}

impl std::fmt::Display for StructureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StructureKind::Png => write!(f, "png"),
            StructureKind::Jpeg => write!(f, "jpeg"),
            StructureKind::Gif => write!(f, "gif"),
        }
    }
}

/// What a file claiming `extension` must look like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRecord {
    pub extension: String,
    /// Any one of these must prefix the content.
    pub signatures: Vec<&'static [u8]>,
    /// Sniffed MIME types accepted for this extension (lowercase, no parameters).
    pub mime_types: Vec<String>,
    /// Deep parser to run, or `None` when the type has no structural check.
    pub structure: Option<StructureKind>,
}

impl ExtensionRecord {
    pub fn new(
        extension: &str,
        signatures: Vec<&'static [u8]>,
        mime_types: &[&str],
        structure: Option<StructureKind>,
    ) -> Self {
        Self {
            extension: extension.to_lowercase(),
            signatures,
            mime_types: mime_types.iter().map(|m| m.to_lowercase()).collect(),
            structure,
        }
    }

    /// Look up the built-in record for `extension` (case-insensitive).
    pub fn builtin(extension: &str) -> Option<Self> {
        let ext = extension.to_lowercase();
        let record = match ext.as_str() {
            "png" => Self::new(
                &ext,
                vec![PNG_SIGNATURE],
                &["image/png"],
                Some(StructureKind::Png),
            ),
            "jpg" | "jpeg" => Self::new(
                &ext,
                vec![JPEG_JFIF_SIGNATURE, JPEG_EXIF_SIGNATURE, JPEG_RAW_SIGNATURE],
                &["image/jpeg"],
                Some(StructureKind::Jpeg),
            ),
            "gif" => Self::new(
                &ext,
                vec![GIF87_SIGNATURE, GIF89_SIGNATURE],
                &["image/gif"],
                Some(StructureKind::Gif),
            ),
            "pdf" => Self::new(&ext, vec![PDF_SIGNATURE], &["application/pdf"], None),
            _ => return None,
        };
        Some(record)
    }

    /// True if `header` starts with one of the registered signatures.
    pub fn matches_signature(&self, header: &[u8]) -> bool {
        self.signatures.iter().any(|sig| header.starts_with(sig))
    }

    /// True if `mime` (parameters stripped, case-insensitive) is accepted.
    pub fn allows_mime(&self, mime: &str) -> bool {
        let normalized = mime
            .split(';')
            .next()
            .map(|s| s.trim())
            .unwrap_or(mime)
            .to_lowercase();
        self.mime_types.iter().any(|m| *m == normalized)
    }

    /// Canonical MIME type reported for accepted files.
    pub fn primary_mime(&self) -> &str {
        self.mime_types
            .first()
            .map(String::as_str)
            .unwrap_or("application/octet-stream")
    }
}

/// Read-only allow-list of extension records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionTable {
    records: BTreeMap<String, ExtensionRecord>,
}

impl ExtensionTable {
    /// Every extension of the built-in registry.
    pub fn builtin() -> Self {
        REGISTERED_EXTENSIONS
            .iter()
            .filter_map(|ext| ExtensionRecord::builtin(ext))
            .fold(Self::default(), Self::with_record)
    }

    /// Build a table from extension names resolved against the built-in registry.
    ///
    /// Fails on an extension the registry does not know, since there would be no
    /// signature to check it against.
    pub fn from_extensions<I, S>(extensions: I) -> Result<Self, anyhow::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::default();
        for ext in extensions {
            let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
            if ext.is_empty() {
                continue;
            }
            let record = ExtensionRecord::builtin(&ext).ok_or_else(|| {
                anyhow::anyhow!(
                    "Extension '{}' has no registered signature (known: {})",
                    ext,
                    REGISTERED_EXTENSIONS.join(", ")
                )
            })?;
            table = table.with_record(record);
        }
        Ok(table)
    }

    /// Add or replace a record.
    pub fn with_record(mut self, record: ExtensionRecord) -> Self {
        self.records.insert(record.extension.clone(), record);
        self
    }

    pub fn get(&self, extension: &str) -> Option<&ExtensionRecord> {
        self.records.get(&extension.to_lowercase())
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.get(extension).is_some()
    }

    /// Allowed extensions in sorted order.
    pub fn extensions(&self) -> Vec<&str> {
        self.records.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

//! Content classification: MIME sniffing and magic-byte matching.
//!
//! Both checks are keyed by the *claimed* extension's record, never by what the
//! sniffer reports, so a well-formed GIF named `.png` still fails.

use palisade_core::constants::HEADER_PREFIX_LEN;
use palisade_core::{ExtensionRecord, RejectReason};
use std::sync::Arc;

/// Content-based MIME detection.
///
/// Implementations must inspect bytes only, never a filename.
pub trait ContentSniffer: Send + Sync {
    /// MIME type detected from `data`, or `None` if unrecognised.
    fn sniff(&self, data: &[u8]) -> Option<String>;
}

/// [`ContentSniffer`] backed by the `infer` crate's signature database.
#[derive(Debug, Default, Clone, Copy)]
pub struct InferSniffer;

impl ContentSniffer for InferSniffer {
    fn sniff(&self, data: &[u8]) -> Option<String> {
        infer::get(data).map(|kind| kind.mime_type().to_string())
    }
}

/// Result of a successful classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Classification {
    pub mime_type: String,
}

#[derive(Clone)]
pub struct ContentClassifier {
    sniffer: Arc<dyn ContentSniffer>,
}

impl ContentClassifier {
    pub fn new(sniffer: Arc<dyn ContentSniffer>) -> Self {
        Self { sniffer }
    }

    /// Sniffed MIME type must be one the record allows.
    pub fn check_mime(
        &self,
        record: &ExtensionRecord,
        data: &[u8],
    ) -> Result<String, RejectReason> {
        match self.sniffer.sniff(data) {
            Some(mime) if record.allows_mime(&mime) => Ok(mime),
            Some(mime) => {
                tracing::warn!(
                    extension = %record.extension,
                    sniffed = %mime,
                    expected = ?record.mime_types,
                    "Sniffed content type does not match claimed extension"
                );
                Err(RejectReason::MimeMismatch)
            }
            None => {
                tracing::warn!(
                    extension = %record.extension,
                    "Content type could not be determined"
                );
                Err(RejectReason::MimeMismatch)
            }
        }
    }

    /// First [`HEADER_PREFIX_LEN`] bytes must start with a registered signature.
    pub fn check_header(record: &ExtensionRecord, data: &[u8]) -> Result<(), RejectReason> {
        let header = &data[..data.len().min(HEADER_PREFIX_LEN)];
        if record.matches_signature(header) {
            return Ok(());
        }

        tracing::warn!(
            extension = %record.extension,
            header = ?header,
            "File header does not match any registered signature"
        );
        Err(RejectReason::HeaderMismatch)
    }

    /// Run both checks. An absent record (unregistered extension) always fails.
    pub fn classify(
        &self,
        record: Option<&ExtensionRecord>,
        data: &[u8],
    ) -> Result<Classification, RejectReason> {
        let Some(record) = record else {
            tracing::warn!("No signature registered for claimed extension");
            return Err(RejectReason::HeaderMismatch);
        };

        let mime_type = self.check_mime(record, data)?;
        Self::check_header(record, data)?;

        Ok(Classification { mime_type })
    }
}

impl std::fmt::Debug for ContentClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentClassifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    /// Always reports the same type, whatever the bytes.
    struct FixedSniffer(Option<&'static str>);

    impl ContentSniffer for FixedSniffer {
        fn sniff(&self, _data: &[u8]) -> Option<String> {
            self.0.map(str::to_string)
        }
    }

    fn png() -> ExtensionRecord {
        ExtensionRecord::builtin("png").unwrap()
    }

    fn classifier_with(sniffer: impl ContentSniffer + 'static) -> ContentClassifier {
        ContentClassifier::new(Arc::new(sniffer))
    }

    #[test]
    fn test_infer_sniffs_common_types() {
        assert_eq!(InferSniffer.sniff(PNG_HEADER).as_deref(), Some("image/png"));
        assert_eq!(InferSniffer.sniff(b"GIF89a\x01\0\x01\0").as_deref(), Some("image/gif"));
        assert_eq!(InferSniffer.sniff(b"%PDF-1.4\n").as_deref(), Some("application/pdf"));
        assert_eq!(InferSniffer.sniff(b"hello world"), None);
    }

    #[test]
    fn test_png_passes() {
        let classifier = classifier_with(InferSniffer);
        let result = classifier.classify(Some(&png()), PNG_HEADER).unwrap();
        assert_eq!(result.mime_type, "image/png");
    }

    #[test]
    fn test_gif_bytes_with_png_extension_fail() {
        let classifier = classifier_with(InferSniffer);
        let result = classifier.classify(Some(&png()), b"GIF89a\x01\0\x01\0\0\0\0;");
        assert_eq!(result, Err(RejectReason::MimeMismatch));
    }

    #[test]
    fn test_header_forgery_caught_when_sniffer_is_fooled() {
        // Sniffer agrees it's a PNG but the raw prefix says otherwise.
        let classifier = classifier_with(FixedSniffer(Some("image/png")));
        let result = classifier.classify(Some(&png()), b"GIF89a\x01\0\x01\0");
        assert_eq!(result, Err(RejectReason::HeaderMismatch));
    }

    #[test]
    fn test_mime_mismatch_caught_when_header_matches() {
        let classifier = classifier_with(FixedSniffer(Some("text/html")));
        let result = classifier.classify(Some(&png()), PNG_HEADER);
        assert_eq!(result, Err(RejectReason::MimeMismatch));
    }

    #[test]
    fn test_unrecognised_content_fails_mime() {
        let classifier = classifier_with(FixedSniffer(None));
        let result = classifier.classify(Some(&png()), PNG_HEADER);
        assert_eq!(result, Err(RejectReason::MimeMismatch));
    }

    #[test]
    fn test_unregistered_extension_always_fails() {
        let classifier = classifier_with(FixedSniffer(Some("image/png")));
        let result = classifier.classify(None, PNG_HEADER);
        assert_eq!(result, Err(RejectReason::HeaderMismatch));
    }

    #[test]
    fn test_header_check_short_input() {
        assert_eq!(
            ContentClassifier::check_header(&png(), b"\x89PN"),
            Err(RejectReason::HeaderMismatch)
        );
        assert_eq!(
            ContentClassifier::check_header(&png(), b""),
            Err(RejectReason::HeaderMismatch)
        );
    }

    #[test]
    fn test_header_check_only_looks_at_prefix() {
        let mut data = b"xx".to_vec();
        data.extend_from_slice(PNG_HEADER);
        assert_eq!(
            ContentClassifier::check_header(&png(), &data),
            Err(RejectReason::HeaderMismatch)
        );
    }

    #[test]
    fn test_jpeg_signatures() {
        let jpg = ExtensionRecord::builtin("jpg").unwrap();
        let classifier = classifier_with(InferSniffer);
        let exif = b"\xFF\xD8\xFF\xE1\0\x10Exif\0\0";
        assert!(classifier.classify(Some(&jpg), exif).is_ok());
        // Valid JPEG start but APP marker not in the registered set.
        let unknown_app = b"\xFF\xD8\xFF\xEE\0\x10Adobe\0";
        assert_eq!(
            classifier.classify(Some(&jpg), unknown_app),
            Err(RejectReason::HeaderMismatch)
        );
    }
}

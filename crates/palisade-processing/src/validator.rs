use palisade_core::{ExtensionRecord, ExtensionTable, RejectReason};
use std::sync::Arc;

/// Filename allow-list check
///
/// Establishes the type a file *claims* to be. Nothing downstream may treat a
/// pass here as evidence of what the bytes actually are.
#[derive(Clone, Debug)]
pub struct ExtensionGate {
    table: Arc<ExtensionTable>,
}

impl ExtensionGate {
    pub fn new(table: Arc<ExtensionTable>) -> Self {
        Self { table }
    }

    /// Lowercased text after the last `.`, or `None` when there is no dot or
    /// nothing follows it.
    pub fn claimed_extension(filename: &str) -> Option<String> {
        let (_, extension) = filename.rsplit_once('.')?;
        if extension.is_empty() {
            return None;
        }
        Some(extension.to_lowercase())
    }

    /// True if the claimed extension is on the allow-list.
    pub fn check(&self, filename: &str) -> bool {
        Self::claimed_extension(filename)
            .map(|ext| self.table.contains(&ext))
            .unwrap_or(false)
    }

    /// Resolve the record for the claimed extension.
    pub fn validate(&self, filename: &str) -> Result<&ExtensionRecord, RejectReason> {
        let Some(extension) = Self::claimed_extension(filename) else {
            tracing::debug!(filename = %filename, "Rejected filename without extension");
            return Err(RejectReason::InvalidExtension);
        };

        self.table.get(&extension).ok_or_else(|| {
            tracing::debug!(
                filename = %filename,
                extension = %extension,
                allowed = ?self.table.extensions(),
                "Rejected extension outside allow-list"
            );
            RejectReason::InvalidExtension
        })
    }

    pub fn table(&self) -> &ExtensionTable {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_gate() -> ExtensionGate {
        ExtensionGate::new(Arc::new(
            ExtensionTable::from_extensions(["jpg", "png"]).unwrap(),
        ))
    }

    #[test]
    fn test_check_ok() {
        let gate = test_gate();
        assert!(gate.check("test.jpg"));
        assert!(gate.check("test.png"));
    }

    #[test]
    fn test_check_case_insensitive() {
        let gate = test_gate();
        assert!(gate.check("FILE.PNG"));
        assert!(gate.check("photo.JpG"));
    }

    #[test]
    fn test_check_no_dot() {
        let gate = test_gate();
        for name in ["", "png", "noextension", "../../etc/passwd"] {
            assert!(!gate.check(name), "{:?}", name);
        }
    }

    #[test]
    fn test_check_outside_allow_list() {
        let gate = test_gate();
        assert!(!gate.check("test.gif"));
        assert!(!gate.check("shell.php"));
        assert!(!gate.check("archive.tar.gz"));
        assert!(!gate.check("trailing."));
    }

    #[test]
    fn test_uses_last_dot_only() {
        let gate = test_gate();
        assert!(!gate.check("image.png.php"));
        assert!(gate.check("shell.php.png"));
    }

    #[test]
    fn test_claimed_extension() {
        assert_eq!(
            ExtensionGate::claimed_extension("a.b.PNG"),
            Some("png".to_string())
        );
        assert_eq!(ExtensionGate::claimed_extension(".png"), Some("png".to_string()));
        assert_eq!(ExtensionGate::claimed_extension("x."), None);
        assert_eq!(ExtensionGate::claimed_extension("x"), None);
    }

    #[test]
    fn test_validate_returns_record() {
        let gate = test_gate();
        let record = gate.validate("Photo.PNG").unwrap();
        assert_eq!(record.extension, "png");
        assert_eq!(gate.validate("x.gif"), Err(RejectReason::InvalidExtension));
        assert_eq!(gate.validate("x"), Err(RejectReason::InvalidExtension));
    }
}

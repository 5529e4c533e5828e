//! Upload acceptance pipeline.
//!
//! The four stages run in a fixed order, cheapest and least trusted first:
//!
//! 1. [`ExtensionGate`] checks the claimed extension against the allow-list.
//! 2. [`sanitize_filename`] derives a storage name that cannot escape the root.
//! 3. [`ContentClassifier`] sniffs the MIME type and matches magic bytes.
//! 4. [`StructuralValidator`] decodes the file and walks its container.
//!
//! [`UploadGate`] sequences them and owns rollback of provisional files.

pub mod classifier;
pub mod sanitize;
pub mod structural;
pub mod upload;
pub mod validator;

pub use classifier::{Classification, ContentClassifier, ContentSniffer, InferSniffer};
pub use sanitize::sanitize_filename;
pub use structural::{StructuralError, StructuralValidator};
pub use upload::{InspectionReport, UploadContent, UploadGate, UploadRequest};
pub use validator::ExtensionGate;

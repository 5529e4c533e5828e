mod pipeline;
mod quarantine;
mod types;

pub use pipeline::UploadGate;
pub use types::{InspectionReport, UploadContent, UploadRequest};

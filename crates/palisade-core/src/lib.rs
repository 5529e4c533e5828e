//! Palisade Core Library
//!
//! This crate provides the configuration, the extension registry, the rejection
//! taxonomy and the verdict types shared by every Palisade component.

pub mod config;
pub mod constants;
pub mod error;
pub mod extension;
pub mod verdict;

// Re-export commonly used types
pub use config::GateConfig;
pub use error::{ErrorMetadata, LogLevel, RejectReason};
pub use extension::{ExtensionRecord, ExtensionTable, StructureKind};
pub use verdict::{StoredArtifact, ValidationVerdict};

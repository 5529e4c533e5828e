//! Palisade Storage Library
//!
//! This crate provides the storage abstraction the upload gate writes through,
//! and a local filesystem implementation confined to a single root directory.
//!
//! # Storage key format
//!
//! A storage key is a single file name directly under the storage root. Keys
//! must not be empty, contain a path separator or `..`, or start with `.`.
//! Key checks and unique-name generation live in the `keys` module.

pub mod factory;
pub(crate) mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use local::LocalStorage;
pub use traits::{ContentReader, Storage, StorageError, StorageResult, StoredObject};

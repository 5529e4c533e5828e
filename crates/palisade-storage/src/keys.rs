//! Shared key checks and unique-name generation for storage backends.
//!
//! Key format: a single file name directly under the storage root.

use palisade_core::constants::MAX_FILENAME_BYTES;
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

/// Numbered variants tried before falling back to a random suffix.
const MAX_NUMBERED_CANDIDATES: u32 = 99;

/// Reject any key that is not a plain, visible file name.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.len() > MAX_FILENAME_BYTES {
        return Err(StorageError::InvalidKey(
            "Storage key is empty or too long".to_string(),
        ));
    }

    if key.contains('/')
        || key.contains('\\')
        || key.contains("..")
        || key.starts_with('.')
        || key.chars().any(char::is_control)
    {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }

    Ok(())
}

fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

fn truncate_to_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// `photo.png` + `3` → `photo-3.png`, shortening the stem to stay within the
/// filename limit.
fn with_suffix(name: &str, suffix: &str) -> String {
    let (stem, ext) = split_extension(name);
    let ext_len = ext.map(|e| e.len() + 1).unwrap_or(0);
    let budget = MAX_FILENAME_BYTES.saturating_sub(ext_len + suffix.len() + 1);
    let stem = truncate_to_boundary(stem, budget);
    match ext {
        Some(ext) => format!("{}-{}.{}", stem, suffix, ext),
        None => format!("{}-{}", stem, suffix),
    }
}

/// Candidate keys for `name`, in the order they should be tried.
pub fn candidate_keys(name: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(name.to_string())
        .chain((1..=MAX_NUMBERED_CANDIDATES).map(move |n| with_suffix(name, &n.to_string())))
        .chain(std::iter::once_with(move || {
            with_suffix(name, &Uuid::new_v4().simple().to_string())
        }))
}

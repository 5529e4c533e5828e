//! Pipeline outcome types.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RejectReason;

/// A file that passed every stage and now lives under the storage root.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifact {
    /// Name of the file relative to the storage root.
    pub storage_key: String,
    pub path: PathBuf,
    pub original_filename: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub stored_at: DateTime<Utc>,
}

/// Outcome of one pipeline run. Produced once per request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationVerdict {
    Accepted { artifact: StoredArtifact },
    Rejected { reason: RejectReason },
}

impl ValidationVerdict {
    pub fn rejected(reason: RejectReason) -> Self {
        ValidationVerdict::Rejected { reason }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationVerdict::Accepted { .. })
    }

    pub fn artifact(&self) -> Option<&StoredArtifact> {
        match self {
            ValidationVerdict::Accepted { artifact } => Some(artifact),
            ValidationVerdict::Rejected { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            ValidationVerdict::Accepted { .. } => None,
            ValidationVerdict::Rejected { reason } => Some(*reason),
        }
    }
}

impl From<RejectReason> for ValidationVerdict {
    fn from(reason: RejectReason) -> Self {
        ValidationVerdict::rejected(reason)
    }
}

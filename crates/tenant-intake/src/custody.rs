//! Chain-of-custody: an append-only log of everything that happened to a
//! registered document.
//!
//! Grounded on `document_registry.py`'s `CustodyRecord`/`CustodyAction`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of thing happened to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustodyAction {
    /// The document was registered for the first time.
    Registered,
    /// A duplicate upload of already-registered content was detected.
    DuplicateUpload,
    /// The document was read back (download or preview).
    Read,
    /// The classifier produced a result for this document.
    Classified,
    /// The extractor produced dated events for this document.
    Extracted,
    /// Metadata (not content) was updated.
    MetadataUpdated,
}

/// One append-only entry in a document's chain of custody.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodyRecord {
    /// What happened.
    pub action: CustodyAction,
    /// UTC instant it happened.
    pub timestamp: DateTime<Utc>,
    /// Actor responsible, when known.
    pub actor_id: Option<String>,
    /// Free-form detail (e.g. which fields changed, the id of a prior
    /// document for `duplicate_upload`).
    pub detail: Option<String>,
}

impl CustodyRecord {
    /// Build a record stamped with the current instant.
    pub fn new(action: CustodyAction, actor_id: Option<String>, detail: Option<String>) -> Self {
        Self {
            action,
            timestamp: Utc::now(),
            actor_id,
            detail,
        }
    }
}

//! The document registry: metadata and chain-of-custody for every document
//! that has passed through intake, plus duplicate-content detection.
//!
//! Grounded on `document_registry.py`'s `DocumentRegistry`/`RegisteredDocument`.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use tenant_types::{DocId, DocumentStatus, Integrity, UserId};

use crate::custody::CustodyRecord;
use crate::tamper::hash_metadata;

/// One entry in a document's append-only version history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentVersion {
    /// 1-based, monotonically increasing within a document.
    pub version_no: u32,
    /// SHA-256 of this version's content, hex-encoded.
    pub content_hash: String,
    /// UTC instant this version was recorded.
    pub uploaded_at: DateTime<Utc>,
    /// Why a new version was recorded, when known.
    pub reason: Option<String>,
}

/// Everything the registry knows about one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredDocument {
    /// Canonical `ORG-YYYY-NNNNNN-XXXX` id.
    pub doc_id: DocId,
    /// Owning user.
    pub user_id: UserId,
    /// SHA-256 of the current version's content, hex-encoded.
    pub content_hash: String,
    /// Hash of `filename` + `size` + `mime` + `user_id`, hex-encoded. Lets
    /// the registry notice a renamed/retyped/reassigned document without
    /// re-hashing its body.
    pub metadata_hash: String,
    /// Size of the current version's content, in bytes.
    pub size: u64,
    /// MIME type, when known.
    pub mime: Option<String>,
    /// Classifier-assigned document type, `None` until classification runs.
    pub doc_type: Option<String>,
    /// Original upload filename.
    pub filename: String,
    /// Lifecycle status.
    pub status: DocumentStatus,
    /// Most recent integrity verification result.
    pub integrity: Integrity,
    /// UTC instant of first registration.
    pub registered_at: DateTime<Utc>,
    /// `versions` entry currently in effect.
    pub current_version: u32,
    /// Append-only content version history.
    pub versions: Vec<DocumentVersion>,
    /// Append-only history of everything that happened to this document.
    pub custody_log: Vec<CustodyRecord>,
}

/// Key used to detect a user re-uploading bytes they already registered.
type DuplicateKey = (UserId, String);

/// In-memory index of registered documents plus an auxiliary
/// `(user_id, content_hash) -> doc_id` map for O(1) duplicate detection,
/// mirroring the source registry's behavior of returning the existing
/// document rather than creating a second one.
#[derive(Default)]
pub struct DocumentRegistry {
    documents: DashMap<DocId, RegisteredDocument>,
    by_content: DashMap<DuplicateKey, DocId>,
}

impl DocumentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an existing registration for `user_id` + `content_hash`, if
    /// this exact content has already been registered for this user.
    pub fn find_duplicate(&self, user_id: &UserId, content_hash: &str) -> Option<DocId> {
        self.by_content
            .get(&(user_id.clone(), content_hash.to_string()))
            .map(|entry| entry.clone())
    }

    /// Register a brand-new document. Callers must have already checked
    /// [`Self::find_duplicate`].
    pub fn register(
        &self,
        doc_id: DocId,
        user_id: UserId,
        content_hash: String,
        size: u64,
        mime: Option<String>,
        filename: String,
    ) -> RegisteredDocument {
        let metadata_hash = hash_metadata(&filename, size, mime.as_deref(), user_id.as_str());
        let registered_at = Utc::now();
        let record = RegisteredDocument {
            doc_id: doc_id.clone(),
            user_id: user_id.clone(),
            content_hash: content_hash.clone(),
            metadata_hash,
            size,
            mime,
            doc_type: None,
            filename,
            status: DocumentStatus::Active,
            integrity: Integrity::Unknown,
            registered_at,
            current_version: 1,
            versions: vec![DocumentVersion {
                version_no: 1,
                content_hash: content_hash.clone(),
                uploaded_at: registered_at,
                reason: None,
            }],
            custody_log: vec![CustodyRecord::new(
                crate::custody::CustodyAction::Registered,
                Some(user_id.as_str().to_string()),
                None,
            )],
        };
        self.by_content.insert((user_id, content_hash), doc_id.clone());
        self.documents.insert(doc_id, record.clone());
        record
    }

    /// Record a new content version for an already-registered document,
    /// e.g. a re-upload that replaces the stored bytes under the same
    /// `doc_id`. No-op (returns the document unchanged) if `content_hash`
    /// matches the current version.
    pub fn revise(
        &self,
        doc_id: &DocId,
        content_hash: String,
        reason: Option<String>,
    ) -> Option<RegisteredDocument> {
        let mut entry = self.documents.get_mut(doc_id)?;
        if entry.content_hash == content_hash {
            return Some(entry.clone());
        }

        let version_no = entry.current_version + 1;
        entry.versions.push(DocumentVersion {
            version_no,
            content_hash: content_hash.clone(),
            uploaded_at: Utc::now(),
            reason,
        });
        entry.current_version = version_no;
        entry.content_hash = content_hash;
        Some(entry.clone())
    }

    /// Current snapshot of a registered document.
    pub fn get(&self, doc_id: &DocId) -> Option<RegisteredDocument> {
        self.documents.get(doc_id).map(|entry| entry.clone())
    }

    /// Append a custody record and run `mutate` against the stored document
    /// under the registry's per-document lock.
    pub fn update(
        &self,
        doc_id: &DocId,
        record: CustodyRecord,
        mutate: impl FnOnce(&mut RegisteredDocument),
    ) -> Option<RegisteredDocument> {
        let mut entry = self.documents.get_mut(doc_id)?;
        mutate(&mut entry);
        entry.custody_log.push(record);
        Some(entry.clone())
    }

    /// All documents belonging to `user_id`, most recently registered first.
    pub fn by_user(&self, user_id: &UserId) -> Vec<RegisteredDocument> {
        let mut docs: Vec<RegisteredDocument> = self
            .documents
            .iter()
            .filter(|entry| &entry.user_id == user_id)
            .map(|entry| entry.clone())
            .collect();
        docs.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
        docs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn register(registry: &DocumentRegistry, doc_id: DocId, user_id: UserId, content_hash: &str) {
        registry.register(
            doc_id,
            user_id,
            content_hash.to_string(),
            1024,
            Some("application/pdf".to_string()),
            "lease.pdf".to_string(),
        );
    }

    #[test]
    fn duplicate_content_for_same_user_is_detected() {
        let registry = DocumentRegistry::new();
        let doc_id = DocId("SEM-2026-000001-AAAA".into());
        register(&registry, doc_id.clone(), user("u1"), "hash-a");
        assert_eq!(
            registry.find_duplicate(&user("u1"), "hash-a"),
            Some(doc_id)
        );
        assert_eq!(registry.find_duplicate(&user("u2"), "hash-a"), None);
    }

    #[test]
    fn update_appends_custody_and_mutates() {
        let registry = DocumentRegistry::new();
        let doc_id = DocId("SEM-2026-000001-AAAA".into());
        register(&registry, doc_id.clone(), user("u1"), "hash-a");
        let updated = registry
            .update(
                &doc_id,
                CustodyRecord::new(crate::custody::CustodyAction::Classified, None, None),
                |doc| doc.doc_type = Some("lease".into()),
            )
            .unwrap();
        assert_eq!(updated.doc_type.as_deref(), Some("lease"));
        assert_eq!(updated.custody_log.len(), 2);
    }

    #[test]
    fn register_seeds_metadata_and_first_version() {
        let registry = DocumentRegistry::new();
        let doc_id = DocId("SEM-2026-000001-AAAA".into());
        register(&registry, doc_id.clone(), user("u1"), "hash-a");
        let doc = registry.get(&doc_id).unwrap();
        assert_eq!(doc.size, 1024);
        assert_eq!(doc.mime.as_deref(), Some("application/pdf"));
        assert_eq!(doc.current_version, 1);
        assert_eq!(doc.versions.len(), 1);
        assert_eq!(doc.versions[0].content_hash, "hash-a");
        assert_eq!(
            doc.metadata_hash,
            hash_metadata("lease.pdf", 1024, Some("application/pdf"), "u1")
        );
    }

    #[test]
    fn revise_appends_a_version_and_updates_content_hash() {
        let registry = DocumentRegistry::new();
        let doc_id = DocId("SEM-2026-000001-AAAA".into());
        register(&registry, doc_id.clone(), user("u1"), "hash-a");

        let revised = registry
            .revise(&doc_id, "hash-b".into(), Some("tenant re-uploaded corrected scan".into()))
            .unwrap();
        assert_eq!(revised.current_version, 2);
        assert_eq!(revised.content_hash, "hash-b");
        assert_eq!(revised.versions.len(), 2);
        assert_eq!(revised.versions[1].version_no, 2);
        assert_eq!(revised.versions[1].content_hash, "hash-b");
    }

    #[test]
    fn revise_with_unchanged_hash_is_a_no_op() {
        let registry = DocumentRegistry::new();
        let doc_id = DocId("SEM-2026-000001-AAAA".into());
        register(&registry, doc_id.clone(), user("u1"), "hash-a");

        let revised = registry.revise(&doc_id, "hash-a".into(), None).unwrap();
        assert_eq!(revised.current_version, 1);
        assert_eq!(revised.versions.len(), 1);
    }
}

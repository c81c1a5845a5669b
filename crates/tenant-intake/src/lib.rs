#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tenant-intake** – The document intake pipeline: id generation, the
//! document registry, chain-of-custody, tamper detection, and the
//! register→classify→extract→cross-reference→analyze pipeline that ties
//! the vault, classifier, extractor, and law index together and feeds
//! derived events to the context loop.
//!
//! Grounded on `document_registry.py`'s `DocumentRegistry`/`CustodyRecord`
//! and `event_extractor.py`/`law_engine.py` for the downstream stages.

mod custody;
mod doc_id;
mod pipeline;
mod registry;
mod tamper;

pub use custody::{CustodyAction, CustodyRecord};
pub use doc_id::DocIdGenerator;
pub use pipeline::{IntakePipeline, IntakeResult};
pub use registry::{DocumentRegistry, RegisteredDocument};
pub use tamper::{hash_content, verify};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tenant_bus_core::{Bus, BusConfig};
    use tenant_classifier::{ClassificationResult, Classifier};
    use tenant_context::ContextLoop;
    use tenant_laws::LawIndex;
    use tenant_storage_memory::MemoryStorageProvider;
    use tenant_types::UserId;
    use tenant_vault::{TrustingResolver, VaultAccessEngine};

    use super::*;

    struct StubClassifier;

    #[async_trait]
    impl Classifier for StubClassifier {
        async fn analyze_document(
            &self,
            _text: &str,
            _filename: &str,
            _hint: Option<&str>,
        ) -> ClassificationResult {
            ClassificationResult {
                doc_type: "eviction_notice".into(),
                confidence: 0.9,
                title: "Eviction Notice".into(),
                summary: "stub".into(),
                key_dates: vec![],
                key_parties: vec![],
                key_amounts: vec![],
                key_terms: vec!["eviction".into(), "notice to quit".into()],
                issues: vec!["eviction_threat".into()],
            }
        }
    }

    fn build_pipeline(log_dir: &std::path::Path) -> IntakePipeline {
        let bus = Bus::new(BusConfig::default());
        let vault = Arc::new(VaultAccessEngine::new(
            Arc::new(MemoryStorageProvider::new()),
            Arc::new(TrustingResolver),
            bus.clone(),
            log_dir.to_path_buf(),
        ));
        IntakePipeline::new(
            vault,
            Arc::new(DocumentRegistry::new()),
            Arc::new(DocIdGenerator::new("SEM")),
            Arc::new(StubClassifier),
            Arc::new(tenant_cache::InMemoryCache::new(tenant_cache::CacheConfig::default())),
            Arc::new(LawIndex::with_base_laws()),
            Arc::new(ContextLoop::new(bus.clone())),
            bus,
        )
    }

    #[tokio::test]
    async fn duplicate_upload_does_not_re_register() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = build_pipeline(dir.path());
        let user = UserId::new("tenant-1").unwrap();
        let content = b"NOTICE TO QUIT: vacate by March 1, 2025 for nonpayment of rent.";

        let first = pipeline
            .intake(
                user.clone(),
                content,
                "notice.pdf",
                Some("application/pdf"),
                std::str::from_utf8(content).unwrap(),
                None,
            )
            .await
            .unwrap();
        assert!(!first.was_duplicate);

        let second = pipeline
            .intake(
                user.clone(),
                content,
                "notice.pdf",
                Some("application/pdf"),
                std::str::from_utf8(content).unwrap(),
                None,
            )
            .await
            .unwrap();
        assert!(second.was_duplicate);
        assert_eq!(second.document.doc_id, first.document.doc_id);
        assert!(second
            .document
            .custody_log
            .iter()
            .any(|r| matches!(r.action, CustodyAction::DuplicateUpload)));
    }

    #[tokio::test]
    async fn high_confidence_classification_triggers_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = build_pipeline(dir.path());
        let user = UserId::new("tenant-2").unwrap();
        let text = "NOTICE TO QUIT: vacate by 03/01/2025 for nonpayment of rent.";

        let result = pipeline
            .intake(user, text.as_bytes(), "notice.pdf", Some("application/pdf"), text, None)
            .await
            .unwrap();

        assert!(!result.extracted_events.is_empty());
        assert!(!result.matched_law_ids.is_empty());
    }

    #[tokio::test]
    async fn tampered_content_is_flagged_on_verify() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = build_pipeline(dir.path());
        let user = UserId::new("tenant-3").unwrap();
        let content = b"lease agreement text";

        let result = pipeline
            .intake(
                user,
                content,
                "lease.pdf",
                Some("application/pdf"),
                "lease agreement text",
                None,
            )
            .await
            .unwrap();

        pipeline
            .verify_integrity(&result.document.doc_id, b"altered lease agreement text")
            .await;

        let updated = pipeline
            .intake(
                UserId::new("tenant-3").unwrap(),
                b"lease agreement text",
                "lease.pdf",
                Some("application/pdf"),
                "lease agreement text",
                None,
            )
            .await
            .unwrap();
        // re-running intake on the same content is itself a duplicate; the
        // integrity flag set above lives on the original registration.
        assert!(updated.was_duplicate);
    }
}

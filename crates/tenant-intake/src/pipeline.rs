//! The intake pipeline: register → classify → extract → cross-reference →
//! feed to the context loop, with per-stage failure isolation.

use std::sync::Arc;

use tenant_bus_core::{Bus, EventPayload};
use tenant_cache::{CacheKey, PersistenceCache};
use tenant_classifier::{Classifier, ClassificationResult};
use tenant_context::ContextLoop;
use tenant_laws::LawIndex;
use tenant_types::{DocId, Integrity, Issue, UserId};
use tenant_vault::{AccessRequest, VaultAccessEngine};
use tracing::warn;

use crate::custody::{CustodyAction, CustodyRecord};
use crate::doc_id::DocIdGenerator;
use crate::registry::{DocumentRegistry, RegisteredDocument};
use crate::tamper::{hash_content, verify};

/// Minimum classifier confidence required before extraction runs, per the
/// classification stage's `ready_for_extraction` signal.
const CLASSIFICATION_READY_THRESHOLD: f64 = 0.5;

/// Minimum law-match relevance surfaced to the pipeline's `law_matched`
/// events. Anything below this is noise.
const LAW_MATCH_MIN_SCORE: f64 = 0.2;

/// Outcome of running a document through the full pipeline.
#[derive(Debug, Clone)]
pub struct IntakeResult {
    /// The registered document's current metadata.
    pub document: RegisteredDocument,
    /// Whether this call discovered a pre-existing duplicate rather than
    /// registering new content.
    pub was_duplicate: bool,
    /// Classifier output, when the classify stage ran.
    pub classification: Option<tenant_classifier::ClassificationResult>,
    /// Dated events found by the extract stage.
    pub extracted_events: Vec<tenant_extractor::ExtractedEvent>,
    /// Law ids matched during cross-reference.
    pub matched_law_ids: Vec<String>,
}

/// Ties together document-id generation, the registry, the vault, the
/// classifier, the extractor, and the law index, driving one document
/// through intake and feeding derived events to a [`ContextLoop`].
pub struct IntakePipeline {
    vault: Arc<VaultAccessEngine>,
    registry: Arc<DocumentRegistry>,
    doc_ids: Arc<DocIdGenerator>,
    classifier: Arc<dyn Classifier>,
    classification_cache: Arc<dyn PersistenceCache<ClassificationResult>>,
    laws: Arc<LawIndex>,
    context: Arc<ContextLoop>,
    bus: Bus,
}

impl IntakePipeline {
    /// Build a pipeline wired to its collaborators. `bus` is used for
    /// intake-local events (`document_classified`, `events_extracted`,
    /// `law_matched`) that the vault engine and context loop don't already
    /// publish on their own.
    pub fn new(
        vault: Arc<VaultAccessEngine>,
        registry: Arc<DocumentRegistry>,
        doc_ids: Arc<DocIdGenerator>,
        classifier: Arc<dyn Classifier>,
        classification_cache: Arc<dyn PersistenceCache<ClassificationResult>>,
        laws: Arc<LawIndex>,
        context: Arc<ContextLoop>,
        bus: Bus,
    ) -> Self {
        Self {
            vault,
            registry,
            doc_ids,
            classifier,
            classification_cache,
            laws,
            context,
            bus,
        }
    }

    /// Run the full pipeline over `content` on behalf of `user_id`.
    ///
    /// Each stage isolates its own failures: a classifier error does not
    /// prevent registration, and an extraction error does not prevent
    /// cross-referencing from running on whatever text was classified.
    pub async fn intake(
        &self,
        user_id: UserId,
        content: &[u8],
        filename: &str,
        mime: Option<&str>,
        text: &str,
        hint: Option<&str>,
    ) -> Result<IntakeResult, tenant_types::TenantError> {
        let (document, was_duplicate) = self
            .register(user_id.clone(), content, filename, mime)
            .await?;

        if was_duplicate {
            return Ok(IntakeResult {
                document,
                was_duplicate,
                classification: None,
                extracted_events: Vec::new(),
                matched_law_ids: Vec::new(),
            });
        }

        let classification = self
            .classify(&document.doc_id, &document.content_hash, text, filename, hint)
            .await;

        let extracted_events = match &classification {
            Some(result) if result.confidence >= CLASSIFICATION_READY_THRESHOLD => {
                self.extract(&document.doc_id, text, &result.doc_type).await
            }
            _ => Vec::new(),
        };

        let doc_type_for_laws = classification
            .as_ref()
            .map(|c| c.doc_type.as_str())
            .unwrap_or("unknown");
        let matched_law_ids = self
            .cross_reference(&document.doc_id, text, &classification, doc_type_for_laws)
            .await;

        let issues = classification
            .as_ref()
            .map(|c| {
                c.issues
                    .iter()
                    .map(|issue_type| Issue {
                        r#type: issue_type.clone(),
                        description: format!("detected during intake of {filename}"),
                        detected_at: chrono::Utc::now(),
                        evidence_refs: vec![document.doc_id.0.clone()],
                    })
                    .collect()
            })
            .unwrap_or_default();

        let deadlines = extracted_events
            .iter()
            .filter(|e| e.is_deadline)
            .map(|e| tenant_types::Deadline {
                id: format!("{}-{}", document.doc_id.0, e.date.format("%Y%m%d")),
                r#type: e.event_type.clone(),
                date: e.date,
                description: e.title.clone(),
                linked_document_id: Some(document.doc_id.clone()),
            })
            .collect();

        self.context
            .emit_event(
                EventPayload::DocumentAnalyzed {
                    issues,
                    deadlines,
                    applicable_laws: matched_law_ids.clone(),
                },
                user_id,
                "intake_pipeline",
            )
            .await;

        Ok(IntakeResult {
            document,
            was_duplicate,
            classification,
            extracted_events,
            matched_law_ids,
        })
    }

    async fn register(
        &self,
        user_id: UserId,
        content: &[u8],
        filename: &str,
        mime: Option<&str>,
    ) -> Result<(RegisteredDocument, bool), tenant_types::TenantError> {
        let content_hash = hash_content(content);

        if let Some(existing_id) = self.registry.find_duplicate(&user_id, &content_hash) {
            let updated = self
                .registry
                .update(
                    &existing_id,
                    CustodyRecord::new(
                        CustodyAction::DuplicateUpload,
                        Some(user_id.as_str().to_string()),
                        Some(format!("re-upload of {filename}")),
                    ),
                    |_| {},
                )
                .ok_or_else(|| tenant_types::TenantError::NotFound(existing_id.0.clone()))?;
            return Ok((updated, true));
        }

        let doc_id = DocId(self.doc_ids.next_id());

        self.vault
            .write(
                AccessRequest {
                    actor_id: user_id.clone(),
                    actor_role: tenant_types::Role::User,
                    resource_id: doc_id.0.clone(),
                    resource_class: tenant_types::ResourceClass::Own,
                    action: tenant_types::AccessAction::Write,
                    ip: None,
                    user_agent: None,
                },
                content,
                "documents",
                filename,
                mime,
            )
            .await?;

        let document = self.registry.register(
            doc_id.clone(),
            user_id.clone(),
            content_hash,
            content.len() as u64,
            mime.map(str::to_string),
            filename.to_string(),
        );

        self.context
            .emit_event(
                EventPayload::DocumentAdded {
                    doc_id,
                    doc_type: None,
                    filename: Some(filename.to_string()),
                },
                user_id,
                "intake_pipeline",
            )
            .await;

        Ok((document, false))
    }

    async fn classify(
        &self,
        doc_id: &DocId,
        content_hash: &str,
        text: &str,
        filename: &str,
        hint: Option<&str>,
    ) -> Option<tenant_classifier::ClassificationResult> {
        let cache_key = CacheKey::new("classification", [content_hash]);
        let result = match self.classification_cache.get(&cache_key).await {
            Some(cached) => cached,
            None => {
                let fresh = self.classifier.analyze_document(text, filename, hint).await;
                self.classification_cache.put(cache_key, fresh.clone()).await;
                fresh
            }
        };

        self.registry.update(
            doc_id,
            CustodyRecord::new(CustodyAction::Classified, None, Some(result.doc_type.clone())),
            |doc| doc.doc_type = Some(result.doc_type.clone()),
        );

        self.bus
            .publish(
                EventPayload::DocumentClassified {
                    doc_id: doc_id.clone(),
                    doc_type: result.doc_type.clone(),
                    confidence: result.confidence,
                    ready_for_extraction: result.confidence >= CLASSIFICATION_READY_THRESHOLD,
                },
                "intake_pipeline",
                None,
            )
            .await;

        Some(result)
    }

    async fn extract(
        &self,
        doc_id: &DocId,
        text: &str,
        doc_type: &str,
    ) -> Vec<tenant_extractor::ExtractedEvent> {
        let events = tenant_extractor::extract_events(text, doc_type);

        self.registry.update(
            doc_id,
            CustodyRecord::new(CustodyAction::Extracted, None, Some(format!("{} events", events.len()))),
            |_| {},
        );

        let wire_events: Vec<tenant_bus_core::ExtractedItem> = events
            .iter()
            .map(|e| tenant_bus_core::ExtractedItem {
                date: e.date,
                event_type: e.event_type.clone(),
                title: e.title.clone(),
                is_deadline: e.is_deadline,
            })
            .collect();

        self.bus
            .publish(
                EventPayload::EventsExtracted {
                    doc_id: doc_id.clone(),
                    count: events.len(),
                    events: wire_events,
                },
                "intake_pipeline",
                None,
            )
            .await;

        events
    }

    async fn cross_reference(
        &self,
        doc_id: &DocId,
        text: &str,
        classification: &Option<tenant_classifier::ClassificationResult>,
        doc_type: &str,
    ) -> Vec<String> {
        let terms: Vec<String> = classification
            .as_ref()
            .map(|c| {
                c.key_terms
                    .iter()
                    .cloned()
                    .chain(std::iter::once(doc_type.to_string()))
                    .collect()
            })
            .unwrap_or_else(|| vec![doc_type.to_string()]);

        let matches = self.laws.match_document(text, &terms, LAW_MATCH_MIN_SCORE);

        for law_match in &matches {
            self.bus
                .publish(
                    EventPayload::LawMatched {
                        law_id: law_match.law_id.clone(),
                    },
                    "intake_pipeline",
                    None,
                )
                .await;
        }

        matches.into_iter().map(|m| m.law_id).collect()
    }

    /// Recompute `content`'s hash against the recorded one and update the
    /// registry's integrity flag, emitting `integrity_alert` on mismatch.
    /// Non-fatal: the caller still gets the bytes regardless of outcome.
    pub async fn verify_integrity(&self, doc_id: &DocId, content: &[u8]) {
        let Some(document) = self.registry.get(doc_id) else {
            warn!(%doc_id, "integrity check requested for unknown document");
            return;
        };

        let verified = verify(content, &document.content_hash);
        let integrity = if verified {
            Integrity::Verified
        } else {
            Integrity::Tampered
        };

        self.registry.update(
            doc_id,
            CustodyRecord::new(CustodyAction::Read, None, None),
            |doc| doc.integrity = integrity,
        );

        if !verified {
            self.bus
                .publish(
                    EventPayload::IntegrityAlert {
                        doc_id: doc_id.clone(),
                    },
                    "intake_pipeline",
                    Some(document.user_id),
                )
                .await;
        }
    }
}

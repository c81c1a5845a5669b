//! Event taxonomy: the closed set of things that can happen, and the
//! envelope every one of them travels in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tenant_types::{DocId, Deadline, Issue, Phase, RecordId, Severity, Trend, UserId};

/// A dated item recognized by the extractor, carried on the bus without
/// pulling in the extractor crate's richer internal type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedItem {
    /// UTC date the item refers to.
    pub date: DateTime<Utc>,
    /// Extractor event category (`notice`, `court`, `payment`, ...).
    pub event_type: String,
    /// Short title, e.g. "Court Hearing".
    pub title: String,
    /// Whether the preceding context carried a deadline marker.
    pub is_deadline: bool,
}

/// Tagged union of every event payload the bus can carry.
///
/// Each variant corresponds one-to-one with a closed event type name; see
/// [`EventPayload::kind`]. Adding a new kind is a breaking change by design —
/// the taxonomy is meant to be closed and auditable, not open for ad hoc
/// string-keyed payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum EventPayload {
    // ---- document lifecycle ----
    /// A document was registered in the vault.
    DocumentAdded {
        /// Registry id of the new document.
        doc_id: DocId,
        /// Classifier-assigned or hinted document type, if known yet.
        doc_type: Option<String>,
        /// Original filename.
        filename: Option<String>,
    },
    /// A document write overwrote existing content.
    DocumentProcessed {
        /// Registry id of the document.
        doc_id: DocId,
    },
    /// The classifier produced a result for a document.
    DocumentClassified {
        /// Registry id of the document.
        doc_id: DocId,
        /// Classifier's best guess at document type.
        doc_type: String,
        /// Classifier confidence in `[0, 1]`.
        confidence: f64,
        /// True when confidence is high enough to trigger extraction.
        ready_for_extraction: bool,
    },
    /// The extractor produced dated events from a document's text.
    EventsExtracted {
        /// Registry id of the source document.
        doc_id: DocId,
        /// Number of events extracted.
        count: usize,
        /// The extracted items themselves.
        events: Vec<ExtractedItem>,
    },

    // ---- case / state ----
    /// A case-tracking field (hearing date, answer deadline, ...) changed.
    CaseInfoUpdated {
        /// Names of the fields that changed.
        updates: Vec<String>,
    },
    /// A law violation was identified in a document or issue.
    ViolationFound {
        /// Issue type the violation corresponds to.
        issue_type: String,
        /// Human-readable description.
        description: String,
    },
    /// The derived timeline gained new entries.
    TimelineUpdated {
        /// Number of entries added.
        events_added: usize,
    },

    // ---- loop-internal ----
    /// A raw document upload was recorded (pre-classification).
    DocumentUploaded {
        /// Best-known document type at upload time.
        doc_type: String,
        /// Original filename.
        filename: Option<String>,
        /// Registry id, if already assigned.
        doc_id: Option<DocId>,
    },
    /// A document finished analysis (issues/deadlines/laws extracted).
    DocumentAnalyzed {
        /// Issues detected in the document.
        issues: Vec<Issue>,
        /// Deadlines detected in the document.
        deadlines: Vec<Deadline>,
        /// Law ids cross-referenced against the document.
        applicable_laws: Vec<String>,
    },
    /// A new issue was detected.
    IssueDetected {
        /// The detected issue.
        issue: Issue,
    },
    /// A deadline has entered the `[now, now+7d]` warning window.
    DeadlineApproaching {
        /// The deadline in question.
        deadline: Deadline,
        /// Days remaining, for display purposes.
        days_remaining: i64,
    },
    /// A deadline's date has passed without resolution.
    DeadlinePassed {
        /// The deadline that passed.
        deadline: Deadline,
    },
    /// The user (or an advocate on their behalf) took a recommended action.
    ActionTaken {
        /// Action key, e.g. `seek_legal_help`.
        action: String,
        /// Optional human-readable label.
        label: Option<String>,
    },
    /// The user's phase changed.
    PhaseChanged {
        /// Previous phase.
        from: Phase,
        /// New phase.
        to: Phase,
    },
    /// A law reference was matched against the user's situation.
    LawMatched {
        /// Id of the matched law reference.
        law_id: String,
    },
    /// The user dismissed a suggestion or warning.
    UserDismissed {
        /// Key of the dismissed item.
        item: String,
    },
    /// The context loop produced a new predicted need.
    PredictionMade {
        /// Key of the predicted need.
        predicted: String,
    },
    /// A user's aggregate intensity jumped sharply.
    IntensitySpike {
        /// New aggregate intensity score.
        score: f64,
        /// Trend direction that triggered the spike.
        trend: Trend,
    },
    /// A UI surface should refresh a section for this user.
    UiRefreshNeeded {
        /// Section key, e.g. `documents`.
        section: String,
    },

    // ---- vault access ----
    /// The vault access engine recorded a delete decision. Carries no
    /// document content, successful or not.
    AccessAudited {
        /// Actor who made the request.
        actor_id: UserId,
        /// Resource the request targeted.
        resource_id: String,
        /// Whether the delete was allowed.
        decision: tenant_types::Decision,
        /// Denial reason, when `decision` is `denied`.
        reason: Option<String>,
    },
    /// A document's recomputed content hash no longer matches the recorded
    /// hash. Non-fatal; the document remains retrievable but flagged.
    IntegrityAlert {
        /// Registry id of the affected document.
        doc_id: DocId,
    },
}

impl EventPayload {
    /// The closed-taxonomy type name for this payload, matching the wire
    /// tag used in [`EventPayload`]'s `#[serde(tag = "type")]`.
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::DocumentAdded { .. } => "document_added",
            EventPayload::DocumentProcessed { .. } => "document_processed",
            EventPayload::DocumentClassified { .. } => "document_classified",
            EventPayload::EventsExtracted { .. } => "events_extracted",
            EventPayload::CaseInfoUpdated { .. } => "case_info_updated",
            EventPayload::ViolationFound { .. } => "violation_found",
            EventPayload::TimelineUpdated { .. } => "timeline_updated",
            EventPayload::DocumentUploaded { .. } => "document_uploaded",
            EventPayload::DocumentAnalyzed { .. } => "document_analyzed",
            EventPayload::IssueDetected { .. } => "issue_detected",
            EventPayload::DeadlineApproaching { .. } => "deadline_approaching",
            EventPayload::DeadlinePassed { .. } => "deadline_passed",
            EventPayload::ActionTaken { .. } => "action_taken",
            EventPayload::PhaseChanged { .. } => "phase_changed",
            EventPayload::LawMatched { .. } => "law_matched",
            EventPayload::UserDismissed { .. } => "user_dismissed",
            EventPayload::PredictionMade { .. } => "prediction_made",
            EventPayload::IntensitySpike { .. } => "intensity_spike",
            EventPayload::UiRefreshNeeded { .. } => "ui_refresh_needed",
            EventPayload::AccessAudited { .. } => "access_audited",
            EventPayload::IntegrityAlert { .. } => "integrity_alert",
        }
    }
}

/// One atomic thing that happened, as delivered to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Stable opaque event id (UUIDv4).
    pub id: RecordId,
    /// UTC instant the event was published.
    pub timestamp: DateTime<Utc>,
    /// Subject user, or `None` for a broadcast event.
    pub user_id: Option<UserId>,
    /// Free-form tag identifying the publisher.
    pub source: String,
    /// The typed payload.
    pub payload: EventPayload,
    /// Urgency score in `[0, 100]`, filled in by the context loop before
    /// publication. Defaults to `0.0` for events the loop does not score.
    pub intensity: f64,
    /// Severity bucket derived from `intensity`.
    pub severity: Severity,
}

impl Event {
    /// Construct a new event with a fresh id and the current timestamp.
    ///
    /// Intensity defaults to `0.0` / [`Severity::Info`]; callers that score
    /// events (the context loop) overwrite both fields before publication.
    pub fn new(payload: EventPayload, source: impl Into<String>, user_id: Option<UserId>) -> Self {
        Self {
            id: RecordId(uuid::Uuid::new_v4().to_string()),
            timestamp: Utc::now(),
            user_id,
            source: source.into(),
            payload,
            intensity: 0.0,
            severity: Severity::Info,
        }
    }

    /// The closed-taxonomy type name of this event's payload.
    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    /// Attach a scored intensity, deriving severity from it.
    pub fn with_intensity(mut self, intensity: f64) -> Self {
        self.intensity = intensity;
        self.severity = Severity::from_intensity(intensity);
        self
    }
}

//! `UserContext` and the read-only views built from it.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenant_intensity::TrendReport;
use tenant_types::{Deadline, Issue, Phase, Severity, UserId};

const MAX_EVENT_HISTORY: usize = 500;

/// A document descriptor as held in a user's context (not the full
/// registry record owned by `tenant-intake`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    /// Registry id, when known.
    pub id: Option<String>,
    /// Document type key (`"eviction_notice"`, `"lease"`, ...).
    pub doc_type: String,
    /// Original filename.
    pub filename: Option<String>,
    /// When this descriptor was recorded.
    pub added_at: DateTime<Utc>,
}

/// One entry in `actions_taken`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Action key.
    pub action: String,
    /// Optional human label.
    pub label: Option<String>,
    /// When the action was recorded.
    pub timestamp: DateTime<Utc>,
}

/// A deterministic suggestion surfaced by the context loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedNeed {
    /// Coarse kind (`document_needed`, `action_needed`, `resource_needed`, `deadline_warning`).
    pub kind: String,
    /// Item key, e.g. `"move_in_photos"`.
    pub item: String,
    /// Why this was suggested.
    pub reason: String,
    /// `critical | high | medium`.
    pub priority: String,
}

/// A recommended next action, produced by the recommended-actions policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedAction {
    /// Action key, deduplicated across the whole list.
    pub action: String,
    /// Human-readable label.
    pub label: String,
    /// Why this is recommended.
    pub reason: String,
    /// `critical | high | medium`.
    pub priority: String,
}

/// Complete per-user derived state. Owned exclusively by the context loop
/// worker for `user_id`; every other component sees a cloned snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    /// Subject of this context.
    pub user_id: UserId,
    /// Current phase bucket.
    pub phase: Phase,
    /// Aggregate urgency score in `[0, 100]`.
    pub intensity_score: f64,

    /// Ordered document descriptors, oldest first.
    pub documents: Vec<DocumentDescriptor>,
    /// Distinct document type keys seen so far.
    pub document_types: HashSet<String>,

    /// Currently active issues, at most one per `type`.
    pub active_issues: Vec<Issue>,
    /// Deadlines, kept sorted ascending by date.
    pub deadlines: Vec<Deadline>,

    /// Law ids cross-referenced against this user's documents/issues.
    pub applicable_laws: Vec<String>,
    /// Distinct tenant rights currently flagged at risk.
    pub rights_at_risk: HashSet<String>,

    /// Bounded ring of recent event summaries, newest last, capped at 500.
    pub events: Vec<String>,
    /// Actions the user (or an advocate) has taken.
    pub actions_taken: Vec<ActionRecord>,

    /// Regenerated every tick from document/phase/deadline state.
    pub predicted_needs: Vec<PredictedNeed>,

    /// Timestamps whose 24h debounce gate has already fired, keyed by
    /// deadline id, so `deadline_approaching` isn't re-emitted every tick.
    #[serde(skip)]
    pub(crate) deadline_debounce: std::collections::HashMap<String, DateTime<Utc>>,

    /// Set once phase reaches `eviction`; only [`crate::phase::resolve_issue`]
    /// clears it. See the phase module docs for the sticky-eviction rule.
    pub(crate) eviction_latch: bool,

    /// Last time any event was processed for this user.
    pub last_activity: DateTime<Utc>,
    /// When this context was first created.
    pub created_at: DateTime<Utc>,
}

impl UserContext {
    /// Construct an empty context for a user's first event.
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            phase: Phase::default(),
            intensity_score: 0.0,
            documents: Vec::new(),
            document_types: HashSet::new(),
            active_issues: Vec::new(),
            deadlines: Vec::new(),
            applicable_laws: Vec::new(),
            rights_at_risk: HashSet::new(),
            events: Vec::new(),
            actions_taken: Vec::new(),
            predicted_needs: Vec::new(),
            deadline_debounce: std::collections::HashMap::new(),
            eviction_latch: false,
            last_activity: now,
            created_at: now,
        }
    }

    pub(crate) fn push_event_summary(&mut self, summary: String) {
        self.events.push(summary);
        if self.events.len() > MAX_EVENT_HISTORY {
            let overflow = self.events.len() - MAX_EVENT_HISTORY;
            self.events.drain(0..overflow);
        }
    }
}

/// Risk-level descriptor shown alongside an intensity report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLevel {
    /// `critical | high | elevated | moderate | low`.
    pub level: &'static str,
    /// Short human-readable message.
    pub message: &'static str,
}

impl RiskLevel {
    /// Derive a risk-level descriptor from an aggregate intensity score.
    pub fn from_intensity(intensity: f64) -> Self {
        if intensity >= 80.0 {
            Self {
                level: "critical",
                message: "Immediate action required",
            }
        } else if intensity >= 60.0 {
            Self {
                level: "high",
                message: "Urgent attention needed",
            }
        } else if intensity >= 40.0 {
            Self {
                level: "elevated",
                message: "Active issues to address",
            }
        } else if intensity >= 20.0 {
            Self {
                level: "moderate",
                message: "Monitor and prepare",
            }
        } else {
            Self {
                level: "low",
                message: "Situation stable",
            }
        }
    }
}

/// Per-issue intensity breakdown, as returned in an [`IntensityReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueIntensity {
    /// Issue type key.
    pub item: String,
    /// Score for this item alone.
    pub intensity: f64,
    /// Severity bucket.
    pub severity: Severity,
    /// Contributing-factor breakdown, for audit/explainability.
    pub factors: Vec<String>,
}

/// Detailed urgency report for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensityReport {
    /// Aggregate score at the time of the report.
    pub overall_intensity: f64,
    /// Severity bucket for `overall_intensity`.
    pub severity: Severity,
    /// Short-term trend.
    pub trend: TrendReport,
    /// Per-issue breakdown.
    pub breakdown: Vec<IssueIntensity>,
    /// Current phase.
    pub phase: Phase,
    /// Human-facing risk descriptor.
    pub risk_level: RiskLevel,
}

/// Consistent read-only snapshot returned by `ContextLoop::get_state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateView {
    /// Subject user.
    pub user_id: UserId,
    /// Full context snapshot.
    pub context: UserContext,
    /// Intensity report computed from the same snapshot.
    pub intensity: IntensityReport,
    /// Recommended next actions (at most 5).
    pub next_actions: Vec<RecommendedAction>,
}

#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tenant-types** – Shared primitive data structures for the Semptify core runtime.
//!
//! The crate is dependency-light and sits at the bottom of the crate graph so
//! that every other crate can depend on it without causing cycles. It makes
//! no assumptions about I/O, storage, or transport.
//!
//! All timestamps in this workspace are `chrono::DateTime<Utc>`. There is no
//! naive-timestamp variant anywhere in the public API: a payload arriving
//! with a bare date/time string that cannot be parsed as UTC is rejected at
//! the deserialization boundary rather than silently treated as local time.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod errors;
pub use errors::TenantError;

//─────────────────────────────
//  Identifiers
//─────────────────────────────

/// Maximum length accepted for a free-form user-supplied identifier.
pub const MAX_ID_LEN: usize = 256;

/// Opaque identifier for a tenant-rights platform user.
///
/// Distinct from `EntityId` in systems with numeric actors: user ids here
/// originate from an external auth provider and are treated as opaque
/// strings throughout the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Build a `UserId`, rejecting empty or oversized values.
    pub fn new(raw: impl Into<String>) -> Result<Self, TenantError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(TenantError::Input("user id cannot be empty".into()));
        }
        if raw.len() > MAX_ID_LEN {
            return Err(TenantError::Input(format!(
                "user id too long: {} > {}",
                raw.len(),
                MAX_ID_LEN
            )));
        }
        Ok(Self(raw))
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical document handle, of the form `ORG-YYYY-NNNNNN-XXXX` (see
/// [`tenant-intake`](../tenant_intake/index.html) for the generator).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocId(pub String);

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier for an [`Event`] or audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//─────────────────────────────
//  Severity / phase taxonomy
//─────────────────────────────

/// Categorical projection of an intensity score onto a coarse urgency bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// 0-19.
    Info,
    /// 20-39.
    Low,
    /// 40-59.
    Medium,
    /// 60-79.
    High,
    /// 80-100.
    Critical,
}

impl Severity {
    /// Map a clamped `0..=100` intensity score onto a [`Severity`] bucket.
    pub fn from_intensity(intensity: f64) -> Self {
        if intensity >= 80.0 {
            Severity::Critical
        } else if intensity >= 60.0 {
            Severity::High
        } else if intensity >= 40.0 {
            Severity::Medium
        } else if intensity >= 20.0 {
            Severity::Low
        } else {
            Severity::Info
        }
    }
}

/// Coarse user-situation bucket driving UI emphasis and sticky-phase rules.
///
/// Phase transitions are monotonic by severity: once in [`Phase::Eviction`]
/// the context loop will not downgrade the phase automatically within the
/// same session. An explicit `issue_resolved` event is required to leave it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Prospective tenant, no active lease yet.
    PreMoveIn,
    /// Ordinary tenancy, no open issues.
    Active,
    /// At least one open issue, not yet escalated.
    IssueEmerging,
    /// Multiple issues, or intensity high enough to warrant dispute posture.
    Dispute,
    /// Eviction notice, threat, or very high intensity. Sticky.
    Eviction,
    /// Tenant has moved out; deposit/closing matters remain.
    MoveOut,
    /// Tenancy concluded; post-tenancy deposit or reference matters.
    PostTenancy,
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Active
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::PreMoveIn => "pre_move_in",
            Phase::Active => "active",
            Phase::IssueEmerging => "issue_emerging",
            Phase::Dispute => "dispute",
            Phase::Eviction => "eviction",
            Phase::MoveOut => "move_out",
            Phase::PostTenancy => "post_tenancy",
        };
        write!(f, "{s}")
    }
}

/// Short-term movement of a user's aggregate intensity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Mean of the last 5 readings is more than 10 points above the prior mean.
    Escalating,
    /// Mean of the last 5 readings is more than 10 points below the prior mean.
    Improving,
    /// Neither threshold crossed.
    Stable,
}

//─────────────────────────────
//  Deadlines and issues
//─────────────────────────────

/// A dated obligation or event tracked against a user's situation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deadline {
    /// Stable identifier, unique within a user's deadline list.
    pub id: String,
    /// Deadline kind, e.g. `court_summons`, `answer_deadline`.
    pub r#type: String,
    /// UTC instant the deadline falls on.
    pub date: chrono::DateTime<chrono::Utc>,
    /// Human-readable description.
    pub description: String,
    /// Document this deadline was extracted from, if any.
    pub linked_document_id: Option<DocId>,
}

/// A detected problem in a user's tenancy, keyed by `type`.
///
/// Invariant: a given `type` appears at most once in a user's active-issue
/// list at a time (see [`tenant-context`](../tenant_context/index.html)).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Issue kind, drawn from the closed taxonomy scored by `tenant-intensity`.
    pub r#type: String,
    /// Human-readable description.
    pub description: String,
    /// UTC instant the issue was first detected.
    pub detected_at: chrono::DateTime<chrono::Utc>,
    /// References to supporting evidence (document ids, custody record ids).
    pub evidence_refs: Vec<String>,
}

//─────────────────────────────
//  Vault access taxonomy
//─────────────────────────────

/// Actor role recognized by the vault access matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The tenant themselves.
    User,
    /// A tenant-rights advocate assisting the user.
    Advocate,
    /// Legal staff (attorneys, paralegals).
    Legal,
    /// Organizational manager / supervisor.
    Manager,
    /// Platform administrator.
    Admin,
}

/// Relationship between an actor and a resource, determining the access
/// matrix row/column that applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceClass {
    /// The actor owns the resource outright.
    Own,
    /// The resource has been explicitly shared with the actor.
    Shared,
    /// The resource belongs to a case the actor is assigned to.
    Case,
    /// The resource belongs to the actor's organization.
    Org,
    /// Platform-internal resource.
    System,
}

/// Operation requested against a vault resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessAction {
    /// Read resource content.
    Read,
    /// Create or overwrite resource content.
    Write,
    /// Remove the resource.
    Delete,
    /// Grant another actor access to the resource.
    Share,
    /// Enumerate resources in a folder/collection.
    List,
}

/// Outcome of an access-matrix lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The action is permitted.
    Allowed,
    /// The action is forbidden.
    Denied,
}

//─────────────────────────────
//  Integrity taxonomy
//─────────────────────────────

/// Result of the most recent content-hash comparison for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integrity {
    /// Recomputed hash matched the recorded hash.
    Verified,
    /// Recomputed hash did not match; document is flagged but still readable.
    Tampered,
    /// No verification has been performed yet.
    Unknown,
}

/// Status of a registered document in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Normal, retrievable document.
    Active,
    /// Soft-retired, retained for audit purposes.
    Archived,
    /// Soft-deleted; content may still exist at the storage layer.
    Deleted,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_boundaries() {
        assert_eq!(Severity::from_intensity(80.0), Severity::Critical);
        assert_eq!(Severity::from_intensity(79.9), Severity::High);
        assert_eq!(Severity::from_intensity(60.0), Severity::High);
        assert_eq!(Severity::from_intensity(40.0), Severity::Medium);
        assert_eq!(Severity::from_intensity(20.0), Severity::Low);
        assert_eq!(Severity::from_intensity(19.9), Severity::Info);
    }

    #[test]
    fn user_id_rejects_empty_and_oversized() {
        assert!(UserId::new("").is_err());
        assert!(UserId::new("  ").is_err());
        assert!(UserId::new("a".repeat(MAX_ID_LEN + 1)).is_err());
        assert!(UserId::new("tenant-42").is_ok());
    }

    #[test]
    fn phase_serializes_snake_case() {
        let s = serde_json::to_string(&Phase::IssueEmerging).unwrap();
        assert_eq!(s, "\"issue_emerging\"");
    }
}

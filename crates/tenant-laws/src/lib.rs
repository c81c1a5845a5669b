#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tenant-laws** – Immutable [`LawReference`] records plus a keyword
//! index for cross-referencing document text and classifier-extracted
//! terms against applicable tenant law.
//!
//! Grounded on `app/services/law_engine.py`'s `LawReference`/`match_document`;
//! the base law set below is carried over from its seed data, trimmed of
//! the per-jurisdiction citations the source leaves `None` in its general
//! entries.

mod seed;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use seed::base_laws;

/// Broad category a [`LawReference`] falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LawCategory {
    /// Lease term disputes.
    LeaseTerms,
    /// Rent payment and increase rules.
    RentPayment,
    /// Security deposit handling.
    SecurityDeposit,
    /// Implied warranty of habitability.
    Habitability,
    /// Repair obligations.
    Repairs,
    /// Eviction procedure.
    Eviction,
    /// Notice-period requirements.
    NoticeRequirements,
    /// Fair-housing / discrimination.
    Discrimination,
    /// Tenant privacy and landlord entry.
    Privacy,
    /// Protection against retaliation.
    Retaliation,
    /// Lease termination mechanics.
    LeaseTermination,
    /// Subletting rules.
    Subletting,
    /// Utility responsibility.
    Utilities,
    /// Landlord entry and access.
    EntryAccess,
    /// Anything not covered above.
    Other,
}

/// An immutable reference to applicable tenant law, loaded once at
/// startup and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LawReference {
    /// Stable identifier, e.g. `habitability_general`.
    pub id: String,
    /// Broad category.
    pub category: LawCategory,
    /// Jurisdiction this reference applies in (`"general"`, `"federal"`,
    /// a state/county name, ...).
    pub jurisdiction: String,
    /// One-paragraph summary.
    pub summary: String,
    /// Terms that, when found in document text or extracted terms,
    /// indicate this law may apply.
    pub keywords: Vec<String>,
    /// Tenant rights this law establishes.
    pub tenant_rights: Vec<String>,
    /// Named statutory time limits, e.g. `{"nonpayment_notice": "3-14 days"}`.
    pub time_limits: BTreeMap<String, String>,
}

/// One match between a document and a [`LawReference`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LawMatch {
    /// The matched law's id.
    pub law_id: String,
    /// Relevance in `[0, 1]`: matched-keyword fraction, boosted 20% and
    /// capped at 1.0, as in the source engine.
    pub relevance_score: f64,
    /// Which of the law's keywords were found.
    pub matched_keywords: Vec<String>,
}

/// A loaded, queryable set of [`LawReference`]s.
pub struct LawIndex {
    laws: Vec<LawReference>,
}

impl LawIndex {
    /// Build an index over `laws`.
    pub fn new(laws: Vec<LawReference>) -> Self {
        Self { laws }
    }

    /// An index pre-loaded with the built-in general-jurisdiction law set.
    pub fn with_base_laws() -> Self {
        Self::new(base_laws())
    }

    /// Look up one law by id.
    pub fn get(&self, law_id: &str) -> Option<&LawReference> {
        self.laws.iter().find(|law| law.id == law_id)
    }

    /// All laws in a category.
    pub fn by_category(&self, category: LawCategory) -> Vec<&LawReference> {
        self.laws.iter().filter(|law| law.category == category).collect()
    }

    /// Match `doc_text` and classifier-extracted `doc_terms` against every
    /// law's keyword list, returning matches with score ≥ `min_score`,
    /// sorted by relevance descending.
    pub fn match_document(&self, doc_text: &str, doc_terms: &[String], min_score: f64) -> Vec<LawMatch> {
        let text_lower = doc_text.to_lowercase();
        let terms_lower: Vec<String> = doc_terms.iter().map(|t| t.to_lowercase()).collect();

        let mut matches: Vec<LawMatch> = self
            .laws
            .iter()
            .filter_map(|law| {
                if law.keywords.is_empty() {
                    return None;
                }
                let matched: Vec<String> = law
                    .keywords
                    .iter()
                    .filter(|kw| {
                        let kw_lower = kw.to_lowercase();
                        text_lower.contains(&kw_lower)
                            || terms_lower.iter().any(|term| term.contains(&kw_lower))
                    })
                    .cloned()
                    .collect();
                if matched.is_empty() {
                    return None;
                }
                let raw_score = matched.len() as f64 / law.keywords.len() as f64;
                let score = (raw_score * 1.2).min(1.0);
                Some(LawMatch {
                    law_id: law.id.clone(),
                    relevance_score: score,
                    matched_keywords: matched,
                })
            })
            .filter(|m| m.relevance_score >= min_score)
            .collect();

        matches.sort_by(|a, b| b.relevance_score.partial_cmp(&a.relevance_score).unwrap());
        matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn habitability_keywords_match_mold_text() {
        let index = LawIndex::with_base_laws();
        let matches = index.match_document("There is mold and a pest infestation.", &[], 0.1);
        assert!(matches.iter().any(|m| m.law_id == "habitability_general"));
    }

    #[test]
    fn score_never_exceeds_one() {
        let index = LawIndex::with_base_laws();
        let matches = index.match_document(
            "eviction notice to quit pay or quit vacate termination unlawful detainer",
            &[],
            0.0,
        );
        assert!(matches.iter().all(|m| m.relevance_score <= 1.0));
    }

    #[test]
    fn matches_are_sorted_descending_by_relevance() {
        let index = LawIndex::with_base_laws();
        let matches = index.match_document(
            "mold heat water plumbing electrical pest infestation notice to quit",
            &[],
            0.0,
        );
        assert!(matches.windows(2).all(|w| w[0].relevance_score >= w[1].relevance_score));
    }
}

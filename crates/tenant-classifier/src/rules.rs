//! Keyword-weighted document-type scoring and shallow entity extraction.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ClassificationResult;

struct DocTypeRule {
    doc_type: &'static str,
    title: &'static str,
    keywords: &'static [(&'static str, f64)],
}

const RULES: &[DocTypeRule] = &[
    DocTypeRule {
        doc_type: "eviction_notice",
        title: "Eviction Notice",
        keywords: &[
            ("notice to quit", 1.0),
            ("eviction notice", 1.0),
            ("unlawful detainer", 0.9),
            ("must vacate", 0.8),
            ("notice to vacate", 0.8),
            ("terminate your tenancy", 0.6),
        ],
    },
    DocTypeRule {
        doc_type: "court_filing",
        title: "Court Filing",
        keywords: &[
            ("summons", 0.9),
            ("complaint", 0.7),
            ("plaintiff", 0.6),
            ("defendant", 0.6),
            ("case no", 0.5),
            ("court of", 0.5),
            ("hearing", 0.4),
        ],
    },
    DocTypeRule {
        doc_type: "lease",
        title: "Lease Agreement",
        keywords: &[
            ("lease agreement", 1.0),
            ("rental agreement", 0.9),
            ("tenancy agreement", 0.9),
            ("term of this lease", 0.6),
            ("landlord and tenant agree", 0.5),
        ],
    },
    DocTypeRule {
        doc_type: "deposit_demand",
        title: "Deposit Demand",
        keywords: &[
            ("security deposit", 0.6),
            ("demand for return of deposit", 1.0),
            ("deposit refund", 0.7),
        ],
    },
    DocTypeRule {
        doc_type: "repair_request",
        title: "Repair Request",
        keywords: &[
            ("repair request", 1.0),
            ("maintenance request", 0.9),
            ("needs repair", 0.6),
            ("please repair", 0.6),
        ],
    },
    DocTypeRule {
        doc_type: "receipt",
        title: "Payment Receipt",
        keywords: &[
            ("receipt", 0.7),
            ("payment received", 0.8),
            ("paid in full", 0.8),
        ],
    },
];

const ISSUE_KEYWORDS: &[(&str, &str)] = &[
    ("mold", "habitability_issue"),
    ("no heat", "habitability_issue"),
    ("no hot water", "habitability_issue"),
    ("infestation", "habitability_issue"),
    ("broken", "habitability_issue"),
    ("harass", "harassment"),
    ("retaliat", "retaliation"),
    ("lockout", "illegal_lockout"),
    ("locked out", "illegal_lockout"),
    ("changed the locks", "illegal_lockout"),
];

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:\d{1,2}[/\-]\d{1,2}[/\-]\d{4}|\d{4}-\d{2}-\d{2}|(?:january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2},?\s+\d{4}|\d{1,2}\s+(?:january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{4})\b",
    )
    .expect("static date pattern is valid")
});

static AMOUNT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\s?\d[\d,]*(?:\.\d{2})?").expect("static amount pattern is valid"));

const PARTY_KEYWORDS: &[&str] = &["landlord", "tenant", "plaintiff", "defendant", "property manager"];

/// Raw date-like substrings found in `text`, in order of first appearance,
/// deduplicated.
pub fn key_dates(text: &str) -> Vec<String> {
    dedup_preserve_order(DATE_PATTERN.find_iter(text).map(|m| m.as_str().to_string()))
}

/// Dollar amounts found in `text`, in order of first appearance,
/// deduplicated.
pub fn key_amounts(text: &str) -> Vec<String> {
    dedup_preserve_order(AMOUNT_PATTERN.find_iter(text).map(|m| m.as_str().to_string()))
}

/// Party-role keywords mentioned in `text` (case-insensitive), in table
/// order.
pub fn key_parties(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    PARTY_KEYWORDS
        .iter()
        .filter(|kw| lower.contains(*kw))
        .map(|kw| kw.to_string())
        .collect()
}

fn dedup_preserve_order(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}

fn detect_issues(lower_text: &str) -> Vec<String> {
    let mut found = Vec::new();
    for (keyword, issue_type) in ISSUE_KEYWORDS {
        if lower_text.contains(keyword) && !found.contains(&issue_type.to_string()) {
            found.push(issue_type.to_string());
        }
    }
    found
}

/// Classify `text`, falling back to `hint` when no keyword rule scores
/// above zero, and to `unknown`/`0.0` when `text` is empty.
pub fn classify(text: &str, filename: &str, hint: Option<&str>) -> ClassificationResult {
    if text.trim().is_empty() {
        return ClassificationResult {
            doc_type: "unknown".to_string(),
            confidence: 0.0,
            title: filename.to_string(),
            summary: String::new(),
            key_dates: Vec::new(),
            key_parties: Vec::new(),
            key_amounts: Vec::new(),
            key_terms: Vec::new(),
            issues: Vec::new(),
        };
    }

    let lower = text.to_lowercase();
    let mut best: Option<(&DocTypeRule, f64, Vec<&str>)> = None;

    for rule in RULES {
        let matched: Vec<&str> = rule
            .keywords
            .iter()
            .filter(|(kw, _)| lower.contains(kw))
            .map(|(kw, _)| *kw)
            .collect();
        if matched.is_empty() {
            continue;
        }
        let score: f64 = rule
            .keywords
            .iter()
            .filter(|(kw, _)| matched.contains(kw))
            .map(|(_, weight)| *weight)
            .sum();
        let total_weight: f64 = rule.keywords.iter().map(|(_, w)| w).sum();
        let confidence = (score / total_weight).min(0.98);
        if best.as_ref().map(|(_, best_score, _)| confidence > *best_score).unwrap_or(true) {
            best = Some((rule, confidence, matched));
        }
    }

    let (doc_type, title, confidence, key_terms) = match best {
        Some((rule, confidence, matched)) => (
            rule.doc_type.to_string(),
            rule.title.to_string(),
            confidence,
            matched.into_iter().map(str::to_string).collect(),
        ),
        None => {
            let fallback = hint.unwrap_or("unknown").to_string();
            let confidence = if hint.is_some() { 0.4 } else { 0.0 };
            (fallback, filename.to_string(), confidence, Vec::new())
        }
    };

    let summary = text.chars().take(280).collect::<String>();

    ClassificationResult {
        doc_type,
        confidence,
        title,
        summary,
        key_dates: key_dates(text),
        key_parties: key_parties(text),
        key_amounts: key_amounts(text),
        key_terms,
        issues: detect_issues(&lower),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lease_text_scores_lease_over_court_filing() {
        let result = classify(
            "This Lease Agreement is between Landlord and Tenant for a term of this lease of 12 months.",
            "lease.pdf",
            None,
        );
        assert_eq!(result.doc_type, "lease");
    }

    #[test]
    fn unmatched_text_falls_back_to_hint() {
        let result = classify("Just some ordinary correspondence.", "letter.pdf", Some("other"));
        assert_eq!(result.doc_type, "other");
        assert_eq!(result.confidence, 0.4);
    }

    #[test]
    fn mold_text_surfaces_habitability_issue() {
        let result = classify("There is mold growing in the bathroom ceiling.", "photo.pdf", None);
        assert!(result.issues.contains(&"habitability_issue".to_string()));
    }

    #[test]
    fn amounts_and_dates_are_extracted() {
        let result = classify("Rent of $1,200.00 was due on 03/01/2025.", "receipt.pdf", None);
        assert!(result.key_amounts.iter().any(|a| a.contains("1,200.00")));
        assert!(result.key_dates.iter().any(|d| d.contains("03/01/2025")));
    }
}

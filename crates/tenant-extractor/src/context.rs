//! Context classification: given the text surrounding a date, decide what
//! kind of event it is.
//!
//! Grounded on `EventExtractor.EVENT_CONTEXTS`/`_classify_event` in
//! `app/services/event_extractor.py`. Spec.md §4.6 lists a representative
//! subset of this table; the fuller set below is carried over from the
//! source since the spec explicitly says "full list in source".

use once_cell::sync::Lazy;
use regex::Regex;

struct ContextRule {
    pattern: &'static str,
    title: &'static str,
    event_type: &'static str,
    confidence: f64,
}

static CONTEXT_RULES: Lazy<Vec<(Regex, &'static ContextRule)>> = Lazy::new(|| {
    RULES
        .iter()
        .map(|rule| (Regex::new(&format!("(?i){}", rule.pattern)).expect("static rule regex is valid"), rule))
        .collect()
});

const RULES: &[ContextRule] = &[
    ContextRule {
        pattern: r"(?:must\s+vacate|vacate\s+by|quit\s+by|leave\s+by)",
        title: "Vacate Deadline",
        event_type: "notice",
        confidence: 0.95,
    },
    ContextRule {
        pattern: r"(?:filed|filing\s+date)",
        title: "Court Filing",
        event_type: "court",
        confidence: 0.95,
    },
    ContextRule {
        pattern: r"(?:hearing|trial|appear\w*)",
        title: "Court Hearing",
        event_type: "court",
        confidence: 0.95,
    },
    ContextRule {
        pattern: r"(?:notice|served|delivered|given)",
        title: "Notice Served",
        event_type: "notice",
        confidence: 0.9,
    },
    ContextRule {
        pattern: r"(?:summons|complaint)",
        title: "Summons/Complaint Filed",
        event_type: "court",
        confidence: 0.9,
    },
    ContextRule {
        pattern: r"(?:lease\s+)?(?:commence|start|begin)\w*",
        title: "Lease Start Date",
        event_type: "other",
        confidence: 0.9,
    },
    ContextRule {
        pattern: r"(?:lease\s+)?(?:end|expir\w*|terminat\w*)",
        title: "Lease End Date",
        event_type: "other",
        confidence: 0.9,
    },
    ContextRule {
        pattern: r"(?:move[\s\-]?in)",
        title: "Move-In Date",
        event_type: "other",
        confidence: 0.85,
    },
    ContextRule {
        pattern: r"(?:move[\s\-]?out)",
        title: "Move-Out Date",
        event_type: "other",
        confidence: 0.85,
    },
    ContextRule {
        pattern: r"(?:rent\s+)?(?:due|payable)",
        title: "Rent Due",
        event_type: "payment",
        confidence: 0.85,
    },
    ContextRule {
        pattern: r"(?:paid|payment\s+(?:of|made|received))",
        title: "Payment Made",
        event_type: "payment",
        confidence: 0.85,
    },
    ContextRule {
        pattern: r"(?:effective|expires?|terminat\w*)",
        title: "Notice Effective Date",
        event_type: "notice",
        confidence: 0.85,
    },
    ContextRule {
        pattern: r"(?:inspection|walkthrough)",
        title: "Inspection Date",
        event_type: "maintenance",
        confidence: 0.85,
    },
    ContextRule {
        pattern: r"(?:last\s+payment)",
        title: "Last Payment Date",
        event_type: "payment",
        confidence: 0.8,
    },
    ContextRule {
        pattern: r"(?:repair\w*|maintenanc\w*)",
        title: "Repair/Maintenance",
        event_type: "maintenance",
        confidence: 0.8,
    },
    ContextRule {
        pattern: r"(?:received)",
        title: "Document Received",
        event_type: "communication",
        confidence: 0.75,
    },
    ContextRule {
        pattern: r"(?:dated?|written|sent|mailed)",
        title: "Document Date",
        event_type: "communication",
        confidence: 0.7,
    },
];

static EXCLUDE_RULES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?:dob|d\.o\.b\.?|date\s+of\s+birth|born|birthday)",
        r"(?:ssn|social\s+security)",
        r"(?:case\s+(?:no|number|#))",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).expect("static exclude regex is valid"))
    .collect()
});

const DEADLINE_WORDS: &[&str] = &[
    "by", "before", "deadline", "due", "must", "no later than", "expire", "within",
];

/// Whether `context_before` (lowercased) matches an exclusion pattern —
/// this date should be dropped entirely (DOB, SSN, case number).
pub fn should_exclude(context_before: &str) -> bool {
    EXCLUDE_RULES.iter().any(|rule| rule.is_match(context_before))
}

/// Whether the preceding context carries a deadline marker.
pub fn is_deadline(context_before: &str) -> bool {
    DEADLINE_WORDS.iter().any(|word| context_before.contains(word))
}

/// Best-scoring `(event_type, title, confidence)` for the combined
/// before/after context, falling back to a `doc_type`-keyed default when no
/// rule matches, and to a generic default when even that fails.
pub fn classify_event(context_before: &str, context_after: &str, doc_type: &str) -> (&'static str, &'static str, f64) {
    let full_context = format!("{context_before} {context_after}");

    let mut best: Option<(&'static str, &'static str, f64)> = None;
    for (regex, rule) in CONTEXT_RULES.iter() {
        if regex.is_match(&full_context) {
            let better = best.map(|(_, _, conf)| rule.confidence > conf).unwrap_or(true);
            if better {
                best = Some((rule.event_type, rule.title, rule.confidence));
            }
        }
    }

    if let Some(result) = best {
        return result;
    }

    match doc_type {
        "notice" => ("notice", "Notice Date", 0.6),
        "lease" => ("other", "Lease Date", 0.6),
        "court_filing" => ("court", "Court Date", 0.7),
        "receipt" | "payment_record" => ("payment", "Payment Date", 0.6),
        _ => ("other", "Document Date", 0.5),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vacate_language_beats_generic_notice_language() {
        let (event_type, title, _) = classify_event("you must vacate by", "", "unknown");
        assert_eq!(event_type, "notice");
        assert_eq!(title, "Vacate Deadline");
    }

    #[test]
    fn unmatched_context_falls_back_to_doc_type_default() {
        let (event_type, title, confidence) = classify_event("nothing relevant here", "", "court_filing");
        assert_eq!(event_type, "court");
        assert_eq!(title, "Court Date");
        assert_eq!(confidence, 0.7);
    }

    #[test]
    fn dob_context_is_excluded() {
        assert!(should_exclude("patient date of birth: "));
        assert!(!should_exclude("hearing scheduled for "));
    }

    #[test]
    fn deadline_word_is_detected() {
        assert!(is_deadline("you must pay by "));
        assert!(!is_deadline("payment was made on "));
    }
}

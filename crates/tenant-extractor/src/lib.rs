#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tenant-extractor** – Deterministic, rule-based extraction of dated
//! events from document text. No ML, no I/O: the same text and `doc_type`
//! hint always produce the same output.
//!
//! Grounded on `app/services/event_extractor.py`'s `EventExtractor`.

mod context;
mod grammar;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub use context::{classify_event, is_deadline, should_exclude};
pub use grammar::{find_dates, DateMatch};

/// One event recognized in a document's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEvent {
    /// UTC midnight of the recognized date.
    pub date: DateTime<Utc>,
    /// Event category (`notice`, `court`, `payment`, `other`, `maintenance`,
    /// `communication`).
    pub event_type: String,
    /// Short title.
    pub title: String,
    /// Surrounding text the date was lifted from.
    pub description: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// The exact matched date substring.
    pub source_text: String,
    /// True when the preceding context carried a deadline marker.
    pub is_deadline: bool,
}

const CONTEXT_BEFORE_CHARS: usize = 100;
const CONTEXT_AFTER_CHARS: usize = 50;
const DESCRIPTION_BEFORE_CHARS: usize = 60;
const DESCRIPTION_AFTER_CHARS: usize = 60;
const MIN_EVENT_YEAR: i32 = 2000;

static CHUNK_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:[.!?])\s+|\n\n+").unwrap());

/// Extract every dated event from `text`, using `doc_type` only as a
/// fallback classification hint when no context rule matches.
///
/// Output is deduplicated by `(date, event_type)` — first occurrence wins —
/// and sorted by date ascending.
pub fn extract_events(text: &str, doc_type: &str) -> Vec<ExtractedEvent> {
    let mut events = Vec::new();

    for chunk in split_into_chunks(text) {
        for date_match in find_dates(&chunk) {
            let position = date_match.position;
            let context_before = lowercase_window_before(&chunk, position, CONTEXT_BEFORE_CHARS);
            let context_after = lowercase_window_after(&chunk, position, CONTEXT_AFTER_CHARS);

            if should_exclude(&context_before) {
                continue;
            }
            if date_match.date.format("%Y").to_string().parse::<i32>().unwrap_or(0) < MIN_EVENT_YEAR {
                continue;
            }

            let (event_type, title, confidence) = classify_event(&context_before, &context_after, doc_type);
            let deadline = is_deadline(&context_before);

            let desc_start = position.saturating_sub(DESCRIPTION_BEFORE_CHARS);
            let desc_end =
                (position + date_match.source_text.len() + DESCRIPTION_AFTER_CHARS).min(chunk.len());
            let description = safe_slice(&chunk, desc_start, desc_end).trim().to_string();

            events.push(ExtractedEvent {
                date: date_match.date,
                event_type: event_type.to_string(),
                title: title.to_string(),
                description,
                confidence,
                source_text: date_match.source_text.clone(),
                is_deadline: deadline,
            });
        }
    }

    let events = deduplicate(events);
    sort_by_date(events)
}

fn split_into_chunks(text: &str) -> Vec<String> {
    CHUNK_BOUNDARY
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn lowercase_window_before(chunk: &str, position: usize, max_chars: usize) -> String {
    let start = position.saturating_sub(max_chars);
    safe_slice(chunk, start, position.min(chunk.len())).to_lowercase()
}

fn lowercase_window_after(chunk: &str, position: usize, max_chars: usize) -> String {
    let end = (position + max_chars).min(chunk.len());
    safe_slice(chunk, position.min(chunk.len()), end).to_lowercase()
}

/// Byte-safe slice that snaps to the nearest char boundary rather than
/// panicking on one that lands mid-codepoint.
fn safe_slice(text: &str, start: usize, end: usize) -> &str {
    let start = start.min(text.len());
    let end = end.min(text.len()).max(start);
    let start = (0..=start).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
    let end = (end..=text.len()).find(|i| text.is_char_boundary(*i)).unwrap_or(text.len());
    &text[start..end]
}

/// Dedup key is `(date, event_type)`, not `(date, event_type, title)`: two
/// context rules firing on the same date for the same category (e.g.
/// "Filed" and "Hearing" both reading as `court`) describe the same
/// underlying timeline entry, and the first chunk encountered wins the
/// title.
fn deduplicate(events: Vec<ExtractedEvent>) -> Vec<ExtractedEvent> {
    let mut seen = std::collections::HashSet::new();
    events
        .into_iter()
        .filter(|e| seen.insert((e.date.date_naive(), e.event_type.clone())))
        .collect()
}

fn sort_by_date(mut events: Vec<ExtractedEvent>) -> Vec<ExtractedEvent> {
    events.sort_by(|a, b| a.date.cmp(&b.date));
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_date_same_category_collapses_to_first_match() {
        let text = "Filed on January 15, 2024. Hearing on January 15, 2024.";
        let events = extract_events(text, "court_filing");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "court");
        assert_eq!(events[0].title, "Court Filing");
        assert_eq!(events[0].date.format("%Y-%m-%d").to_string(), "2024-01-15");
    }

    #[test]
    fn dob_is_not_extracted_as_an_event() {
        let text = "Tenant date of birth: 05/04/1990. Lease commences on 01/01/2025.";
        let events = extract_events(text, "lease");
        assert!(events.iter().all(|e| e.date.format("%Y").to_string() != "1990"));
    }

    #[test]
    fn pre_2000_dates_are_discarded() {
        let text = "Born on 04/03/1975.";
        let events = extract_events(text, "unknown");
        assert!(events.is_empty());
    }

    #[test]
    fn events_are_sorted_ascending() {
        let text = "Hearing on 03/01/2025. Filed on 01/15/2025.";
        let events = extract_events(text, "court_filing");
        assert!(events.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[test]
    fn deadline_marker_is_flagged() {
        let text = "Rent is due by 01/05/2025.";
        let events = extract_events(text, "lease");
        assert!(events.iter().any(|e| e.is_deadline));
    }
}

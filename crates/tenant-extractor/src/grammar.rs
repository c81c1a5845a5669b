//! Date grammars: a small ordered list of regexes, each paired with how to
//! read its capture groups into `(year, month, day)`.
//!
//! Grounded on `EventExtractor.DATE_PATTERNS`/`_parse_match` in
//! `app/services/event_extractor.py`.

use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

fn month_from_name(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "january" => Some(1),
        "february" => Some(2),
        "march" => Some(3),
        "april" => Some(4),
        "may" => Some(5),
        "june" => Some(6),
        "july" => Some(7),
        "august" => Some(8),
        "september" => Some(9),
        "october" => Some(10),
        "november" => Some(11),
        "december" => Some(12),
        _ => None,
    }
}

static MDY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})[/\-](\d{1,2})[/\-](\d{4})\b").unwrap());
static TEXT_MDY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{1,2}),?\s+(\d{4})\b",
    )
    .unwrap()
});
static ISO: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());
static DMY_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(\d{1,2})\s+(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{4})\b",
    )
    .unwrap()
});

/// One date-like match in a chunk of text: the parsed UTC instant, the raw
/// matched text, and its byte offset within the chunk.
#[derive(Debug, Clone)]
pub struct DateMatch {
    /// Parsed UTC midnight of the matched date.
    pub date: DateTime<Utc>,
    /// The exact substring matched.
    pub source_text: String,
    /// Byte offset of the match start within the searched text.
    pub position: usize,
}

fn valid_range(year: i32, month: u32, day: u32) -> bool {
    (1900..=2100).contains(&year) && (1..=12).contains(&month) && (1..=31).contains(&day)
}

/// Find every recognizable date in `text`, across all four grammars, in
/// the order the original patterns are tried (`MM/DD/YYYY`, `Month DD,
/// YYYY`, `YYYY-MM-DD`, `DD Month YYYY`). Matches with out-of-range
/// components are silently skipped, matching the source's try/except.
pub fn find_dates(text: &str) -> Vec<DateMatch> {
    let mut found = Vec::new();

    for m in MDY.captures_iter(text) {
        let whole = m.get(0).unwrap();
        let (month, day, year) = (
            m[1].parse::<u32>().unwrap_or(0),
            m[2].parse::<u32>().unwrap_or(0),
            m[3].parse::<i32>().unwrap_or(0),
        );
        push_if_valid(&mut found, year, month, day, whole.as_str(), whole.start());
    }

    for m in TEXT_MDY.captures_iter(text) {
        let whole = m.get(0).unwrap();
        let Some(month) = month_from_name(&m[1]) else { continue };
        let day = m[2].parse::<u32>().unwrap_or(0);
        let year = m[3].parse::<i32>().unwrap_or(0);
        push_if_valid(&mut found, year, month, day, whole.as_str(), whole.start());
    }

    for m in ISO.captures_iter(text) {
        let whole = m.get(0).unwrap();
        let year = m[1].parse::<i32>().unwrap_or(0);
        let month = m[2].parse::<u32>().unwrap_or(0);
        let day = m[3].parse::<u32>().unwrap_or(0);
        push_if_valid(&mut found, year, month, day, whole.as_str(), whole.start());
    }

    for m in DMY_TEXT.captures_iter(text) {
        let whole = m.get(0).unwrap();
        let day = m[1].parse::<u32>().unwrap_or(0);
        let Some(month) = month_from_name(&m[2]) else { continue };
        let year = m[3].parse::<i32>().unwrap_or(0);
        push_if_valid(&mut found, year, month, day, whole.as_str(), whole.start());
    }

    found
}

fn push_if_valid(
    out: &mut Vec<DateMatch>,
    year: i32,
    month: u32,
    day: u32,
    source_text: &str,
    position: usize,
) {
    if !valid_range(year, month, day) {
        return;
    }
    let Some(date) = Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).single() else {
        return;
    };
    out.push(DateMatch {
        date,
        source_text: source_text.to_string(),
        position,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn recognizes_all_four_grammars() {
        let text = "01/15/2025 and 2025-01-15 and January 15, 2025 and 15 January 2025";
        let found = find_dates(text);
        assert_eq!(found.len(), 4);
        for m in &found {
            assert_eq!(m.date.format("%Y-%m-%d").to_string(), "2025-01-15");
        }
    }

    #[test]
    fn out_of_range_components_are_rejected() {
        let found = find_dates("13/45/2025");
        assert!(found.is_empty());
    }

    #[test]
    fn year_before_1900_is_rejected() {
        let found = find_dates("01/01/1899");
        assert!(found.is_empty());
    }

    proptest::proptest! {
        #[test]
        fn iso_dates_in_valid_range_always_round_trip(
            year in 1900i32..=2100,
            month in 1u32..=12,
            day in 1u32..=28,
        ) {
            let text = format!("{year:04}-{month:02}-{day:02}");
            let found = find_dates(&text);
            proptest::prop_assert_eq!(found.len(), 1);
            proptest::prop_assert_eq!(found[0].date.format("%Y-%m-%d").to_string(), text);
        }

        #[test]
        fn slash_dates_in_valid_range_always_parse(
            year in 1900i32..=2100,
            month in 1u32..=12,
            day in 1u32..=28,
        ) {
            let text = format!("{month}/{day}/{year}");
            let found = find_dates(&text);
            proptest::prop_assert_eq!(found.len(), 1);
            proptest::prop_assert_eq!(found[0].date.year(), year);
            proptest::prop_assert_eq!(found[0].date.month(), month);
            proptest::prop_assert_eq!(found[0].date.day(), day);
        }
    }
}

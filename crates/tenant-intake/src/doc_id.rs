//! `doc_id` generation: `ORG-YYYY-NNNNNN-XXXX`.
//!
//! Grounded on `document_registry.py`'s `DocumentIDGenerator`
//! (`SEM-YYYY-NNNNNN-XXXX`, generalized to a configurable org prefix).

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Datelike, Utc};
use dashmap::DashMap;
use rand::Rng;

const BASE32_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Generates monotonic, collision-resistant document ids of the form
/// `ORG-YYYY-NNNNNN-XXXX`, where `NNNNNN` is a six-digit sequence number
/// that resets each calendar year and `XXXX` is four random base32
/// characters guarding against sequence-number guessing.
pub struct DocIdGenerator {
    org_prefix: String,
    sequence_by_year: DashMap<i32, AtomicU64>,
}

impl DocIdGenerator {
    /// Build a generator stamping ids with `org_prefix` (e.g. `"SEM"`).
    pub fn new(org_prefix: impl Into<String>) -> Self {
        Self {
            org_prefix: org_prefix.into(),
            sequence_by_year: DashMap::new(),
        }
    }

    /// Generate the next id for the current UTC year.
    pub fn next_id(&self) -> String {
        let year = Utc::now().year();
        let sequence = self
            .sequence_by_year
            .entry(year)
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::SeqCst)
            + 1;

        let mut rng = rand::thread_rng();
        let suffix: String = (0..4)
            .map(|_| BASE32_ALPHABET[rng.gen_range(0..BASE32_ALPHABET.len())] as char)
            .collect();

        format!("{}-{year}-{sequence:06}-{suffix}", self.org_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_within_a_year() {
        let gen = DocIdGenerator::new("SEM");
        let first = gen.next_id();
        let second = gen.next_id();
        let seq = |id: &str| -> u64 { id.split('-').nth(2).unwrap().parse().unwrap() };
        assert_eq!(seq(&first) + 1, seq(&second));
    }

    #[test]
    fn ids_match_the_expected_shape() {
        let gen = DocIdGenerator::new("SEM");
        let id = gen.next_id();
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "SEM");
        assert_eq!(parts[2].len(), 6);
        assert_eq!(parts[3].len(), 4);
    }
}

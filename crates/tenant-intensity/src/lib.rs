#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **tenant-intensity** – Deterministic urgency scoring for the Semptify
//! core runtime.
//!
//! No machine learning, no network calls, no shared mutable state beyond
//! the explicit rolling-history window in [`IntensityHistory`]: every
//! score in this crate is a pure function of its inputs, so the same
//! document type, deadline, and situation always produce the same number.
//! That determinism is deliberate — it is what lets the vault audit log
//! and the context loop's test suite assert exact scores rather than
//! ranges.

mod engine;
mod tables;
mod trend;

pub use engine::{calculate_intensity, calculate_overall_intensity, ScoredIntensity, ScoredItem, ScoringInput};
pub use trend::{IntensityHistory, TrendReport};

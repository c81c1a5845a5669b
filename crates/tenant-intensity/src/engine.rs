//! Pure scoring functions: no I/O, no shared state, same inputs always
//! produce the same outputs.
//!
//! Grounded on `IntensityEngine.calculate_intensity` /
//! `calculate_overall_intensity` in the platform's original context loop.

use chrono::{DateTime, Utc};
use tenant_types::{Phase, Severity};

use crate::tables::{base_intensity, deadline_multiplier, phase_multiplier};

/// The subset of a user's situation the scoring functions need. Kept
/// separate from the full user-context type (owned by `tenant-context`) so
/// this crate has no dependency on it.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput {
    /// Current phase.
    pub phase: Phase,
    /// Number of currently-active issues.
    pub active_issue_count: usize,
    /// Number of rights currently flagged at risk.
    pub rights_at_risk_count: usize,
}

/// Result of scoring a single event/document/issue type.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredIntensity {
    /// Final score, clamped to `[0, 100]` and rounded to one decimal place.
    pub score: f64,
    /// Severity bucket derived from `score`.
    pub severity: Severity,
    /// Human-readable breakdown of each multiplier applied, in order. Useful
    /// for audit trails and UI explainability, not parsed by callers.
    pub factors: Vec<String>,
}

/// Score one event/document/issue type against a user's current situation.
///
/// `deadline`, when given, applies the appropriate bucketed multiplier from
/// [`deadline_multiplier`] based on whole days until (or since) the date.
/// `additional_factors` lets callers fold in ad hoc multipliers (named for
/// the audit trail) without changing this function's signature.
pub fn calculate_intensity(
    event_type: &str,
    input: ScoringInput,
    deadline: Option<DateTime<Utc>>,
    additional_factors: &[(&str, f64)],
) -> ScoredIntensity {
    let mut factors = Vec::new();

    let base = base_intensity(event_type);
    let mut intensity = base;
    factors.push(format!("base: {base} ({event_type})"));

    if let Some(deadline) = deadline {
        let days = floor_days_until(deadline);
        let (mult, label) = deadline_multiplier(days);
        intensity *= mult;
        factors.push(format!("deadline ({label}): x{mult}"));
    }

    if input.active_issue_count > 1 {
        let mult = 1.0 + (input.active_issue_count as f64 * 0.10);
        intensity *= mult;
        factors.push(format!(
            "multiple issues ({}): x{mult:.2}",
            input.active_issue_count
        ));
    }

    if input.rights_at_risk_count > 0 {
        let mult = 1.0 + (input.rights_at_risk_count as f64 * 0.15);
        intensity *= mult;
        factors.push(format!(
            "rights at risk ({}): x{mult:.2}",
            input.rights_at_risk_count
        ));
    }

    let phase_mult = phase_multiplier(input.phase);
    if (phase_mult - 1.0).abs() > f64::EPSILON {
        intensity *= phase_mult;
        factors.push(format!("phase ({}): x{phase_mult}", input.phase));
    }

    for (name, value) in additional_factors {
        intensity *= value;
        factors.push(format!("{name}: x{value}"));
    }

    intensity = intensity.min(100.0).max(0.0);
    let score = round1(intensity);

    ScoredIntensity {
        score,
        severity: Severity::from_intensity(score),
        factors,
    }
}

/// One issue or deadline to fold into [`calculate_overall_intensity`].
pub enum ScoredItem<'a> {
    /// An active issue, keyed by its type string.
    Issue(&'a str),
    /// An upcoming or past deadline, keyed by type string and due date.
    Deadline(&'a str, DateTime<Utc>),
}

/// Weighted-average aggregate intensity across a user's active issues and
/// deadlines: the top 5 individual scores (descending) are averaged with
/// weights `1.0, 0.9, 0.8, 0.7, 0.6`, so the single worst thing dominates
/// but does not completely drown out the rest.
///
/// Returns `0.0` when `items` is empty.
pub fn calculate_overall_intensity(input: ScoringInput, items: &[ScoredItem<'_>]) -> f64 {
    if items.is_empty() {
        return 0.0;
    }

    let mut scores: Vec<f64> = items
        .iter()
        .map(|item| match item {
            ScoredItem::Issue(ty) => calculate_intensity(ty, input, None, &[]).score,
            ScoredItem::Deadline(ty, date) => {
                calculate_intensity(ty, input, Some(*date), &[]).score
            }
        })
        .collect();

    if scores.is_empty() {
        return 0.0;
    }
    scores.sort_by(|a, b| b.partial_cmp(a).unwrap());

    let top: Vec<f64> = scores.into_iter().take(5).collect();
    let weighted_sum: f64 = top
        .iter()
        .enumerate()
        .map(|(i, s)| s * (1.0 - i as f64 * 0.1))
        .sum();
    let weight_total: f64 = (0..top.len()).map(|i| 1.0 - i as f64 * 0.1).sum();

    if weight_total > 0.0 {
        round1(weighted_sum / weight_total)
    } else {
        0.0
    }
}

/// Whole days from now until `deadline`, floored toward negative infinity
/// (so "23 hours ago" is `-1`, matching the platform's historical
/// `timedelta.days` semantics rather than Rust's truncating duration math).
fn floor_days_until(deadline: DateTime<Utc>) -> i64 {
    let delta = deadline - Utc::now();
    delta.num_seconds().div_euclid(86_400)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn input(phase: Phase, issues: usize, rights: usize) -> ScoringInput {
        ScoringInput {
            phase,
            active_issue_count: issues,
            rights_at_risk_count: rights,
        }
    }

    #[test]
    fn unknown_event_type_uses_unknown_base() {
        let scored = calculate_intensity("not_a_real_type", input(Phase::Active, 0, 0), None, &[]);
        assert_eq!(scored.score, 30.0);
    }

    #[test]
    fn past_due_deadline_uses_maximum_multiplier() {
        let deadline = Utc::now() - Duration::days(5);
        let scored = calculate_intensity(
            "court_summons",
            input(Phase::Active, 0, 0),
            Some(deadline),
            &[],
        );
        // 90 * 1.5 = 135, clamped to 100
        assert_eq!(scored.score, 100.0);
    }

    #[test]
    fn thirty_days_has_no_discount() {
        let deadline = Utc::now() + Duration::days(30);
        let scored =
            calculate_intensity("lease", input(Phase::Active, 0, 0), Some(deadline), &[]);
        assert_eq!(scored.score, 20.0); // base 20 * 1.0
    }

    #[test]
    fn sixty_days_is_discounted() {
        let deadline = Utc::now() + Duration::days(45);
        let scored =
            calculate_intensity("lease", input(Phase::Active, 0, 0), Some(deadline), &[]);
        assert_eq!(scored.score, 16.0); // base 20 * 0.8
    }

    #[test]
    fn multiple_issues_compound_multiplicatively() {
        let scored = calculate_intensity(
            "habitability_issue",
            input(Phase::Active, 3, 0),
            None,
            &[],
        );
        // 55 * (1 + 3*0.1) = 55 * 1.3 = 71.5
        assert_eq!(scored.score, 71.5);
    }

    #[test]
    fn single_issue_does_not_trigger_compounding() {
        let scored =
            calculate_intensity("habitability_issue", input(Phase::Active, 1, 0), None, &[]);
        assert_eq!(scored.score, 55.0);
    }

    #[test]
    fn eviction_phase_amplifies_score() {
        let scored =
            calculate_intensity("habitability_issue", input(Phase::Eviction, 0, 0), None, &[]);
        assert_eq!(scored.score, 71.5); // 55 * 1.3
    }

    #[test]
    fn overall_intensity_of_empty_situation_is_zero() {
        assert_eq!(
            calculate_overall_intensity(input(Phase::Active, 0, 0), &[]),
            0.0
        );
    }

    #[test]
    fn overall_intensity_weights_worst_items_most() {
        let items = vec![
            ScoredItem::Issue("illegal_lockout"), // 95
            ScoredItem::Issue("rent_receipt"),    // 15 (base table also used for issues here)
        ];
        let score = calculate_overall_intensity(input(Phase::Active, 2, 0), &items);
        // issue_mult = 1 + 2*0.1 = 1.2 applied to both
        // 95*1.2=114->100, 15*1.2=18
        // weighted: 100*1.0 + 18*0.9 = 116.2, weight_total=1.9 => 61.2
        assert_eq!(score, 61.2);
    }
}

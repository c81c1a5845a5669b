//! Static scoring tables.
//!
//! Values are taken verbatim from the platform's original intensity
//! calculation logic. They are not tunable at runtime — changing what
//! "critical" means is a product decision, not a config change.

/// Base intensity for a closed set of document/issue type keys. Unknown
/// keys score as `"unknown"` (30.0).
pub fn base_intensity(event_type: &str) -> f64 {
    match event_type {
        // Documents
        "eviction_notice" => 85.0,
        "notice_to_quit" => 80.0,
        "court_summons" => 90.0,
        "pay_or_quit" => 75.0,
        "lease_violation" => 60.0,
        "rent_increase" => 45.0,
        "lease" => 20.0,
        "rent_receipt" => 15.0,
        "repair_request" => 40.0,
        "photo_evidence" => 20.0,
        "communication" => 25.0,

        // Issues
        "eviction_threat" => 85.0,
        "habitability_issue" => 55.0,
        "illegal_lockout" => 95.0,
        "harassment" => 65.0,
        "retaliation" => 70.0,
        "deposit_dispute" => 50.0,
        "rent_dispute" => 55.0,
        "repair_ignored" => 45.0,

        _ => 30.0, // "unknown"
    }
}

/// Multiplier applied for a deadline that is `days` away, where negative
/// means already past due. Buckets match the platform's historical
/// urgency curve; note `30_days` has no discount (1.0) while `60_days`
/// and beyond taper off.
pub fn deadline_multiplier(days: i64) -> (f64, &'static str) {
    if days < 0 {
        (1.5, "past_due")
    } else if days == 0 {
        (1.4, "today")
    } else if days == 1 {
        (1.35, "1_day")
    } else if days <= 3 {
        (1.25, "3_days")
    } else if days <= 7 {
        (1.15, "7_days")
    } else if days <= 14 {
        (1.05, "14_days")
    } else if days <= 30 {
        (1.0, "30_days")
    } else if days <= 60 {
        (0.8, "60_days")
    } else {
        (0.6, "90_days")
    }
}

/// Multiplier for the user's current [`tenant_types::Phase`]. Phases not
/// listed here (there are none, the match is exhaustive) carry 1.0.
pub fn phase_multiplier(phase: tenant_types::Phase) -> f64 {
    use tenant_types::Phase::*;
    match phase {
        Eviction => 1.3,
        Dispute => 1.2,
        IssueEmerging => 1.1,
        PostTenancy => 1.1,
        Active => 1.0,
        PreMoveIn => 0.9,
        MoveOut => 1.0,
    }
}

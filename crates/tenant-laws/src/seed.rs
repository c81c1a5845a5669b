//! The general-jurisdiction base law set, carried over from
//! `LawEngine._seed_base_laws`.

use std::collections::BTreeMap;

use crate::{LawCategory, LawReference};

fn law(
    id: &str,
    category: LawCategory,
    jurisdiction: &str,
    summary: &str,
    tenant_rights: &[&str],
    keywords: &[&str],
    time_limits: &[(&str, &str)],
) -> LawReference {
    LawReference {
        id: id.to_string(),
        category,
        jurisdiction: jurisdiction.to_string(),
        summary: summary.to_string(),
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        tenant_rights: tenant_rights.iter().map(|s| s.to_string()).collect(),
        time_limits: time_limits
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// The built-in, general-jurisdiction law references.
pub fn base_laws() -> Vec<LawReference> {
    vec![
        law(
            "security_deposit_general",
            LawCategory::SecurityDeposit,
            "general",
            "Landlords must return security deposits within a specified time after move-out, minus documented deductions.",
            &[
                "Right to itemized statement of deductions",
                "Right to return of deposit within time limit",
                "Right to sue for wrongful retention",
            ],
            &["security deposit", "deposit return", "damage deduction", "move out", "move-out inspection"],
            &[],
        ),
        law(
            "habitability_general",
            LawCategory::Habitability,
            "general",
            "Landlords must maintain rental property in habitable condition with working essential services.",
            &[
                "Right to habitable living conditions",
                "Right to repair and deduct (with notice)",
                "Right to withhold rent for serious violations",
                "Right to terminate lease for uninhabitable conditions",
            ],
            &["habitability", "repairs", "maintenance", "heat", "water", "plumbing", "electrical", "mold", "pest", "infestation"],
            &[],
        ),
        law(
            "eviction_notice_general",
            LawCategory::Eviction,
            "general",
            "Landlords must follow proper legal procedures and provide adequate notice before eviction.",
            &[
                "Right to proper written notice",
                "Right to cure violations if applicable",
                "Right to court hearing",
                "Protection from illegal lockouts",
            ],
            &["eviction", "notice to quit", "pay or quit", "vacate", "termination", "unlawful detainer"],
            &[
                ("nonpayment_notice", "3-14 days typically"),
                ("lease_violation_cure", "varies by jurisdiction"),
                ("no_cause_notice", "30-60 days typically"),
            ],
        ),
        law(
            "retaliation_general",
            LawCategory::Retaliation,
            "general",
            "Landlords cannot retaliate against tenants for exercising legal rights.",
            &[
                "Right to complain about conditions",
                "Right to contact housing authorities",
                "Right to join tenant organizations",
                "Right to assert legal rights",
            ],
            &["retaliation", "retaliatory eviction", "complaint", "housing authority", "code enforcement"],
            &[],
        ),
        law(
            "entry_access_general",
            LawCategory::EntryAccess,
            "general",
            "Landlords must provide reasonable notice before entering rental unit.",
            &[
                "Right to advance notice of entry",
                "Right to quiet enjoyment",
                "Right to refuse entry without notice",
            ],
            &["entry", "access", "notice", "privacy", "inspection", "showing", "landlord entry"],
            &[("notice_for_entry", "24-48 hours typical")],
        ),
        law(
            "rent_increase_general",
            LawCategory::RentPayment,
            "general",
            "Rent increases must follow proper notice procedures and lease terms.",
            &[
                "Right to notice of rent increase",
                "Right to refuse increase and terminate",
            ],
            &["rent increase", "lease renewal", "notice of increase"],
            &[],
        ),
    ]
}

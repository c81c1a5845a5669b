//! Phase rule table and the sticky-eviction state machine.
//!
//! Grounded on `ContextDataLoop._update_phase`, with the spec's formalized
//! sticky-until-`issue_resolved` rule (an Open Question the spec resolves
//! in favor of its own formalization over the source's implicit behavior).

use tenant_types::Phase;

use crate::state::UserContext;

const HIGH_INTENSITY_ISSUE_TYPES: &[&str] = &["eviction_threat", "notice_to_quit", "eviction_notice"];

/// Recompute `context.phase` from current state.
///
/// Transitions are monotonic-by-severity: once `eviction` is reached, this
/// function leaves the phase at `eviction` on every subsequent call
/// regardless of how the other fields change, until [`resolve_issue`] is
/// called. There is no automatic downgrade path.
pub fn recompute_phase(context: &mut UserContext) {
    if context.eviction_latch {
        context.phase = Phase::Eviction;
        return;
    }

    let has_high_intensity_issue = context
        .active_issues
        .iter()
        .any(|issue| HIGH_INTENSITY_ISSUE_TYPES.contains(&issue.r#type.as_str()));

    let new_phase = if has_high_intensity_issue || context.intensity_score >= 80.0 {
        Phase::Eviction
    } else if context.intensity_score >= 50.0 || context.active_issues.len() >= 2 {
        Phase::Dispute
    } else if !context.active_issues.is_empty() {
        Phase::IssueEmerging
    } else if context.document_types.contains("moved_out")
        || context.document_types.contains("deposit_demand")
    {
        Phase::PostTenancy
    } else {
        Phase::Active
    };

    if new_phase == Phase::Eviction {
        context.eviction_latch = true;
    }
    context.phase = new_phase;
}

/// Explicit signal that an issue has been resolved: removes it from
/// `active_issues`, releases the eviction latch, and re-derives phase from
/// scratch. The only way out of `eviction` within a session.
pub fn resolve_issue(context: &mut UserContext, issue_type: &str) {
    context.active_issues.retain(|issue| issue.r#type != issue_type);
    context.eviction_latch = false;
    recompute_phase(context);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenant_types::{Issue, UserId};

    fn issue(r#type: &str) -> Issue {
        Issue {
            r#type: r#type.to_string(),
            description: String::new(),
            detected_at: chrono::Utc::now(),
            evidence_refs: Vec::new(),
        }
    }

    #[test]
    fn defaults_to_active() {
        let mut ctx = UserContext::new(UserId::new("u1").unwrap());
        recompute_phase(&mut ctx);
        assert_eq!(ctx.phase, Phase::Active);
    }

    #[test]
    fn high_intensity_issue_forces_eviction() {
        let mut ctx = UserContext::new(UserId::new("u1").unwrap());
        ctx.active_issues.push(issue("eviction_threat"));
        recompute_phase(&mut ctx);
        assert_eq!(ctx.phase, Phase::Eviction);
    }

    #[test]
    fn eviction_is_sticky_until_resolved() {
        let mut ctx = UserContext::new(UserId::new("u1").unwrap());
        ctx.active_issues.push(issue("eviction_threat"));
        recompute_phase(&mut ctx);
        assert_eq!(ctx.phase, Phase::Eviction);

        // issue cleared directly (not via resolve_issue) -- should stay latched
        ctx.active_issues.clear();
        ctx.intensity_score = 0.0;
        recompute_phase(&mut ctx);
        assert_eq!(ctx.phase, Phase::Eviction);

        resolve_issue(&mut ctx, "eviction_threat");
        assert_eq!(ctx.phase, Phase::Active);
    }

    #[test]
    fn two_issues_trigger_dispute() {
        let mut ctx = UserContext::new(UserId::new("u1").unwrap());
        ctx.active_issues.push(issue("harassment"));
        ctx.active_issues.push(issue("retaliation"));
        recompute_phase(&mut ctx);
        assert_eq!(ctx.phase, Phase::Dispute);
    }

    #[test]
    fn post_tenancy_from_document_types() {
        let mut ctx = UserContext::new(UserId::new("u1").unwrap());
        ctx.document_types.insert("deposit_demand".to_string());
        recompute_phase(&mut ctx);
        assert_eq!(ctx.phase, Phase::PostTenancy);
    }
}

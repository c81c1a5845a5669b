//! Pure per-event-type reducers.
//!
//! Each function in this module only ever touches the fields spec.md's
//! reducer table assigns it; phase/intensity/predictions are recomputed
//! centrally by the loop after every reducer runs, not here.

use chrono::Utc;
use tenant_bus_core::EventPayload;
use tenant_types::Deadline;

use crate::state::{ActionRecord, DocumentDescriptor, UserContext};

/// Apply the reducer for `payload` to `context`, mutating it in place.
/// Payload kinds with no reducer entry in spec.md's table (most of them
/// are events the context loop itself produces downstream) are no-ops here.
pub fn apply(context: &mut UserContext, payload: &EventPayload) {
    match payload {
        EventPayload::DocumentUploaded {
            doc_type,
            filename,
            doc_id,
        } => {
            context.documents.push(DocumentDescriptor {
                id: doc_id.as_ref().map(|d| d.to_string()),
                doc_type: doc_type.clone(),
                filename: filename.clone(),
                added_at: Utc::now(),
            });
            context.document_types.insert(doc_type.clone());
        }

        EventPayload::DocumentAdded {
            doc_id,
            doc_type,
            filename,
        } => {
            let resolved_type = doc_type.clone().unwrap_or_else(|| "unknown".to_string());
            context.documents.push(DocumentDescriptor {
                id: Some(doc_id.to_string()),
                doc_type: resolved_type.clone(),
                filename: filename.clone(),
                added_at: Utc::now(),
            });
            context.document_types.insert(resolved_type);
        }

        EventPayload::DocumentAnalyzed {
            issues,
            deadlines,
            applicable_laws,
        } => {
            for issue in issues {
                add_unique_issue(context, issue.clone());
            }
            for deadline in deadlines {
                insert_deadline_sorted(context, deadline.clone());
            }
            for law in applicable_laws {
                add_unique_law(context, law.clone());
            }
        }

        EventPayload::IssueDetected { issue } => {
            if let Some(right) = right_at_risk_for(&issue.r#type) {
                context.rights_at_risk.insert(right.to_string());
            }
            add_unique_issue(context, issue.clone());
        }

        EventPayload::DeadlineApproaching { deadline, .. } => {
            insert_deadline_sorted(context, deadline.clone());
        }

        EventPayload::ActionTaken { action, label } => {
            context.actions_taken.push(ActionRecord {
                action: action.clone(),
                label: label.clone(),
                timestamp: Utc::now(),
            });
        }

        EventPayload::LawMatched { law_id } => {
            add_unique_law(context, law_id.clone());
        }

        EventPayload::EventsExtracted { events, .. } => {
            for item in events {
                if item.is_deadline {
                    insert_deadline_sorted(
                        context,
                        Deadline {
                            id: format!("{}-{}", item.event_type, item.date.timestamp()),
                            r#type: item.event_type.clone(),
                            date: item.date,
                            description: item.title.clone(),
                            linked_document_id: None,
                        },
                    );
                }
            }
        }

        // `case_info_updated` carries no direct state mutation; the loop's
        // per-tick deadline scan (step 6) covers the "schedule a deadline
        // check" behavior spec.md's table describes for this event.
        EventPayload::CaseInfoUpdated { .. } => {}

        _ => {}
    }
}

fn add_unique_issue(context: &mut UserContext, issue: tenant_types::Issue) {
    if !context.active_issues.iter().any(|i| i.r#type == issue.r#type) {
        context.active_issues.push(issue);
    }
}

fn add_unique_law(context: &mut UserContext, law_id: String) {
    if !context.applicable_laws.contains(&law_id) {
        context.applicable_laws.push(law_id);
    }
}

fn insert_deadline_sorted(context: &mut UserContext, deadline: Deadline) {
    if !context.deadlines.iter().any(|d| d.id == deadline.id) {
        context.deadlines.push(deadline);
    }
    context.deadlines.sort_by(|a, b| a.date.cmp(&b.date));
}

/// Mirrors `ContextDataLoop._handle_issue_detected`'s `rights_mapping`.
fn right_at_risk_for(issue_type: &str) -> Option<&'static str> {
    match issue_type {
        "eviction_threat" => Some("Right to due process"),
        "habitability_issue" => Some("Right to habitable housing"),
        "harassment" => Some("Right to quiet enjoyment"),
        "retaliation" => Some("Right to assert rights without retaliation"),
        "illegal_lockout" => Some("Right to access your home"),
        "deposit_dispute" => Some("Right to security deposit return"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenant_types::{Issue, UserId};

    #[test]
    fn issue_detected_is_deduplicated_by_type() {
        let mut ctx = UserContext::new(UserId::new("u1").unwrap());
        let issue = Issue {
            r#type: "harassment".into(),
            description: "x".into(),
            detected_at: Utc::now(),
            evidence_refs: vec![],
        };
        apply(&mut ctx, &EventPayload::IssueDetected { issue: issue.clone() });
        apply(&mut ctx, &EventPayload::IssueDetected { issue });
        assert_eq!(ctx.active_issues.len(), 1);
    }

    #[test]
    fn issue_detected_adds_mapped_right() {
        let mut ctx = UserContext::new(UserId::new("u1").unwrap());
        let issue = Issue {
            r#type: "illegal_lockout".into(),
            description: "x".into(),
            detected_at: Utc::now(),
            evidence_refs: vec![],
        };
        apply(&mut ctx, &EventPayload::IssueDetected { issue });
        assert!(ctx.rights_at_risk.contains("Right to access your home"));
    }

    #[test]
    fn deadlines_stay_sorted_by_date() {
        let mut ctx = UserContext::new(UserId::new("u1").unwrap());
        let later = Deadline {
            id: "a".into(),
            r#type: "court".into(),
            date: Utc::now() + chrono::Duration::days(10),
            description: String::new(),
            linked_document_id: None,
        };
        let sooner = Deadline {
            id: "b".into(),
            r#type: "court".into(),
            date: Utc::now() + chrono::Duration::days(1),
            description: String::new(),
            linked_document_id: None,
        };
        apply(
            &mut ctx,
            &EventPayload::DeadlineApproaching {
                deadline: later,
                days_remaining: 10,
            },
        );
        apply(
            &mut ctx,
            &EventPayload::DeadlineApproaching {
                deadline: sooner,
                days_remaining: 1,
            },
        );
        assert_eq!(ctx.deadlines[0].id, "b");
        assert_eq!(ctx.deadlines[1].id, "a");
    }
}

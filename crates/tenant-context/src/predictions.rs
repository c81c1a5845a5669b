//! Predicted needs and the recommended-actions policy.
//!
//! Grounded on `ContextDataLoop._generate_predictions` and
//! `_get_recommended_actions`.

use chrono::Utc;
use tenant_types::Phase;

use crate::state::{PredictedNeed, RecommendedAction, UserContext};

const ESSENTIAL_DOCUMENTS: &[&str] = &["lease", "rent_receipt", "photo_evidence"];

/// Regenerate `predicted_needs` from the current document/phase/deadline
/// state. Deterministic given `context` and the current instant (deadline
/// proximity is clock-dependent, everything else is not).
pub fn generate_predictions(context: &UserContext) -> Vec<PredictedNeed> {
    let mut predictions = Vec::new();

    if context.document_types.contains("lease") && !context.document_types.contains("photo_evidence")
    {
        predictions.push(PredictedNeed {
            kind: "document_needed".into(),
            item: "move_in_photos".into(),
            reason: "Protect your security deposit".into(),
            priority: "medium".into(),
        });
    }

    if context.document_types.contains("repair_request") {
        predictions.push(PredictedNeed {
            kind: "action_needed".into(),
            item: "repair_followup".into(),
            reason: "Follow up in writing creates legal protection".into(),
            priority: "high".into(),
        });
    }

    if context.phase == Phase::Eviction {
        predictions.push(PredictedNeed {
            kind: "resource_needed".into(),
            item: "legal_aid".into(),
            reason: "Free legal help is available for eviction cases".into(),
            priority: "critical".into(),
        });
    }

    if context.phase == Phase::PostTenancy {
        predictions.push(PredictedNeed {
            kind: "action_needed".into(),
            item: "deposit_demand_letter".into(),
            reason: "Formal demand starts the legal clock".into(),
            priority: "high".into(),
        });
    }

    let now = Utc::now();
    for deadline in &context.deadlines {
        let days_left = (deadline.date - now).num_seconds().div_euclid(86_400);
        if days_left > 0 && days_left <= 7 {
            predictions.push(PredictedNeed {
                kind: "deadline_warning".into(),
                item: deadline.r#type.clone(),
                reason: format!("Due in {days_left} days"),
                priority: if days_left <= 3 { "critical".into() } else { "high".into() },
            });
        }
    }

    predictions
}

fn title_case(key: &str) -> String {
    key.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compute at most 5 recommended next actions, in policy order,
/// deduplicated by `action` key (first occurrence wins).
pub fn recommended_actions(context: &UserContext) -> Vec<RecommendedAction> {
    let mut actions = Vec::new();

    if context.intensity_score >= 80.0 {
        actions.push(RecommendedAction {
            action: "seek_legal_help".into(),
            label: "Get Legal Help Now".into(),
            reason: "Your situation is urgent".into(),
            priority: "critical".into(),
        });
    }

    if let Some(missing) = ESSENTIAL_DOCUMENTS
        .iter()
        .find(|doc| !context.document_types.contains(**doc))
    {
        actions.push(RecommendedAction {
            action: "upload_document".into(),
            label: format!("Upload: {}", title_case(missing)),
            reason: "Essential for your protection".into(),
            priority: "high".into(),
        });
    }

    if !context.active_issues.is_empty() && !context.document_types.contains("photo_evidence") {
        actions.push(RecommendedAction {
            action: "document_issue".into(),
            label: "Document Current Issues".into(),
            reason: "Photos and records strengthen your case".into(),
            priority: "high".into(),
        });
    }

    for prediction in context.predicted_needs.iter().take(3) {
        actions.push(RecommendedAction {
            action: prediction.item.clone(),
            label: title_case(&prediction.item),
            reason: prediction.reason.clone(),
            priority: prediction.priority.clone(),
        });
    }

    let mut seen = std::collections::HashSet::new();
    actions.retain(|action| seen.insert(action.action.clone()));
    actions.truncate(5);
    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenant_types::UserId;

    #[test]
    fn lease_without_photos_predicts_move_in_photos() {
        let mut ctx = UserContext::new(UserId::new("u1").unwrap());
        ctx.document_types.insert("lease".into());
        let predictions = generate_predictions(&ctx);
        assert!(predictions.iter().any(|p| p.item == "move_in_photos"));
    }

    #[test]
    fn high_intensity_recommends_legal_help_first() {
        let mut ctx = UserContext::new(UserId::new("u1").unwrap());
        ctx.intensity_score = 85.0;
        let actions = recommended_actions(&ctx);
        assert_eq!(actions[0].action, "seek_legal_help");
    }

    #[test]
    fn recommendations_cap_at_five_and_dedup() {
        let mut ctx = UserContext::new(UserId::new("u1").unwrap());
        ctx.intensity_score = 90.0;
        ctx.predicted_needs = vec![
            PredictedNeed {
                kind: "k".into(),
                item: "seek_legal_help".into(),
                reason: "dup".into(),
                priority: "high".into(),
            },
            PredictedNeed {
                kind: "k".into(),
                item: "a".into(),
                reason: "x".into(),
                priority: "high".into(),
            },
            PredictedNeed {
                kind: "k".into(),
                item: "b".into(),
                reason: "y".into(),
                priority: "high".into(),
            },
        ];
        let actions = recommended_actions(&ctx);
        assert!(actions.len() <= 5);
        let keys: Vec<_> = actions.iter().map(|a| a.action.clone()).collect();
        let unique: std::collections::HashSet<_> = keys.iter().collect();
        assert_eq!(keys.len(), unique.len());
    }
}

//! The context loop itself: per-user serialization, the event tick, and the
//! read-only accessors.
//!
//! Concurrency model: each user's [`UserContext`] lives behind its own
//! `tokio::sync::Mutex`, held in a `DashMap` keyed by `UserId`. Acquiring
//! that per-user lock for the duration of one tick gives the single-writer
//! guarantee spec.md §4.2/§5 requires without a dedicated worker task per
//! user — option (b) from the two the spec allows. `DashMap`'s internal
//! sharding means contention across *different* users' locks never blocks
//! each other, matching the "parallel across distinct resources" scheduling
//! model described for the rest of the runtime.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use tenant_bus_core::{Bus, Event, EventPayload};
use tenant_intensity::{
    calculate_intensity, calculate_overall_intensity, IntensityHistory, ScoredItem, ScoringInput,
};
use tenant_types::UserId;

use crate::phase::{recompute_phase, resolve_issue};
use crate::predictions::{generate_predictions, recommended_actions};
use crate::reducers;
use crate::state::{IntensityReport, IssueIntensity, RiskLevel, StateView, UserContext};

const DEADLINE_WARNING_WINDOW_DAYS: i64 = 7;
const DEADLINE_DEBOUNCE: Duration = Duration::from_secs(24 * 3600);

/// Per-user context loop, wired to a [`Bus`] for publishing derived events.
pub struct ContextLoop {
    bus: Bus,
    contexts: DashMap<UserId, Arc<Mutex<UserContext>>>,
    intensity_history: Mutex<IntensityHistory>,
}

impl ContextLoop {
    /// Build a context loop that publishes derived events on `bus`.
    pub fn new(bus: Bus) -> Self {
        Self {
            bus,
            contexts: DashMap::new(),
            intensity_history: Mutex::new(IntensityHistory::new()),
        }
    }

    fn handle_for(&self, user_id: &UserId) -> Arc<Mutex<UserContext>> {
        self.contexts
            .entry(user_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(UserContext::new(user_id.clone()))))
            .clone()
    }

    /// Feed one event into the loop for `user_id`: run its reducer (if any),
    /// recompute intensity/phase/predictions, publish the canonicalized,
    /// scored event, and return it.
    ///
    /// This is the sole ingress point for events that affect per-user state
    /// — other components hold an `Arc<ContextLoop>` (wired explicitly in
    /// `tenant-runtime`) and call this instead of publishing raw to the bus,
    /// which both avoids a self-subscription feedback loop and matches the
    /// "intensity filled in before publication" requirement on `Event`.
    pub async fn emit_event(
        &self,
        payload: EventPayload,
        user_id: UserId,
        source: impl Into<String>,
    ) -> Event {
        let handle = self.handle_for(&user_id);
        let mut ctx = handle.lock().await;

        reducers::apply(&mut ctx, &payload);
        ctx.last_activity = Utc::now();
        ctx.push_event_summary(payload.kind().to_string());

        let score = score_context(&ctx);
        ctx.intensity_score = score;
        self.intensity_history.lock().await.record(user_id.clone(), score);

        recompute_phase(&mut ctx);
        ctx.predicted_needs = generate_predictions(&ctx);

        let due_deadlines = self.due_deadline_payloads(&mut ctx);

        let event = Event::new(payload, source, Some(user_id.clone())).with_intensity(score);

        drop(ctx);

        self.bus.publish_event(event.clone()).await;
        for (deadline_payload, intensity) in due_deadlines {
            let due_event = Event::new(deadline_payload, "context_loop", Some(user_id.clone()))
                .with_intensity(intensity);
            self.bus.publish_event(due_event).await;
        }

        event
    }

    /// Explicit resolution of an issue: the only way to clear the
    /// sticky-eviction phase latch. Returns the updated snapshot.
    pub async fn resolve_issue(&self, user_id: &UserId, issue_type: &str) -> UserContext {
        let handle = self.handle_for(user_id);
        let mut ctx = handle.lock().await;
        resolve_issue(&mut ctx, issue_type);
        let score = score_context(&ctx);
        ctx.intensity_score = score;
        ctx.predicted_needs = generate_predictions(&ctx);
        ctx.clone()
    }

    /// Read-only snapshot of a user's context, creating an empty one if
    /// none exists yet.
    pub async fn get_context(&self, user_id: &UserId) -> UserContext {
        let handle = self.handle_for(user_id);
        handle.lock().await.clone()
    }

    /// Detailed urgency breakdown for a user.
    pub async fn get_intensity_report(&self, user_id: &UserId) -> IntensityReport {
        let ctx = self.get_context(user_id).await;
        let trend = self.intensity_history.lock().await.trend(user_id);
        let input = scoring_input(&ctx);

        let breakdown = ctx
            .active_issues
            .iter()
            .map(|issue| {
                let scored = calculate_intensity(&issue.r#type, input, None, &[]);
                IssueIntensity {
                    item: issue.r#type.clone(),
                    intensity: scored.score,
                    severity: scored.severity,
                    factors: scored.factors,
                }
            })
            .collect();

        IntensityReport {
            overall_intensity: ctx.intensity_score,
            severity: tenant_types::Severity::from_intensity(ctx.intensity_score),
            trend,
            breakdown,
            phase: ctx.phase,
            risk_level: RiskLevel::from_intensity(ctx.intensity_score),
        }
    }

    /// Consistent snapshot of everything a UI surface needs for one user.
    pub async fn get_state(&self, user_id: &UserId) -> StateView {
        let ctx = self.get_context(user_id).await;
        let intensity = self.get_intensity_report(user_id).await;
        let next_actions = recommended_actions(&ctx);
        StateView {
            user_id: user_id.clone(),
            context: ctx,
            intensity,
            next_actions,
        }
    }

    /// Evict contexts whose last activity is older than `idle_ttl`. Call
    /// periodically from `tenant-runtime`; never called internally.
    pub fn evict_idle(&self, idle_ttl: Duration) {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(idle_ttl).unwrap_or_else(|_| chrono::Duration::zero());
        self.contexts.retain(|user_id, handle| {
            let keep = match handle.try_lock() {
                Ok(ctx) => ctx.last_activity > cutoff,
                Err(_) => true, // in-flight tick; don't evict out from under it
            };
            if !keep {
                debug!(%user_id, "evicting idle user context");
            }
            keep
        });
    }

    fn due_deadline_payloads(&self, ctx: &mut UserContext) -> Vec<(EventPayload, f64)> {
        let now = Utc::now();
        let input = scoring_input(ctx);
        let mut due = Vec::new();
        for deadline in ctx.deadlines.clone() {
            let days_remaining = (deadline.date - now).num_seconds().div_euclid(86_400);
            if days_remaining < 0 || days_remaining > DEADLINE_WARNING_WINDOW_DAYS {
                continue;
            }
            let last_fired = ctx.deadline_debounce.get(&deadline.id).copied();
            let should_fire = match last_fired {
                Some(at) => now - at
                    >= chrono::Duration::from_std(DEADLINE_DEBOUNCE).unwrap(),
                None => true,
            };
            if !should_fire {
                continue;
            }
            ctx.deadline_debounce.insert(deadline.id.clone(), now);
            let intensity = calculate_intensity(&deadline.r#type, input, Some(deadline.date), &[]).score;
            due.push((
                EventPayload::DeadlineApproaching {
                    deadline,
                    days_remaining,
                },
                intensity,
            ));
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenant_bus_core::BusConfig;

    fn new_loop() -> ContextLoop {
        ContextLoop::new(Bus::new(BusConfig::default()))
    }

    #[tokio::test]
    async fn eviction_notice_raises_phase_and_intensity() {
        let loop_ = new_loop();
        let user = UserId::new("tenant-1").unwrap();

        loop_
            .emit_event(
                EventPayload::DocumentUploaded {
                    doc_type: "eviction_notice".into(),
                    filename: None,
                    doc_id: None,
                },
                user.clone(),
                "test",
            )
            .await;

        // document_uploaded alone carries no issue/deadline, so intensity
        // stays 0 until an issue is actually detected from it.
        let event = loop_
            .emit_event(
                EventPayload::IssueDetected {
                    issue: tenant_types::Issue {
                        r#type: "eviction_threat".into(),
                        description: "eviction notice received".into(),
                        detected_at: Utc::now(),
                        evidence_refs: vec![],
                    },
                },
                user.clone(),
                "test",
            )
            .await;

        assert!(event.intensity >= 80.0);
        let ctx = loop_.get_context(&user).await;
        assert!(ctx.document_types.contains("eviction_notice"));
        assert_eq!(ctx.phase, tenant_types::Phase::Eviction);

        let state = loop_.get_state(&user).await;
        assert!(state
            .next_actions
            .iter()
            .any(|a| a.action == "seek_legal_help"));
    }

    #[tokio::test]
    async fn resolve_issue_clears_sticky_eviction() {
        let loop_ = new_loop();
        let user = UserId::new("tenant-2").unwrap();

        loop_
            .emit_event(
                EventPayload::IssueDetected {
                    issue: tenant_types::Issue {
                        r#type: "eviction_threat".into(),
                        description: "x".into(),
                        detected_at: Utc::now(),
                        evidence_refs: vec![],
                    },
                },
                user.clone(),
                "test",
            )
            .await;
        assert_eq!(
            loop_.get_context(&user).await.phase,
            tenant_types::Phase::Eviction
        );

        let resolved = loop_.resolve_issue(&user, "eviction_threat").await;
        assert_eq!(resolved.phase, tenant_types::Phase::Active);
    }

    #[tokio::test]
    async fn two_users_do_not_interfere() {
        let loop_ = new_loop();
        let alice = UserId::new("alice").unwrap();
        let bob = UserId::new("bob").unwrap();

        loop_
            .emit_event(
                EventPayload::ActionTaken {
                    action: "noted".into(),
                    label: None,
                },
                alice.clone(),
                "test",
            )
            .await;

        let bob_ctx = loop_.get_context(&bob).await;
        assert!(bob_ctx.actions_taken.is_empty());
        let alice_ctx = loop_.get_context(&alice).await;
        assert_eq!(alice_ctx.actions_taken.len(), 1);
    }
}

fn scoring_input(ctx: &UserContext) -> ScoringInput {
    ScoringInput {
        phase: ctx.phase,
        active_issue_count: ctx.active_issues.len(),
        rights_at_risk_count: ctx.rights_at_risk.len(),
    }
}

fn score_context(ctx: &UserContext) -> f64 {
    let input = scoring_input(ctx);
    let mut items: Vec<ScoredItem<'_>> = Vec::with_capacity(ctx.active_issues.len() + ctx.deadlines.len());
    for issue in &ctx.active_issues {
        items.push(ScoredItem::Issue(&issue.r#type));
    }
    for deadline in &ctx.deadlines {
        items.push(ScoredItem::Deadline(&deadline.r#type, deadline.date));
    }
    if items.is_empty() {
        return 0.0;
    }
    let score = calculate_overall_intensity(input, &items);
    if !(0.0..=100.0).contains(&score) {
        warn!(score, "overall intensity escaped [0,100], clamping");
        return score.clamp(0.0, 100.0);
    }
    score
}

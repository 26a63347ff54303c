//! Action pipeline: sort, gate, apply or escalate, record.

use crate::cadence::TickContext;
use crate::collaborators::{Alert, Collaborators};
use crate::config::ProactiveConfig;
use crate::effectors;
use crate::ledger::OutcomeLedger;
use crate::types::{Action, DecisionOutcome, OutcomeResult, Priority};
use serde_json::json;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

pub const ALERT_TYPE: &str = "PROACTIVE_ACTION";

/// Whether `action` may be applied without a human.
///
/// Depends only on the action and the config snapshot. CRITICAL actions are
/// always escalated.
pub fn should_auto_apply(action: &Action, config: &ProactiveConfig) -> bool {
    action.should_auto_apply
        && action.confidence >= config.auto_apply_thresholds.min_confidence
        && action.priority != Priority::Critical
}

/// Sort by priority weight, highest first. Ties keep their analyzer order.
pub fn prioritize(actions: &mut [Action]) {
    actions.sort_by(|a, b| b.priority.weight().cmp(&a.priority.weight()));
}

pub struct ActionPipeline<'a> {
    pub collaborators: &'a Collaborators,
    pub ledger: &'a Mutex<OutcomeLedger>,
}

impl ActionPipeline<'_> {
    /// Process every action once, in priority order, and return the outcomes.
    pub async fn process(
        &self,
        mut actions: Vec<Action>,
        config: &ProactiveConfig,
        tick: &TickContext,
    ) -> Vec<DecisionOutcome> {
        prioritize(&mut actions);
        let mut outcomes = Vec::with_capacity(actions.len());

        for action in &actions {
            let outcome = if should_auto_apply(action, config) {
                self.apply(action, tick).await
            } else {
                self.escalate(action).await
            };
            debug!(
                action_id = %action.id,
                action_type = %action.action_type,
                priority = %action.priority,
                applied = outcome.applied,
                result = %outcome.result,
                "action processed"
            );
            self.ledger
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .append(outcome.clone());
            outcomes.push(outcome);
        }

        if !outcomes.is_empty() {
            let applied = outcomes.iter().filter(|o| o.applied).count();
            info!(
                cadence = %tick.cadence,
                processed = outcomes.len(),
                applied,
                escalated = outcomes.len() - applied,
                "pipeline finished"
            );
        }
        outcomes
    }

    async fn apply(&self, action: &Action, tick: &TickContext) -> DecisionOutcome {
        let report = effectors::dispatch(action, self.collaborators, tick).await;
        let result = if report.success {
            OutcomeResult::Success
        } else {
            OutcomeResult::Failure
        };
        DecisionOutcome::applied(action, result, report.impact, report.feedback)
    }

    async fn escalate(&self, action: &Action) -> DecisionOutcome {
        let alert = Alert::new(
            ALERT_TYPE,
            action.description.clone(),
            action.priority,
            json!({
                "confidence": action.confidence,
                "action": action,
            }),
        );
        if let Err(e) = self.collaborators.alerting.create_alert(alert).await {
            warn!(action_id = %action.id, error = %e, "alert sink rejected escalation");
        }
        DecisionOutcome::escalated(action)
    }
}

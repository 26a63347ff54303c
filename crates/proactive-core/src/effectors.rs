//! Effector dispatch: turn an approved action into a side effect.
//!
//! Effectors never return an error. A collaborator failure, or a suggested
//! action with no effector, becomes an unsuccessful [`EffectorReport`].

use crate::cadence::TickContext;
use crate::collaborators::{Collaborators, ConstraintKind, ScheduleConstraint};
use crate::error::Result;
use crate::types::{Action, Impact, SuggestedAction};
use chrono::{Duration as ChronoDuration, NaiveDate};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

pub const PENDING_REBALANCE_KEY: &str = "proactive:pending_rebalance";
pub const STAFFING_HINT_PREFIX: &str = "proactive:staffing_hint:";

const PENDING_REBALANCE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const STAFFING_HINT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);
/// Days a workload-limit constraint stays in force.
const WORKLOAD_LIMIT_DAYS: i64 = 14;

pub fn staffing_hint_key(date: NaiveDate) -> String {
    format!("{STAFFING_HINT_PREFIX}{}", date.format("%Y-%m-%d"))
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectorReport {
    pub success: bool,
    pub impact: Impact,
    pub feedback: Option<String>,
}

impl EffectorReport {
    fn ok(impact: Impact, feedback: impl Into<String>) -> Self {
        Self {
            success: true,
            impact,
            feedback: Some(feedback.into()),
        }
    }

    fn failed(feedback: impl Into<String>) -> Self {
        Self {
            success: false,
            impact: Impact::default(),
            feedback: Some(feedback.into()),
        }
    }
}

/// Run the effector for `action`.
///
/// Effectors that change external state are not started once the tick has
/// been cancelled; the action is reported as not applied instead.
pub async fn dispatch(action: &Action, c: &Collaborators, tick: &TickContext) -> EffectorReport {
    if tick.cancel.is_cancelled() && mutates_external_state(&action.suggested_action) {
        debug!(action_id = %action.id, "tick cancelled; effector not started");
        return EffectorReport::failed("tick cancelled before the effect was applied");
    }

    let effect = match &action.suggested_action {
        SuggestedAction::WorkloadReduction {
            analyst_id,
            analyst_name,
            ..
        } => reduce_workload(c, tick, analyst_id, analyst_name).await,
        SuggestedAction::RebalanceWorkload { .. } => queue_rebalance(c, action).await,
        SuggestedAction::ApplyOptimization {
            opportunity_kind,
            expected_impact,
            ..
        } => Ok(apply_optimization(opportunity_kind, *expected_impact)),
        SuggestedAction::ProactiveScheduling {
            date,
            required_staff,
        } => cache_staffing_hint(c, action, *date, *required_staff).await,
        SuggestedAction::Unknown => {
            warn!(action_id = %action.id, "no effector for suggested action");
            return EffectorReport::failed("no effector registered for suggested action");
        }
    };

    match effect {
        Ok(report) => {
            debug!(
                action_id = %action.id,
                effector = action.suggested_action.type_name(),
                "effector applied"
            );
            report
        }
        Err(e) => {
            warn!(
                action_id = %action.id,
                effector = action.suggested_action.type_name(),
                error = %e,
                "effector failed"
            );
            EffectorReport::failed(e.to_string())
        }
    }
}

fn mutates_external_state(suggested: &SuggestedAction) -> bool {
    matches!(
        suggested,
        SuggestedAction::WorkloadReduction { .. }
            | SuggestedAction::RebalanceWorkload { .. }
            | SuggestedAction::ProactiveScheduling { .. }
    )
}

async fn reduce_workload(
    c: &Collaborators,
    tick: &TickContext,
    analyst_id: &str,
    analyst_name: &str,
) -> Result<EffectorReport> {
    let start = tick.now.date_naive();
    let constraint = ScheduleConstraint {
        id: Uuid::new_v4(),
        analyst_id: analyst_id.to_string(),
        kind: ConstraintKind::WorkloadLimit,
        start_date: start,
        end_date: start + ChronoDuration::days(WORKLOAD_LIMIT_DAYS),
        description: format!("Reduced workload for {analyst_name} after burnout risk"),
    };
    c.data.create_constraint(constraint).await?;
    Ok(EffectorReport::ok(
        Impact::default(),
        format!("workload limit created for {analyst_name}"),
    ))
}

async fn queue_rebalance(c: &Collaborators, action: &Action) -> Result<EffectorReport> {
    let value = json!({
        "action_id": action.id,
        "description": action.description,
        "suggested_action": action.suggested_action,
    });
    c.store
        .set(PENDING_REBALANCE_KEY, value, PENDING_REBALANCE_TTL)
        .await?;
    Ok(EffectorReport::ok(
        Impact::default(),
        "rebalance queued for next schedule generation",
    ))
}

fn apply_optimization(kind: &str, expected_impact: f64) -> EffectorReport {
    EffectorReport::ok(
        Impact {
            efficiency_improvement: expected_impact,
            ..Impact::default()
        },
        format!("optimization {kind} recorded"),
    )
}

async fn cache_staffing_hint(
    c: &Collaborators,
    action: &Action,
    date: NaiveDate,
    required_staff: u32,
) -> Result<EffectorReport> {
    let value = json!({
        "date": date,
        "required_staff": required_staff,
        "confidence": action.confidence,
    });
    c.store
        .set(&staffing_hint_key(date), value, STAFFING_HINT_TTL)
        .await?;
    Ok(EffectorReport::ok(
        Impact::default(),
        format!("staffing hint cached for {date}"),
    ))
}

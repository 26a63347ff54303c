//! Data model for the decision loop.
//!
//! An [`Action`] is a candidate intervention produced by an analyzer. The
//! pipeline consumes each action exactly once and records what happened to it
//! as a [`DecisionOutcome`], which is the only thing that outlives the tick.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// ActionType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Optimization,
    Alert,
    Adjustment,
    Prediction,
}

impl ActionType {
    pub const ALL: [ActionType; 4] = [
        ActionType::Optimization,
        ActionType::Alert,
        ActionType::Adjustment,
        ActionType::Prediction,
    ];

    /// The adaptive threshold tuned from this type's outcomes.
    pub fn threshold_key(self) -> &'static str {
        match self {
            ActionType::Optimization => crate::thresholds::OPTIMIZATION_IMPACT,
            ActionType::Alert => crate::thresholds::BURNOUT_RISK,
            ActionType::Adjustment => crate::thresholds::FAIRNESS_SCORE,
            ActionType::Prediction => crate::thresholds::CONFLICT_PROBABILITY,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionType::Optimization => "OPTIMIZATION",
            ActionType::Alert => "ALERT",
            ActionType::Adjustment => "ADJUSTMENT",
            ActionType::Prediction => "PREDICTION",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn weight(self) -> u8 {
        match self {
            Priority::Critical => 4,
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
            Priority::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// SuggestedAction
// ---------------------------------------------------------------------------

/// What an effector should do if the action is applied.
///
/// One variant per effector, each carrying only the fields that effector
/// reads. Unrecognised `type` tags deserialize to `Unknown`, which the
/// dispatch table rejects without failing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestedAction {
    /// Limit one analyst's workload for the next two weeks.
    WorkloadReduction {
        analyst_id: String,
        analyst_name: String,
        #[serde(default)]
        recommendations: Vec<String>,
    },
    /// Hand a rebalance hint to the next schedule-generation run.
    RebalanceWorkload {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fairness_score: Option<f64>,
        #[serde(default)]
        recommendations: Vec<String>,
    },
    ApplyOptimization {
        opportunity_kind: String,
        expected_impact: f64,
        description: String,
        #[serde(default)]
        affected_analysts: Vec<String>,
    },
    /// Cache a staffing requirement for an upcoming date.
    ProactiveScheduling {
        date: NaiveDate,
        required_staff: u32,
    },
    #[serde(other)]
    Unknown,
}

impl SuggestedAction {
    pub fn type_name(&self) -> &'static str {
        match self {
            SuggestedAction::WorkloadReduction { .. } => "WORKLOAD_REDUCTION",
            SuggestedAction::RebalanceWorkload { .. } => "REBALANCE_WORKLOAD",
            SuggestedAction::ApplyOptimization { .. } => "APPLY_OPTIMIZATION",
            SuggestedAction::ProactiveScheduling { .. } => "PROACTIVE_SCHEDULING",
            SuggestedAction::Unknown => "UNKNOWN",
        }
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub priority: Priority,
    /// Analyzer confidence in `[0, 1]`.
    pub confidence: f64,
    pub description: String,
    pub suggested_action: SuggestedAction,
    /// The analyzer's recommendation; the pipeline makes the final call.
    pub should_auto_apply: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Action {
    pub fn new(
        action_type: ActionType,
        priority: Priority,
        confidence: f64,
        description: impl Into<String>,
        suggested_action: SuggestedAction,
        should_auto_apply: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            action_type,
            priority,
            confidence: confidence.clamp(0.0, 1.0),
            description: description.into(),
            suggested_action,
            should_auto_apply,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

// ---------------------------------------------------------------------------
// DecisionOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeResult {
    Success,
    Failure,
    Partial,
}

impl std::fmt::Display for OutcomeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OutcomeResult::Success => "SUCCESS",
            OutcomeResult::Failure => "FAILURE",
            OutcomeResult::Partial => "PARTIAL",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Impact {
    pub fairness_score_change: f64,
    pub conflicts_reduced: f64,
    pub efficiency_improvement: f64,
}

/// The immutable record of what happened to one action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub action_id: Uuid,
    pub action_type: ActionType,
    pub applied: bool,
    pub result: OutcomeResult,
    pub impact: Impact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl DecisionOutcome {
    /// Outcome of an action that went through an effector.
    pub fn applied(
        action: &Action,
        result: OutcomeResult,
        impact: Impact,
        feedback: Option<String>,
    ) -> Self {
        Self {
            action_id: action.id,
            action_type: action.action_type,
            applied: true,
            result,
            impact,
            feedback,
            timestamp: Utc::now(),
        }
    }

    /// Outcome of an action handed to a human. Nothing has changed yet, so the
    /// result is `Failure` with zero impact.
    pub fn escalated(action: &Action) -> Self {
        Self {
            action_id: action.id,
            action_type: action.action_type,
            applied: false,
            result: OutcomeResult::Failure,
            impact: Impact::default(),
            feedback: Some("escalated for human approval".to_string()),
            timestamp: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

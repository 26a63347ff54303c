//! Analyzer adapters: query a collaborator, apply a fixed rule, emit actions.
//!
//! Each analyzer is isolated. A collaborator failure inside one analyzer is
//! logged and that analyzer contributes nothing; the rest of the tick runs.

use crate::cadence::TickContext;
use crate::collaborators::{Collaborators, DateRange, OpportunityCategory, RiskLevel, Severity};
use crate::config::{AnalyzerKind, ProactiveConfig};
use crate::error::Result;
use crate::types::{Action, ActionType, Priority, SuggestedAction};
use chrono::Duration;
use serde_json::json;
use tracing::{debug, warn};

/// Constraint changes are looked for within this many hours of the tick.
const CONSTRAINT_LOOKBACK_HOURS: i64 = 1;
/// Days ahead covered by a staffing prediction sweep.
const PREDICTION_HORIZON_DAYS: i64 = 7;
/// Window for fairness reports and opportunity scans.
const ANALYSIS_WINDOW_DAYS: i64 = 30;

const STAFFING_AUTO_APPLY_CONFIDENCE: f64 = 0.9;
const FAIRNESS_FLOOR: f64 = 0.7;
const WORKLOAD_BALANCE_CONFIDENCE: f64 = 0.8;
const FAIRNESS_OPPORTUNITY_MIN_IMPACT: f64 = 0.5;
const FAIRNESS_OPPORTUNITY_AUTO_IMPACT: f64 = 0.7;
const FAIRNESS_OPPORTUNITY_CONFIDENCE: f64 = 0.75;
const OPTIMIZATION_AUTO_IMPACT: f64 = 0.6;
const OPTIMIZATION_CONFIDENCE: f64 = 0.8;

/// Everything an analyzer may read during one tick.
pub struct AnalysisContext<'a> {
    pub collaborators: &'a Collaborators,
    pub config: &'a ProactiveConfig,
    /// Current `optimization_impact` adaptive threshold.
    pub optimization_threshold: f64,
    pub tick: &'a TickContext,
}

/// Run `kinds` in order and collect their actions.
///
/// Disabled analyzers are skipped. Cancellation is checked between
/// analyzers; an analyzer already awaiting a collaborator runs to completion.
pub async fn run_analyzers(kinds: &[AnalyzerKind], cx: &AnalysisContext<'_>) -> Vec<Action> {
    let mut actions = Vec::new();
    for &kind in kinds {
        if cx.tick.cancel.is_cancelled() {
            debug!(cadence = %cx.tick.cadence, "tick cancelled; skipping remaining analyzers");
            break;
        }
        if !cx.config.enabled_analysis.is_enabled(kind) {
            continue;
        }
        match analyze(kind, cx).await {
            Ok(found) => {
                debug!(analyzer = %kind, count = found.len(), "analyzer finished");
                actions.extend(found);
            }
            Err(e) => {
                warn!(analyzer = %kind, cadence = %cx.tick.cadence, error = %e, "analyzer failed");
            }
        }
    }
    actions
}

pub async fn analyze(kind: AnalyzerKind, cx: &AnalysisContext<'_>) -> Result<Vec<Action>> {
    match kind {
        AnalyzerKind::ConflictPrediction => predict_conflicts(cx).await,
        AnalyzerKind::BurnoutRisk => assess_burnout(cx).await,
        AnalyzerKind::WorkloadBalance => check_workload_balance(cx).await,
        AnalyzerKind::FairnessOpportunities => find_fairness_opportunities(cx).await,
        AnalyzerKind::OptimizationOpportunities => find_optimizations(cx).await,
    }
}

async fn predict_conflicts(cx: &AnalysisContext<'_>) -> Result<Vec<Action>> {
    let c = cx.collaborators;
    let since = cx.tick.now - Duration::hours(CONSTRAINT_LOOKBACK_HOURS);
    let changes = c.data.recent_constraint_changes(since).await?;
    if changes == 0 {
        return Ok(Vec::new());
    }

    let today = cx.tick.now.date_naive();
    let mut actions = Vec::new();
    for offset in 1..=PREDICTION_HORIZON_DAYS {
        let date = today + Duration::days(offset);
        let prediction = c.predictive.predict_staffing_needs(date).await?;
        if prediction.risk_level != RiskLevel::High {
            continue;
        }
        let action = Action::new(
            ActionType::Prediction,
            Priority::High,
            prediction.confidence,
            format!(
                "High staffing risk on {date}: {} analysts required",
                prediction.predicted_required_staff
            ),
            SuggestedAction::ProactiveScheduling {
                date,
                required_staff: prediction.predicted_required_staff,
            },
            prediction.confidence > STAFFING_AUTO_APPLY_CONFIDENCE,
        )
        .with_metadata("constraint_changes", json!(changes));
        actions.push(action);
    }
    Ok(actions)
}

async fn assess_burnout(cx: &AnalysisContext<'_>) -> Result<Vec<Action>> {
    let c = cx.collaborators;
    let analysts = c.data.active_analysts().await?;
    if analysts.is_empty() {
        return Ok(Vec::new());
    }
    let assessments = c.predictive.identify_burnout_risk(&analysts).await?;

    Ok(assessments
        .into_iter()
        .filter(|a| a.risk_level == RiskLevel::High)
        .map(|a| {
            Action::new(
                ActionType::Alert,
                Priority::High,
                a.risk_score,
                format!("{} is at high risk of burnout", a.name),
                SuggestedAction::WorkloadReduction {
                    analyst_id: a.analyst_id.clone(),
                    analyst_name: a.name.clone(),
                    recommendations: a.recommendations,
                },
                // Workload cuts always go to a human.
                false,
            )
            .with_metadata("analyst_id", json!(a.analyst_id))
        })
        .collect())
}

async fn check_workload_balance(cx: &AnalysisContext<'_>) -> Result<Vec<Action>> {
    let range = DateRange::trailing(cx.tick.now.date_naive(), ANALYSIS_WINDOW_DAYS);
    let report = cx
        .collaborators
        .analytics
        .generate_fairness_report(range)
        .await?;
    if report.overall_fairness_score >= FAIRNESS_FLOOR {
        return Ok(Vec::new());
    }

    let action = Action::new(
        ActionType::Adjustment,
        Priority::Medium,
        WORKLOAD_BALANCE_CONFIDENCE,
        format!(
            "Workload fairness is {:.2} over the last {ANALYSIS_WINDOW_DAYS} days",
            report.overall_fairness_score
        ),
        SuggestedAction::RebalanceWorkload {
            fairness_score: Some(report.overall_fairness_score),
            recommendations: report.recommendations,
        },
        true,
    );
    Ok(vec![action])
}

async fn find_fairness_opportunities(cx: &AnalysisContext<'_>) -> Result<Vec<Action>> {
    let range = DateRange::trailing(cx.tick.now.date_naive(), ANALYSIS_WINDOW_DAYS);
    let opportunities = cx
        .collaborators
        .analytics
        .identify_optimization_opportunities(range)
        .await?;

    Ok(opportunities
        .into_iter()
        .filter(|o| {
            o.category == OpportunityCategory::Fairness
                && o.impact > FAIRNESS_OPPORTUNITY_MIN_IMPACT
        })
        .map(|o| {
            let priority = if o.severity == Severity::High {
                Priority::High
            } else {
                Priority::Medium
            };
            Action::new(
                ActionType::Adjustment,
                priority,
                FAIRNESS_OPPORTUNITY_CONFIDENCE,
                o.description.clone(),
                SuggestedAction::RebalanceWorkload {
                    fairness_score: None,
                    recommendations: o.suggested_actions,
                },
                o.impact > FAIRNESS_OPPORTUNITY_AUTO_IMPACT,
            )
            .with_metadata("opportunity_kind", json!(o.kind))
            .with_metadata("impact", json!(o.impact))
        })
        .collect())
}

async fn find_optimizations(cx: &AnalysisContext<'_>) -> Result<Vec<Action>> {
    let range = DateRange::upcoming(cx.tick.now.date_naive(), ANALYSIS_WINDOW_DAYS);
    let opportunities = cx
        .collaborators
        .analytics
        .identify_optimization_opportunities(range)
        .await?;
    let gated = &cx.config.auto_apply_thresholds.require_human_approval;

    Ok(opportunities
        .into_iter()
        .filter(|o| o.impact > cx.optimization_threshold)
        .map(|o| {
            let auto = o.impact > OPTIMIZATION_AUTO_IMPACT && !gated.contains(&o.kind);
            Action::new(
                ActionType::Optimization,
                severity_priority(o.severity),
                OPTIMIZATION_CONFIDENCE,
                o.description.clone(),
                SuggestedAction::ApplyOptimization {
                    opportunity_kind: o.kind,
                    expected_impact: o.impact,
                    description: o.description,
                    affected_analysts: o.affected_analysts,
                },
                auto,
            )
        })
        .collect())
}

pub fn severity_priority(severity: Severity) -> Priority {
    match severity {
        Severity::Critical => Priority::Critical,
        Severity::High => Priority::High,
        Severity::Medium => Priority::Medium,
        Severity::Low => Priority::Low,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

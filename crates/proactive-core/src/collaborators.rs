//! Contracts for everything the engine consumes but does not own.
//!
//! The analytics and predictive engines, the alert sink, the durable cache,
//! and the scheduling data store are reached only through these traits. The
//! engine never sees their storage or their formulas, only the typed results.

use crate::error::Result;
use crate::types::Priority;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Shared value types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// The `days` days ending on `today` (inclusive).
    pub fn trailing(today: NaiveDate, days: i64) -> Self {
        Self {
            start: today - ChronoDuration::days(days),
            end: today,
        }
    }

    /// The `days` days starting on `today`.
    pub fn upcoming(today: NaiveDate, days: i64) -> Self {
        Self {
            start: today,
            end: today + ChronoDuration::days(days),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalystRef {
    pub id: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FairnessReport {
    pub range: DateRange,
    pub overall_fairness_score: f64,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityCategory {
    Fairness,
    Coverage,
    #[default]
    Efficiency,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    /// Analytics-defined type tag, e.g. `WORKLOAD_IMBALANCE`.
    pub kind: String,
    #[serde(default)]
    pub category: OpportunityCategory,
    pub severity: Severity,
    pub impact: f64,
    pub description: String,
    #[serde(default)]
    pub suggested_actions: Vec<String>,
    #[serde(default)]
    pub affected_analysts: Vec<String>,
}

#[async_trait]
pub trait Analytics: Send + Sync {
    async fn generate_fairness_report(&self, range: DateRange) -> Result<FairnessReport>;

    async fn identify_optimization_opportunities(
        &self,
        range: DateRange,
    ) -> Result<Vec<Opportunity>>;
}

// ---------------------------------------------------------------------------
// Predictive
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffingPrediction {
    pub date: NaiveDate,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub predicted_required_staff: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurnoutAssessment {
    pub analyst_id: String,
    pub name: String,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[async_trait]
pub trait Predictive: Send + Sync {
    async fn predict_staffing_needs(&self, date: NaiveDate) -> Result<StaffingPrediction>;

    async fn identify_burnout_risk(
        &self,
        analysts: &[AnalystRef],
    ) -> Result<Vec<BurnoutAssessment>>;
}

// ---------------------------------------------------------------------------
// Alerting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub severity: Priority,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(
        kind: impl Into<String>,
        message: impl Into<String>,
        severity: Priority,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.into(),
            message: message.into(),
            severity,
            metadata,
            created_at: Utc::now(),
        }
    }
}

/// Fire-and-forget escalation sink.
#[async_trait]
pub trait Alerting: Send + Sync {
    async fn create_alert(&self, alert: Alert) -> Result<()>;
}

// ---------------------------------------------------------------------------
// KeyValueStore
// ---------------------------------------------------------------------------

/// Durable cache with per-key expiry. Expired keys read as absent.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;

    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()>;
}

// ---------------------------------------------------------------------------
// DataStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    WorkloadLimit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConstraint {
    pub id: Uuid,
    pub analyst_id: String,
    pub kind: ConstraintKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub description: String,
}

#[async_trait]
pub trait DataStore: Send + Sync {
    /// Number of scheduling constraints created or changed since `since`.
    async fn recent_constraint_changes(&self, since: DateTime<Utc>) -> Result<usize>;

    async fn active_analysts(&self) -> Result<Vec<AnalystRef>>;

    async fn create_constraint(&self, constraint: ScheduleConstraint) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// The full set of injected collaborators for one engine.
#[derive(Clone)]
pub struct Collaborators {
    pub analytics: Arc<dyn Analytics>,
    pub predictive: Arc<dyn Predictive>,
    pub alerting: Arc<dyn Alerting>,
    pub store: Arc<dyn KeyValueStore>,
    pub data: Arc<dyn DataStore>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_range_ends_today() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        let r = DateRange::trailing(today, 30);
        assert_eq!(r.end, today);
        assert_eq!(r.start, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    #[test]
    fn opportunity_category_defaults_to_efficiency() {
        let o: Opportunity = serde_json::from_str(
            r#"{"kind":"IDLE_COVERAGE","severity":"LOW","impact":0.2,"description":"d"}"#,
        )
        .unwrap();
        assert_eq!(o.category, OpportunityCategory::Efficiency);
        assert!(o.suggested_actions.is_empty());
    }
}

//! Canned collaborators backed by a YAML file.
//!
//! `FixtureWorld` answers every analytics, predictive and data-store query
//! from `.shiftplanner/fixture.yaml`. It lets the CLI drive the engine without
//! a live scheduling backend, and gives tests a controllable world: calls can
//! be made to fail or to take a while, and every call is counted.

use crate::collaborators::{
    Alert, Alerting, Analytics, AnalystRef, BurnoutAssessment, Collaborators, DataStore,
    DateRange, FairnessReport, KeyValueStore, Opportunity, Predictive, RiskLevel,
    ScheduleConstraint, StaffingPrediction,
};
use crate::error::{ProactiveError, Result};
use crate::paths;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

// ---------------------------------------------------------------------------
// FixtureData
// ---------------------------------------------------------------------------

/// Collaborator calls a fixture can count or fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureCall {
    FairnessReport,
    Opportunities,
    StaffingPrediction,
    BurnoutRisk,
    ConstraintChanges,
    ActiveAnalysts,
    CreateConstraint,
}

impl FixtureCall {
    fn collaborator(self) -> &'static str {
        match self {
            FixtureCall::FairnessReport | FixtureCall::Opportunities => "analytics",
            FixtureCall::StaffingPrediction | FixtureCall::BurnoutRisk => "predictive",
            FixtureCall::ConstraintChanges
            | FixtureCall::ActiveAnalysts
            | FixtureCall::CreateConstraint => "data store",
        }
    }
}

/// Staffing prediction for the day `day_offset` days after today.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffingFixture {
    pub day_offset: i64,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub required_staff: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureData {
    #[serde(default)]
    pub analysts: Vec<AnalystRef>,
    #[serde(default)]
    pub recent_constraint_changes: usize,
    #[serde(default = "default_fairness_score")]
    pub fairness_score: f64,
    #[serde(default)]
    pub fairness_recommendations: Vec<String>,
    #[serde(default)]
    pub opportunities: Vec<Opportunity>,
    /// Days not listed predict LOW risk.
    #[serde(default)]
    pub staffing: Vec<StaffingFixture>,
    #[serde(default)]
    pub burnout: Vec<BurnoutAssessment>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub fail: BTreeSet<FixtureCall>,
    /// Simulated latency applied to every call, in milliseconds.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub latency_ms: u64,
}

fn default_fairness_score() -> f64 {
    1.0
}

fn is_zero(v: &u64) -> bool {
    *v == 0
}

impl Default for FixtureData {
    fn default() -> Self {
        Self {
            analysts: Vec::new(),
            recent_constraint_changes: 0,
            fairness_score: default_fairness_score(),
            fairness_recommendations: Vec::new(),
            opportunities: Vec::new(),
            staffing: Vec::new(),
            burnout: Vec::new(),
            fail: BTreeSet::new(),
            latency_ms: 0,
        }
    }
}

impl FixtureData {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::fixture_path(root);
        if !path.exists() {
            return Err(ProactiveError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&paths::fixture_path(root), data.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// FixtureWorld
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct FixtureWorld {
    data: FixtureData,
    calls: Mutex<BTreeMap<FixtureCall, usize>>,
    constraints: Mutex<Vec<ScheduleConstraint>>,
}

impl FixtureWorld {
    pub fn new(data: FixtureData) -> Self {
        Self {
            data,
            calls: Mutex::new(BTreeMap::new()),
            constraints: Mutex::new(Vec::new()),
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        Ok(Self::new(FixtureData::load(root)?))
    }

    pub fn data(&self) -> &FixtureData {
        &self.data
    }

    /// Bundle this world with an alert sink and a key-value store.
    pub fn collaborators(
        self: Arc<Self>,
        alerting: Arc<dyn Alerting>,
        store: Arc<dyn KeyValueStore>,
    ) -> Collaborators {
        Collaborators {
            analytics: self.clone(),
            predictive: self.clone(),
            alerting,
            store,
            data: self,
        }
    }

    pub fn call_count(&self, call: FixtureCall) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&call)
            .copied()
            .unwrap_or(0)
    }

    pub fn created_constraints(&self) -> Vec<ScheduleConstraint> {
        self.constraints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Count the call, wait out the configured latency, then fail if asked to.
    async fn enter(&self, call: FixtureCall) -> Result<()> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(call)
            .or_default() += 1;
        if self.data.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.data.latency_ms)).await;
        }
        if self.data.fail.contains(&call) {
            return Err(ProactiveError::collaborator(
                call.collaborator(),
                format!("fixture configured to fail {call:?}"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Analytics for FixtureWorld {
    async fn generate_fairness_report(&self, range: DateRange) -> Result<FairnessReport> {
        self.enter(FixtureCall::FairnessReport).await?;
        Ok(FairnessReport {
            range,
            overall_fairness_score: self.data.fairness_score,
            recommendations: self.data.fairness_recommendations.clone(),
        })
    }

    async fn identify_optimization_opportunities(
        &self,
        _range: DateRange,
    ) -> Result<Vec<Opportunity>> {
        self.enter(FixtureCall::Opportunities).await?;
        Ok(self.data.opportunities.clone())
    }
}

#[async_trait]
impl Predictive for FixtureWorld {
    async fn predict_staffing_needs(&self, date: NaiveDate) -> Result<StaffingPrediction> {
        self.enter(FixtureCall::StaffingPrediction).await?;
        let offset = (date - Utc::now().date_naive()).num_days();
        let prediction = match self.data.staffing.iter().find(|s| s.day_offset == offset) {
            Some(s) => StaffingPrediction {
                date,
                risk_level: s.risk_level,
                confidence: s.confidence,
                predicted_required_staff: s.required_staff,
            },
            None => StaffingPrediction {
                date,
                risk_level: RiskLevel::Low,
                confidence: 0.5,
                predicted_required_staff: 0,
            },
        };
        Ok(prediction)
    }

    async fn identify_burnout_risk(
        &self,
        analysts: &[AnalystRef],
    ) -> Result<Vec<BurnoutAssessment>> {
        self.enter(FixtureCall::BurnoutRisk).await?;
        Ok(self
            .data
            .burnout
            .iter()
            .filter(|b| analysts.iter().any(|a| a.id == b.analyst_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DataStore for FixtureWorld {
    async fn recent_constraint_changes(&self, _since: DateTime<Utc>) -> Result<usize> {
        self.enter(FixtureCall::ConstraintChanges).await?;
        Ok(self.data.recent_constraint_changes)
    }

    async fn active_analysts(&self) -> Result<Vec<AnalystRef>> {
        self.enter(FixtureCall::ActiveAnalysts).await?;
        Ok(self.data.analysts.clone())
    }

    async fn create_constraint(&self, constraint: ScheduleConstraint) -> Result<()> {
        self.enter(FixtureCall::CreateConstraint).await?;
        self.constraints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(constraint);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// RecordingAlerts
// ---------------------------------------------------------------------------

/// In-memory alert sink. Optionally rejects every alert.
#[derive(Debug, Default)]
pub struct RecordingAlerts {
    alerts: Mutex<Vec<Alert>>,
    failing: AtomicBool,
}

impl RecordingAlerts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let sink = Self::default();
        sink.failing.store(true, Ordering::Release);
        sink
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Alerting for RecordingAlerts {
    async fn create_alert(&self, alert: Alert) -> Result<()> {
        if self.failing.load(Ordering::Acquire) {
            return Err(ProactiveError::collaborator("alerting", "alert sink unavailable"));
        }
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(alert);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn fixture_yaml_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let data = FixtureData {
            recent_constraint_changes: 2,
            fairness_score: 0.6,
            staffing: vec![StaffingFixture {
                day_offset: 3,
                risk_level: RiskLevel::High,
                confidence: 0.92,
                required_staff: 5,
            }],
            ..FixtureData::default()
        };
        data.save(dir.path()).unwrap();
        let loaded = FixtureData::load(dir.path()).unwrap();
        assert_eq!(loaded.recent_constraint_changes, 2);
        assert_eq!(loaded.staffing, data.staffing);
    }

    #[test]
    fn missing_fixture_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            FixtureData::load(dir.path()),
            Err(ProactiveError::NotInitialized)
        ));
    }

    #[tokio::test]
    async fn configured_failure_is_a_collaborator_error_and_still_counted() {
        let world = FixtureWorld::new(FixtureData {
            fail: [FixtureCall::FairnessReport].into_iter().collect(),
            ..FixtureData::default()
        });
        let today = Utc::now().date_naive();
        let err = world
            .generate_fairness_report(DateRange::trailing(today, 30))
            .await
            .unwrap_err();
        assert!(matches!(err, ProactiveError::Collaborator { ref name, .. } if name == "analytics"));
        assert_eq!(world.call_count(FixtureCall::FairnessReport), 1);
    }

    #[tokio::test]
    async fn unlisted_days_predict_low_risk() {
        let world = FixtureWorld::new(FixtureData::default());
        let date = Utc::now().date_naive() + chrono::Duration::days(4);
        let p = world.predict_staffing_needs(date).await.unwrap();
        assert_eq!(p.risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn failing_alert_sink_rejects() {
        let sink = RecordingAlerts::failing();
        let alert = Alert::new(
            "PROACTIVE_ACTION",
            "m",
            crate::types::Priority::Low,
            serde_json::json!({}),
        );
        assert!(sink.create_alert(alert).await.is_err());
        assert!(sink.alerts().is_empty());
    }
}

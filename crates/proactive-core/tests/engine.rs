use chrono::Utc;
use proactive_core::collaborators::{AnalystRef, BurnoutAssessment, RiskLevel};
use proactive_core::config::AutoApplyThresholds;
use proactive_core::effectors::PENDING_REBALANCE_KEY;
use proactive_core::fixture::{FixtureData, FixtureWorld, RecordingAlerts};
use proactive_core::store::RedbStore;
use proactive_core::{
    ActionType, Cadence, ConfigPatch, EngineState, ProactiveConfig, ProactiveEngine,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn engine_on(
    path: &Path,
    data: FixtureData,
) -> (ProactiveEngine, Arc<RedbStore>, Arc<RecordingAlerts>) {
    let store = Arc::new(RedbStore::open(path).unwrap());
    let alerts = Arc::new(RecordingAlerts::new());
    let world = Arc::new(FixtureWorld::new(data));
    let c = world.collaborators(alerts.clone(), store.clone());
    (
        ProactiveEngine::new(c, ProactiveConfig::default()),
        store,
        alerts,
    )
}

fn unfair() -> FixtureData {
    FixtureData {
        fairness_score: 0.5,
        ..FixtureData::default()
    }
}

#[tokio::test]
async fn durable_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("proactive.redb");

    {
        let (engine, store, alerts) = engine_on(&path, unfair());
        engine.enable().await.unwrap();
        engine
            .update_config(ConfigPatch {
                auto_apply_thresholds: Some(AutoApplyThresholds {
                    min_confidence: 0.7,
                    ..AutoApplyThresholds::default()
                }),
                ..ConfigPatch::default()
            })
            .await
            .unwrap();

        let report = engine.run_cadence(Cadence::Hourly).await.unwrap();
        assert_eq!(report.outcomes.len(), 1);
        assert!(report.outcomes[0].applied);
        assert!(alerts.alerts().is_empty());
        assert!(store
            .get_at(PENDING_REBALANCE_KEY, Utc::now())
            .unwrap()
            .is_some());

        engine.run_cadence(Cadence::Weekly).await.unwrap();
        assert_eq!(engine.history(ActionType::Adjustment).len(), 1);
    }

    let (engine, _store, _alerts) = engine_on(&path, FixtureData::default());
    assert_eq!(engine.state(), EngineState::Disabled);
    engine.restore().await;

    let status = engine.status();
    assert_eq!(status.state, EngineState::Enabled);
    assert_eq!(status.config.auto_apply_thresholds.min_confidence, 0.7);
    assert!(status.performance_snapshot.is_some());
    // The ledger lives in memory only.
    assert!(engine.history(ActionType::Adjustment).is_empty());
}

#[tokio::test]
async fn continuous_tick_keeps_only_critical_actions() {
    let dir = TempDir::new().unwrap();
    let data = FixtureData {
        analysts: vec![AnalystRef {
            id: "a1".into(),
            name: "Dana".into(),
        }],
        burnout: vec![BurnoutAssessment {
            analyst_id: "a1".into(),
            name: "Dana".into(),
            risk_level: RiskLevel::High,
            risk_score: 0.9,
            recommendations: vec!["Skip next weekend".into()],
        }],
        ..FixtureData::default()
    };
    let (engine, _store, alerts) = engine_on(&dir.path().join("proactive.redb"), data);

    let report = engine.run_cadence(Cadence::Continuous).await.unwrap();
    assert!(report.outcomes.is_empty());
    assert_eq!(report.discarded, 1);
    assert!(alerts.alerts().is_empty());
}

#[tokio::test]
async fn escalated_action_reaches_alert_sink() {
    let dir = TempDir::new().unwrap();
    let (engine, _store, alerts) = engine_on(&dir.path().join("proactive.redb"), unfair());

    let report = engine.run_cadence(Cadence::Hourly).await.unwrap();
    assert_eq!(report.outcomes.len(), 1);
    assert!(!report.outcomes[0].applied);

    let raised = alerts.alerts();
    assert_eq!(raised.len(), 1);
    assert_eq!(raised[0].kind, "PROACTIVE_ACTION");
    assert_eq!(raised[0].metadata["confidence"], 0.8);
}

//! The proactive engine: lifecycle, cadence timers, and tick execution.
//!
//! ```text
//! enable()  ──► Enabled ──start()──► Running
//!    ▲             ▲                    │
//!    │             └──────stop()────────┘
//! disable() ◄── any state (stops timers first)
//! ```
//!
//! `start()` spawns one timer task per cadence. Each firing is gated on
//! `running && enabled`, claims the cadence's in-progress guard, and runs as
//! its own task, so a slow tick is skipped over rather than queued behind.
//! `stop()` cancels the timers without waiting for ticks already in flight.

use crate::analyzers::{self, AnalysisContext};
use crate::cadence::{Cadence, CadenceGuards, CancelSource, CancelToken, TickContext};
use crate::collaborators::Collaborators;
use crate::config::{ConfigPatch, ProactiveConfig, WarnLevel};
use crate::error::{ProactiveError, Result};
use crate::ledger::OutcomeLedger;
use crate::pipeline::ActionPipeline;
use crate::thresholds::{AdaptiveThresholds, PerformanceReport, ThresholdAdjustment};
use crate::types::{ActionType, DecisionOutcome, Priority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const ENABLED_KEY: &str = "proactive:enabled";
pub const CONFIG_KEY: &str = "proactive:config";
pub const PERFORMANCE_REPORT_KEY: &str = "proactive:performance_report";

const DURABLE_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);
const REPORT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

// ---------------------------------------------------------------------------
// Status types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Disabled,
    Enabled,
    Running,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EngineState::Disabled => "disabled",
            EngineState::Enabled => "enabled",
            EngineState::Running => "running",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub state: EngineState,
    pub is_running: bool,
    pub is_enabled: bool,
    pub config: ProactiveConfig,
    pub adaptive_thresholds: BTreeMap<String, f64>,
    pub performance_snapshot: Option<PerformanceReport>,
    pub ledger_sizes: BTreeMap<ActionType, usize>,
    pub last_update: Option<DateTime<Utc>>,
}

/// What one tick did.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub cadence: Cadence,
    /// The previous tick of this cadence was still running.
    pub skipped: bool,
    pub outcomes: Vec<DecisionOutcome>,
    /// Non-critical actions dropped by the continuous cadence.
    pub discarded: usize,
    pub adjustments: Vec<ThresholdAdjustment>,
}

impl TickReport {
    fn empty(cadence: Cadence) -> Self {
        Self {
            cadence,
            skipped: false,
            outcomes: Vec::new(),
            discarded: 0,
            adjustments: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProactiveEngine
// ---------------------------------------------------------------------------

/// Cheap to clone; clones share one engine.
#[derive(Clone)]
pub struct ProactiveEngine {
    inner: Arc<Inner>,
}

struct Inner {
    collaborators: Collaborators,
    config: RwLock<Arc<ProactiveConfig>>,
    ledger: Mutex<OutcomeLedger>,
    thresholds: Mutex<AdaptiveThresholds>,
    enabled: AtomicBool,
    running: AtomicBool,
    /// Serializes enable/disable/start.
    lifecycle: tokio::sync::Mutex<()>,
    timers: Mutex<Vec<JoinHandle<()>>>,
    cancel: Mutex<Option<CancelSource>>,
    guards: CadenceGuards,
    last_update: Mutex<Option<DateTime<Utc>>>,
    performance: Mutex<Option<PerformanceReport>>,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ProactiveEngine {
    pub fn new(collaborators: Collaborators, config: ProactiveConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                collaborators,
                config: RwLock::new(Arc::new(config)),
                ledger: Mutex::new(OutcomeLedger::new()),
                thresholds: Mutex::new(AdaptiveThresholds::default()),
                enabled: AtomicBool::new(false),
                running: AtomicBool::new(false),
                lifecycle: tokio::sync::Mutex::new(()),
                timers: Mutex::new(Vec::new()),
                cancel: Mutex::new(None),
                guards: CadenceGuards::default(),
                last_update: Mutex::new(None),
                performance: Mutex::new(None),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    pub fn state(&self) -> EngineState {
        if self.is_running() {
            EngineState::Running
        } else if self.is_enabled() {
            EngineState::Enabled
        } else {
            EngineState::Disabled
        }
    }

    pub fn config(&self) -> Arc<ProactiveConfig> {
        self.inner
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn replace_config(&self, config: ProactiveConfig) {
        *self
            .inner
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Persist the enabled flag, then set it locally.
    pub async fn enable(&self) -> Result<()> {
        let _lifecycle = self.inner.lifecycle.lock().await;
        self.inner
            .collaborators
            .store
            .set(ENABLED_KEY, json!(true), DURABLE_TTL)
            .await?;
        self.inner.enabled.store(true, Ordering::Release);
        info!("proactive engine enabled");
        Ok(())
    }

    /// Persist the disabled flag, clear it locally, and stop if running.
    pub async fn disable(&self) -> Result<()> {
        let _lifecycle = self.inner.lifecycle.lock().await;
        self.inner
            .collaborators
            .store
            .set(ENABLED_KEY, json!(false), DURABLE_TTL)
            .await?;
        self.inner.enabled.store(false, Ordering::Release);
        self.stop();
        info!("proactive engine disabled");
        Ok(())
    }

    /// Start the cadence timers. A no-op if already running.
    ///
    /// Durable state is restored first (see [`restore`](Self::restore)), so
    /// the engine starts if either the local flag or the durable flag says it
    /// is enabled. If any timer cannot be set up the engine is stopped again
    /// and the error returned.
    pub async fn start(&self) -> Result<()> {
        let _lifecycle = self.inner.lifecycle.lock().await;
        if self.is_running() {
            debug!("proactive engine already running");
            return Ok(());
        }

        self.restore_durable().await;
        if !self.is_enabled() {
            return Err(ProactiveError::NotEnabled);
        }

        if let Err(e) = self.spawn_timers() {
            self.stop();
            return Err(e);
        }
        info!("proactive engine started");
        Ok(())
    }

    /// Adopt durable state without starting: the enabled flag (ORed with the
    /// local one), the config snapshot, and the last performance report along
    /// with the thresholds it recorded.
    pub async fn restore(&self) {
        let _lifecycle = self.inner.lifecycle.lock().await;
        self.restore_durable().await;
    }

    async fn restore_durable(&self) {
        if self.read_durable_enabled().await {
            self.inner.enabled.store(true, Ordering::Release);
        }
        if let Some(config) = self.read_durable_config().await {
            self.replace_config(config);
        }
        if let Some(report) = self.read_durable_report().await {
            lock(&self.inner.thresholds).merge(&report.thresholds);
            *lock(&self.inner.performance) = Some(report);
        }
    }

    /// Cancel every cadence timer. Ticks already running finish on their own.
    pub fn stop(&self) {
        let was_running = self.inner.running.swap(false, Ordering::AcqRel);
        if let Some(source) = lock(&self.inner.cancel).take() {
            source.cancel();
        }
        lock(&self.inner.timers).clear();
        if was_running {
            info!("proactive engine stopped");
        }
    }

    fn spawn_timers(&self) -> Result<()> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| ProactiveError::NoRuntime)?;
        let config = self.config();
        let source = CancelSource::new();
        let token = source.token();
        *lock(&self.inner.cancel) = Some(source);
        self.inner.running.store(true, Ordering::Release);

        for cadence in Cadence::ALL {
            let period = config.cadence_periods.period(cadence);
            if period.is_zero() {
                return Err(ProactiveError::InvalidCadence {
                    cadence: cadence.to_string(),
                    reason: "period must be non-zero".into(),
                });
            }
            let first = Instant::now()
                .checked_add(period)
                .and_then(|first| first.checked_add(period).map(|_| first))
                .ok_or_else(|| ProactiveError::InvalidCadence {
                    cadence: cadence.to_string(),
                    reason: format!("period of {}s is too long to schedule", period.as_secs()),
                })?;
            let handle = runtime.spawn(cadence_timer(
                Arc::downgrade(&self.inner),
                cadence,
                first,
                period,
                token.clone(),
            ));
            lock(&self.inner.timers).push(handle);
            debug!(%cadence, period_secs = period.as_secs(), "cadence timer scheduled");
        }
        Ok(())
    }

    async fn read_durable_enabled(&self) -> bool {
        match self.inner.collaborators.store.get(ENABLED_KEY).await {
            Ok(value) => value.and_then(|v| v.as_bool()).unwrap_or(false),
            Err(e) => {
                warn!(error = %e, "could not read durable enabled flag");
                false
            }
        }
    }

    async fn read_durable_config(&self) -> Option<ProactiveConfig> {
        let value = match self.inner.collaborators.store.get(CONFIG_KEY).await {
            Ok(value) => value?,
            Err(e) => {
                warn!(error = %e, "could not read durable config");
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable durable config");
                None
            }
        }
    }

    async fn read_durable_report(&self) -> Option<PerformanceReport> {
        if lock(&self.inner.performance).is_some() {
            return None;
        }
        let value = match self.inner.collaborators.store.get(PERFORMANCE_REPORT_KEY).await {
            Ok(value) => value?,
            Err(e) => {
                warn!(error = %e, "could not read performance report");
                return None;
            }
        };
        serde_json::from_value(value)
            .map_err(|e| warn!(error = %e, "ignoring unreadable performance report"))
            .ok()
    }

    // -----------------------------------------------------------------------
    // Config
    // -----------------------------------------------------------------------

    /// Apply `patch` to the current snapshot, persist the result, and swap it
    /// in. Cadence periods take effect on the next `start()`.
    pub async fn update_config(&self, patch: ConfigPatch) -> Result<Arc<ProactiveConfig>> {
        let next = patch.apply(&self.config());
        let errors: Vec<String> = next
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        if !errors.is_empty() {
            return Err(ProactiveError::InvalidConfig(errors.join("; ")));
        }

        self.inner
            .collaborators
            .store
            .set(CONFIG_KEY, serde_json::to_value(&next)?, DURABLE_TTL)
            .await?;
        self.replace_config(next);
        info!("proactive config updated");
        Ok(self.config())
    }

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    pub fn status(&self) -> EngineStatus {
        let state = self.state();
        EngineStatus {
            state,
            is_running: state == EngineState::Running,
            is_enabled: state != EngineState::Disabled,
            config: (*self.config()).clone(),
            adaptive_thresholds: lock(&self.inner.thresholds).snapshot(),
            performance_snapshot: lock(&self.inner.performance).clone(),
            ledger_sizes: lock(&self.inner.ledger).sizes(),
            last_update: *lock(&self.inner.last_update),
        }
    }

    pub fn history(&self, action_type: ActionType) -> Vec<DecisionOutcome> {
        lock(&self.inner.ledger)
            .history(action_type)
            .cloned()
            .collect()
    }

    pub fn threshold(&self, action_type: ActionType) -> f64 {
        lock(&self.inner.thresholds).for_type(action_type)
    }

    // -----------------------------------------------------------------------
    // Ticks
    // -----------------------------------------------------------------------

    /// Run one tick of `cadence` now, regardless of the running gate.
    ///
    /// Still honours the in-progress guard: if a tick of the same cadence is
    /// running, the report comes back with `skipped` set.
    pub async fn run_cadence(&self, cadence: Cadence) -> Result<TickReport> {
        let Some(_in_flight) = self.inner.guards.try_enter(cadence) else {
            info!(%cadence, "tick already in progress; skipping");
            return Ok(TickReport {
                skipped: true,
                ..TickReport::empty(cadence)
            });
        };
        let tick = TickContext::new(cadence, CancelToken::never());
        self.execute(&tick).await
    }

    /// Timer-driven firing: gate, guard, execute, log.
    async fn fire(&self, cadence: Cadence, cancel: CancelToken) {
        if !(self.is_running() && self.is_enabled()) {
            debug!(%cadence, "engine not running; tick ignored");
            return;
        }
        let Some(_in_flight) = self.inner.guards.try_enter(cadence) else {
            info!(%cadence, "previous tick still running; skipping");
            return;
        };
        let tick = TickContext::new(cadence, cancel);
        match self.execute(&tick).await {
            Ok(report) => debug!(
                %cadence,
                outcomes = report.outcomes.len(),
                discarded = report.discarded,
                "tick finished"
            ),
            Err(e) => warn!(%cadence, error = %e, "tick failed"),
        }
    }

    async fn execute(&self, tick: &TickContext) -> Result<TickReport> {
        let report = match tick.cadence {
            Cadence::Weekly => TickReport {
                adjustments: self.recalibrate(tick).await?,
                ..TickReport::empty(tick.cadence)
            },
            _ => self.analyze_and_act(tick).await,
        };
        *lock(&self.inner.last_update) = Some(Utc::now());
        Ok(report)
    }

    async fn analyze_and_act(&self, tick: &TickContext) -> TickReport {
        let config = self.config();
        let kinds = config.analysis_frequency.for_cadence(tick.cadence);
        let cx = AnalysisContext {
            collaborators: &self.inner.collaborators,
            config: &config,
            optimization_threshold: self.threshold(ActionType::Optimization),
            tick,
        };
        let mut actions = analyzers::run_analyzers(kinds, &cx).await;

        let mut discarded = 0;
        if tick.cadence == Cadence::Continuous {
            let before = actions.len();
            actions.retain(|a| a.priority == Priority::Critical);
            discarded = before - actions.len();
            if discarded > 0 {
                debug!(discarded, "continuous tick drops non-critical actions");
            }
        }

        let pipeline = ActionPipeline {
            collaborators: &self.inner.collaborators,
            ledger: &self.inner.ledger,
        };
        let outcomes = pipeline.process(actions, &config, tick).await;
        TickReport {
            outcomes,
            discarded,
            ..TickReport::empty(tick.cadence)
        }
    }

    async fn recalibrate(&self, tick: &TickContext) -> Result<Vec<ThresholdAdjustment>> {
        let (adjustments, report) = {
            let ledger = lock(&self.inner.ledger);
            lock(&self.inner.thresholds).recalibrate(&ledger, tick.now)
        };
        for a in &adjustments {
            info!(
                threshold = %a.key,
                action_type = %a.action_type,
                from = a.from,
                to = a.to,
                "adaptive threshold adjusted"
            );
        }
        *lock(&self.inner.performance) = Some(report.clone());
        self.inner
            .collaborators
            .store
            .set(
                PERFORMANCE_REPORT_KEY,
                serde_json::to_value(&report)?,
                REPORT_TTL,
            )
            .await?;
        Ok(adjustments)
    }
}

/// Repeating timer for one cadence, first firing at `first` (one period after
/// start); missed firings are skipped.
async fn cadence_timer(
    inner: Weak<Inner>,
    cadence: Cadence,
    first: Instant,
    period: Duration,
    mut cancel: CancelToken,
) {
    let mut interval = tokio::time::interval_at(first, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let engine = ProactiveEngine { inner };
        let token = cancel.clone();
        tokio::spawn(async move { engine.fire(cadence, token).await });
    }
    debug!(%cadence, "cadence timer exited");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{
        AnalystRef, BurnoutAssessment, KeyValueStore, Opportunity, OpportunityCategory,
        RiskLevel, Severity,
    };
    use crate::config::{AnalyzerKind, AutoApplyThresholds};
    use crate::fixture::{FixtureCall, FixtureData, FixtureWorld, RecordingAlerts};
    use crate::store::MemoryStore;
    use crate::types::OutcomeResult;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    struct Harness {
        world: Arc<FixtureWorld>,
        store: Arc<MemoryStore>,
        alerts: Arc<RecordingAlerts>,
        engine: ProactiveEngine,
    }

    fn harness(data: FixtureData, config: ProactiveConfig) -> Harness {
        harness_with_store(data, config, Arc::new(MemoryStore::new()))
    }

    fn harness_with_store(
        data: FixtureData,
        config: ProactiveConfig,
        store: Arc<MemoryStore>,
    ) -> Harness {
        let world = Arc::new(FixtureWorld::new(data));
        let alerts = Arc::new(RecordingAlerts::new());
        let c = world.clone().collaborators(alerts.clone(), store.clone());
        Harness {
            world,
            store,
            alerts,
            engine: ProactiveEngine::new(c, config),
        }
    }

    fn unfair() -> FixtureData {
        FixtureData {
            fairness_score: 0.5,
            ..FixtureData::default()
        }
    }

    const HOUR: Duration = Duration::from_secs(60 * 60);

    #[tokio::test]
    async fn start_without_enable_is_refused() {
        let h = harness(FixtureData::default(), ProactiveConfig::default());
        assert!(matches!(
            h.engine.start().await,
            Err(ProactiveError::NotEnabled)
        ));
        assert_eq!(h.engine.state(), EngineState::Disabled);
    }

    #[tokio::test]
    async fn enable_persists_durable_flag() {
        let h = harness(FixtureData::default(), ProactiveConfig::default());
        h.engine.enable().await.unwrap();
        assert_eq!(h.store.peek(ENABLED_KEY), Some(json!(true)));
        let ttl = h.store.ttl_remaining(ENABLED_KEY).unwrap();
        assert!(ttl > chrono::Duration::days(29));
        h.engine.disable().await.unwrap();
        assert_eq!(h.store.peek(ENABLED_KEY), Some(json!(false)));
    }

    #[tokio::test(start_paused = true)]
    async fn durable_flag_lets_a_fresh_engine_start() {
        let store = Arc::new(MemoryStore::new());
        let first = harness_with_store(FixtureData::default(), ProactiveConfig::default(), store.clone());
        first.engine.enable().await.unwrap();

        let second = harness_with_store(FixtureData::default(), ProactiveConfig::default(), store);
        assert!(!second.engine.is_enabled());
        second.engine.start().await.unwrap();
        assert_eq!(second.engine.state(), EngineState::Running);
        second.engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn double_start_does_not_double_fire() {
        let h = harness(unfair(), ProactiveConfig::default());
        h.engine.enable().await.unwrap();
        h.engine.start().await.unwrap();
        h.engine.start().await.unwrap();

        tokio::time::sleep(HOUR * 3 + Duration::from_secs(10)).await;
        assert_eq!(h.world.call_count(FixtureCall::FairnessReport), 3);
        h.engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn first_firing_waits_one_period() {
        let h = harness(unfair(), ProactiveConfig::default());
        h.engine.enable().await.unwrap();
        h.engine.start().await.unwrap();
        tokio::time::sleep(HOUR - Duration::from_secs(1)).await;
        assert_eq!(h.world.call_count(FixtureCall::FairnessReport), 0);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(h.world.call_count(FixtureCall::FairnessReport), 1);
        h.engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_engine_does_not_tick() {
        let h = harness(unfair(), ProactiveConfig::default());
        h.engine.enable().await.unwrap();
        h.engine.start().await.unwrap();
        h.engine.stop();
        assert_eq!(h.engine.state(), EngineState::Enabled);

        tokio::time::sleep(HOUR * 2).await;
        assert_eq!(h.world.call_count(FixtureCall::FairnessReport), 0);
        assert_eq!(h.world.call_count(FixtureCall::ConstraintChanges), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn disable_stops_a_running_engine() {
        let h = harness(unfair(), ProactiveConfig::default());
        h.engine.enable().await.unwrap();
        h.engine.start().await.unwrap();
        h.engine.disable().await.unwrap();
        assert_eq!(h.engine.state(), EngineState::Disabled);
        tokio::time::sleep(HOUR * 2).await;
        assert_eq!(h.world.call_count(FixtureCall::FairnessReport), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_tick_is_skipped_not_overlapped() {
        let mut config = ProactiveConfig::default();
        config.cadence_periods.continuous_secs = 1;
        config.analysis_frequency.continuous = vec![AnalyzerKind::WorkloadBalance];
        config.analysis_frequency.hourly = vec![];
        config.analysis_frequency.daily = vec![];
        let h = harness(
            FixtureData {
                latency_ms: 5_000,
                ..unfair()
            },
            config,
        );
        h.engine.enable().await.unwrap();
        h.engine.start().await.unwrap();

        // Fires at 1s and keeps firing every second while the first tick
        // sleeps for 5s; every later firing finds the guard held.
        tokio::time::sleep(Duration::from_millis(5_500)).await;
        assert_eq!(h.world.call_count(FixtureCall::FairnessReport), 1);

        let report = h.engine.run_cadence(Cadence::Continuous).await.unwrap();
        assert!(report.skipped);
        h.engine.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_rolls_back_start() {
        let mut config = ProactiveConfig::default();
        config.cadence_periods.weekly_secs = 0;
        let h = harness(unfair(), config);
        h.engine.enable().await.unwrap();
        let err = h.engine.start().await.unwrap_err();
        assert!(matches!(err, ProactiveError::InvalidCadence { ref cadence, .. } if cadence == "weekly"));
        assert_eq!(h.engine.state(), EngineState::Enabled);
        assert!(lock(&h.engine.inner.timers).is_empty());

        // Timers spawned before the failure were cancelled with it.
        tokio::time::sleep(HOUR * 2).await;
        assert_eq!(h.world.call_count(FixtureCall::FairnessReport), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unschedulable_period_rolls_back_start() {
        let mut config = ProactiveConfig::default();
        config.cadence_periods.weekly_secs = u64::MAX;
        let h = harness(unfair(), config);
        h.engine.enable().await.unwrap();
        let err = h.engine.start().await.unwrap_err();
        assert!(matches!(err, ProactiveError::InvalidCadence { ref cadence, .. } if cadence == "weekly"));
        assert_eq!(h.engine.state(), EngineState::Enabled);
        assert!(lock(&h.engine.inner.timers).is_empty());

        tokio::time::sleep(HOUR * 2).await;
        assert_eq!(h.world.call_count(FixtureCall::FairnessReport), 0);
    }

    /// Rejects every write of the performance report, so weekly ticks fail.
    struct ReportRejectingStore {
        inner: MemoryStore,
        report_writes: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueStore for ReportRejectingStore {
        async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration) -> Result<()> {
            if key == PERFORMANCE_REPORT_KEY {
                self.report_writes.fetch_add(1, Ordering::SeqCst);
                return Err(ProactiveError::Store("disk full".into()));
            }
            self.inner.set(key, value, ttl).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_tick_does_not_stop_its_timer() {
        let store = Arc::new(ReportRejectingStore {
            inner: MemoryStore::new(),
            report_writes: AtomicUsize::new(0),
        });
        let mut config = ProactiveConfig::default();
        config.cadence_periods.weekly_secs = 60;
        let world = Arc::new(FixtureWorld::new(FixtureData::default()));
        let c = world.collaborators(Arc::new(RecordingAlerts::new()), store.clone());
        let engine = ProactiveEngine::new(c, config);
        engine.enable().await.unwrap();
        engine.start().await.unwrap();

        tokio::time::sleep(Duration::from_secs(125)).await;
        assert_eq!(store.report_writes.load(Ordering::SeqCst), 2);
        assert_eq!(engine.state(), EngineState::Running);
        engine.stop();
    }

    #[tokio::test]
    async fn failing_analyzer_is_isolated_within_a_tick() {
        let h = harness(
            FixtureData {
                fail: [FixtureCall::Opportunities].into_iter().collect(),
                ..unfair()
            },
            ProactiveConfig::default(),
        );
        let report = h.engine.run_cadence(Cadence::Hourly).await.unwrap();
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].action_type, ActionType::Adjustment);
        assert!(h.engine.status().last_update.is_some());
    }

    #[tokio::test]
    async fn continuous_tick_only_processes_critical_actions() {
        let h = harness(
            FixtureData {
                analysts: vec![AnalystRef {
                    id: "a1".into(),
                    name: "Ada".into(),
                }],
                burnout: vec![BurnoutAssessment {
                    analyst_id: "a1".into(),
                    name: "Ada".into(),
                    risk_level: RiskLevel::High,
                    risk_score: 0.9,
                    recommendations: vec![],
                }],
                ..FixtureData::default()
            },
            ProactiveConfig::default(),
        );
        let report = h.engine.run_cadence(Cadence::Continuous).await.unwrap();
        assert_eq!(report.discarded, 1);
        assert!(report.outcomes.is_empty());
        assert!(h.alerts.alerts().is_empty());
    }

    #[tokio::test]
    async fn continuous_tick_escalates_critical_actions() {
        let opportunity = |severity: Severity, impact: f64| Opportunity {
            kind: "SHIFT_MERGE".into(),
            category: OpportunityCategory::Efficiency,
            severity,
            impact,
            description: format!("{severity:?} merge"),
            suggested_actions: vec![],
            affected_analysts: vec![],
        };
        let mut config = ProactiveConfig::default();
        config.analysis_frequency.continuous = vec![AnalyzerKind::OptimizationOpportunities];
        let h = harness(
            FixtureData {
                opportunities: vec![
                    opportunity(Severity::High, 0.8),
                    opportunity(Severity::Critical, 0.9),
                    // Below the optimization threshold: never becomes an action.
                    opportunity(Severity::Low, 0.1),
                ],
                ..FixtureData::default()
            },
            config,
        );

        let report = h.engine.run_cadence(Cadence::Continuous).await.unwrap();
        assert_eq!(report.discarded, 1);
        assert_eq!(report.outcomes.len(), 1);
        assert!(!report.outcomes[0].applied);
        assert_eq!(report.outcomes[0].result, OutcomeResult::Failure);

        let alerts = h.alerts.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Priority::Critical);
        assert_eq!(h.engine.history(ActionType::Optimization).len(), 1);
    }

    #[tokio::test]
    async fn weekly_tick_raises_threshold_for_failing_type() {
        let h = harness(unfair(), ProactiveConfig::default());
        // Workload balance escalates every time (confidence 0.8 < 0.85).
        for _ in 0..6 {
            h.engine.run_cadence(Cadence::Hourly).await.unwrap();
        }
        assert!(h
            .engine
            .history(ActionType::Adjustment)
            .iter()
            .all(|o| o.result == OutcomeResult::Failure));

        let report = h.engine.run_cadence(Cadence::Weekly).await.unwrap();
        assert_eq!(report.adjustments.len(), 1);
        assert!((h.engine.threshold(ActionType::Adjustment) - 0.8).abs() < 1e-9);

        let stored = h.store.get(PERFORMANCE_REPORT_KEY).await.unwrap().unwrap();
        assert_eq!(stored["by_type"]["ADJUSTMENT"]["samples"], 6);
        assert!(h.engine.status().performance_snapshot.is_some());
    }

    #[tokio::test]
    async fn update_config_persists_and_rejects_invalid() {
        let h = harness(FixtureData::default(), ProactiveConfig::default());
        let patch = ConfigPatch {
            auto_apply_thresholds: Some(AutoApplyThresholds {
                min_confidence: 0.6,
                ..AutoApplyThresholds::default()
            }),
            ..ConfigPatch::default()
        };
        let cfg = h.engine.update_config(patch).await.unwrap();
        assert_eq!(cfg.auto_apply_thresholds.min_confidence, 0.6);
        let stored = h.store.peek(CONFIG_KEY).unwrap();
        assert_eq!(stored["auto_apply_thresholds"]["min_confidence"], 0.6);

        let bad = ConfigPatch {
            auto_apply_thresholds: Some(AutoApplyThresholds {
                min_confidence: 2.0,
                ..AutoApplyThresholds::default()
            }),
            ..ConfigPatch::default()
        };
        assert!(matches!(
            h.engine.update_config(bad).await,
            Err(ProactiveError::InvalidConfig(_))
        ));
        assert_eq!(h.engine.config().auto_apply_thresholds.min_confidence, 0.6);
    }

    #[tokio::test(start_paused = true)]
    async fn start_loads_durable_config() {
        let store = Arc::new(MemoryStore::new());
        let mut durable = ProactiveConfig::default();
        durable.enabled_analysis.set(AnalyzerKind::BurnoutRisk, false);
        store
            .set(CONFIG_KEY, serde_json::to_value(&durable).unwrap(), DURABLE_TTL)
            .await
            .unwrap();
        let h = harness_with_store(FixtureData::default(), ProactiveConfig::default(), store);
        h.engine.enable().await.unwrap();
        h.engine.start().await.unwrap();
        assert!(!h
            .engine
            .config()
            .enabled_analysis
            .is_enabled(AnalyzerKind::BurnoutRisk));
        h.engine.stop();
    }

    #[tokio::test]
    async fn restore_adopts_durable_report_thresholds() {
        let store = Arc::new(MemoryStore::new());
        let first = harness_with_store(unfair(), ProactiveConfig::default(), store.clone());
        for _ in 0..5 {
            first.engine.run_cadence(Cadence::Hourly).await.unwrap();
        }
        first.engine.run_cadence(Cadence::Weekly).await.unwrap();
        first.engine.enable().await.unwrap();

        let second = harness_with_store(FixtureData::default(), ProactiveConfig::default(), store);
        second.engine.restore().await;
        assert_eq!(second.engine.state(), EngineState::Enabled);
        assert!((second.engine.threshold(ActionType::Adjustment) - 0.8).abs() < 1e-9);
        assert!(second.engine.status().performance_snapshot.is_some());
    }

    #[tokio::test]
    async fn status_reports_ledger_and_thresholds() {
        let h = harness(unfair(), ProactiveConfig::default());
        h.engine.run_cadence(Cadence::Hourly).await.unwrap();
        let status = h.engine.status();
        assert_eq!(status.state, EngineState::Disabled);
        assert!(!status.is_running);
        assert_eq!(status.ledger_sizes[&ActionType::Adjustment], 1);
        assert_eq!(status.adaptive_thresholds["fairness_score"], 0.7);
    }
}

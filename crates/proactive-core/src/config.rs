use crate::cadence::Cadence;
use crate::error::{ProactiveError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// AnalyzerKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    ConflictPrediction,
    BurnoutRisk,
    WorkloadBalance,
    FairnessOpportunities,
    OptimizationOpportunities,
}

impl AnalyzerKind {
    pub const ALL: [AnalyzerKind; 5] = [
        AnalyzerKind::ConflictPrediction,
        AnalyzerKind::BurnoutRisk,
        AnalyzerKind::WorkloadBalance,
        AnalyzerKind::FairnessOpportunities,
        AnalyzerKind::OptimizationOpportunities,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnalyzerKind::ConflictPrediction => "conflict_prediction",
            AnalyzerKind::BurnoutRisk => "burnout_risk",
            AnalyzerKind::WorkloadBalance => "workload_balance",
            AnalyzerKind::FairnessOpportunities => "fairness_opportunities",
            AnalyzerKind::OptimizationOpportunities => "optimization_opportunities",
        }
    }
}

impl std::fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnalyzerKind {
    type Err = ProactiveError;
    fn from_str(s: &str) -> Result<Self> {
        AnalyzerKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                ProactiveError::InvalidConfig(format!(
                    "unknown analyzer '{s}': must be one of {}",
                    AnalyzerKind::ALL.map(|k| k.as_str()).join(", ")
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// EnabledAnalysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnabledAnalysis {
    #[serde(default = "default_true")]
    pub conflict_prediction: bool,
    #[serde(default = "default_true")]
    pub burnout_risk: bool,
    #[serde(default = "default_true")]
    pub workload_balance: bool,
    #[serde(default = "default_true")]
    pub fairness_opportunities: bool,
    #[serde(default = "default_true")]
    pub optimization_opportunities: bool,
}

fn default_true() -> bool {
    true
}

impl Default for EnabledAnalysis {
    fn default() -> Self {
        Self {
            conflict_prediction: true,
            burnout_risk: true,
            workload_balance: true,
            fairness_opportunities: true,
            optimization_opportunities: true,
        }
    }
}

impl EnabledAnalysis {
    pub fn is_enabled(&self, kind: AnalyzerKind) -> bool {
        match kind {
            AnalyzerKind::ConflictPrediction => self.conflict_prediction,
            AnalyzerKind::BurnoutRisk => self.burnout_risk,
            AnalyzerKind::WorkloadBalance => self.workload_balance,
            AnalyzerKind::FairnessOpportunities => self.fairness_opportunities,
            AnalyzerKind::OptimizationOpportunities => self.optimization_opportunities,
        }
    }

    pub fn set(&mut self, kind: AnalyzerKind, enabled: bool) {
        let flag = match kind {
            AnalyzerKind::ConflictPrediction => &mut self.conflict_prediction,
            AnalyzerKind::BurnoutRisk => &mut self.burnout_risk,
            AnalyzerKind::WorkloadBalance => &mut self.workload_balance,
            AnalyzerKind::FairnessOpportunities => &mut self.fairness_opportunities,
            AnalyzerKind::OptimizationOpportunities => &mut self.optimization_opportunities,
        };
        *flag = enabled;
    }
}

// ---------------------------------------------------------------------------
// AutoApplyThresholds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoApplyThresholds {
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    #[serde(default = "default_max_risk")]
    pub max_risk: f64,
    /// Suggested-action / opportunity types that never auto-apply.
    #[serde(default = "default_require_human_approval")]
    pub require_human_approval: BTreeSet<String>,
}

fn default_min_confidence() -> f64 {
    0.85
}

fn default_max_risk() -> f64 {
    0.3
}

fn default_require_human_approval() -> BTreeSet<String> {
    ["WORKLOAD_REDUCTION", "ANALYST_REASSIGNMENT", "CONSTRAINT_CHANGE"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

impl Default for AutoApplyThresholds {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            max_risk: default_max_risk(),
            require_human_approval: default_require_human_approval(),
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisFrequency
// ---------------------------------------------------------------------------

/// Which analyzers run on which cadence. The weekly cadence runs none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFrequency {
    #[serde(default = "default_continuous")]
    pub continuous: Vec<AnalyzerKind>,
    #[serde(default = "default_hourly")]
    pub hourly: Vec<AnalyzerKind>,
    #[serde(default = "default_daily")]
    pub daily: Vec<AnalyzerKind>,
}

fn default_continuous() -> Vec<AnalyzerKind> {
    vec![AnalyzerKind::ConflictPrediction, AnalyzerKind::BurnoutRisk]
}

fn default_hourly() -> Vec<AnalyzerKind> {
    vec![
        AnalyzerKind::WorkloadBalance,
        AnalyzerKind::FairnessOpportunities,
    ]
}

fn default_daily() -> Vec<AnalyzerKind> {
    vec![AnalyzerKind::OptimizationOpportunities]
}

impl Default for AnalysisFrequency {
    fn default() -> Self {
        Self {
            continuous: default_continuous(),
            hourly: default_hourly(),
            daily: default_daily(),
        }
    }
}

impl AnalysisFrequency {
    pub fn for_cadence(&self, cadence: Cadence) -> &[AnalyzerKind] {
        match cadence {
            Cadence::Continuous => &self.continuous,
            Cadence::Hourly => &self.hourly,
            Cadence::Daily => &self.daily,
            Cadence::Weekly => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// CadencePeriods
// ---------------------------------------------------------------------------

/// Longest period a cadence may be configured with (one year).
pub const MAX_CADENCE_PERIOD: Duration = Duration::from_secs(366 * 24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CadencePeriods {
    #[serde(default = "default_continuous_secs")]
    pub continuous_secs: u64,
    #[serde(default = "default_hourly_secs")]
    pub hourly_secs: u64,
    #[serde(default = "default_daily_secs")]
    pub daily_secs: u64,
    #[serde(default = "default_weekly_secs")]
    pub weekly_secs: u64,
}

fn default_continuous_secs() -> u64 {
    30
}

fn default_hourly_secs() -> u64 {
    60 * 60
}

fn default_daily_secs() -> u64 {
    24 * 60 * 60
}

fn default_weekly_secs() -> u64 {
    7 * 24 * 60 * 60
}

impl Default for CadencePeriods {
    fn default() -> Self {
        Self {
            continuous_secs: default_continuous_secs(),
            hourly_secs: default_hourly_secs(),
            daily_secs: default_daily_secs(),
            weekly_secs: default_weekly_secs(),
        }
    }
}

impl CadencePeriods {
    pub fn period(&self, cadence: Cadence) -> Duration {
        let secs = match cadence {
            Cadence::Continuous => self.continuous_secs,
            Cadence::Hourly => self.hourly_secs,
            Cadence::Daily => self.daily_secs,
            Cadence::Weekly => self.weekly_secs,
        };
        Duration::from_secs(secs)
    }
}

// ---------------------------------------------------------------------------
// ProactiveConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProactiveConfig {
    #[serde(default)]
    pub enabled_analysis: EnabledAnalysis,
    #[serde(default)]
    pub auto_apply_thresholds: AutoApplyThresholds,
    #[serde(default)]
    pub analysis_frequency: AnalysisFrequency,
    #[serde(default)]
    pub cadence_periods: CadencePeriods,
}

impl ProactiveConfig {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(ProactiveError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: ProactiveConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let t = &self.auto_apply_thresholds;

        if !(0.0..=1.0).contains(&t.min_confidence) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "auto_apply_thresholds.min_confidence {} is outside [0, 1]",
                    t.min_confidence
                ),
            });
        }
        if !(0.0..=1.0).contains(&t.max_risk) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "auto_apply_thresholds.max_risk {} is outside [0, 1]",
                    t.max_risk
                ),
            });
        }

        for cadence in Cadence::ALL {
            let period = self.cadence_periods.period(cadence);
            if period.is_zero() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("cadence_periods: {cadence} period must be non-zero"),
                });
            } else if period > MAX_CADENCE_PERIOD {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!(
                        "cadence_periods: {cadence} period {}s exceeds the {}s maximum",
                        period.as_secs(),
                        MAX_CADENCE_PERIOD.as_secs()
                    ),
                });
            }
            for kind in self.analysis_frequency.for_cadence(cadence) {
                if !self.enabled_analysis.is_enabled(*kind) {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: format!(
                            "analyzer '{kind}' is scheduled on the {cadence} cadence but disabled"
                        ),
                    });
                }
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// ConfigPatch
// ---------------------------------------------------------------------------

/// A partial update. Each present field replaces the matching section of the
/// current snapshot; absent fields carry over.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_analysis: Option<EnabledAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_apply_thresholds: Option<AutoApplyThresholds>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_frequency: Option<AnalysisFrequency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence_periods: Option<CadencePeriods>,
}

impl ConfigPatch {
    pub fn apply(&self, base: &ProactiveConfig) -> ProactiveConfig {
        ProactiveConfig {
            enabled_analysis: self
                .enabled_analysis
                .clone()
                .unwrap_or_else(|| base.enabled_analysis.clone()),
            auto_apply_thresholds: self
                .auto_apply_thresholds
                .clone()
                .unwrap_or_else(|| base.auto_apply_thresholds.clone()),
            analysis_frequency: self
                .analysis_frequency
                .clone()
                .unwrap_or_else(|| base.analysis_frequency.clone()),
            cadence_periods: self
                .cadence_periods
                .clone()
                .unwrap_or_else(|| base.cadence_periods.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

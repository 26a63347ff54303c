//! Adaptive thresholds tuned from recorded outcomes.
//!
//! Once a week each action type with enough recent history nudges its
//! threshold: a type that keeps succeeding with real impact gets a lower bar,
//! a type that keeps failing gets a higher one. Every value stays inside
//! [`MIN_THRESHOLD`, `MAX_THRESHOLD`].

use crate::ledger::OutcomeLedger;
use crate::types::{ActionType, OutcomeResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const OPTIMIZATION_IMPACT: &str = "optimization_impact";
pub const BURNOUT_RISK: &str = "burnout_risk";
pub const FAIRNESS_SCORE: &str = "fairness_score";
pub const CONFLICT_PROBABILITY: &str = "conflict_probability";

pub const DEFAULT_THRESHOLDS: [(&str, f64); 4] = [
    (OPTIMIZATION_IMPACT, 0.3),
    (BURNOUT_RISK, 0.7),
    (FAIRNESS_SCORE, 0.7),
    (CONFLICT_PROBABILITY, 0.6),
];

pub const MIN_THRESHOLD: f64 = 0.1;
pub const MAX_THRESHOLD: f64 = 0.9;

/// Trailing window considered by a recalibration.
pub const WINDOW_DAYS: i64 = 7;
/// Types with fewer recent outcomes than this are left alone.
pub const MIN_SAMPLES: usize = 5;

const LOWER_STEP: f64 = 0.05;
const RAISE_STEP: f64 = 0.1;

// ---------------------------------------------------------------------------
// AdaptiveThresholds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdaptiveThresholds {
    values: BTreeMap<String, f64>,
}

impl Default for AdaptiveThresholds {
    fn default() -> Self {
        Self {
            values: DEFAULT_THRESHOLDS
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }
}

impl AdaptiveThresholds {
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn for_type(&self, action_type: ActionType) -> f64 {
        let key = action_type.threshold_key();
        self.get(key).unwrap_or_else(|| default_for(key))
    }

    /// Store `value` under `key`, clamped into range. Returns the stored value.
    pub fn set(&mut self, key: &str, value: f64) -> f64 {
        let clamped = value.clamp(MIN_THRESHOLD, MAX_THRESHOLD);
        self.values.insert(key.to_string(), clamped);
        clamped
    }

    /// Adopt recorded values for known keys. Unknown keys are ignored.
    pub fn merge(&mut self, values: &BTreeMap<String, f64>) {
        for (key, value) in values {
            if self.values.contains_key(key) {
                self.set(key, *value);
            }
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        self.values.clone()
    }

    /// Recompute every threshold from the ledger's trailing window.
    ///
    /// Returns the changes that were made and the report describing the
    /// window. Types below [`MIN_SAMPLES`] still appear in the report but keep
    /// their threshold.
    pub fn recalibrate(
        &mut self,
        ledger: &OutcomeLedger,
        now: DateTime<Utc>,
    ) -> (Vec<ThresholdAdjustment>, PerformanceReport) {
        let cutoff = now - Duration::days(WINDOW_DAYS);
        let mut adjustments = Vec::new();
        let mut by_type = BTreeMap::new();

        for action_type in ledger.types() {
            let recent = ledger.since(action_type, cutoff);
            let stats = TypeStats::from_outcomes(&recent);
            by_type.insert(action_type, stats);

            if stats.samples < MIN_SAMPLES {
                continue;
            }

            let key = action_type.threshold_key();
            let current = self.for_type(action_type);
            let next = if stats.success_rate > 0.8 && stats.average_impact > 0.1 {
                (current - LOWER_STEP).max(MIN_THRESHOLD)
            } else if stats.success_rate < 0.5 {
                (current + RAISE_STEP).min(MAX_THRESHOLD)
            } else {
                continue;
            };

            let stored = self.set(key, next);
            if (stored - current).abs() > f64::EPSILON {
                adjustments.push(ThresholdAdjustment {
                    key: key.to_string(),
                    action_type,
                    from: current,
                    to: stored,
                });
            }
        }

        let report = PerformanceReport {
            generated_at: now,
            by_type,
            thresholds: self.snapshot(),
        };
        (adjustments, report)
    }
}

fn default_for(key: &str) -> f64 {
    DEFAULT_THRESHOLDS
        .iter()
        .find(|(k, _)| *k == key)
        .map_or(0.5, |(_, v)| *v)
}

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdAdjustment {
    pub key: String,
    pub action_type: ActionType,
    pub from: f64,
    pub to: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TypeStats {
    pub success_rate: f64,
    pub average_impact: f64,
    pub samples: usize,
}

impl TypeStats {
    fn from_outcomes(outcomes: &[&crate::types::DecisionOutcome]) -> Self {
        let samples = outcomes.len();
        if samples == 0 {
            return Self {
                success_rate: 0.0,
                average_impact: 0.0,
                samples,
            };
        }
        let n = samples as f64;
        let successes = outcomes
            .iter()
            .filter(|o| o.result == OutcomeResult::Success)
            .count() as f64;
        let impact: f64 = outcomes
            .iter()
            .map(|o| o.impact.efficiency_improvement)
            .sum();
        Self {
            success_rate: successes / n,
            average_impact: impact / n,
            samples,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub generated_at: DateTime<Utc>,
    pub by_type: BTreeMap<ActionType, TypeStats>,
    pub thresholds: BTreeMap<String, f64>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

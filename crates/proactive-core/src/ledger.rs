use crate::types::{ActionType, DecisionOutcome};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Per-type history cap. The oldest outcome is evicted first.
pub const LEDGER_CAPACITY: usize = 100;

/// Bounded, append-only outcome history keyed by action type.
#[derive(Debug, Default, Clone)]
pub struct OutcomeLedger {
    by_type: HashMap<ActionType, VecDeque<DecisionOutcome>>,
}

impl OutcomeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, outcome: DecisionOutcome) {
        let history = self.by_type.entry(outcome.action_type).or_default();
        history.push_back(outcome);
        while history.len() > LEDGER_CAPACITY {
            history.pop_front();
        }
    }

    pub fn history(&self, action_type: ActionType) -> impl Iterator<Item = &DecisionOutcome> {
        self.by_type.get(&action_type).into_iter().flatten()
    }

    pub fn len(&self, action_type: ActionType) -> usize {
        self.by_type.get(&action_type).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.values().all(VecDeque::is_empty)
    }

    /// Outcomes of `action_type` recorded at or after `cutoff`.
    pub fn since(&self, action_type: ActionType, cutoff: DateTime<Utc>) -> Vec<&DecisionOutcome> {
        self.history(action_type)
            .filter(|o| o.timestamp >= cutoff)
            .collect()
    }

    /// History length per type, for status output. Types never seen are omitted.
    pub fn sizes(&self) -> BTreeMap<ActionType, usize> {
        self.by_type
            .iter()
            .filter(|(_, h)| !h.is_empty())
            .map(|(t, h)| (*t, h.len()))
            .collect()
    }

    /// Types with at least one recorded outcome, in a stable order.
    pub fn types(&self) -> Vec<ActionType> {
        ActionType::ALL
            .into_iter()
            .filter(|t| self.len(*t) > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Impact, OutcomeResult};
    use chrono::Duration;
    use uuid::Uuid;

    fn outcome(action_type: ActionType, at: DateTime<Utc>) -> DecisionOutcome {
        DecisionOutcome {
            action_id: Uuid::new_v4(),
            action_type,
            applied: true,
            result: OutcomeResult::Success,
            impact: Impact::default(),
            feedback: None,
            timestamp: at,
        }
    }

    #[test]
    fn hundred_and_first_append_evicts_oldest() {
        let mut ledger = OutcomeLedger::new();
        let now = Utc::now();
        let first = outcome(ActionType::Adjustment, now);
        let first_id = first.action_id;
        ledger.append(first);
        for _ in 0..LEDGER_CAPACITY {
            ledger.append(outcome(ActionType::Adjustment, now));
        }
        assert_eq!(ledger.len(ActionType::Adjustment), LEDGER_CAPACITY);
        assert!(ledger
            .history(ActionType::Adjustment)
            .all(|o| o.action_id != first_id));
    }

    #[test]
    fn types_are_capped_independently() {
        let mut ledger = OutcomeLedger::new();
        let now = Utc::now();
        for _ in 0..150 {
            ledger.append(outcome(ActionType::Alert, now));
        }
        ledger.append(outcome(ActionType::Prediction, now));
        let sizes = ledger.sizes();
        assert_eq!(sizes[&ActionType::Alert], LEDGER_CAPACITY);
        assert_eq!(sizes[&ActionType::Prediction], 1);
        assert!(!sizes.contains_key(&ActionType::Optimization));
    }

    #[test]
    fn since_filters_by_timestamp() {
        let mut ledger = OutcomeLedger::new();
        let now = Utc::now();
        ledger.append(outcome(ActionType::Optimization, now - Duration::days(10)));
        ledger.append(outcome(ActionType::Optimization, now - Duration::days(2)));
        ledger.append(outcome(ActionType::Optimization, now));
        let recent = ledger.since(ActionType::Optimization, now - Duration::days(7));
        assert_eq!(recent.len(), 2);
    }

    #[test]
    fn empty_ledger_reports_nothing() {
        let ledger = OutcomeLedger::new();
        assert!(ledger.is_empty());
        assert!(ledger.types().is_empty());
        assert_eq!(ledger.history(ActionType::Alert).count(), 0);
    }
}

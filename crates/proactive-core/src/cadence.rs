//! Cadences, per-cadence re-entrancy guards, and the cooperative
//! cancellation token handed to every tick.

use crate::error::{ProactiveError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

// ---------------------------------------------------------------------------
// Cadence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cadence {
    Continuous,
    Hourly,
    Daily,
    Weekly,
}

impl Cadence {
    pub const ALL: [Cadence; 4] = [
        Cadence::Continuous,
        Cadence::Hourly,
        Cadence::Daily,
        Cadence::Weekly,
    ];

    fn index(self) -> usize {
        match self {
            Cadence::Continuous => 0,
            Cadence::Hourly => 1,
            Cadence::Daily => 2,
            Cadence::Weekly => 3,
        }
    }
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Cadence::Continuous => "continuous",
            Cadence::Hourly => "hourly",
            Cadence::Daily => "daily",
            Cadence::Weekly => "weekly",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for Cadence {
    type Err = ProactiveError;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "continuous" => Ok(Cadence::Continuous),
            "hourly" => Ok(Cadence::Hourly),
            "daily" => Ok(Cadence::Daily),
            "weekly" => Ok(Cadence::Weekly),
            _ => Err(ProactiveError::UnknownCadence(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// In-progress guards
// ---------------------------------------------------------------------------

/// One "already processing" flag per cadence.
#[derive(Debug, Default)]
pub struct CadenceGuards {
    flags: [AtomicBool; 4],
}

impl CadenceGuards {
    /// Claim the cadence. Returns `None` if a tick of the same cadence is
    /// still running; the flag is released when the returned guard drops.
    pub fn try_enter(&self, cadence: Cadence) -> Option<InFlight<'_>> {
        let flag = &self.flags[cadence.index()];
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight { flag })
    }

    pub fn is_busy(&self, cadence: Cadence) -> bool {
        self.flags[cadence.index()].load(Ordering::Acquire)
    }
}

pub struct InFlight<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Owner side of a cancellation token. Cancelling never waits for holders.
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A token that is never cancelled, for on-demand ticks.
    pub fn never() -> Self {
        CancelSource::new().token()
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the source is cancelled. Pends forever if the source is
    /// dropped without cancelling.
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// TickContext
// ---------------------------------------------------------------------------

/// Per-tick context passed through analyzers and effectors.
#[derive(Debug, Clone)]
pub struct TickContext {
    pub cadence: Cadence,
    pub now: DateTime<Utc>,
    pub cancel: CancelToken,
}

impl TickContext {
    pub fn new(cadence: Cadence, cancel: CancelToken) -> Self {
        Self {
            cadence,
            now: Utc::now(),
            cancel,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cadence_parse_and_display_agree() {
        for c in Cadence::ALL {
            assert_eq!(c.to_string().parse::<Cadence>().unwrap(), c);
        }
        assert!(matches!(
            "monthly".parse::<Cadence>(),
            Err(ProactiveError::UnknownCadence(_))
        ));
    }

    #[test]
    fn guard_blocks_reentry_until_dropped() {
        let guards = CadenceGuards::default();
        let first = guards.try_enter(Cadence::Hourly);
        assert!(first.is_some());
        assert!(guards.try_enter(Cadence::Hourly).is_none());
        // Other cadences are independent.
        assert!(guards.try_enter(Cadence::Daily).is_some());
        drop(first);
        assert!(!guards.is_busy(Cadence::Hourly));
        assert!(guards.try_enter(Cadence::Hourly).is_some());
    }

    #[test]
    fn cancel_is_visible_to_existing_tokens() {
        let source = CancelSource::new();
        let token = source.token();
        assert!(!token.is_cancelled());
        source.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_future_resolves_after_cancel() {
        let source = CancelSource::new();
        let mut token = source.token();
        let waiter = tokio::spawn(async move { token.cancelled().await });
        source.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("cancelled() did not resolve")
            .unwrap();
    }

    #[test]
    fn never_token_is_not_cancelled() {
        assert!(!CancelToken::never().is_cancelled());
    }
}

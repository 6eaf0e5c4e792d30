//! Mutual exclusion between the poller and the manual analysis trigger.
//!
//! The guard is an explicit state machine:
//!
//! ```text
//! Idle ──try_acquire──▶ Analyzing ──lease dropped──▶ CoolingDown{until} ──now ≥ until──▶ Idle
//! ```
//!
//! Only the analysis trigger leaves `Idle`. The poller never transitions the
//! guard; it only asks whether it is `Idle` and, if so, writes while holding
//! the guard's lock so an analysis cannot start halfway through the write.
//!
//! Every acquisition also bumps an epoch. A poll records the epoch when it
//! starts fetching and applies only if it is unchanged, so data fetched
//! before an analysis never lands after that analysis's cooldown.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Current state of the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardPhase {
    Idle,
    Analyzing,
    CoolingDown { until: Instant },
}

impl GuardPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Collapse an expired cooldown into `Idle`.
    fn settle(self, now: Instant) -> Self {
        match self {
            Self::CoolingDown { until } if now >= until => Self::Idle,
            other => other,
        }
    }
}

impl fmt::Display for GuardPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Analyzing => f.write_str("analyzing"),
            Self::CoolingDown { .. } => f.write_str("cooling down"),
        }
    }
}

/// Single-writer lock guarding `DashboardState` replacement.
#[derive(Debug)]
pub struct ConcurrencyGuard {
    phase: Mutex<GuardPhase>,
    /// Analyses started so far. Only written with `phase` locked.
    epoch: AtomicU64,
    cooldown: Duration,
}

impl ConcurrencyGuard {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            phase: Mutex::new(GuardPhase::Idle),
            epoch: AtomicU64::new(0),
            cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Lock and settle any expired cooldown.
    fn lock(&self) -> MutexGuard<'_, GuardPhase> {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        *phase = phase.settle(Instant::now());
        phase
    }

    pub fn phase(&self) -> GuardPhase {
        *self.lock()
    }

    pub fn is_idle(&self) -> bool {
        self.phase().is_idle()
    }

    /// `Idle → Analyzing`. Fails with the current phase otherwise.
    ///
    /// The returned lease moves the guard to `CoolingDown` when dropped,
    /// whether the analysis succeeded, failed, or its future was cancelled.
    pub fn try_acquire(&self) -> Result<AnalysisLease<'_>, GuardPhase> {
        let mut phase = self.lock();
        if !phase.is_idle() {
            return Err(*phase);
        }
        *phase = GuardPhase::Analyzing;
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(epoch, "Guard acquired for analysis");
        Ok(AnalysisLease { guard: self })
    }

    /// The current epoch if the guard is `Idle`, the blocking phase otherwise.
    pub fn idle_epoch(&self) -> Result<u64, GuardPhase> {
        let phase = self.lock();
        if !phase.is_idle() {
            return Err(*phase);
        }
        Ok(self.epoch.load(Ordering::SeqCst))
    }

    /// Run `f` only if the guard is `Idle` and no analysis has started since
    /// `epoch`, holding the guard lock throughout.
    pub fn when_idle_since<R>(&self, epoch: u64, f: impl FnOnce() -> R) -> Option<R> {
        let phase = self.lock();
        if !phase.is_idle() || self.epoch.load(Ordering::SeqCst) != epoch {
            return None;
        }
        let out = f();
        drop(phase);
        Some(out)
    }

    fn finish_analysis(&self) {
        let mut phase = self.lock();
        let until = Instant::now() + self.cooldown;
        *phase = GuardPhase::CoolingDown { until };
        tracing::debug!(cooldown_ms = self.cooldown.as_millis(), "Guard cooling down");
    }
}

/// Proof that the holder owns the guard in the `Analyzing` phase.
#[must_use = "dropping the lease immediately ends the analysis phase"]
#[derive(Debug)]
pub struct AnalysisLease<'a> {
    guard: &'a ConcurrencyGuard,
}

impl Drop for AnalysisLease<'_> {
    fn drop(&mut self) {
        self.guard.finish_analysis();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn full_cycle_returns_to_idle() {
        let guard = ConcurrencyGuard::new(Duration::from_secs(5));
        assert_eq!(guard.phase(), GuardPhase::Idle);

        let lease = guard.try_acquire().unwrap();
        assert_eq!(guard.phase(), GuardPhase::Analyzing);

        drop(lease);
        assert!(matches!(guard.phase(), GuardPhase::CoolingDown { .. }));

        tokio::time::advance(Duration::from_millis(4_999)).await;
        assert!(!guard.is_idle());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(guard.is_idle());
    }

    #[tokio::test(start_paused = true)]
    async fn second_acquire_is_rejected() {
        let guard = ConcurrencyGuard::new(Duration::from_secs(5));
        let _lease = guard.try_acquire().unwrap();
        assert_eq!(guard.try_acquire().unwrap_err(), GuardPhase::Analyzing);
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_rejected_while_cooling_down() {
        let guard = ConcurrencyGuard::new(Duration::from_secs(5));
        drop(guard.try_acquire().unwrap());
        let err = guard.try_acquire().unwrap_err();
        assert!(matches!(err, GuardPhase::CoolingDown { .. }));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(guard.try_acquire().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn when_idle_since_only_runs_when_idle() {
        let guard = ConcurrencyGuard::new(Duration::from_secs(5));
        assert_eq!(guard.when_idle_since(0, || 1), Some(1));

        let lease = guard.try_acquire().unwrap();
        assert_eq!(guard.idle_epoch(), Err(GuardPhase::Analyzing));
        assert_eq!(guard.when_idle_since(1, || 2), None);
        drop(lease);
        assert_eq!(guard.when_idle_since(1, || 3), None);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(guard.idle_epoch(), Ok(1));
        assert_eq!(guard.when_idle_since(1, || 4), Some(4));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_epoch_is_refused_after_cooldown() {
        let guard = ConcurrencyGuard::new(Duration::from_secs(5));
        let before = guard.idle_epoch().unwrap();

        drop(guard.try_acquire().unwrap());
        tokio::time::advance(Duration::from_secs(5)).await;

        assert!(guard.is_idle());
        assert_eq!(guard.when_idle_since(before, || ()), None);
    }

    #[test]
    fn phase_display() {
        assert_eq!(GuardPhase::Idle.to_string(), "idle");
        assert_eq!(GuardPhase::Analyzing.to_string(), "analyzing");
    }
}

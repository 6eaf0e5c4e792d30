//! Periodic refresh loop.
//!
//! Spawns one tokio task that runs a poll cycle on every tick of a fixed
//! interval. Cycles run inline in the loop, so they never overlap; ticks
//! missed while a cycle is outstanding are skipped rather than queued.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::engine::CycleOutcome;
use crate::source::DashboardSource;
use crate::SyncEngine;

/// Handle to a running poller.
pub struct PollerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop scheduling new cycles.
    ///
    /// A fetch already in flight is allowed to finish, but its result is
    /// discarded instead of applied.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Stop and wait for the loop to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Poller task panicked");
        }
    }
}

impl<S: DashboardSource> SyncEngine<S> {
    /// Start polling every `period`. The first cycle runs immediately.
    pub fn start_polling(&self, period: Duration) -> PollerHandle {
        let cancel = CancellationToken::new();
        let engine = self.clone();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            run_poll_loop(engine, period, token).await;
        });

        tracing::info!(interval_ms = period.as_millis(), "Poller started");
        PollerHandle { cancel, task }
    }
}

async fn run_poll_loop<S: DashboardSource>(
    engine: SyncEngine<S>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        // Not raced against `cancel`: stopping must not abort an in-flight fetch.
        match engine.poll_cycle(&cancel).await {
            CycleOutcome::Discarded if cancel.is_cancelled() => break,
            _ => {}
        }
    }

    tracing::info!("Poller stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::error::RequestError;
    use crate::source::{AgentsResponse, AnalysisResponse, CommsResponse, PatternDetection};
    use sanket_core::types::DashboardStats;
    use sanket_core::SyncConfig;

    /// Counts agent fetches; each one takes `delay` of (virtual) time.
    struct SlowSource {
        fetches: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl DashboardSource for SlowSource {
        async fn agents(&self) -> Result<AgentsResponse, RequestError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(AgentsResponse::default())
        }
        async fn quantum_insights(&self) -> Result<PatternDetection, RequestError> {
            Ok(PatternDetection::default())
        }
        async fn dashboard_stats(&self) -> Result<DashboardStats, RequestError> {
            Ok(DashboardStats::default())
        }
        async fn communications(&self, _limit: u32) -> Result<CommsResponse, RequestError> {
            Ok(CommsResponse::default())
        }
        async fn analyze(&self) -> Result<AnalysisResponse, RequestError> {
            Ok(AnalysisResponse::default())
        }
    }

    fn engine(delay: Duration) -> (SyncEngine<SlowSource>, Arc<AtomicUsize>) {
        let fetches = Arc::new(AtomicUsize::new(0));
        let source = SlowSource {
            fetches: fetches.clone(),
            delay,
        };
        (SyncEngine::new(source, &SyncConfig::default()), fetches)
    }

    #[tokio::test(start_paused = true)]
    async fn first_cycle_runs_immediately_then_on_interval() {
        let (engine, fetches) = engine(Duration::ZERO);
        let handle = engine.start_polling(Duration::from_secs(15));

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert!(engine.snapshot().synced_at.is_some());

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn slow_cycles_never_overlap() {
        // Each fetch outlasts two ticks.
        let (engine, fetches) = engine(Duration::from_secs(25));
        let handle = engine.start_polling(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        // Still inside the first fetch: no second fetch may have started.
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        // First fetch done at 25s; the missed ticks collapse into one more fetch.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 2);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_discards_in_flight_result() {
        let (engine, fetches) = engine(Duration::from_secs(5));
        let handle = engine.start_polling(Duration::from_secs(15));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fetches.load(Ordering::SeqCst), 1);

        handle.stop();
        assert!(handle.is_stopped());
        handle.shutdown().await;

        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert!(engine.snapshot().synced_at.is_none());
    }
}

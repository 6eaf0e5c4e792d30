//! The sync engine: one handle over the store, ledger, guard and source.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use sanket_core::types::DashboardState;
use sanket_core::SyncConfig;

use crate::aggregator;
use crate::error::Endpoint;
use crate::guard::{ConcurrencyGuard, GuardPhase};
use crate::ledger::DispatchLedger;
use crate::source::DashboardSource;
use crate::store::SnapshotStore;

/// What a single poll cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A fresh state replaced the previous one.
    Applied { alerts: usize },
    /// The guard was not idle; nothing was fetched.
    SkippedGuardBusy,
    /// A read source failed; the previous state was kept.
    Failed { endpoint: Endpoint },
    /// The fetch succeeded but the poller was stopped, or an analysis began
    /// after the fetch started.
    Discarded,
}

struct EngineInner<S> {
    source: S,
    store: SnapshotStore,
    ledger: DispatchLedger,
    guard: ConcurrencyGuard,
    /// Held for a whole cycle so cycles from any driver never overlap.
    cycle: tokio::sync::Mutex<()>,
    comms_limit: u32,
}

/// Shared handle to the engine. Clone is cheap (inner Arc).
pub struct SyncEngine<S> {
    inner: Arc<EngineInner<S>>,
}

impl<S> Clone for SyncEngine<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: DashboardSource> SyncEngine<S> {
    /// Create an engine with an empty dashboard and an empty ledger.
    pub fn new(source: S, config: &SyncConfig) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                source,
                store: SnapshotStore::default(),
                ledger: DispatchLedger::new(),
                guard: ConcurrencyGuard::new(config.cooldown()),
                cycle: tokio::sync::Mutex::new(()),
                comms_limit: config.comms_limit,
            }),
        }
    }

    pub(crate) fn source(&self) -> &S {
        &self.inner.source
    }

    pub(crate) fn store(&self) -> &SnapshotStore {
        &self.inner.store
    }

    pub(crate) fn guard(&self) -> &ConcurrencyGuard {
        &self.inner.guard
    }

    pub fn ledger(&self) -> &DispatchLedger {
        &self.inner.ledger
    }

    /// The current dashboard, as an immutable snapshot.
    pub fn snapshot(&self) -> Arc<DashboardState> {
        self.inner.store.snapshot()
    }

    /// Receive every subsequent dashboard change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardState>> {
        self.inner.store.subscribe()
    }

    pub fn guard_phase(&self) -> GuardPhase {
        self.inner.guard.phase()
    }

    /// Approve an alert for dispatch.
    ///
    /// Records `id` in the ledger and marks the matching alert on the current
    /// dashboard as dispatched, which is exactly what the next derivation
    /// will produce. Returns `false` if `id` was already approved.
    pub fn approve(&self, id: &str) -> bool {
        let newly = self.inner.ledger.approve(id);

        let shown = self.inner.store.modify_if(|state| match state.alert_mut(id) {
            Some(alert) if !alert.is_dispatched() => {
                alert.mark_dispatched();
                true
            }
            _ => false,
        });

        tracing::info!(alert_id = %id, newly, shown, "Alert approved for dispatch");
        newly
    }

    /// Run one poll cycle now, outside any poller.
    pub async fn poll_once(&self) -> CycleOutcome {
        self.poll_cycle(&CancellationToken::new()).await
    }

    /// One fetch → derive → replace pass.
    ///
    /// Cycles are serialized: a second caller waits for the running cycle.
    /// Skips without fetching unless the guard is idle. The result is applied
    /// only if `cancel` has not fired, the guard is still idle, and no
    /// analysis started during the fetch; that check and the replacement
    /// happen under the guard lock.
    pub(crate) async fn poll_cycle(&self, cancel: &CancellationToken) -> CycleOutcome {
        let cycle_id = Uuid::new_v4();

        if cancel.is_cancelled() {
            return CycleOutcome::Discarded;
        }
        let _cycle = self.inner.cycle.lock().await;

        let epoch = match self.inner.guard.idle_epoch() {
            Ok(epoch) => epoch,
            Err(phase) => {
                tracing::debug!(cycle_id = %cycle_id, guard = %phase, "Poll skipped, guard busy");
                return CycleOutcome::SkippedGuardBusy;
            }
        };

        tracing::debug!(cycle_id = %cycle_id, "Poll cycle started");
        let start = std::time::Instant::now();

        let bundle = match aggregator::fetch_all(&self.inner.source, self.inner.comms_limit).await
        {
            Ok(bundle) => bundle,
            Err(e) => {
                tracing::warn!(
                    cycle_id = %cycle_id,
                    endpoint = %e.endpoint,
                    error = %e,
                    "Poll cycle failed, keeping previous dashboard"
                );
                return CycleOutcome::Failed {
                    endpoint: e.endpoint,
                };
            }
        };

        if cancel.is_cancelled() {
            tracing::warn!(cycle_id = %cycle_id, "Poller stopped mid-cycle, result discarded");
            return CycleOutcome::Discarded;
        }

        let agents = bundle.swarm.len();
        let applied = self.inner.guard.when_idle_since(epoch, || {
            let mut alerts = 0;
            self.inner.store.replace_with(|_| {
                let dispatched = self.inner.ledger.snapshot();
                let state = bundle.into_state(&dispatched, Utc::now());
                alerts = state.alerts.len();
                state
            });
            alerts
        });

        match applied {
            Some(alerts) => {
                tracing::info!(
                    cycle_id = %cycle_id,
                    agents,
                    alerts,
                    duration_ms = start.elapsed().as_millis(),
                    "Dashboard refreshed"
                );
                CycleOutcome::Applied { alerts }
            }
            None => {
                tracing::warn!(
                    cycle_id = %cycle_id,
                    "Analysis ran mid-cycle, result discarded"
                );
                CycleOutcome::Discarded
            }
        }
    }
}

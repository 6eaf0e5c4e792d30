//! Owner of the single current `DashboardState`.
//!
//! Backed by a `tokio::sync::watch` channel so the presentation layer can
//! either read the latest snapshot or await changes. Readers get an
//! `Arc<DashboardState>` and never observe a half-applied update.

use std::sync::Arc;

use tokio::sync::watch;

use sanket_core::types::DashboardState;

#[derive(Debug)]
pub struct SnapshotStore {
    tx: watch::Sender<Arc<DashboardState>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(DashboardState::default())
    }
}

impl SnapshotStore {
    pub fn new(initial: DashboardState) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    /// The current state. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<DashboardState> {
        self.tx.borrow().clone()
    }

    /// A receiver notified on every replacement or modification.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardState>> {
        self.tx.subscribe()
    }

    /// Replace the state wholesale with the output of `build`.
    ///
    /// `build` runs while the store is locked, so nothing else can modify
    /// the state between reading its inputs and publishing the result.
    pub fn replace_with(&self, build: impl FnOnce(&DashboardState) -> DashboardState) {
        self.tx.send_modify(|current| {
            let next = build(current);
            *current = Arc::new(next);
        });
    }

    /// Edit the state in place and return a value computed from it.
    pub fn modify<R>(&self, edit: impl FnOnce(&mut DashboardState) -> R) -> R {
        let mut out = None;
        self.tx.send_modify(|current| {
            out = Some(edit(Arc::make_mut(current)));
        });
        // send_modify always runs its closure exactly once.
        out.unwrap_or_else(|| unreachable!("send_modify skipped its closure"))
    }

    /// Edit in place, notifying subscribers only if `edit` returns `true`.
    pub fn modify_if(&self, edit: impl FnOnce(&mut DashboardState) -> bool) -> bool {
        self.tx
            .send_if_modified(|current| edit(Arc::make_mut(current)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanket_core::types::DashboardStats;

    #[test]
    fn snapshots_are_immutable_copies() {
        let store = SnapshotStore::default();
        let before = store.snapshot();

        store.modify(|s| s.stats.active_villages = 3);

        assert_eq!(before.stats.active_villages, 0);
        assert_eq!(store.snapshot().stats.active_villages, 3);
    }

    #[test]
    fn replace_with_sees_previous_state() {
        let store = SnapshotStore::default();
        store.modify(|s| s.stats.total_reports = 10);

        store.replace_with(|prev| DashboardState {
            stats: DashboardStats {
                total_reports: prev.stats.total_reports + 1,
                ..Default::default()
            },
            ..Default::default()
        });
        assert_eq!(store.snapshot().stats.total_reports, 11);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let store = SnapshotStore::default();
        let mut rx = store.subscribe();

        store.modify(|s| s.stats.high_risk_villages = 2);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().stats.high_risk_villages, 2);

        let changed = store.modify_if(|_| false);
        assert!(!changed);
        assert!(!rx.has_changed().unwrap());
    }
}

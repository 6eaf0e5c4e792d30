//! Session-scoped record of alerts an official has approved for dispatch.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Insertion-only set of dispatched alert ids.
///
/// Lives as long as the engine. Every derivation consults it, and a member
/// always derives as `dispatched` whatever the backend reports.
#[derive(Debug, Default)]
pub struct DispatchLedger {
    ids: Mutex<HashSet<String>>,
}

impl DispatchLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        // The set is only ever inserted into, so a poisoned lock still holds a valid set.
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `id` as dispatched. Returns `false` if it already was.
    pub fn approve(&self, id: &str) -> bool {
        let mut ids = self.lock();
        if ids.contains(id) {
            return false;
        }
        ids.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains(id)
    }

    /// Copy of the current membership, for a derivation pass.
    pub fn snapshot(&self) -> HashSet<String> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approve_is_idempotent() {
        let ledger = DispatchLedger::new();
        assert!(ledger.is_empty());
        assert!(ledger.approve("a1"));
        assert!(!ledger.approve("a1"));
        assert_eq!(ledger.len(), 1);
        assert!(ledger.contains("a1"));
        assert!(!ledger.contains("a2"));
    }

    #[test]
    fn snapshot_is_detached() {
        let ledger = DispatchLedger::new();
        ledger.approve("a1");
        let snap = ledger.snapshot();
        ledger.approve("a2");
        assert_eq!(snap.len(), 1);
        assert_eq!(ledger.len(), 2);
    }
}

//! Process-wide single-flight guard over generation IDs.
//!
//! The dispatch loop lists queued *and* running jobs every tick, so a job
//! whose engine is mid-poll shows up again and again. The guard ensures at
//! most one engine task exists per job ID: acquisition hands out an RAII
//! [`InFlightSlot`] whose `Drop` releases the entry, so the slot is freed
//! however the task ends -- success, error, or panic unwind.
//!
//! Nothing here is persisted. After a restart the set is empty and a job
//! left `running` in storage is simply picked up again.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use lumen_core::types::DbId;

/// Concurrency-safe set of generation IDs currently being processed.
/// Cloning produces another handle to the same set.
#[derive(Debug, Clone, Default)]
pub struct InFlightGuard {
    active: Arc<Mutex<HashSet<DbId>>>,
}

/// RAII token proving exclusive in-flight ownership of one generation ID.
#[derive(Debug)]
pub struct InFlightSlot {
    guard: InFlightGuard,
    id: DbId,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `id` for processing. Returns `None` when another task already
    /// holds it.
    pub fn try_acquire(&self, id: DbId) -> Option<InFlightSlot> {
        if self.lock().insert(id) {
            Some(InFlightSlot {
                guard: self.clone(),
                id,
            })
        } else {
            None
        }
    }

    /// Whether `id` is currently being processed.
    pub fn contains(&self, id: DbId) -> bool {
        self.lock().contains(&id)
    }

    /// Number of jobs currently in flight.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, id: DbId) {
        self.lock().remove(&id);
    }

    /// The lock is only ever held for a single insert/remove/lookup, so a
    /// poisoned mutex (a panic in that window) is safe to recover from.
    fn lock(&self) -> MutexGuard<'_, HashSet<DbId>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.guard.release(self.id);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_refused_while_slot_is_held() {
        let guard = InFlightGuard::new();
        let slot = guard.try_acquire(1).expect("first acquire");
        assert!(guard.try_acquire(1).is_none());
        drop(slot);
        assert!(guard.try_acquire(1).is_some());
    }

    #[test]
    fn distinct_ids_are_independent() {
        let guard = InFlightGuard::new();
        let _a = guard.try_acquire(1).unwrap();
        let _b = guard.try_acquire(2).unwrap();
        assert_eq!(guard.len(), 2);
    }

    #[test]
    fn drop_releases_the_entry() {
        let guard = InFlightGuard::new();
        {
            let _slot = guard.try_acquire(7).unwrap();
            assert!(guard.contains(7));
        }
        assert!(!guard.contains(7));
        assert!(guard.is_empty());
    }

    #[test]
    fn clones_share_one_set() {
        let guard = InFlightGuard::new();
        let other = guard.clone();
        let _slot = guard.try_acquire(9).unwrap();
        assert!(other.try_acquire(9).is_none());
        assert!(other.contains(9));
    }

    #[tokio::test]
    async fn slot_is_released_when_the_task_panics() {
        let guard = InFlightGuard::new();
        let slot = guard.try_acquire(42).unwrap();

        let handle = tokio::spawn(async move {
            let _slot = slot;
            panic!("engine blew up");
        });
        assert!(handle.await.is_err());

        // The unwind dropped the slot, so the id is free again.
        assert!(!guard.contains(42));
        assert!(guard.try_acquire(42).is_some());
    }
}

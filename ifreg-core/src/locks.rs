//! Per-record async locks.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One mutex per record id.
///
/// Entries exist only while some task holds or waits for the lock; the last
/// guard to drop removes the entry again. Ids never share a mutex, so a
/// held lock on one record never delays work on another.
#[derive(Clone, Default)]
pub(crate) struct RecordLocks {
    locks: Arc<DashMap<u64, Arc<Mutex<()>>>>,
}

pub(crate) struct RecordGuard {
    id: u64,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<DashMap<u64, Arc<Mutex<()>>>>,
}

impl RecordLocks {
    pub(crate) async fn acquire(&self, id: u64) -> RecordGuard {
        let mutex = self.locks.entry(id).or_default().clone();
        let guard = mutex.lock_owned().await;
        RecordGuard {
            id,
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for RecordGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

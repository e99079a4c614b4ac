//! Per-record import serialization

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::store::RecordId;

/// One async lock per record identifier
///
/// Imports holding the guard for the same record run one after another;
/// imports of different records never wait on each other. Entries nobody holds
/// or waits for are dropped on the next acquisition.
#[derive(Debug, Default)]
pub struct RecordLocks {
    locks: Mutex<HashMap<RecordId, Arc<AsyncMutex<()>>>>,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `record`
    pub async fn lock(&self, record: &RecordId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(record.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Number of records with a live lock entry
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_same_record_waits() {
        let locks = RecordLocks::new();
        let a = RecordId::new("a").unwrap();
        let b = RecordId::new("b").unwrap();

        let guard = locks.lock(&a).await;

        assert!(
            timeout(Duration::from_millis(50), locks.lock(&a))
                .await
                .is_err()
        );
        let other = timeout(Duration::from_millis(50), locks.lock(&b)).await;
        assert!(other.is_ok());
        drop(other);

        drop(guard);
        assert!(
            timeout(Duration::from_millis(50), locks.lock(&a))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let locks = RecordLocks::new();
        for id in ["a", "b", "c"] {
            let _guard = locks.lock(&RecordId::new(id).unwrap()).await;
        }
        // Only the most recent entry survives the last prune.
        assert_eq!(locks.len(), 1);
    }
}

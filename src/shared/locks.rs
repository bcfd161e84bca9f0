//! Per-key async mutexes.
//!
//! Admission checks (is this point free? does this driver already charge?)
//! are check-then-write sequences; holding the key's guard for the whole
//! sequence makes concurrent attempts on the same point or driver run one
//! after the other.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct KeyedLocks {
    locks: DashMap<i32, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the guard for `key`, waiting behind any current holder.
    pub async fn lock(&self, key: i32) -> OwnedMutexGuard<()> {
        let mutex = Arc::clone(&self.locks.entry(key).or_default());
        mutex.lock_owned().await
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Locks shared by everything that admits work onto a charging point.
///
/// Acquisition order is always point, then driver, then vehicle.
#[derive(Default)]
pub struct AdmissionLocks {
    pub points: KeyedLocks,
    pub drivers: KeyedLocks,
    pub vehicles: KeyedLocks,
}

impl AdmissionLocks {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_serialized() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.lock(1).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.lock(1).await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.lock(2)).await;
        assert!(b.is_ok());
    }
}

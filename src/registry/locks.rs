//! Per-id serialization of registration operations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};

struct Entry {
    lock: Arc<Mutex<()>>,
    /// Holders plus waiters.
    claims: usize,
}

type LockTable = Arc<StdMutex<HashMap<String, Entry>>>;

/// Keyed async locks: holders of the same id run one at a time, different
/// ids never wait on each other. Entries are dropped once nobody holds or
/// waits on them, including waiters cancelled before they got the lock.
#[derive(Default, Clone)]
pub struct IdLocks {
    table: LockTable,
}

/// Interest in an id's entry, released on drop whether or not the lock was won.
struct Claim {
    id: String,
    table: LockTable,
}

impl Drop for Claim {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = table.get_mut(&self.id) {
            entry.claims -= 1;
            if entry.claims == 0 {
                table.remove(&self.id);
            }
        }
    }
}

/// Held for the duration of one operation on `id`.
pub struct IdGuard {
    // Field order matters: the mutex is released before the claim.
    _guard: OwnedMutexGuard<()>,
    _claim: Claim,
}

impl IdLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, id: &str) -> IdGuard {
        let (claim, lock) = {
            let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
            let entry = table.entry(id.to_string()).or_insert_with(|| Entry {
                lock: Arc::new(Mutex::new(())),
                claims: 0,
            });
            entry.claims += 1;
            let claim = Claim {
                id: id.to_string(),
                table: Arc::clone(&self.table),
            };
            (claim, Arc::clone(&entry.lock))
        };

        let guard = lock.lock_owned().await;
        IdGuard {
            _guard: guard,
            _claim: claim,
        }
    }

    /// Number of ids with a live lock entry.
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_id_serializes() {
        let locks = IdLocks::new();
        let first = locks.acquire("a").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("a").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_ids_do_not_block() {
        let locks = IdLocks::new();
        let _a = locks.acquire("a").await;

        tokio::time::timeout(Duration::from_millis(200), locks.acquire("b"))
            .await
            .expect("lock on a different id should not wait");
    }

    #[tokio::test]
    async fn test_entries_are_pruned() {
        let locks = IdLocks::new();
        {
            let _a = locks.acquire("a").await;
            let _b = locks.acquire("b").await;
            assert_eq!(locks.len(), 2);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_releases_entry() {
        let locks = IdLocks::new();
        let holder = locks.acquire("a").await;

        let mut waiter = Box::pin(locks.acquire("a"));
        assert!(futures::poll!(&mut waiter).is_pending());

        // Holder leaves first, then the waiter gives up without polling again.
        drop(holder);
        drop(waiter);

        assert!(locks.is_empty());
    }
}

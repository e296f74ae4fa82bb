//! Per-entry write locks
//!
//! Block mutations read a journal entry's block list, modify it, and
//! write it back together with recomputed metrics. Concurrent mutations
//! of the same entry must serialize or one write-back clobbers the
//! other, so every mutation holds the entry's lock for its full
//! read-modify-write span. Mutations of different entries stay
//! independent.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of write locks keyed by entry id.
#[derive(Debug, Default)]
pub struct IdLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IdLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `id`, creating it on first use.
    ///
    /// The owned guard keeps the lock alive independently of the
    /// registry map, so entries can be pruned while guards are held.
    pub async fn acquire(&self, id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Drop registry entries nobody holds anymore before adding one.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

//! Per-location mutual exclusion
//!
//! Every read-modify-write on one location's counters or travel state runs
//! while holding that location's lock. Different locations never contend.
//! Waiting is bounded; an expired wait surfaces as [`QueueError::LocationBusy`].

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::error::{QueueError, QueueResult};

/// Lock table keyed by location id
#[derive(Debug)]
pub struct LocationLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
    timeout: Duration,
}

/// Held lock for one location; released on drop
#[derive(Debug)]
pub struct LocationGuard {
    _guard: OwnedMutexGuard<()>,
    location_id: String,
}

impl LocationGuard {
    pub fn location_id(&self) -> &str {
        &self.location_id
    }
}

impl LocationLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: DashMap::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of locations with a table entry
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Drop the entry for `location_id` when nobody holds or awaits it
    pub fn discard(&self, location_id: &str) {
        self.locks
            .remove_if(location_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Acquire the lock for `location_id`, waiting at most the configured timeout
    pub async fn acquire(&self, location_id: &str) -> QueueResult<LocationGuard> {
        // Clone the Arc out so the shard guard is released before awaiting
        let lock = self
            .locks
            .entry(location_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        match tokio::time::timeout(self.timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(LocationGuard {
                _guard: guard,
                location_id: location_id.to_string(),
            }),
            Err(_) => {
                tracing::warn!(
                    location_id = %location_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Location lock wait expired"
                );
                Err(QueueError::LocationBusy(location_id.to_string()))
            }
        }
    }
}

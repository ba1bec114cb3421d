//! Queue core: serial allocation and per-location queue state
//!
//! # Mutation flow
//!
//! ```text
//! with_location(id, f)
//!     ├─ 1. Acquire per-location lock (bounded wait → LocationBusy)
//!     ├─ 2. Begin write transaction
//!     ├─ 3. Load location (LocationNotFound)
//!     ├─ 4. f(txn, &mut location)   -- synchronous, no awaits
//!     ├─ 5. Persist location
//!     ├─ 6. Commit
//!     └─ 7. Release lock
//! ```
//!
//! A failing `f` drops the transaction uncommitted, so nothing is written.

mod allocator;
mod error;
mod events;
mod location;
mod locks;
mod schedule;
pub mod storage;

pub use allocator::SerialAllocator;
pub use error::{QueueError, QueueResult};
pub use events::{EVENT_CHANNEL_CAPACITY, QueueEvent};
pub use location::classify;
pub use locks::{LocationGuard, LocationLocks};
pub use storage::{QueueStorage, StorageError};

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use redb::WriteTransaction;
use shared::models::{DEFAULT_MAX_ADMISSIONS, Location};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Runtime knobs for the queue core
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// Business timezone; "today" is computed here
    pub timezone: Tz,
    /// Longest wait for a per-location lock
    pub lock_timeout: Duration,
    /// Capacity for locations created without one
    pub default_max_admissions: u32,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::UTC,
            lock_timeout: Duration::from_millis(2000),
            default_max_admissions: DEFAULT_MAX_ADMISSIONS,
        }
    }
}

/// Shared handle to storage, lock table and event channel
///
/// Cheap to clone; all clones see the same state.
#[derive(Clone)]
pub struct QueueService {
    storage: QueueStorage,
    locks: Arc<LocationLocks>,
    event_tx: broadcast::Sender<QueueEvent>,
    settings: QueueSettings,
}

impl std::fmt::Debug for QueueService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueService")
            .field("storage", &"<QueueStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .field("settings", &self.settings)
            .finish()
    }
}

impl QueueService {
    pub fn new(storage: QueueStorage, settings: QueueSettings) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            storage,
            locks: Arc::new(LocationLocks::new(settings.lock_timeout)),
            event_tx,
            settings,
        }
    }

    pub fn storage(&self) -> &QueueStorage {
        &self.storage
    }

    pub fn locks(&self) -> &LocationLocks {
        &self.locks
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.settings
    }

    pub fn timezone(&self) -> Tz {
        self.settings.timezone
    }

    /// Current calendar day in the business timezone
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.settings.timezone).date_naive()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.event_tx.subscribe()
    }

    /// Broadcast an event; having no subscribers is fine
    pub(crate) fn publish(&self, event: QueueEvent) {
        tracing::trace!(?event, "Publishing queue event");
        let _ = self.event_tx.send(event);
    }

    /// Run `f` against a location under its lock inside one write transaction
    pub(crate) async fn with_location<T>(
        &self,
        location_id: &str,
        f: impl FnOnce(&WriteTransaction, &mut Location) -> QueueResult<T>,
    ) -> QueueResult<T> {
        let guard = self.locks.acquire(location_id).await?;
        let result = self.mutate_location(location_id, f);
        drop(guard);

        // Unknown ids must not leave entries behind
        if matches!(result, Err(QueueError::LocationNotFound(_))) {
            self.locks.discard(location_id);
        }
        result
    }

    fn mutate_location<T>(
        &self,
        location_id: &str,
        f: impl FnOnce(&WriteTransaction, &mut Location) -> QueueResult<T>,
    ) -> QueueResult<T> {
        let txn = self.storage.begin_write()?;
        let mut location = self
            .storage
            .get_location_txn(&txn, location_id)?
            .ok_or_else(|| QueueError::LocationNotFound(location_id.to_string()))?;

        let result = f(&txn, &mut location)?;

        location.updated_at = shared::util::now_millis();
        self.storage.put_location(&txn, &location)?;
        txn.commit().map_err(StorageError::from)?;

        Ok(result)
    }

    /// Re-scope the day counters when the location last counted an earlier day
    ///
    /// Never moves `counter_date` backwards.
    ///
    /// `total_issued` is re-seeded from the bookings already stored for
    /// `today` (advance bookings), so the next same-day serial never collides
    /// with one of them.
    pub(crate) fn roll_over(
        &self,
        txn: &WriteTransaction,
        location: &mut Location,
        today: NaiveDate,
    ) -> QueueResult<()> {
        if location.counter_date.is_some_and(|d| d >= today) {
            return Ok(());
        }
        let already_booked = self.storage.count_bookings_txn(txn, &location.id, today)?;
        tracing::debug!(
            location_id = %location.id,
            previous = ?location.counter_date,
            today = %today,
            already_booked,
            "Rolling location counters over to a new day"
        );
        location.counter_date = Some(today);
        location.total_issued = already_booked;
        location.current_served = 0;
        Ok(())
    }

    /// Counters as they would read after a rollover, without writing
    pub(crate) fn effective_counters(&self, location: &Location) -> QueueResult<(u32, u32)> {
        let today = self.today();
        if location.counter_date == Some(today) {
            Ok((location.current_served, location.total_issued))
        } else {
            Ok((0, self.storage.count_bookings(&location.id, today)?))
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use chrono::Days;

    #[tokio::test]
    async fn test_missing_location_is_not_found() {
        let service = service();
        let err = service
            .with_location("nope", |_, _| Ok(()))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::LocationNotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_ids_leave_no_lock_entries() {
        let service = service();
        let loc = location(&service, 5).await;
        service.call_next(&loc.id).await.unwrap_err();
        let baseline = service.locks().len();

        for i in 0..200 {
            let id = format!("no-such-{i}");
            assert!(matches!(
                service.call_next(&id).await.unwrap_err(),
                QueueError::LocationNotFound(_)
            ));
            assert!(matches!(
                service.create_booking(&id, service.today(), "p1").await.unwrap_err(),
                QueueError::LocationNotFound(_)
            ));
        }
        assert_eq!(service.locks().len(), baseline);
    }

    #[tokio::test]
    async fn test_failed_mutation_writes_nothing() {
        let service = service();
        let loc = location(&service, 5).await;

        let err = service
            .with_location(&loc.id, |_, l| {
                l.current_served = 99;
                Err::<(), _>(QueueError::QueueExhausted)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::QueueExhausted));

        let stored = service.storage().get_location(&loc.id).unwrap().unwrap();
        assert_eq!(stored.current_served, 0);
    }

    #[tokio::test]
    async fn test_roll_over_seeds_from_existing_bookings() {
        let service = service();
        let loc = location(&service, 5).await;
        let today = service.today();

        // Two advance bookings made earlier for what is now today
        let tomorrow = today.checked_add_days(Days::new(1)).unwrap();
        service.create_booking(&loc.id, tomorrow, "a").await.unwrap();
        service.create_booking(&loc.id, tomorrow, "b").await.unwrap();

        let txn = service.storage().begin_write().unwrap();
        let mut stale = loc.clone();
        stale.counter_date = today.checked_sub_days(Days::new(1));
        stale.total_issued = 7;
        stale.current_served = 4;
        service.roll_over(&txn, &mut stale, tomorrow).unwrap();
        assert_eq!(stale.counter_date, Some(tomorrow));
        assert_eq!(stale.total_issued, 2);
        assert_eq!(stale.current_served, 0);
    }

    #[tokio::test]
    async fn test_roll_over_never_goes_back_a_day() {
        let service = service();
        let loc = location(&service, 5).await;
        let today = service.today();
        let tomorrow = today.checked_add_days(Days::new(1)).unwrap();

        let txn = service.storage().begin_write().unwrap();
        let mut ahead = loc.clone();
        ahead.counter_date = Some(tomorrow);
        ahead.total_issued = 3;
        ahead.current_served = 2;

        // A caller that read the clock before midnight
        service.roll_over(&txn, &mut ahead, today).unwrap();
        assert_eq!(ahead.counter_date, Some(tomorrow));
        assert_eq!(ahead.total_issued, 3);
        assert_eq!(ahead.current_served, 2);
    }
}

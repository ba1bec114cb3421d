//! redb-based storage layer for locations, providers and bookings
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `locations` | `location_id` | `Location` | Location rows (counters, travel state) |
//! | `providers` | `provider_id` | `Provider` | Provider rows (live position) |
//! | `bookings` | `(location_id, date, serial)` | `Booking` | Tickets; key enforces serial uniqueness |
//! | `booking_index` | `booking_id` | `BookingKey` | Lookup by booking id |
//! | `scheduler_state` | name | text | Scheduler bookkeeping (`last_reset_date`) |
//! | `schedules` | `(location_id, provider_id)` | `Vec<ScheduleSlot>` | Weekly visiting hours |
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate`: a mutation is on disk when
//! `commit()` returns, so queue position is observable right after the
//! operation completes.
//!
//! Write transactions are single-writer. Callers must never `.await` while a
//! `WriteTransaction` is open.

use chrono::NaiveDate;
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::{Deserialize, Serialize};
use shared::models::{Booking, Location, Provider, ScheduleSlot};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for locations: key = location_id, value = JSON-serialized Location
const LOCATIONS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("locations");

/// Table for providers: key = provider_id, value = JSON-serialized Provider
const PROVIDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("providers");

/// Table for bookings: key = (location_id, date, serial), value = JSON-serialized Booking
const BOOKINGS_TABLE: TableDefinition<(&str, &str, u32), &[u8]> = TableDefinition::new("bookings");

/// Table for booking lookup: key = booking_id, value = JSON-serialized BookingKey
const BOOKING_INDEX_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("booking_index");

/// Table for scheduler bookkeeping: key = name, value = text
const SCHEDULER_TABLE: TableDefinition<&str, &str> = TableDefinition::new("scheduler_state");

/// Table for visiting hours: key = (location_id, provider_id), value = JSON-serialized Vec<ScheduleSlot>
const SCHEDULES_TABLE: TableDefinition<(&str, &str), &[u8]> = TableDefinition::new("schedules");

const LAST_RESET_DATE_KEY: &str = "last_reset_date";

/// Lowest / highest possible date keys, used for whole-location scans
const DATE_KEY_MIN: &str = "0000-00-00";
const DATE_KEY_MAX: &str = "9999-99-99";

/// Primary key of a booking row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingKey {
    pub location_id: String,
    pub date: NaiveDate,
    pub serial: u32,
}

impl BookingKey {
    pub fn of(booking: &Booking) -> Self {
        Self {
            location_id: booking.location_id.clone(),
            date: booking.date,
            serial: booking.serial_number,
        }
    }
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt scheduler state: {0}")]
    CorruptState(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Queue storage backed by redb
#[derive(Clone)]
pub struct QueueStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for QueueStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueStorage").finish_non_exhaustive()
    }
}

impl QueueStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests, demos)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(LOCATIONS_TABLE)?;
            let _ = write_txn.open_table(PROVIDERS_TABLE)?;
            let _ = write_txn.open_table(BOOKINGS_TABLE)?;
            let _ = write_txn.open_table(BOOKING_INDEX_TABLE)?;
            let _ = write_txn.open_table(SCHEDULER_TABLE)?;
            let _ = write_txn.open_table(SCHEDULES_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Cheap liveness probe (health checks)
    pub fn ping(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOCATIONS_TABLE)?;
        Ok(table.len()?)
    }

    // ========== Location Operations ==========

    pub fn get_location(&self, location_id: &str) -> StorageResult<Option<Location>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOCATIONS_TABLE)?;
        match table.get(location_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Read a location inside a write transaction
    pub fn get_location_txn(
        &self,
        txn: &WriteTransaction,
        location_id: &str,
    ) -> StorageResult<Option<Location>> {
        let table = txn.open_table(LOCATIONS_TABLE)?;
        match table.get(location_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_location(&self, txn: &WriteTransaction, location: &Location) -> StorageResult<()> {
        let mut table = txn.open_table(LOCATIONS_TABLE)?;
        let value = serde_json::to_vec(location)?;
        table.insert(location.id.as_str(), value.as_slice())?;
        Ok(())
    }

    pub fn list_locations(&self) -> StorageResult<Vec<Location>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOCATIONS_TABLE)?;

        let mut locations = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            locations.push(serde_json::from_slice(value.value())?);
        }
        Ok(locations)
    }

    pub fn location_ids(&self) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(LOCATIONS_TABLE)?;

        let mut ids = Vec::new();
        for result in table.iter()? {
            let (key, _value) = result?;
            ids.push(key.value().to_string());
        }
        Ok(ids)
    }

    // ========== Provider Operations ==========

    pub fn get_provider(&self, provider_id: &str) -> StorageResult<Option<Provider>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PROVIDERS_TABLE)?;
        match table.get(provider_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Read a provider inside a write transaction
    pub fn get_provider_txn(
        &self,
        txn: &WriteTransaction,
        provider_id: &str,
    ) -> StorageResult<Option<Provider>> {
        let table = txn.open_table(PROVIDERS_TABLE)?;
        match table.get(provider_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    pub fn put_provider(&self, txn: &WriteTransaction, provider: &Provider) -> StorageResult<()> {
        let mut table = txn.open_table(PROVIDERS_TABLE)?;
        let value = serde_json::to_vec(provider)?;
        table.insert(provider.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// All providers, read inside a write transaction
    pub fn list_providers_txn(&self, txn: &WriteTransaction) -> StorageResult<Vec<Provider>> {
        let table = txn.open_table(PROVIDERS_TABLE)?;

        let mut providers = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            providers.push(serde_json::from_slice(value.value())?);
        }
        Ok(providers)
    }

    // ========== Booking Operations ==========

    /// Insert a new booking
    ///
    /// Returns `false` without writing when `(location, date, serial)` is
    /// already taken.
    pub fn insert_booking(&self, txn: &WriteTransaction, booking: &Booking) -> StorageResult<bool> {
        let date = booking.date.to_string();
        let key = (booking.location_id.as_str(), date.as_str(), booking.serial_number);
        {
            let mut table = txn.open_table(BOOKINGS_TABLE)?;
            if table.get(key)?.is_some() {
                return Ok(false);
            }
            let value = serde_json::to_vec(booking)?;
            table.insert(key, value.as_slice())?;
        }

        let mut index = txn.open_table(BOOKING_INDEX_TABLE)?;
        let index_value = serde_json::to_vec(&BookingKey::of(booking))?;
        index.insert(booking.id.as_str(), index_value.as_slice())?;
        Ok(true)
    }

    /// Overwrite an existing booking row (status changes)
    pub fn update_booking(&self, txn: &WriteTransaction, booking: &Booking) -> StorageResult<()> {
        let date = booking.date.to_string();
        let key = (booking.location_id.as_str(), date.as_str(), booking.serial_number);
        let mut table = txn.open_table(BOOKINGS_TABLE)?;
        let value = serde_json::to_vec(booking)?;
        table.insert(key, value.as_slice())?;
        Ok(())
    }

    pub fn get_booking(&self, booking_id: &str) -> StorageResult<Option<Booking>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(BOOKING_INDEX_TABLE)?;
        let key: BookingKey = match index.get(booking_id)? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => return Ok(None),
        };

        let table = read_txn.open_table(BOOKINGS_TABLE)?;
        let date = key.date.to_string();
        match table.get((key.location_id.as_str(), date.as_str(), key.serial))? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Read a booking inside a write transaction
    pub fn get_booking_txn(
        &self,
        txn: &WriteTransaction,
        booking_id: &str,
    ) -> StorageResult<Option<Booking>> {
        let key: BookingKey = {
            let index = txn.open_table(BOOKING_INDEX_TABLE)?;
            match index.get(booking_id)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => return Ok(None),
            }
        };

        let table = txn.open_table(BOOKINGS_TABLE)?;
        let date = key.date.to_string();
        match table.get((key.location_id.as_str(), date.as_str(), key.serial))? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Number of bookings for (location, date), inside a write transaction
    pub fn count_bookings_txn(
        &self,
        txn: &WriteTransaction,
        location_id: &str,
        date: NaiveDate,
    ) -> StorageResult<u32> {
        let table = txn.open_table(BOOKINGS_TABLE)?;
        let date = date.to_string();
        let range_start = (location_id, date.as_str(), 0u32);
        let range_end = (location_id, date.as_str(), u32::MAX);

        let mut count = 0u32;
        for result in table.range(range_start..=range_end)? {
            result?;
            count += 1;
        }
        Ok(count)
    }

    /// Bookings for (location, date), ordered by serial
    pub fn bookings_for_day(&self, location_id: &str, date: NaiveDate) -> StorageResult<Vec<Booking>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BOOKINGS_TABLE)?;
        let date = date.to_string();
        let range_start = (location_id, date.as_str(), 0u32);
        let range_end = (location_id, date.as_str(), u32::MAX);

        let mut bookings = Vec::new();
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            bookings.push(serde_json::from_slice(value.value())?);
        }
        Ok(bookings)
    }

    /// Number of bookings for (location, date) outside a transaction
    pub fn count_bookings(&self, location_id: &str, date: NaiveDate) -> StorageResult<u32> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BOOKINGS_TABLE)?;
        let date = date.to_string();
        let range_start = (location_id, date.as_str(), 0u32);
        let range_end = (location_id, date.as_str(), u32::MAX);

        let mut count = 0u32;
        for result in table.range(range_start..=range_end)? {
            result?;
            count += 1;
        }
        Ok(count)
    }

    /// Distinct requester ids that ever booked at a location
    pub fn requesters_for_location(&self, location_id: &str) -> StorageResult<Vec<String>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BOOKINGS_TABLE)?;
        let range_start = (location_id, DATE_KEY_MIN, 0u32);
        let range_end = (location_id, DATE_KEY_MAX, u32::MAX);

        let mut requesters = BTreeSet::new();
        for result in table.range(range_start..=range_end)? {
            let (_key, value) = result?;
            let booking: Booking = serde_json::from_slice(value.value())?;
            requesters.insert(booking.requester_id);
        }
        Ok(requesters.into_iter().collect())
    }

    // ========== Schedule Operations ==========

    /// Replace a provider's slots at a location; an empty list removes the row
    pub fn replace_schedule(
        &self,
        txn: &WriteTransaction,
        location_id: &str,
        provider_id: &str,
        slots: &[ScheduleSlot],
    ) -> StorageResult<()> {
        let mut table = txn.open_table(SCHEDULES_TABLE)?;
        if slots.is_empty() {
            table.remove((location_id, provider_id))?;
        } else {
            let value = serde_json::to_vec(slots)?;
            table.insert((location_id, provider_id), value.as_slice())?;
        }
        Ok(())
    }

    pub fn get_schedule(&self, location_id: &str, provider_id: &str) -> StorageResult<Vec<ScheduleSlot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SCHEDULES_TABLE)?;
        match table.get((location_id, provider_id))? {
            Some(value) => Ok(serde_json::from_slice(value.value())?),
            None => Ok(Vec::new()),
        }
    }

    /// Every provider's slots at a location, unordered
    pub fn schedules_for_location(&self, location_id: &str) -> StorageResult<Vec<ScheduleSlot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SCHEDULES_TABLE)?;

        let mut slots = Vec::new();
        for result in table.range((location_id, "")..)? {
            let (key, value) = result?;
            if key.value().0 != location_id {
                break;
            }
            let row: Vec<ScheduleSlot> = serde_json::from_slice(value.value())?;
            slots.extend(row);
        }
        Ok(slots)
    }

    // ========== Scheduler State ==========

    pub fn last_reset_date(&self) -> StorageResult<Option<NaiveDate>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SCHEDULER_TABLE)?;
        match table.get(LAST_RESET_DATE_KEY)? {
            Some(value) => NaiveDate::parse_from_str(value.value(), "%Y-%m-%d")
                .map(Some)
                .map_err(|e| StorageError::CorruptState(format!("last_reset_date: {}", e))),
            None => Ok(None),
        }
    }

    pub fn set_last_reset_date(&self, txn: &WriteTransaction, date: NaiveDate) -> StorageResult<()> {
        let mut table = txn.open_table(SCHEDULER_TABLE)?;
        let value = date.format("%Y-%m-%d").to_string();
        table.insert(LAST_RESET_DATE_KEY, value.as_str())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{BookingStatus, Coordinates, TravelStatus, Weekday};

    fn create_test_location(id: &str) -> Location {
        Location {
            id: id.to_string(),
            name: format!("Chamber {}", id),
            provider_id: None,
            max_admissions: 50,
            is_admitting: true,
            current_served: 0,
            total_issued: 0,
            counter_date: None,
            travel_status: TravelStatus::AtBase,
            delay_minutes: 0,
            destination: Some(Coordinates::new(23.75, 90.39)),
            en_route_provider_id: None,
            created_at: shared::util::now_millis(),
            updated_at: shared::util::now_millis(),
        }
    }

    fn create_test_booking(location_id: &str, date: NaiveDate, serial: u32) -> Booking {
        Booking {
            id: uuid::Uuid::new_v4().to_string(),
            location_id: location_id.to_string(),
            requester_id: format!("patient-{}", serial),
            serial_number: serial,
            date,
            status: BookingStatus::Pending,
            created_at: shared::util::now_millis(),
            updated_at: shared::util::now_millis(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn test_location_roundtrip() {
        let storage = QueueStorage::open_in_memory().unwrap();
        let location = create_test_location("loc-1");

        let txn = storage.begin_write().unwrap();
        storage.put_location(&txn, &location).unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.get_location("loc-1").unwrap(), Some(location));
        assert!(storage.get_location("missing").unwrap().is_none());
        assert_eq!(storage.location_ids().unwrap(), vec!["loc-1".to_string()]);
        assert_eq!(storage.ping().unwrap(), 1);
    }

    #[test]
    fn test_uncommitted_write_is_discarded() {
        let storage = QueueStorage::open_in_memory().unwrap();
        {
            let txn = storage.begin_write().unwrap();
            storage.put_location(&txn, &create_test_location("loc-1")).unwrap();
            // dropped without commit
        }
        assert!(storage.get_location("loc-1").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_serial_is_rejected() {
        let storage = QueueStorage::open_in_memory().unwrap();
        let first = create_test_booking("loc-1", day(10), 1);
        let second = create_test_booking("loc-1", day(10), 1);

        let txn = storage.begin_write().unwrap();
        assert!(storage.insert_booking(&txn, &first).unwrap());
        assert!(!storage.insert_booking(&txn, &second).unwrap());
        txn.commit().unwrap();

        // Same serial on another day or location is fine
        let txn = storage.begin_write().unwrap();
        assert!(storage.insert_booking(&txn, &create_test_booking("loc-1", day(11), 1)).unwrap());
        assert!(storage.insert_booking(&txn, &create_test_booking("loc-2", day(10), 1)).unwrap());
        txn.commit().unwrap();

        assert_eq!(storage.get_booking(&first.id).unwrap(), Some(first));
        assert!(storage.get_booking(&second.id).unwrap().is_none());
    }

    #[test]
    fn test_count_and_list_are_scoped_to_location_and_day() {
        let storage = QueueStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        for serial in [3, 1, 2] {
            storage
                .insert_booking(&txn, &create_test_booking("loc-1", day(10), serial))
                .unwrap();
        }
        storage
            .insert_booking(&txn, &create_test_booking("loc-1", day(11), 1))
            .unwrap();
        storage
            .insert_booking(&txn, &create_test_booking("loc-10", day(10), 1))
            .unwrap();
        assert_eq!(storage.count_bookings_txn(&txn, "loc-1", day(10)).unwrap(), 3);
        txn.commit().unwrap();

        let serials: Vec<u32> = storage
            .bookings_for_day("loc-1", day(10))
            .unwrap()
            .iter()
            .map(|b| b.serial_number)
            .collect();
        assert_eq!(serials, vec![1, 2, 3]);
        assert_eq!(storage.count_bookings("loc-1", day(11)).unwrap(), 1);
        assert_eq!(storage.count_bookings("loc-1", day(12)).unwrap(), 0);
    }

    #[test]
    fn test_requesters_are_distinct() {
        let storage = QueueStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        let mut a = create_test_booking("loc-1", day(10), 1);
        a.requester_id = "alice".into();
        let mut b = create_test_booking("loc-1", day(11), 1);
        b.requester_id = "alice".into();
        let mut c = create_test_booking("loc-1", day(11), 2);
        c.requester_id = "bob".into();
        let mut other = create_test_booking("loc-2", day(11), 1);
        other.requester_id = "carol".into();
        for booking in [&a, &b, &c, &other] {
            storage.insert_booking(&txn, booking).unwrap();
        }
        txn.commit().unwrap();

        assert_eq!(
            storage.requesters_for_location("loc-1").unwrap(),
            vec!["alice".to_string(), "bob".to_string()]
        );
    }

    #[test]
    fn test_last_reset_date() {
        let storage = QueueStorage::open_in_memory().unwrap();
        assert!(storage.last_reset_date().unwrap().is_none());

        let txn = storage.begin_write().unwrap();
        storage.set_last_reset_date(&txn, day(5)).unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.last_reset_date().unwrap(), Some(day(5)));
    }

    #[test]
    fn test_reopen_from_disk_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue.redb");
        {
            let storage = QueueStorage::open(&path).unwrap();
            let txn = storage.begin_write().unwrap();
            storage.put_location(&txn, &create_test_location("loc-1")).unwrap();
            txn.commit().unwrap();
        }
        let storage = QueueStorage::open(&path).unwrap();
        assert!(storage.get_location("loc-1").unwrap().is_some());
    }

    fn slot(location_id: &str, provider_id: &str, day: Weekday, start: &str) -> ScheduleSlot {
        ScheduleSlot {
            id: uuid::Uuid::new_v4().to_string(),
            location_id: location_id.to_string(),
            provider_id: provider_id.to_string(),
            day_of_week: day,
            shift_name: "Evening".to_string(),
            start_time: start.to_string(),
            end_time: "21:00".to_string(),
            max_patients: 20,
        }
    }

    #[test]
    fn test_schedule_replace_and_scan_by_location() {
        let storage = QueueStorage::open_in_memory().unwrap();

        let txn = storage.begin_write().unwrap();
        storage
            .replace_schedule(&txn, "loc-1", "dr-a", &[slot("loc-1", "dr-a", Weekday::Mon, "17:00")])
            .unwrap();
        storage
            .replace_schedule(&txn, "loc-1", "dr-b", &[slot("loc-1", "dr-b", Weekday::Tue, "18:00")])
            .unwrap();
        storage
            .replace_schedule(&txn, "loc-10", "dr-a", &[slot("loc-10", "dr-a", Weekday::Wed, "09:00")])
            .unwrap();
        txn.commit().unwrap();

        assert_eq!(storage.schedules_for_location("loc-1").unwrap().len(), 2);
        assert_eq!(storage.schedules_for_location("loc-10").unwrap().len(), 1);
        assert!(storage.schedules_for_location("loc-2").unwrap().is_empty());

        // Empty replacement removes the row
        let txn = storage.begin_write().unwrap();
        storage.replace_schedule(&txn, "loc-1", "dr-a", &[]).unwrap();
        txn.commit().unwrap();
        assert!(storage.get_schedule("loc-1", "dr-a").unwrap().is_empty());
        assert_eq!(storage.get_schedule("loc-1", "dr-b").unwrap().len(), 1);
    }
}

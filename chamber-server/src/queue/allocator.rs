//! Serial allocation and booking creation
//!
//! Serials for `(location, date)` form the dense sequence `1..=N`. Same-day
//! tickets advance the location's `total_issued` counter; advance tickets
//! derive from the number of bookings already stored for that date. Both
//! paths run under the location lock, inside the transaction that inserts
//! the booking, so concurrent callers never see the same serial.

use chrono::NaiveDate;
use redb::WriteTransaction;
use shared::models::{Booking, Location};

use super::events::QueueEvent;
use super::location::classify;
use super::storage::QueueStorage;
use super::{QueueError, QueueResult, QueueService};

/// Hands out the next serial for a location and date
pub struct SerialAllocator<'a> {
    service: &'a QueueService,
    storage: &'a QueueStorage,
    today: NaiveDate,
}

impl<'a> SerialAllocator<'a> {
    pub fn new(service: &'a QueueService, today: NaiveDate) -> Self {
        Self {
            service,
            storage: service.storage(),
            today,
        }
    }

    /// Next serial for `date`
    ///
    /// Must be called with the location lock held and `location` loaded in
    /// `txn`. For today the counter is advanced in place; the caller persists
    /// it together with the booking.
    pub fn allocate(
        &self,
        txn: &WriteTransaction,
        location: &mut Location,
        date: NaiveDate,
    ) -> QueueResult<u32> {
        if date < self.today {
            return Err(QueueError::Validation(format!(
                "Cannot book for a past date: {}",
                date
            )));
        }

        if date == self.today {
            self.service.roll_over(txn, location, self.today)?;
            let serial = location.total_issued + 1;
            location.total_issued = serial;
            Ok(serial)
        } else {
            let existing = self.storage.count_bookings_txn(txn, &location.id, date)?;
            Ok(existing + 1)
        }
    }
}

impl QueueService {
    /// Issue a ticket for `requester_id` at `location_id` on `date`
    ///
    /// Status is `pending` within capacity and `extra` beyond it.
    pub async fn create_booking(
        &self,
        location_id: &str,
        date: NaiveDate,
        requester_id: &str,
    ) -> QueueResult<Booking> {
        let requester_id = requester_id.trim();
        if requester_id.is_empty() {
            return Err(QueueError::Validation("Requester id is required".into()));
        }
        if date < self.today() {
            return Err(QueueError::Validation(format!(
                "Cannot book for a past date: {}",
                date
            )));
        }

        let booking = self
            .with_location(location_id, |txn, location| {
                if !location.is_admitting {
                    return Err(QueueError::AdmissionClosed(location.id.clone()));
                }

                // Read the clock under the lock so counters never roll back a day
                let serial = SerialAllocator::new(self, self.today()).allocate(txn, location, date)?;
                let now = shared::util::now_millis();
                let booking = Booking {
                    id: uuid::Uuid::new_v4().to_string(),
                    location_id: location.id.clone(),
                    requester_id: requester_id.to_string(),
                    serial_number: serial,
                    date,
                    status: classify(serial, location),
                    created_at: now,
                    updated_at: now,
                };

                if !self.storage().insert_booking(txn, &booking)? {
                    return Err(QueueError::SerialTaken {
                        location_id: location.id.clone(),
                        date: date.to_string(),
                        serial,
                    });
                }
                Ok(booking)
            })
            .await?;

        tracing::info!(
            location_id = %booking.location_id,
            booking_id = %booking.id,
            serial = booking.serial_number,
            date = %booking.date,
            status = ?booking.status,
            "Booking created"
        );

        self.publish(QueueEvent::BookingCreated {
            location_id: booking.location_id.clone(),
            booking_id: booking.id.clone(),
            serial: booking.serial_number,
            status: booking.status,
            date: booking.date,
        });

        Ok(booking)
    }
}

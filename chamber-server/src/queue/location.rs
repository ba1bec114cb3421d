//! Location queue state: admission gate, serving counter, capacity, bookings

use chrono::NaiveDate;
use shared::models::{
    Booking, BookingStatus, Location, LocationCreate, QueueEntry, TravelStatus,
};

use super::events::QueueEvent;
use super::{QueueError, QueueResult, QueueService};
use crate::geo;
use crate::utils::validation::{MAX_NAME_LEN, validate_capacity, validate_required_text};

/// Status a freshly issued serial gets at this location
///
/// Serials beyond the nominal capacity are still honored, as `extra`.
pub fn classify(serial: u32, location: &Location) -> BookingStatus {
    if serial > location.max_admissions {
        BookingStatus::Extra
    } else {
        BookingStatus::Pending
    }
}

impl QueueService {
    pub async fn create_location(&self, data: LocationCreate) -> QueueResult<Location> {
        let name = validate_required_text(&data.name, "name", MAX_NAME_LEN)?;
        let max_admissions = data
            .max_admissions
            .unwrap_or(self.settings().default_max_admissions);
        validate_capacity(max_admissions)?;
        if let Some(destination) = data.destination
            && !geo::is_valid(destination)
        {
            return Err(QueueError::Validation(
                "Destination coordinates out of range".into(),
            ));
        }

        let now = shared::util::now_millis();
        let location = Location {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            provider_id: data.provider_id.filter(|p| !p.trim().is_empty()),
            max_admissions,
            is_admitting: true,
            current_served: 0,
            total_issued: 0,
            counter_date: None,
            travel_status: TravelStatus::AtBase,
            delay_minutes: 0,
            destination: data.destination,
            en_route_provider_id: None,
            created_at: now,
            updated_at: now,
        };

        let txn = self.storage().begin_write()?;
        self.storage().put_location(&txn, &location)?;
        txn.commit().map_err(super::StorageError::from)?;

        tracing::info!(location_id = %location.id, name = %location.name, "Location created");
        Ok(location)
    }

    pub fn get_location(&self, location_id: &str) -> QueueResult<Location> {
        self.storage()
            .get_location(location_id)?
            .ok_or_else(|| QueueError::LocationNotFound(location_id.to_string()))
    }

    /// All locations, newest first, optionally only one provider's
    pub fn list_locations(&self, provider_id: Option<&str>) -> QueueResult<Vec<Location>> {
        let mut locations: Vec<Location> = self
            .storage()
            .list_locations()?
            .into_iter()
            .filter(|l| provider_id.is_none_or(|p| l.provider_id.as_deref() == Some(p)))
            .collect();
        locations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(locations)
    }

    /// Flip the admission gate; returns the new state
    pub async fn toggle_admission(&self, location_id: &str) -> QueueResult<bool> {
        let is_admitting = self
            .with_location(location_id, |_, location| {
                location.is_admitting = !location.is_admitting;
                Ok(location.is_admitting)
            })
            .await?;

        tracing::info!(location_id = %location_id, is_admitting, "Admission toggled");
        self.publish(QueueEvent::AdmissionToggled {
            location_id: location_id.to_string(),
            is_admitting,
        });
        Ok(is_admitting)
    }

    /// Advance the serving counter by one; returns the serial now served
    pub async fn call_next(&self, location_id: &str) -> QueueResult<u32> {
        let current_served = self
            .with_location(location_id, |txn, location| {
                self.roll_over(txn, location, self.today())?;
                if location.current_served >= location.total_issued {
                    return Err(QueueError::QueueExhausted);
                }
                location.current_served += 1;
                Ok(location.current_served)
            })
            .await?;

        tracing::info!(location_id = %location_id, current_served, "Next patient called");
        self.publish(QueueEvent::ServingAdvanced {
            location_id: location_id.to_string(),
            current_served,
        });
        Ok(current_served)
    }

    /// Change nominal capacity
    ///
    /// Existing bookings keep their status; only later serials see the new value.
    pub async fn set_capacity(&self, location_id: &str, max_admissions: u32) -> QueueResult<Location> {
        validate_capacity(max_admissions)?;
        let location = self
            .with_location(location_id, |_, location| {
                location.max_admissions = max_admissions;
                Ok(location.clone())
            })
            .await?;

        tracing::info!(location_id = %location_id, max_admissions, "Capacity updated");
        self.publish(QueueEvent::CapacityChanged {
            location_id: location_id.to_string(),
            max_admissions,
        });
        Ok(location)
    }

    /// Ordered queue for one day (defaults to today)
    pub fn queue_snapshot(
        &self,
        location_id: &str,
        date: Option<NaiveDate>,
    ) -> QueueResult<Vec<QueueEntry>> {
        self.get_location(location_id)?;
        let date = date.unwrap_or_else(|| self.today());
        let bookings = self.storage().bookings_for_day(location_id, date)?;
        Ok(bookings.iter().map(QueueEntry::from).collect())
    }

    /// Distinct requesters that ever booked at a location
    pub fn list_requesters(&self, location_id: &str) -> QueueResult<Vec<String>> {
        self.get_location(location_id)?;
        Ok(self.storage().requesters_for_location(location_id)?)
    }

    pub fn get_booking(&self, booking_id: &str) -> QueueResult<Booking> {
        self.storage()
            .get_booking(booking_id)?
            .ok_or_else(|| QueueError::BookingNotFound(booking_id.to_string()))
    }

    /// Move a ticket to completed / cancelled / no-show
    ///
    /// Terminal tickets never change again and a ticket cannot go back to
    /// `pending` or `extra`.
    pub async fn update_booking_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> QueueResult<Booking> {
        if !status.is_terminal() {
            return Err(QueueError::InvalidBookingStatus(format!(
                "Cannot set booking status to {:?}",
                status
            )));
        }
        let location_id = self.get_booking(booking_id)?.location_id;

        let booking = self
            .with_location(&location_id, |txn, _| {
                let mut booking = self
                    .storage()
                    .get_booking_txn(txn, booking_id)?
                    .ok_or_else(|| QueueError::BookingNotFound(booking_id.to_string()))?;
                if booking.status.is_terminal() {
                    return Err(QueueError::InvalidBookingStatus(format!(
                        "Booking {} is already {:?}",
                        booking_id, booking.status
                    )));
                }
                booking.status = status;
                booking.updated_at = shared::util::now_millis();
                self.storage().update_booking(txn, &booking)?;
                Ok(booking)
            })
            .await?;

        tracing::info!(booking_id = %booking_id, status = ?status, "Booking status updated");
        self.publish(QueueEvent::BookingStatusChanged {
            location_id,
            booking_id: booking_id.to_string(),
            status,
        });
        Ok(booking)
    }
}

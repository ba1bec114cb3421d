//! Weekly visiting hours of providers at locations
//!
//! Slots are replaced wholesale per (location, provider) in one write
//! transaction. They describe when a provider usually visits; they never gate
//! bookings or the serving counter, so no location lock is taken.

use shared::models::{DEFAULT_SLOT_MAX_PATIENTS, ScheduleReplace, ScheduleSlot};

use super::{QueueError, QueueResult, QueueService, StorageError};
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_SCHEDULE_SLOTS, validate_clock_time, validate_required_text,
};

impl QueueService {
    /// Replace all of a provider's slots at a location
    ///
    /// An empty list clears them. Returns the stored slots ordered by day
    /// then start time.
    pub fn replace_schedule(&self, data: ScheduleReplace) -> QueueResult<Vec<ScheduleSlot>> {
        if data.schedules.len() > MAX_SCHEDULE_SLOTS {
            return Err(QueueError::Validation(format!(
                "At most {MAX_SCHEDULE_SLOTS} slots per provider and location"
            )));
        }

        let mut slots = Vec::with_capacity(data.schedules.len());
        for shift in data.schedules {
            let start = validate_clock_time(&shift.start_time, "start_time")?;
            let end = validate_clock_time(&shift.end_time, "end_time")?;
            if start >= end {
                return Err(QueueError::Validation(format!(
                    "Slot must end after it starts ({} - {})",
                    shift.start_time.trim(),
                    shift.end_time.trim()
                )));
            }
            let max_patients = shift.max_patients.unwrap_or(DEFAULT_SLOT_MAX_PATIENTS);
            if max_patients == 0 {
                return Err(QueueError::Validation("max_patients must be at least 1".into()));
            }

            slots.push(ScheduleSlot {
                id: uuid::Uuid::new_v4().to_string(),
                location_id: data.location_id.clone(),
                provider_id: data.provider_id.clone(),
                day_of_week: shift.day_of_week,
                shift_name: validate_required_text(&shift.shift_name, "shift_name", MAX_NAME_LEN)?,
                start_time: start.format("%H:%M").to_string(),
                end_time: end.format("%H:%M").to_string(),
                max_patients,
            });
        }
        sort_by_day(&mut slots);

        let storage = self.storage();
        let txn = storage.begin_write()?;
        if storage.get_location_txn(&txn, &data.location_id)?.is_none() {
            return Err(QueueError::LocationNotFound(data.location_id));
        }
        if storage.get_provider_txn(&txn, &data.provider_id)?.is_none() {
            return Err(QueueError::ProviderNotFound(data.provider_id));
        }
        storage.replace_schedule(&txn, &data.location_id, &data.provider_id, &slots)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(
            location_id = %data.location_id,
            provider_id = %data.provider_id,
            slots = slots.len(),
            "Schedule replaced"
        );
        Ok(slots)
    }

    /// Every provider's slots at a location, ordered by start time
    pub fn location_schedule(&self, location_id: &str) -> QueueResult<Vec<ScheduleSlot>> {
        self.get_location(location_id)?;
        let mut slots = self.storage().schedules_for_location(location_id)?;
        slots.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then(a.day_of_week.cmp(&b.day_of_week))
        });
        Ok(slots)
    }

    /// One provider's slots at a location, ordered by day then start time
    pub fn provider_schedule(
        &self,
        provider_id: &str,
        location_id: &str,
    ) -> QueueResult<Vec<ScheduleSlot>> {
        let mut slots = self.storage().get_schedule(location_id, provider_id)?;
        sort_by_day(&mut slots);
        Ok(slots)
    }
}

fn sort_by_day(slots: &mut [ScheduleSlot]) {
    slots.sort_by(|a, b| {
        a.day_of_week
            .cmp(&b.day_of_week)
            .then_with(|| a.start_time.cmp(&b.start_time))
    });
}

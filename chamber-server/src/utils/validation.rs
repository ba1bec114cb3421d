//! Input validation helpers
//!
//! Run before any lock is taken; a rejected request never touches storage.

use chrono::NaiveTime;
use shared::models::Coordinates;

use crate::geo;
use crate::queue::{QueueError, QueueResult};

/// Location / provider display names
pub const MAX_NAME_LEN: usize = 200;

/// Requester identifiers (header value)
pub const MAX_REQUESTER_ID_LEN: usize = 128;

/// Slots accepted in one schedule replacement (eight a day)
pub const MAX_SCHEDULE_SLOTS: usize = 56;

/// Largest delay a provider may announce (one day)
pub const MAX_DELAY_MINUTES: u32 = 1440;

/// Validate a required string and return it trimmed
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> QueueResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(QueueError::Validation(format!("{field} must not be empty")));
    }
    if trimmed.len() > max_len {
        return Err(QueueError::Validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            trimmed.len()
        )));
    }
    Ok(trimmed.to_string())
}

/// Capacity must admit at least one ticket
pub fn validate_capacity(max_admissions: u32) -> QueueResult<()> {
    if max_admissions == 0 {
        return Err(QueueError::Validation("max_admissions must be at least 1".into()));
    }
    Ok(())
}

/// Validate a reported position
pub fn validate_coordinates(position: Coordinates) -> QueueResult<()> {
    if !position.lat.is_finite() || !position.lng.is_finite() {
        return Err(QueueError::Validation("Coordinates must be finite numbers".into()));
    }
    if !geo::is_valid(position) {
        return Err(QueueError::Validation(format!(
            "Coordinates out of range: lat {} lng {}",
            position.lat, position.lng
        )));
    }
    Ok(())
}

/// Parse a wall-clock time given as `HH:MM` (seconds tolerated)
pub fn validate_clock_time(value: &str, field: &str) -> QueueResult<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| QueueError::Validation(format!("{field} must be HH:MM, got '{value}'")))
}

/// Delay must be at least one minute and at most a day
pub fn validate_delay_minutes(minutes: u32) -> QueueResult<()> {
    if minutes == 0 || minutes > MAX_DELAY_MINUTES {
        return Err(QueueError::Validation(format!(
            "Delay must be between 1 and {MAX_DELAY_MINUTES} minutes, got {minutes}"
        )));
    }
    Ok(())
}

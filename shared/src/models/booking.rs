//! Booking Model (a queue ticket)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Ticket status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    /// Within nominal capacity
    Pending,
    /// Issued beyond nominal capacity, still honored
    Extra,
    Completed,
    Cancelled,
    NoShow,
}

impl BookingStatus {
    /// Completed / cancelled / no-show never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
    }
}

/// Booking record
///
/// `(location_id, date, serial_number)` is unique. Serials are never
/// renumbered after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub location_id: String,
    pub requester_id: String,
    pub serial_number: u32,
    pub date: NaiveDate,
    pub status: BookingStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create booking payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCreate {
    pub location_id: String,
    /// `YYYY-MM-DD`
    pub date: String,
}

/// Booking status update payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingStatusUpdate {
    pub status: BookingStatus,
}

/// One row of a location's daily queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub serial: u32,
    pub status: BookingStatus,
    pub booking_id: String,
    pub requester_id: String,
}

impl From<&Booking> for QueueEntry {
    fn from(b: &Booking) -> Self {
        Self {
            serial: b.serial_number,
            status: b.status,
            booking_id: b.id.clone(),
            requester_id: b.requester_id.clone(),
        }
    }
}

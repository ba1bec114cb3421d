//! Queue change notifications
//!
//! Published after the corresponding transaction commits. Subscribers use
//! them as "something changed" hints and re-read state; dropping events
//! (no receivers, lagged receivers) loses nothing durable.

use chrono::NaiveDate;
use serde::Serialize;
use shared::models::BookingStatus;

/// Broadcast channel capacity
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueueEvent {
    BookingCreated {
        location_id: String,
        booking_id: String,
        serial: u32,
        status: BookingStatus,
        date: NaiveDate,
    },
    BookingStatusChanged {
        location_id: String,
        booking_id: String,
        status: BookingStatus,
    },
    AdmissionToggled {
        location_id: String,
        is_admitting: bool,
    },
    CapacityChanged {
        location_id: String,
        max_admissions: u32,
    },
    ServingAdvanced {
        location_id: String,
        current_served: u32,
    },
    JourneyStarted {
        location_id: String,
        provider_id: String,
    },
    PositionReported {
        location_id: String,
        provider_id: String,
        distance_km: Option<f64>,
    },
    Arrived {
        location_id: String,
        provider_id: String,
    },
    DelayReported {
        location_id: String,
        minutes: u32,
    },
    SessionEnded {
        location_id: String,
        provider_id: String,
    },
    DailyReset {
        date: NaiveDate,
    },
}

impl QueueEvent {
    /// Location the event belongs to; `None` for global events
    pub fn location_id(&self) -> Option<&str> {
        match self {
            Self::BookingCreated { location_id, .. }
            | Self::BookingStatusChanged { location_id, .. }
            | Self::AdmissionToggled { location_id, .. }
            | Self::CapacityChanged { location_id, .. }
            | Self::ServingAdvanced { location_id, .. }
            | Self::JourneyStarted { location_id, .. }
            | Self::PositionReported { location_id, .. }
            | Self::Arrived { location_id, .. }
            | Self::DelayReported { location_id, .. }
            | Self::SessionEnded { location_id, .. } => Some(location_id),
            Self::DailyReset { .. } => None,
        }
    }

    /// Whether a watcher of `location_id` should refresh
    pub fn concerns(&self, location_id: &str) -> bool {
        self.location_id().is_none_or(|id| id == location_id)
    }
}

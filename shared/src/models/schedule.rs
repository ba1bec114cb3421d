//! Schedule Model (weekly visiting hours of a provider at a location)

use serde::{Deserialize, Serialize};

/// Default patient cap for a visiting slot
pub const DEFAULT_SLOT_MAX_PATIENTS: u32 = 20;

/// Day of the week, ordered Sunday first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

/// One recurring visiting slot
///
/// Times are local `HH:MM` in the business timezone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    pub id: String,
    pub location_id: String,
    pub provider_id: String,
    pub day_of_week: Weekday,
    /// e.g. "Morning", "Evening"
    pub shift_name: String,
    pub start_time: String,
    pub end_time: String,
    pub max_patients: u32,
}

/// One slot in a replace request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftInput {
    pub day_of_week: Weekday,
    pub shift_name: String,
    pub start_time: String,
    pub end_time: String,
    pub max_patients: Option<u32>,
}

/// Replace every slot a provider has at a location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleReplace {
    pub provider_id: String,
    pub location_id: String,
    pub schedules: Vec<ShiftInput>,
}

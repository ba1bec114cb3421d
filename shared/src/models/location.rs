//! Location Model (the chamber: a physical service point with its own daily queue)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default nominal capacity for a location
pub const DEFAULT_MAX_ADMISSIONS: u32 = 50;

/// A latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Provider journey phase relative to a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TravelStatus {
    #[default]
    AtBase,
    EnRoute,
    Arrived,
    Delayed,
}

impl TravelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AtBase => "AT_BASE",
            Self::EnRoute => "EN_ROUTE",
            Self::Arrived => "ARRIVED",
            Self::Delayed => "DELAYED",
        }
    }
}

impl std::fmt::Display for TravelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location record
///
/// `current_served <= total_issued` always holds. `total_issued` belongs to
/// the calendar day in `counter_date`; the allocator rolls it over when the
/// day changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: String,
    /// Display name, e.g. "Popular Diagnostic, Room 402"
    pub name: String,
    /// Owning provider (if linked)
    pub provider_id: Option<String>,
    /// Nominal capacity; tickets beyond it are issued as `extra`
    pub max_admissions: u32,
    /// Admission gate
    pub is_admitting: bool,
    /// Serial currently being served
    pub current_served: u32,
    /// Tickets issued for `counter_date`
    pub total_issued: u32,
    /// Calendar day `total_issued` counts for
    pub counter_date: Option<NaiveDate>,
    pub travel_status: TravelStatus,
    pub delay_minutes: u32,
    /// Fixed destination coordinates
    pub destination: Option<Coordinates>,
    /// Provider currently travelling here; live position lives on that provider's row
    pub en_route_provider_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create location payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationCreate {
    pub name: String,
    pub provider_id: Option<String>,
    /// Defaults to the server's configured capacity
    pub max_admissions: Option<u32>,
    pub destination: Option<Coordinates>,
}

/// Capacity update payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityUpdate {
    pub max_admissions: u32,
}

/// Delay report payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayReport {
    pub minutes: u32,
}
